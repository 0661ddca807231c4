//! Filepath: src/infra/utils.rs
//! Small formatting helpers shared by the report printers.

/// Byte-size formatting helpers
pub struct SizeUtils;

impl SizeUtils
{
    const MIB: f64 = 1024.0 * 1024.0;

    /// Render a byte count as mebibytes with two decimals, e.g. `1.50 MiB`
    pub fn mib(bytes: u64) -> String
    {
        format!("{:.2} MiB", bytes as f64 / Self::MIB)
    }

    /// Plain count for small sizes, MiB otherwise
    pub fn short(bytes: u64) -> String
    {
        if bytes < 1024 * 1024
        {
            format!("{bytes} B")
        }
        else
        {
            Self::mib(bytes)
        }
    }
}

/// Pluralization helper for report lines
pub struct TextUtils;

impl TextUtils
{
    /// `1 file`, `2 files`, `2 batches`
    pub fn count(
        n: usize,
        noun: &str,
    ) -> String
    {
        if n == 1
        {
            return format!("{n} {noun}");
        }

        let sibilant = ["s", "x", "z", "ch", "sh"]
            .iter()
            .any(|end| noun.ends_with(end));
        if sibilant
        {
            format!("{n} {noun}es")
        }
        else
        {
            format!("{n} {noun}s")
        }
    }
}
