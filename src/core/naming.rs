//! Filepath: src/core/naming.rs
//! Normalized display names derived from an entry's position under the scan root.
//!
//! A name is built from up to two directory levels (the "main" and "sub"
//! categories) plus a short identifier lifted from the original file stem:
//!   `Wedding/Photos - Regular/IMG001.JPG` → `wedding_photos-regular_img001.jpg`
//!
//! Generation is a fixed point: a path whose components were already produced
//! by this module maps back to the same names, so rescanning a renamed tree is
//! a no-op. All names are capped at `MAX_NAME_LEN` characters.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Upper bound for generated names, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// OS metadata files, compared case-insensitively.
pub const SYSTEM_ARTIFACTS: &[&str] = &[
    ".ds_store",
    "thumbs.db",
    ".localized",
    ".spotlight-v100",
    ".trashes",
];

static SPACED_HYPHEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*-\s*").expect("static regex"));
static NOT_ALNUM_OR_HYPHEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9-]").expect("static regex"));
static NOT_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]").expect("static regex"));
static LETTERS_THEN_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+[0-9]+").expect("static regex"));
static LETTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+").expect("static regex"));

/// True for OS metadata file names such as `.DS_Store` or `Thumbs.db`.
pub fn is_system_artifact(name: &str) -> bool {
    let lower = name.to_lowercase();
    SYSTEM_ARTIFACTS.contains(&lower.as_str())
}

/// Generate the normalized name for `path` (a file, or a directory when
/// `is_dir`) located under `root`. Never fails: inputs it cannot interpret
/// come back as their current basename.
pub fn generate_name(path: &Path, root: &Path, is_dir: bool) -> String {
    let Some(base) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return path.to_string_lossy().into_owned();
    };

    if is_system_artifact(&base) {
        return base;
    }

    let Ok(relative) = path.strip_prefix(root) else {
        return base;
    };

    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    // Files take their categories from parent directories only
    let dirs = if is_dir {
        &segments[..]
    } else {
        &segments[..segments.len().saturating_sub(1)]
    };
    let categories = categories(dirs);

    if is_dir {
        if categories.is_empty() {
            return base;
        }
        return truncate_chars(&categories.join("_"), MAX_NAME_LEN);
    }

    compose_file_name(&categories, &base)
}

/// Lower-cased category label. Strings with a hyphen keep only letters,
/// digits and hyphens; everything else maps each non-alphanumeric to `-`.
pub fn normalize_category(raw: &str) -> String {
    let cleaned = if SPACED_HYPHEN.is_match(raw) {
        NOT_ALNUM_OR_HYPHEN.replace_all(raw, "")
    } else {
        NOT_ALNUM.replace_all(raw, "-")
    };
    cleaned.to_lowercase()
}

/// Leading identifier of a file stem: letters followed by digits, else the
/// first run of letters, else the whole stem.
pub fn identifier(stem: &str) -> &str {
    LETTERS_THEN_DIGITS
        .find(stem)
        .or_else(|| LETTERS.find(stem))
        .map_or(stem, |m| m.as_str())
}

/// Collision variant of `name`: `<stem>-<n><ext>`, still within the cap.
pub fn with_suffix(name: &str, n: u32, is_dir: bool) -> String {
    let (stem, ext) = if is_dir {
        (name, "")
    } else {
        split_extension(name)
    };
    let suffix = format!("-{n}");
    let room = MAX_NAME_LEN
        .saturating_sub(ext.chars().count())
        .saturating_sub(suffix.len());
    format!("{}{suffix}{ext}", truncate_chars(stem, room))
}

/// True when `current` is `with_suffix(generated, n)` for some `n >= 2`.
pub fn is_disambiguated(current: &str, generated: &str, is_dir: bool) -> bool {
    let stem = if is_dir {
        current
    } else {
        split_extension(current).0
    };
    let Some((_, digits)) = stem.rsplit_once('-') else {
        return false;
    };
    match digits.parse::<u32>() {
        Ok(n) if n >= 2 && !digits.starts_with('0') => with_suffix(generated, n, is_dir) == current,
        _ => false,
    }
}

/// Split `name` into stem and extension (dot included). A leading dot does not
/// start an extension, so `.profile` has none.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

fn categories(dirs: &[String]) -> Vec<String> {
    let Some(first) = dirs.first() else {
        return Vec::new();
    };
    let main = normalize_category(first);

    let mut out = vec![main.clone()];
    if let Some(second) = dirs.get(1) {
        // A previously generated `main_sub` directory maps back to `sub`
        let prefix = format!("{main}_");
        let raw = second.strip_prefix(prefix.as_str()).unwrap_or(second);
        out.push(normalize_category(raw));
    }

    out.retain(|c| !c.is_empty());
    out
}

fn compose_file_name(categories: &[String], base: &str) -> String {
    let (stem, ext) = split_extension(base);
    let prefix: String = categories.iter().map(|c| format!("{c}_")).collect();

    let stem = stem.strip_prefix(prefix.as_str()).unwrap_or(stem);
    let id = identifier(stem).to_lowercase();

    fit(&format!("{prefix}{id}"), &ext.to_lowercase())
}

/// Join stem and extension; an over-long result is cut inside the stem so the
/// whole name is exactly `MAX_NAME_LEN` characters.
fn fit(stem: &str, ext: &str) -> String {
    let ext_len = ext.chars().count();
    if stem.chars().count() + ext_len <= MAX_NAME_LEN {
        return format!("{stem}{ext}");
    }
    if ext_len >= MAX_NAME_LEN {
        return truncate_chars(&format!("{stem}{ext}"), MAX_NAME_LEN);
    }
    format!("{}{ext}", truncate_chars(stem, MAX_NAME_LEN - ext_len))
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn file(root: &str, rel: &str) -> String {
        let root = PathBuf::from(root);
        generate_name(&root.join(rel), &root, false)
    }

    fn dir(root: &str, rel: &str) -> String {
        let root = PathBuf::from(root);
        generate_name(&root.join(rel), &root, true)
    }

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category("Photos - Regular"), "photos-regular");
        assert_eq!(normalize_category("Wedding Day"), "wedding-day");
        assert_eq!(normalize_category("Videos - Vipin & Co"), "videos-vipinco");
        assert_eq!(normalize_category("a_b.c"), "a-b-c");
    }

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("IMG001"), "IMG001");
        assert_eq!(identifier("IMG_001"), "IMG");
        assert_eq!(identifier("001_x"), "001_x");
        assert_eq!(identifier("DSC1234 copy"), "DSC1234");
    }

    #[test]
    fn test_directory_names() {
        assert_eq!(dir("/in", "Wedding"), "wedding");
        assert_eq!(dir("/in", "Wedding/Photos - Regular"), "wedding_photos-regular");
        // Deeper directories reuse the first two levels
        assert_eq!(dir("/in", "Wedding/Photos - Regular/Day 1"), "wedding_photos-regular");
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            file("/in", "Wedding/Photos - Regular/IMG001.JPG"),
            "wedding_photos-regular_img001.jpg"
        );
        assert_eq!(file("/in", "Wedding/IMG_0042.png"), "wedding_img.png");
        assert_eq!(file("/in", "notes.TXT"), "notes.txt");
        assert_eq!(file("/in", "Misc/README"), "misc_readme");
    }

    #[test]
    fn test_system_artifacts_pass_through() {
        assert_eq!(file("/in", "Wedding/.DS_Store"), ".DS_Store");
        assert_eq!(file("/in", "Wedding/Thumbs.db"), "Thumbs.db");
        assert_eq!(dir("/in", ".Trashes"), ".Trashes");
    }

    #[test]
    fn test_long_names_truncate_inside_stem() {
        let long = "A".repeat(150);
        let name = file("/in", &format!("{long}/IMG001.jpeg"));
        assert_eq!(name.chars().count(), MAX_NAME_LEN);
        assert!(name.ends_with(".jpeg"));

        let name = dir("/in", &long);
        assert_eq!(name.chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_suffix_round_trip() {
        let generated = "wedding_img.jpg";
        let variant = with_suffix(generated, 2, false);
        assert_eq!(variant, "wedding_img-2.jpg");
        assert!(is_disambiguated(&variant, generated, false));
        assert!(!is_disambiguated(generated, generated, false));
        assert!(!is_disambiguated("wedding_img-02.jpg", generated, false));
        assert!(!is_disambiguated("other-2.jpg", generated, false));

        assert_eq!(with_suffix("wedding_photos", 3, true), "wedding_photos-3");
        assert!(is_disambiguated("wedding_photos-3", "wedding_photos", true));

        let long = format!("{}.jpg", "x".repeat(96));
        assert_eq!(with_suffix(&long, 12, false).chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_rename_is_a_fixed_point() {
        let root = Path::new("/in");
        let d1 = dir("/in", "Wedding");
        let d2 = dir("/in", "Wedding/Photos - Regular");
        let f = file("/in", "Wedding/Photos - Regular/IMG001.JPG");

        let renamed = root.join(&d1).join(&d2);
        assert_eq!(generate_name(&root.join(&d1), root, true), d1);
        assert_eq!(generate_name(&renamed, root, true), d2);
        assert_eq!(generate_name(&renamed.join(&f), root, false), f);
    }

    fn segment() -> impl Strategy<Value = String> {
        "[A-Za-z0-9 _.-]{1,24}".prop_filter("no dot-only names", |s| {
            !s.starts_with('.') && s.trim() != ""
        })
    }

    proptest! {
        #[test]
        fn prop_names_are_bounded_and_keep_extension(
            parts in prop::collection::vec(segment(), 0..4),
            stem in "[A-Za-z0-9_ ]{1,200}",
            ext in "[A-Za-z0-9]{1,6}",
        ) {
            let root = Path::new("/in");
            let mut path = root.to_path_buf();
            for p in &parts {
                path.push(p);
            }
            let name = generate_name(&path.join(format!("{stem}.{ext}")), root, false);
            prop_assert!(name.chars().count() <= MAX_NAME_LEN);
            let expected_ext = format!(".{}", ext.to_lowercase());
            prop_assert!(name.ends_with(&expected_ext));
        }

        #[test]
        fn prop_generation_is_idempotent(
            main in segment(),
            sub in segment(),
            stem in "[A-Za-z0-9_ ]{1,24}",
            ext in "[A-Za-z0-9]{1,5}",
        ) {
            let root = Path::new("/in");
            let d1 = generate_name(&root.join(&main), root, true);
            let d2 = generate_name(&root.join(&main).join(&sub), root, true);
            let f = generate_name(&root.join(&main).join(&sub).join(format!("{stem}.{ext}")), root, false);

            let renamed = root.join(&d1).join(&d2);
            prop_assert_eq!(generate_name(&root.join(&d1), root, true), d1);
            prop_assert_eq!(generate_name(&renamed, root, true), d2.clone());
            prop_assert_eq!(generate_name(&renamed.join(&f), root, false), f);
        }
    }
}
