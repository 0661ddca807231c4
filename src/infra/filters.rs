//! Entry filters resolved once from configuration.
//!
//! `IgnoreRules` decides which names the scanner never looks at (unwanted,
//! hidden, OS metadata). `ExtensionFilter` is the allow-list applied to files.

use std::collections::BTreeSet;
use std::fmt;

use crate::core::naming::{SYSTEM_ARTIFACTS, split_extension};
use crate::error::ConfigError;

/// Why an entry was left out of the scan result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason
{
    /// Matches the unwanted-name list
    Unwanted,
    /// Starts with a dot
    Hidden,
    /// Contains an OS metadata marker such as `.DS_Store`
    SystemMetadata,
    /// Extension not in the allow-list
    Extension,
    /// Symlink, socket, device or other non-regular entry
    NotRegular,
}

impl fmt::Display for FilterReason
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        let s = match self
        {
            FilterReason::Unwanted => "unwanted name",
            FilterReason::Hidden => "hidden",
            FilterReason::SystemMetadata => "system metadata",
            FilterReason::Extension => "extension not allowed",
            FilterReason::NotRegular => "not a regular file or directory",
        };
        f.write_str(s)
    }
}

/// Name-based ignore rules. Names are compared case-insensitively.
#[derive(Debug, Clone)]
pub struct IgnoreRules
{
    names: BTreeSet<String>,
}

impl Default for IgnoreRules
{
    fn default() -> Self
    {
        Self::new(std::iter::empty::<&str>())
    }
}

impl IgnoreRules
{
    /// Built-in OS artifact names plus `extra`.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = SYSTEM_ARTIFACTS
            .iter()
            .map(|s| s.to_string())
            .chain(
                extra
                    .into_iter()
                    .map(|s| s.as_ref().trim().to_lowercase())
                    .filter(|s| !s.is_empty()),
            )
            .collect();
        Self { names }
    }

    /// Reason `name` is ignored, or `None` if the scanner should visit it.
    pub fn classify(
        &self,
        name: &str,
    ) -> Option<FilterReason>
    {
        let lower = name.to_lowercase();

        if self
            .names
            .contains(&lower)
        {
            return Some(FilterReason::Unwanted);
        }
        if name.starts_with('.')
        {
            return Some(FilterReason::Hidden);
        }
        if lower.contains(".ds_store")
        {
            return Some(FilterReason::SystemMetadata);
        }
        None
    }

    /// Whether `name` counts as real content (used for the empty-output check).
    pub fn is_visible(
        &self,
        name: &str,
    ) -> bool
    {
        self.classify(name)
            .is_none()
    }
}

/// Extension allow-list. Entries are stored as lower-cased `.ext`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExtensionFilter
{
    /// Wildcard: every extension, including none
    #[default]
    Any,
    Only(BTreeSet<String>),
}

impl ExtensionFilter
{
    /// Parse a comma-separated list. `*` anywhere, or an empty value, means
    /// all files; entries gain a leading dot and are lower-cased.
    pub fn parse(raw: &str) -> Result<Self, ConfigError>
    {
        if raw
            .trim()
            .is_empty()
        {
            return Ok(Self::Any);
        }

        let mut set = BTreeSet::new();
        for part in raw.split(',')
        {
            let ext = part
                .trim()
                .to_lowercase();
            if ext.is_empty()
            {
                continue;
            }
            if ext == "*"
            {
                return Ok(Self::Any);
            }
            if ext.starts_with('.')
            {
                set.insert(ext);
            }
            else
            {
                set.insert(format!(".{ext}"));
            }
        }

        if set.is_empty() || set.contains(".")
        {
            return Err(ConfigError::EmptyExtensions {
                value: raw.to_string(),
            });
        }
        Ok(Self::Only(set))
    }

    /// Whether a file called `file_name` passes the filter.
    pub fn allows(
        &self,
        file_name: &str,
    ) -> bool
    {
        match self
        {
            Self::Any => true,
            Self::Only(set) =>
            {
                let ext = split_extension(file_name)
                    .1
                    .to_lowercase();
                set.contains(&ext)
            }
        }
    }
}

impl fmt::Display for ExtensionFilter
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        match self
        {
            Self::Any => f.write_str("*"),
            Self::Only(set) =>
            {
                let list: Vec<&str> = set
                    .iter()
                    .map(String::as_str)
                    .collect();
                f.write_str(&list.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_ignore_rules_classify()
    {
        let rules = IgnoreRules::new(["desktop.ini"]);

        assert_eq!(rules.classify("Thumbs.db"), Some(FilterReason::Unwanted));
        assert_eq!(rules.classify("DESKTOP.INI"), Some(FilterReason::Unwanted));
        assert_eq!(rules.classify(".cache"), Some(FilterReason::Hidden));
        assert_eq!(rules.classify("copy of .DS_Store"), Some(FilterReason::SystemMetadata));
        assert_eq!(rules.classify("photo.jpg"), None);
        assert!(rules.is_visible("batch_01"));
    }

    #[test]
    fn test_extension_filter_parse()
    {
        assert_eq!(ExtensionFilter::parse("*").unwrap(), ExtensionFilter::Any);
        assert_eq!(ExtensionFilter::parse("").unwrap(), ExtensionFilter::Any);
        assert_eq!(ExtensionFilter::parse("jpg, *").unwrap(), ExtensionFilter::Any);

        let only = ExtensionFilter::parse("JPG, .png,mp4").unwrap();
        assert_eq!(only.to_string(), ".jpg, .mp4, .png");

        assert!(matches!(
            ExtensionFilter::parse(" , ,"),
            Err(ConfigError::EmptyExtensions { .. })
        ));
    }

    #[test]
    fn test_extension_filter_allows()
    {
        let only = ExtensionFilter::parse("jpg,png").unwrap();
        assert!(only.allows("IMG001.JPG"));
        assert!(only.allows("a.b.png"));
        assert!(!only.allows("clip.mp4"));
        assert!(!only.allows("README"));
        assert!(ExtensionFilter::Any.allows("README"));
    }
}
