// src/watch/filter.rs

use std::path::Path;

use regex::Regex;

use crate::errors::{Result, WatchrunError};

/// Compiled include/exclude patterns, matched against the full path string.
///
/// - With no include pattern every path is included.
/// - An exclude match always wins over an include match.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl NameFilter {
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// True if the include pattern is unset or matches `path`.
    pub fn includes(&self, path: &Path) -> bool {
        match &self.include {
            Some(re) => re.is_match(&path.to_string_lossy()),
            None => true,
        }
    }

    /// True if an exclude pattern is set and matches `path`.
    pub fn excludes(&self, path: &Path) -> bool {
        match &self.exclude {
            Some(re) => re.is_match(&path.to_string_lossy()),
            None => false,
        }
    }

    pub fn allows(&self, path: &Path) -> bool {
        self.includes(path) && !self.excludes(path)
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }
}

fn compile(pattern: Option<&str>) -> Result<Option<Regex>> {
    match pattern {
        None | Some("") => Ok(None),
        Some(pat) => Regex::new(pat)
            .map(Some)
            .map_err(|source| WatchrunError::InvalidPattern {
                pattern: pat.to_string(),
                source,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_matches_anywhere_in_path() {
        let filter = NameFilter::new(Some(r"\.(go|rb|java)$"), None).unwrap();
        assert!(filter.allows(Path::new("/src/main.go")));
        assert!(!filter.allows(Path::new("/src/main.rs")));
    }

    #[test]
    fn exclude_wins_over_include() {
        let filter = NameFilter::new(Some(r"\.rs$"), Some("/target/")).unwrap();
        assert!(filter.allows(Path::new("/p/src/lib.rs")));
        assert!(!filter.allows(Path::new("/p/target/build.rs")));
    }

    #[test]
    fn empty_patterns_allow_everything() {
        let filter = NameFilter::new(Some(""), None).unwrap();
        assert!(filter.is_empty());
        assert!(filter.allows(Path::new("anything")));
    }
}
