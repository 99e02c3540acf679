use std::fmt;

/// Case-insensitive substring filter.
///
/// ```
/// use dtz_batch::Filter;
///
/// let filter = Filter::new("  Jane ").unwrap();
/// assert!(filter.matches("[[User:JANE DOE|Jane]]"));
/// assert!(!filter.matches("John"));
/// assert!(Filter::new("   ").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter(String);

impl Filter {
    /// Builds a filter from user input; blank input means "no filter".
    pub fn new(input: &str) -> Option<Self> {
        let needle = input.trim().to_lowercase();
        (!needle.is_empty()).then_some(Self(needle))
    }

    pub fn matches(&self, haystack: &str) -> bool {
        haystack.to_lowercase().contains(&self.0)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
