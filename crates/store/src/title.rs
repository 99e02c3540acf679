//! File title validation.
//!
//! Titles arrive from users as bare file names, `File:` titles, or whole page
//! URLs copied from a browser. They are normalized to `File:` titles before
//! any query is made.

use crate::error::{ErrorKind, Result};

pub const FILE_NAMESPACE: &str = "File:";
/// Characters that can never appear in a file name.
const FORBIDDEN: [char; 2] = ['/', '|'];
/// Prefixes naming the file namespace, matched case-insensitively.
const NAMESPACE_ALIASES: [&str; 2] = ["file", "image"];

/// Normalizes user input into a `File:` title.
///
/// Returns `Ok(None)` for blank input so callers can decide what "not given"
/// means.
///
/// # Examples
///
/// ```
/// use dtz_store::file_title;
///
/// assert_eq!(file_title("Example.jpg").unwrap().as_deref(), Some("File:Example.jpg"));
/// assert_eq!(file_title("File:Example.jpg").unwrap().as_deref(), Some("File:Example.jpg"));
/// assert_eq!(
///     file_title("https://commons.wikimedia.org/wiki/File:Example.jpg").unwrap().as_deref(),
///     Some("File:Example.jpg"),
/// );
/// assert_eq!(file_title("   ").unwrap(), None);
/// assert!(file_title("a|b.jpg").is_err());
/// ```
pub fn file_title(input: &str) -> Result<Option<String>> {
    let mut title = input.trim();
    if (title.starts_with("https://") || title.starts_with("http://"))
        && let Some(pos) = title.find("/wiki/")
    {
        title = &title[pos + "/wiki/".len()..];
    }
    if title.contains(FORBIDDEN) {
        exn::bail!(ErrorKind::InvalidTitle(format!(
            "file names may not contain the characters {FORBIDDEN:?}: {title}"
        )));
    }
    if let Some((prefix, name)) = title.split_once(':')
        && NAMESPACE_ALIASES.iter().any(|alias| prefix.trim().eq_ignore_ascii_case(alias))
    {
        title = name.trim_start();
    }
    if title.is_empty() {
        return Ok(None);
    }
    Ok(Some(format!("{FILE_NAMESPACE}{title}")))
}
