//! Location of template fields (`| name = value`) in wiki source text.

use std::ops::Range;

use regex::{Regex, escape as regex_escape};
use tracing::instrument;

use crate::{consts, mask};

/// Half-open byte range `[start, end)` covering the first line of a field's
/// value, starting immediately after the `=`.
///
/// Only the first line is ever considered part of the value; multi-line
/// values are deliberately not followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpan {
    pub start: usize,
    pub end: usize,
}
impl FieldSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The raw (untrimmed) value this span covers in `text`.
    pub fn value<'t>(&self, text: &'t str) -> &'t str {
        &text[self.range()]
    }

    /// Returns `text` with this span replaced by `replacement`, leaving
    /// everything else untouched.
    pub fn splice(&self, text: &str, replacement: &str) -> String {
        let mut out = String::with_capacity(text.len() - (self.end - self.start) + replacement.len());
        out.push_str(&text[..self.start]);
        out.push_str(replacement);
        out.push_str(&text[self.end..]);
        out
    }
}
impl From<FieldSpan> for Range<usize> {
    fn from(span: FieldSpan) -> Self {
        span.range()
    }
}

/// Spans of the two fields an edit cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Positions {
    pub author: Option<FieldSpan>,
    pub date: Option<FieldSpan>,
}

/// Finds the first occurrence of field `name` in (already masked) `text`.
///
/// The field name is matched exactly but case-insensitively, with optional
/// whitespace around it. The span ends at the next line terminator (a
/// trailing `\r` is not part of the value), or at end-of-text when there is
/// none.
///
/// ```
/// use dtz_wikitext::find_field;
///
/// let text = "|Author = Jane Doe\n|Date = 2020:01:01";
/// let author = find_field(text, "author").unwrap();
/// assert_eq!(author.value(text), " Jane Doe");
/// let date = find_field(text, "date").unwrap();
/// assert_eq!(date.value(text), " 2020:01:01");
/// assert!(find_field(text, "source").is_none());
/// ```
pub fn find_field(text: &str, name: &str) -> Option<FieldSpan> {
    match name.to_ascii_lowercase().as_str() {
        "author" => find_with(text, &consts::AUTHOR_FIELD_REGEX),
        "date" => find_with(text, &consts::DATE_FIELD_REGEX),
        other => {
            let pattern = format!(r"(?i)\|\s*{}\s*=", regex_escape(other));
            // An escaped literal always compiles.
            let regex = Regex::new(&pattern).ok()?;
            find_with(text, &regex)
        },
    }
}

fn find_with(text: &str, delimiter: &Regex) -> Option<FieldSpan> {
    let start = delimiter.find(text)?.end();
    let end = match text[start..].find('\n') {
        Some(len) => {
            let line = &text[start..start + len];
            start + line.strip_suffix('\r').unwrap_or(line).len()
        },
        // Text truncated? Take whatever is left.
        None => text.len(),
    };
    Some(FieldSpan { start, end })
}

/// Masks opaque regions once, then locates the `author` and `date` fields.
///
/// The returned spans index directly into the *original* `text`, since
/// masking preserves length and positions.
#[instrument(level = "debug", skip(text), fields(text_len = text.len()))]
pub fn find_positions(text: &str) -> Positions {
    let masked = mask(text);
    Positions {
        author: find_with(&masked, &consts::AUTHOR_FIELD_REGEX),
        date: find_with(&masked, &consts::DATE_FIELD_REGEX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const INFORMATION: &str = "== {{int:filedesc}} ==\n\
        {{Information\n\
        |description={{en|1=A lighthouse}}\n\
        |date=2020-06-15 10:00:00\n\
        |source={{own}}\n\
        |author=[[User:Example|Example]]\n\
        }}\n";

    #[rstest]
    #[case("|date=x", "date", Some("x"))]
    #[case("| date =x\ny", "date", Some("x"))]
    #[case("|\tDATE\t= x \n", "date", Some(" x "))]
    #[case("|date=\n", "date", Some(""))]
    #[case("|date=x\r\ny", "date", Some("x"))]
    #[case("|other=x", "date", None)]
    #[case("date=x", "date", None)]
    #[case("|Source = own", "source", Some(" own"))]
    #[case("|a.b = x", "a.b", Some(" x"))]
    #[case("|axb = x", "a.b", None)]
    fn test_find_field(#[case] text: &str, #[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(find_field(text, name).map(|s| s.value(text)), expected);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let text = "|date=first\n|date=second\n";
        assert_eq!(find_field(text, "date").unwrap().value(text), "first");
    }

    #[test]
    fn test_positions_in_information_template() {
        let positions = find_positions(INFORMATION);
        assert_eq!(positions.date.unwrap().value(INFORMATION), "2020-06-15 10:00:00");
        assert_eq!(positions.author.unwrap().value(INFORMATION), "[[User:Example|Example]]");
    }

    #[test]
    fn test_positions_skip_commented_fields() {
        let text = "<!-- |date=old\n|author=nobody -->\n|Author=Real\n|Date=2021\n";
        let positions = find_positions(text);
        assert_eq!(positions.date.unwrap().value(text), "2021");
        assert_eq!(positions.author.unwrap().value(text), "Real");
    }

    #[test]
    fn test_positions_inside_unterminated_region_not_found() {
        let text = "|author=me\n<nowiki>\n|date=2020\n";
        let positions = find_positions(text);
        assert!(positions.author.is_some());
        assert!(positions.date.is_none());
    }

    #[test]
    fn test_positions_index_original_text() {
        // Multi-byte characters before the field must not shift the span.
        let text = "Ünïcödé <!-- ☃ -->\n|date=2020\n";
        let span = find_positions(text).date.unwrap();
        assert_eq!(&text[span.range()], "2020");
    }

    #[test]
    fn test_splice() {
        let text = "|date=2020-06-15\n|author=x\n";
        let span = find_field(text, "date").unwrap();
        assert_eq!(span.splice(text, "{{DTZ|y}}"), "|date={{DTZ|y}}\n|author=x\n");
    }
}
