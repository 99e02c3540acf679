//! Blanking of opaque regions (comments, `<nowiki>`, `<pre>`, `<math>`).

use std::ops::Range;

use regex::Regex;
use tracing::instrument;

use crate::consts;

/// The kinds of region whose contents must never be scanned for fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpaqueKind {
    Comment,
    NoWiki,
    Pre,
    Math,
}
impl OpaqueKind {
    /// Same order as the capture groups of the start-tag pattern.
    pub const ALL: [OpaqueKind; 4] = [Self::Comment, Self::NoWiki, Self::Pre, Self::Math];

    fn end_regex(self) -> &'static Regex {
        match self {
            Self::Comment => &consts::COMMENT_END_REGEX,
            Self::NoWiki => &consts::NOWIKI_END_REGEX,
            Self::Pre => &consts::PRE_END_REGEX,
            Self::Math => &consts::MATH_END_REGEX,
        }
    }
}

/// A located opaque region, delimiters included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueRegion {
    pub kind: OpaqueKind,
    pub span: Range<usize>,
    /// `false` when no end tag was found and the region runs to end-of-text.
    pub terminated: bool,
}

/// Finds opaque regions left to right.
///
/// Regions do not nest: inside a region only the end tag of the *same* kind
/// is looked for, and the first one wins. An unterminated region swallows
/// the rest of the text and stops the search.
pub fn opaque_regions(text: &str) -> Vec<OpaqueRegion> {
    let mut regions = Vec::new();
    let mut cursor = 0;
    while let Some(captures) = consts::OPAQUE_START_REGEX.captures_at(text, cursor) {
        let Some((kind, start)) = OpaqueKind::ALL
            .iter()
            .enumerate()
            .find_map(|(i, kind)| captures.get(i + 1).map(|m| (*kind, m)))
        else {
            break;
        };
        match kind.end_regex().find_at(text, start.end()) {
            Some(end) => {
                regions.push(OpaqueRegion {
                    kind,
                    span: start.start()..end.end(),
                    terminated: true,
                });
                cursor = end.end();
            },
            None => {
                regions.push(OpaqueRegion {
                    kind,
                    span: start.start()..text.len(),
                    terminated: false,
                });
                break;
            },
        }
    }
    regions
}

/// Returns a copy of `text` with every opaque region (delimiters included)
/// replaced by spaces.
///
/// The output has exactly the same byte length as the input, so any offset
/// found in the masked text is valid against the original. Text outside the
/// masked regions, including its casing, is left untouched.
///
/// ```
/// use dtz_wikitext::mask;
///
/// let masked = mask("a<!-- |date= -->b");
/// assert_eq!(masked, "a               b");
/// assert_eq!(mask("no regions here"), "no regions here");
/// ```
#[instrument(level = "trace", skip(text), fields(text_len = text.len()))]
pub fn mask(text: &str) -> String {
    let regions = opaque_regions(text);
    if regions.is_empty() {
        return text.to_string();
    }
    let mut masked = String::with_capacity(text.len());
    let mut last = 0;
    for region in &regions {
        masked.push_str(&text[last..region.span.start]);
        // Blank per byte, not per char, to keep offsets stable.
        masked.extend(std::iter::repeat_n(' ', region.span.len()));
        last = region.span.end;
    }
    masked.push_str(&text[last..]);
    masked
}
