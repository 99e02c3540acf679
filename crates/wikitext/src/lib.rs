//! Field location in semi-structured wiki source text.
//!
//! Wiki pages describe files with templates such as `{{Information}}`, whose
//! fields look like `|date=...`. Finding one of those fields with a plain
//! pattern scan is easy, except that the same pattern may also appear inside
//! regions the wiki never parses (`<!-- -->`, `<nowiki>`, `<pre>`, `<math>`).
//! Those regions are blanked out first with [`mask`], which keeps every
//! byte offset stable so spans found in the masked text can be used directly
//! against the original.
//!
//! This is best effort, not a wikitext parser: opaque regions are assumed not
//! to nest, and only the first line of a field value is ever considered.

mod consts;
mod field;
mod mask;

pub use crate::field::{FieldSpan, Positions, find_field, find_positions};
pub use crate::mask::{OpaqueKind, OpaqueRegion, mask, opaque_regions};
