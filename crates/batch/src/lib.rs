pub mod edit;
pub mod error;
mod filter;
pub mod report;
mod request;
pub mod scan;

pub use crate::filter::Filter;
pub use crate::request::{BatchRequest, RequestInput};
pub use crate::scan::{RecordOutcome, ScanEvent, ScanSettings, ScanSummary, scan};
