pub mod backend;
pub mod error;
mod models;
mod title;

pub use crate::backend::{DocumentStore, IdentityProvider, RecordPageStream};
pub use crate::models::{ConcurrencyToken, Document, Edit, Identity, ImageRecord, TRUSTED_GROUP, UploadRange};
pub use crate::title::{FILE_NAMESPACE, file_title};
use std::sync::Arc;

pub type StoreHandle = Arc<dyn DocumentStore + Send + Sync>;
