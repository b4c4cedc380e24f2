//! Pretrained static word vectors (GloVe).
//!
//! - [`StaticEmbeddingLookup`] - Frozen index-to-vector layer
//! - [`EmbeddingTableCache`] - Load-once table cache, injectable or process-wide
//! - [`TableLoader`] / [`NpyTableLoader`] - Where tables come from

pub mod cache;
pub mod loader;
pub mod lookup;

pub use cache::{global_table_cache, EmbeddingTableCache};
pub use loader::{EmbeddingTable, NpyTableLoader, TableLoader};
pub use lookup::{StaticEmbeddingConfig, StaticEmbeddingLookup};
