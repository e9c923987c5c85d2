//! Document index: chunking, vector storage, and the Drive build pipeline.

mod chunker;
mod service;
mod sqlite;
mod store;

pub use chunker::{Chunker, ChunkerConfig, TextChunk};
pub use service::{IndexInfo, IndexReport, IndexService};
pub use sqlite::SqliteVectorStore;
pub use store::{ChunkSearchResult, DocChunk, VectorStore};
