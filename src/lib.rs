//! Tastelog Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod library_store;
pub mod llm;
pub mod recommend;
pub mod server;
pub mod sqlite_persistence;
pub mod streaming;

// Re-export commonly used types for convenience
pub use library_store::{LibraryStore, SqliteLibraryStore};
pub use recommend::{RecommendError, RecommendService, RecommendStore, SqliteRecommendStore};
pub use server::{run_server, RequestsLoggingLevel, Session};
pub use streaming::{StreamingApi, StreamingClient};
