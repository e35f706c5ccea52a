//! # Agent
//!
//! A tool-oriented facade over indexing and semantic search.
//!
//! [`SemanticAgent`] builds the embedding service, vector store, content
//! cache and indexing pipeline from an [`AgentConfig`] and exposes them as
//! tools (`read_file`, `glob`, `index_files`, `semantic_search`). Every call
//! returns a [`ToolOutput`]; failures never escape as errors or panics.

pub mod agent;
pub mod config;
pub mod error;
pub mod registry;
pub mod telemetry;
pub mod tool;
pub mod tools;

pub use agent::SemanticAgent;
pub use config::{AgentConfig, EmbeddingSection, IndexingSection, StoreSection};
pub use error::{AgentError, Result};
pub use registry::{ToolInfo, ToolRegistry};
pub use telemetry::init_tracing;
pub use tool::{Tool, ToolOutput, parse_args};
pub use tools::{GlobTool, IndexFilesTool, ReadFileTool, SemanticSearchTool};
