//! ragdb-graph
//!
//! Entity extraction and graph-neighbourhood expansion over an in-memory
//! petgraph graph or a session-based remote graph database.
pub mod expander;
pub mod extract;
pub mod memory;
pub mod session;

pub use expander::GraphExpander;
pub use extract::TitleCaseExtractor;
pub use memory::MemoryGraph;
pub use session::{GraphClient, GraphSession, PathRow, SessionGraph};
