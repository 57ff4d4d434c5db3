//! ragdb-core
//!
//! Shared data model, error taxonomy, collaborator contracts, content
//! addressing, text chunking and configuration for the ragdb crates.
#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunking;
pub mod config;
pub mod content;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
