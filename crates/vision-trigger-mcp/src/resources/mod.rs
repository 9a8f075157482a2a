//! MCP resource implementations.

pub mod config;
pub mod references;
pub mod registry;
pub mod stats;
pub mod templates;

pub use registry::ResourceRegistry;
