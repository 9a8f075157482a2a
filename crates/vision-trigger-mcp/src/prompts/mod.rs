//! MCP prompt implementations.

pub mod registry;
pub mod save_selection;
pub mod visual_turn;

pub use registry::PromptRegistry;
