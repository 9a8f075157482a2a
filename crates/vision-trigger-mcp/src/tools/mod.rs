//! MCP tools exposing the trigger policy and the reference store.

pub mod reference_lookup;
pub mod reference_save;
pub mod registry;
pub mod session_end;
pub mod session_start;
pub mod vision_plan;
pub mod vision_trigger;

pub use registry::ToolRegistry;
