//! MCP server for the vision trigger policy: exposes per-turn trigger
//! detection, planning, and reference memory to an agent orchestrator.

pub mod config;
pub mod prompts;
pub mod protocol;
pub mod repl;
pub mod resources;
pub mod session;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::resolve_policy_path;
pub use protocol::ProtocolHandler;
pub use session::PolicySessionManager;
pub use transport::StdioTransport;
