//! Toolbelt MCP Server — schema-checked utility tools for LLM clients.

pub mod capabilities;
pub mod config;
pub mod prompts;
pub mod protocol;
pub mod repl;
pub mod resources;
pub mod tools;
pub mod transport;
pub mod types;

pub use capabilities::build_registry;
pub use config::{ConfigOverrides, ServerConfig};
pub use protocol::ProtocolHandler;
pub use transport::StdioTransport;
