//! MCP protocol handling — JSON-RPC routing onto the capability dispatcher.

pub mod handler;
pub mod negotiation;
pub mod validator;

pub use handler::ProtocolHandler;
