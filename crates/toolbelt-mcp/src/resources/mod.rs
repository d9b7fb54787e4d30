//! MCP resource implementations.

pub mod greeting;
pub mod server_info;

pub use server_info::ServerSummary;
