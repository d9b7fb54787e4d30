//! MCP prompt implementations.

pub mod code_review;
pub mod weather_briefing;
