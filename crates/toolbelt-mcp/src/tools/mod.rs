//! MCP tool implementations.
//!
//! Each tool module exposes a `descriptor` constructor; handlers receive
//! arguments that already passed schema validation and had defaults filled.

pub mod calculate;
pub mod current_time;
pub mod generate_image;
pub mod geocode;
pub mod greet;
pub mod http;
pub mod weather;

use serde::de::DeserializeOwned;
use serde_json::Value;
use toolbelt::{Arguments, Descriptor, HandlerError, HandlerResult};

use crate::config::ServerConfig;
use crate::types::McpResult;

/// Decode validated arguments into a tool's parameter struct.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Arguments) -> HandlerResult<T> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| HandlerError::new(format!("Invalid arguments: {e}")))
}

/// All tools, in listing order.
pub fn descriptors(config: &ServerConfig) -> McpResult<Vec<Descriptor>> {
    let client = http::build_client(config)?;
    Ok(vec![
        greet::descriptor(),
        calculate::descriptor(),
        current_time::descriptor(),
        geocode::descriptor(client.clone(), &config.geocode_url),
        weather::descriptor(client.clone(), &config.weather_url),
        generate_image::descriptor(client, &config.image_url, config.hf_token.clone()),
    ])
}
