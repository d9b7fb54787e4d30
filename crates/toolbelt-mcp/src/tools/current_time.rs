//! Tool: current_time — Current local time in an IANA time zone.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::json;
use toolbelt::{
    Arguments, Descriptor, FieldSpec, HandlerError, HandlerResult, ObjectSchema, ToolFn,
    ToolOutput,
};

use super::parse_args;

pub const DEFAULT_TIMEZONE: &str = "Asia/Seoul";

#[derive(Debug, Deserialize)]
struct TimeParams {
    timezone: String,
}

pub fn parse_zone(name: &str) -> Result<Tz, HandlerError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| HandlerError::new(format!("Unknown timezone '{name}'")))
}

/// Render `now` in `tz` as `YYYY-MM-DD HH:MM:SS <abbr> (<zone>)`.
pub fn describe(now: DateTime<Utc>, tz: Tz) -> String {
    let local = now.with_timezone(&tz);
    format!("{} ({})", local.format("%Y-%m-%d %H:%M:%S %Z"), tz.name())
}

pub fn descriptor() -> Descriptor {
    let input = ObjectSchema::new().field(
        FieldSpec::string("timezone")
            .default_value(DEFAULT_TIMEZONE)
            .describe("IANA time zone name, e.g. Europe/London"),
    );
    let output = ObjectSchema::new()
        .field(FieldSpec::string("timezone"))
        .field(FieldSpec::string("iso8601"));

    Descriptor::tool("current_time", input, ToolFn(execute))
        .title("Current time")
        .describe("Get the current date and time in a time zone")
        .output_schema(output)
}

async fn execute(args: Arguments) -> HandlerResult<ToolOutput> {
    let params: TimeParams = parse_args(args)?;
    let tz = parse_zone(&params.timezone)?;
    let now = Utc::now();

    Ok(ToolOutput::text(describe(now, tz)).with_structured(json!({
        "timezone": tz.name(),
        "iso8601": now.with_timezone(&tz).to_rfc3339(),
    })))
}
