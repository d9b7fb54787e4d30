//! Prompt: weather_briefing — Chain geocode and get_weather for a city.

use serde::Deserialize;
use toolbelt::{
    Arguments, Descriptor, FieldSpec, HandlerResult, ObjectSchema, PromptFn, PromptMessage,
};

use crate::tools::parse_args;

#[derive(Debug, Deserialize)]
struct BriefingParams {
    city: String,
}

pub fn descriptor() -> Descriptor {
    let input = ObjectSchema::new().field(
        FieldSpec::string("city")
            .min_length(1)
            .describe("City to brief the weather for"),
    );

    Descriptor::prompt("weather_briefing", input, PromptFn(expand))
        .title("Weather briefing")
        .describe("Short weather briefing for a city")
}

async fn expand(args: Arguments) -> HandlerResult<Vec<PromptMessage>> {
    let params: BriefingParams = parse_args(args)?;
    let text = format!(
        "Give me a short weather briefing for {city}.\n\n\
         1. Use geocode to find the coordinates of {city}\n\
         2. Use get_weather with those coordinates\n\
         3. Summarize current conditions and the next few days in plain language",
        city = params.city,
    );
    Ok(vec![PromptMessage::user(text)])
}
