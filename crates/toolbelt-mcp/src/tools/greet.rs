//! Tool: greet — Greet someone in English or Korean.

use serde::Deserialize;
use serde_json::json;
use toolbelt::{Arguments, Descriptor, FieldSpec, HandlerResult, ObjectSchema, ToolFn, ToolOutput};

use super::parse_args;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ko,
    En,
}

#[derive(Debug, Deserialize)]
struct GreetParams {
    name: String,
    language: Language,
}

pub fn greeting(name: &str, language: Language) -> String {
    match language {
        Language::En => format!("Hello, {name}!"),
        Language::Ko => format!("안녕하세요, {name}님!"),
    }
}

pub fn descriptor() -> Descriptor {
    let input = ObjectSchema::new()
        .field(
            FieldSpec::string("name")
                .min_length(1)
                .describe("Name of the person to greet"),
        )
        .field(
            FieldSpec::enumeration("language", ["ko", "en"])
                .default_value("en")
                .describe("Greeting language"),
        );
    let output = ObjectSchema::new().field(FieldSpec::string("greeting"));

    Descriptor::tool("greet", input, ToolFn(execute))
        .title("Greet")
        .describe("Greet someone by name in English or Korean")
        .output_schema(output)
}

async fn execute(args: Arguments) -> HandlerResult<ToolOutput> {
    let params: GreetParams = parse_args(args)?;
    let text = greeting(&params.name, params.language);
    Ok(ToolOutput::text(text.clone()).with_structured(json!({ "greeting": text })))
}
