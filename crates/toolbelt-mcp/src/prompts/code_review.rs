//! Prompt: code_review — Ask for a focused review of a code snippet.

use serde::Deserialize;
use toolbelt::{
    Arguments, Descriptor, FieldSpec, HandlerResult, ObjectSchema, PromptFn, PromptMessage,
};

use crate::tools::parse_args;

#[derive(Debug, Deserialize)]
struct ReviewParams {
    code: String,
    #[serde(default)]
    language: Option<String>,
    focus: String,
}

pub fn descriptor() -> Descriptor {
    let input = ObjectSchema::new()
        .field(FieldSpec::string("code").min_length(1).describe("Code to review"))
        .field(
            FieldSpec::string("language")
                .optional()
                .describe("Programming language of the code"),
        )
        .field(
            FieldSpec::enumeration("focus", ["readability", "performance", "security"])
                .default_value("readability")
                .describe("What the review should concentrate on"),
        );

    Descriptor::prompt("code_review", input, PromptFn(expand))
        .title("Code review")
        .describe("Review code with a chosen focus")
}

async fn expand(args: Arguments) -> HandlerResult<Vec<PromptMessage>> {
    let params: ReviewParams = parse_args(args)?;
    let language = params.language.as_deref().unwrap_or("the following");
    let fence = params.language.as_deref().unwrap_or_default();

    let text = format!(
        "Please review {language} code with a focus on {focus}.\n\n\
         ```{fence}\n{code}\n```\n\n\
         Point out concrete problems, explain why each matters, \
         and suggest a fix for each one.",
        focus = params.focus,
        code = params.code.trim_end(),
    );
    Ok(vec![PromptMessage::user(text)])
}
