//! Resource: greeting://{name}

use serde_json::Value;
use toolbelt::{Arguments, ContentBlock, Descriptor, HandlerResult, RegistryError, ResourceFn};

use crate::tools::greet::{greeting, Language};

pub const URI_TEMPLATE: &str = "greeting://{name}";

pub fn descriptor() -> Result<Descriptor, RegistryError> {
    Ok(Descriptor::resource("greeting", URI_TEMPLATE, ResourceFn(read))?
        .mime_type("text/plain")
        .describe("A personalized English greeting"))
}

async fn read(_uri: String, vars: Arguments) -> HandlerResult<Vec<ContentBlock>> {
    let name = vars.get("name").and_then(Value::as_str).unwrap_or_default();
    Ok(vec![ContentBlock::text(greeting(name, Language::En))])
}
