//! Tool: generate_image — Text-to-image through the Hugging Face inference API.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use toolbelt::{
    Arguments, ContentBlock, Descriptor, FieldSpec, HandlerError, HandlerResult, ObjectSchema,
    ToolHandler, ToolOutput,
};

use super::{http, parse_args};

const SERVICE: &str = "Image service";
const DEFAULT_MIME: &str = "image/png";

#[derive(Debug, Deserialize)]
struct ImageParams {
    prompt: String,
}

/// Holds the API token. Nothing else in the server sees it.
pub struct ImageTool {
    client: Client,
    url: String,
    token: Option<String>,
}

impl ImageTool {
    pub fn new(client: Client, url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            token,
        }
    }
}

#[async_trait]
impl ToolHandler for ImageTool {
    async fn call(&self, args: Arguments) -> HandlerResult<ToolOutput> {
        let params: ImageParams = parse_args(args)?;
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| HandlerError::new("HF_TOKEN is not configured"))?;

        let request = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .json(&json!({ "inputs": params.prompt }))
            .send()
            .await;
        let response = http::check(SERVICE, request).await?;

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| DEFAULT_MIME.to_string());
        if !mime_type.starts_with("image/") {
            return Err(HandlerError::new(format!(
                "Unexpected {SERVICE} response: content type {mime_type}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| HandlerError::new(format!("{SERVICE} request failed: {e}")))?;
        if bytes.is_empty() {
            return Err(HandlerError::new(format!(
                "Unexpected {SERVICE} response: empty image"
            )));
        }
        tracing::debug!("Generated {} byte {mime_type} image", bytes.len());

        Ok(ToolOutput::new(vec![
            ContentBlock::image(bytes.to_vec(), mime_type),
            ContentBlock::text(format!("Generated image for prompt: {}", params.prompt)),
        ]))
    }
}

pub fn descriptor(client: Client, url: &str, token: Option<String>) -> Descriptor {
    let input = ObjectSchema::new().field(
        FieldSpec::string("prompt")
            .min_length(1)
            .max_length(1000)
            .describe("Description of the image to generate"),
    );

    Descriptor::tool("generate_image", input, ImageTool::new(client, url, token))
        .title("Generate image")
        .describe("Generate an image from a text prompt")
}
