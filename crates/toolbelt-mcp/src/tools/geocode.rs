//! Tool: geocode — Resolve an address to coordinates via Nominatim.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use toolbelt::{
    Arguments, Descriptor, FieldSpec, HandlerError, HandlerResult, ObjectSchema, ToolHandler,
    ToolOutput,
};

use super::{http, parse_args};

const SERVICE: &str = "Geocoding service";

#[derive(Debug, Deserialize)]
struct GeocodeParams {
    address: String,
}

/// One Nominatim search hit. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct Place {
    display_name: String,
    lat: String,
    lon: String,
}

pub struct GeocodeTool {
    client: Client,
    base_url: String,
}

impl GeocodeTool {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ToolHandler for GeocodeTool {
    async fn call(&self, args: Arguments) -> HandlerResult<ToolOutput> {
        let params: GeocodeParams = parse_args(args)?;
        let url = format!("{}/search", self.base_url);

        let request = self
            .client
            .get(&url)
            .query(&[
                ("q", params.address.as_str()),
                ("format", "json"),
                ("limit", "1"),
            ])
            .send()
            .await;
        let response = http::check(SERVICE, request).await?;
        let places: Vec<Place> = http::json(SERVICE, response).await?;

        let place = places.into_iter().next().ok_or_else(|| {
            HandlerError::new(format!("No location found for '{}'", params.address))
        })?;
        let latitude = parse_coordinate(&place.lat)?;
        let longitude = parse_coordinate(&place.lon)?;

        let text = format!(
            "{}\nLatitude: {latitude}\nLongitude: {longitude}",
            place.display_name
        );
        Ok(ToolOutput::text(text).with_structured(json!({
            "display_name": place.display_name,
            "latitude": latitude,
            "longitude": longitude,
        })))
    }
}

fn parse_coordinate(raw: &str) -> Result<f64, HandlerError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| HandlerError::new(format!("Unexpected {SERVICE} response: bad coordinate '{raw}'")))
}

pub fn descriptor(client: Client, base_url: &str) -> Descriptor {
    let input = ObjectSchema::new().field(
        FieldSpec::string("address")
            .min_length(1)
            .max_length(200)
            .describe("Free-form address or place name"),
    );
    let output = ObjectSchema::new()
        .field(FieldSpec::string("display_name"))
        .field(FieldSpec::number("latitude"))
        .field(FieldSpec::number("longitude"));

    Descriptor::tool("geocode", input, GeocodeTool::new(client, base_url))
        .title("Geocode")
        .describe("Look up the latitude and longitude of an address")
        .output_schema(output)
}
