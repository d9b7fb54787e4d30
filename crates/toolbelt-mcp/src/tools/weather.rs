//! Tool: get_weather — Current conditions and a daily forecast from Open-Meteo.

use std::fmt::Write as _;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use toolbelt::{
    Arguments, Descriptor, FieldSpec, HandlerResult, ObjectSchema, ToolHandler, ToolOutput,
};

use super::{http, parse_args};

const SERVICE: &str = "Weather service";

#[derive(Debug, Deserialize)]
struct WeatherParams {
    latitude: f64,
    longitude: f64,
    forecast_days: u8,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    current: Current,
    daily: Daily,
}

#[derive(Debug, Deserialize)]
struct Current {
    temperature_2m: f64,
    wind_speed_10m: f64,
    weather_code: u8,
}

#[derive(Debug, Deserialize)]
struct Daily {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
}

/// WMO weather interpretation code, summarized.
pub fn describe_code(code: u8) -> &'static str {
    match code {
        0 => "Clear sky",
        1..=3 => "Partly cloudy",
        45 | 48 => "Fog",
        51..=57 => "Drizzle",
        61..=67 => "Rain",
        71..=77 => "Snow",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95..=99 => "Thunderstorm",
        _ => "Unknown conditions",
    }
}

pub struct WeatherTool {
    client: Client,
    base_url: String,
}

impl WeatherTool {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ToolHandler for WeatherTool {
    async fn call(&self, args: Arguments) -> HandlerResult<ToolOutput> {
        let params: WeatherParams = parse_args(args)?;
        let url = format!("{}/v1/forecast", self.base_url);

        let request = self
            .client
            .get(&url)
            .query(&[
                ("latitude", params.latitude.to_string()),
                ("longitude", params.longitude.to_string()),
                (
                    "current",
                    "temperature_2m,wind_speed_10m,weather_code".to_string(),
                ),
                ("daily", "temperature_2m_max,temperature_2m_min".to_string()),
                ("forecast_days", params.forecast_days.to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await;
        let response = http::check(SERVICE, request).await?;
        let forecast: Forecast = http::json(SERVICE, response).await?;

        Ok(render(params.latitude, params.longitude, &forecast))
    }
}

fn render(latitude: f64, longitude: f64, forecast: &Forecast) -> ToolOutput {
    let current = &forecast.current;
    let mut text = format!(
        "Weather at {latitude}, {longitude}\nNow: {}°C, wind {} km/h, {}",
        current.temperature_2m,
        current.wind_speed_10m,
        describe_code(current.weather_code)
    );

    let mut days = Vec::with_capacity(forecast.daily.time.len());
    for (i, date) in forecast.daily.time.iter().enumerate() {
        let max = forecast.daily.temperature_2m_max.get(i).copied().flatten();
        let min = forecast.daily.temperature_2m_min.get(i).copied().flatten();
        let _ = write!(text, "\n{date}: min {} / max {}", temp(min), temp(max));
        days.push(json!({ "date": date, "min": min, "max": max }));
    }

    ToolOutput::text(text).with_structured(json!({
        "current": {
            "temperature": current.temperature_2m,
            "wind_speed": current.wind_speed_10m,
            "conditions": describe_code(current.weather_code),
        },
        "daily": days,
    }))
}

fn temp(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v}°C"))
}

pub fn descriptor(client: Client, base_url: &str) -> Descriptor {
    let input = ObjectSchema::new()
        .field(
            FieldSpec::number("latitude")
                .range(-90.0, 90.0)
                .describe("Latitude in decimal degrees"),
        )
        .field(
            FieldSpec::number("longitude")
                .range(-180.0, 180.0)
                .describe("Longitude in decimal degrees"),
        )
        .field(
            FieldSpec::integer("forecast_days")
                .range(1.0, 16.0)
                .default_value(3)
                .describe("Number of forecast days"),
        );

    Descriptor::tool("get_weather", input, WeatherTool::new(client, base_url))
        .title("Weather forecast")
        .describe("Get current weather and a daily forecast for a location")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Forecast {
        let raw = json!({
            "current": { "temperature_2m": 21.5, "wind_speed_10m": 9.0, "weather_code": 2 },
            "daily": {
                "time": ["2024-06-01", "2024-06-02"],
                "temperature_2m_max": [25.1, null],
                "temperature_2m_min": [15.0, 14.2],
            }
        });
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_describe_code() {
        assert_eq!(describe_code(0), "Clear sky");
        assert_eq!(describe_code(63), "Rain");
        assert_eq!(describe_code(200), "Unknown conditions");
    }

    #[test]
    fn test_render_forecast() {
        let output = render(37.5, 127.0, &sample());
        let text = output.content[0].as_text().unwrap();
        assert!(text.starts_with("Weather at 37.5, 127\nNow: 21.5°C, wind 9 km/h, Partly cloudy"));
        assert!(text.contains("2024-06-01: min 15°C / max 25.1°C"));
        assert!(text.contains("2024-06-02: min 14.2°C / max n/a"));

        let structured = output.structured.unwrap();
        assert_eq!(structured["daily"].as_array().unwrap().len(), 2);
        assert_eq!(structured["current"]["conditions"], "Partly cloudy");
    }
}
