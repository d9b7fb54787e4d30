//! Dispatcher integration tests: lookup, validation, handler failures,
//! output contracts, and envelope shapes, end to end.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Map, Value};

use toolbelt::{
    build_envelope, Arguments, CapabilityKind, ContentBlock, Descriptor, Dispatcher, FailureKind,
    FieldSpec, FieldType, HandlerError, InvocationOutcome, InvocationRequest, ObjectSchema,
    PromptFn, PromptMessage, Registry, RegistryError, ResourceFn, SuccessPayload, ToolFn,
    ToolOutput, UnknownFields,
};

// ─────────────────────── fixtures ───────────────────────

fn calculator() -> Descriptor {
    Descriptor::tool(
        "calculate",
        ObjectSchema::new()
            .field(FieldSpec::number("number1"))
            .field(FieldSpec::number("number2"))
            .field(FieldSpec::enumeration("operator", ["+", "-", "*", "/"])),
        ToolFn(|args: Arguments| async move {
            let a = args["number1"].as_f64().unwrap_or_default();
            let b = args["number2"].as_f64().unwrap_or_default();
            let op = args["operator"].as_str().unwrap_or_default().to_string();
            let result = match op.as_str() {
                "+" => a + b,
                "-" => a - b,
                "*" => a * b,
                "/" if b == 0.0 => return Err(HandlerError::new("Cannot divide by zero")),
                "/" => a / b,
                other => return Err(HandlerError::new(format!("Unsupported operator: {other}"))),
            };
            Ok(ToolOutput::text(format!("{a} {op} {b} = {result}"))
                .with_structured(json!({ "result": result })))
        }),
    )
    .output_schema(ObjectSchema::new().field(FieldSpec::number("result")))
}

fn greet(reply_prefix: &'static str) -> Descriptor {
    Descriptor::tool(
        "greet",
        ObjectSchema::new()
            .field(FieldSpec::string("name").min_length(1))
            .field(FieldSpec::enumeration("language", ["ko", "en"]).default_value("en")),
        ToolFn(move |args: Arguments| async move {
            let name = args["name"].as_str().unwrap_or_default().to_string();
            let language = args["language"].as_str().unwrap_or_default().to_string();
            Ok::<_, HandlerError>(ToolOutput::text(format!("{reply_prefix}:{language}:{name}")))
        }),
    )
}

fn weather() -> Descriptor {
    Descriptor::tool(
        "weather",
        ObjectSchema::new()
            .field(FieldSpec::number("latitude").range(-90.0, 90.0))
            .field(FieldSpec::number("longitude").range(-180.0, 180.0))
            .field(FieldSpec::integer("forecast_days").range(1.0, 16.0).default_value(3)),
        ToolFn(|args: Arguments| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, HandlerError>(ToolOutput::text(format!(
                "{},{} x{}",
                args["latitude"], args["longitude"], args["forecast_days"]
            )))
        }),
    )
}

fn greeting_resource() -> Descriptor {
    Descriptor::resource(
        "greeting",
        "greeting://{name}",
        ResourceFn(|_uri: String, vars: Arguments| async move {
            let name = vars["name"].as_str().unwrap_or_default().to_string();
            Ok::<_, HandlerError>(vec![ContentBlock::text(format!("Hello, {name}!"))])
        }),
    )
    .unwrap()
    .mime_type("text/plain")
}

fn review_prompt() -> Descriptor {
    Descriptor::prompt(
        "code_review",
        ObjectSchema::new().field(FieldSpec::string("code")),
        PromptFn(|args: Arguments| async move {
            let code = args["code"].as_str().unwrap_or_default().to_string();
            Ok::<_, HandlerError>(vec![PromptMessage::user(format!("Review:\n{code}"))])
        }),
    )
    .describe("Ask for a code review")
}

fn dispatcher() -> Dispatcher {
    let mut registry = Registry::new();
    registry.register(calculator()).unwrap();
    registry.register(greet("greet")).unwrap();
    registry.register(weather()).unwrap();
    registry.register(greeting_resource()).unwrap();
    registry.register(review_prompt()).unwrap();
    Dispatcher::new(Arc::new(registry))
}

fn failure_of(outcome: &InvocationOutcome) -> (FailureKind, &str) {
    let f = outcome
        .failure()
        .unwrap_or_else(|| panic!("expected failure, got {outcome:?}"));
    (f.kind, f.message.as_str())
}

/// Smallest argument object satisfying every required field of `schema`.
fn minimal_args(schema: &ObjectSchema) -> Value {
    fn sample(ty: &FieldType, spec: &FieldSpec) -> Value {
        let c = &spec.constraints;
        match ty {
            FieldType::Number => json!(c.minimum.unwrap_or(0.0)),
            FieldType::Integer => json!(c.minimum.unwrap_or(0.0) as i64),
            FieldType::String => json!("a".repeat(c.min_length.unwrap_or(1).max(1))),
            FieldType::Boolean => json!(true),
            FieldType::Enum { values } => json!(values[0]),
            FieldType::Array { items } => {
                let n = c.min_items.unwrap_or(0);
                Value::Array((0..n).map(|_| sample(items, spec)).collect())
            }
        }
    }
    let mut args = Map::new();
    for spec in schema.required_fields() {
        args.insert(spec.name.clone(), sample(&spec.field_type, spec));
    }
    Value::Object(args)
}

// ─────────────────────── scenarios ───────────────────────

#[tokio::test]
async fn test_calculator_addition() {
    let d = dispatcher();
    let outcome = d
        .invoke(InvocationRequest::call_tool(
            "calculate",
            json!({ "number1": 10, "number2": 5, "operator": "+" }),
        ))
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.content(), &[ContentBlock::text("10 + 5 = 15")]);

    let envelope = build_envelope(outcome).to_value();
    assert_eq!(envelope["content"][0]["text"], "10 + 5 = 15");
    assert_eq!(envelope["structuredContent"]["result"], json!(15.0));
    assert!(envelope.get("isError").is_none());
}

#[tokio::test]
async fn test_calculator_divide_by_zero() {
    let d = dispatcher();
    let outcome = d
        .invoke(InvocationRequest::call_tool(
            "calculate",
            json!({ "number1": 10, "number2": 0, "operator": "/" }),
        ))
        .await;

    let (kind, message) = failure_of(&outcome);
    assert_eq!(kind, FailureKind::Handler);
    assert_eq!(message, "Cannot divide by zero");

    let envelope = build_envelope(outcome).to_value();
    assert_eq!(envelope["isError"], true);
    assert_eq!(envelope["content"].as_array().unwrap().len(), 1);
    assert_eq!(envelope["content"][0]["text"], "Cannot divide by zero");
}

#[tokio::test]
async fn test_duplicate_greet_keeps_first() {
    let mut registry = Registry::new();
    registry.register(greet("first")).unwrap();
    let err = registry.register(greet("second")).unwrap_err();
    assert!(matches!(err, RegistryError::Duplicate { kind: CapabilityKind::Tool, .. }));
    assert_eq!(err.to_string(), "Duplicate capability: tool/greet");

    let d = Dispatcher::new(Arc::new(registry));
    let outcome = d
        .invoke(InvocationRequest::call_tool("greet", json!({ "name": "Kim" })))
        .await;
    assert_eq!(outcome.content()[0].as_text(), Some("first:en:Kim"));
}

#[tokio::test]
async fn test_language_default_applied_before_handler() {
    let d = dispatcher();
    let outcome = d
        .invoke(InvocationRequest::call_tool("greet", json!({ "name": "Alice" })))
        .await;
    assert_eq!(outcome.content()[0].as_text(), Some("greet:en:Alice"));
}

// ─────────────────────── properties ───────────────────────

const ALL_KINDS: [CapabilityKind; 3] = [
    CapabilityKind::Tool,
    CapabilityKind::Resource,
    CapabilityKind::Prompt,
];

fn schemas_of_every_capability(d: &Dispatcher) -> Vec<(CapabilityKind, String, ObjectSchema)> {
    ALL_KINDS
        .iter()
        .flat_map(|&kind| {
            d.registry()
                .list(kind)
                .iter()
                .map(move |c| (kind, c.name.clone(), c.input_schema.clone()))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[tokio::test]
async fn test_minimal_valid_args_succeed_for_every_capability() {
    let d = dispatcher();
    let capabilities = schemas_of_every_capability(&d);
    for kind in ALL_KINDS {
        assert!(capabilities.iter().any(|(k, _, _)| *k == kind), "no {kind} registered");
    }

    for (kind, name, schema) in capabilities {
        let args = minimal_args(&schema);
        let outcome = d.invoke_kind(kind, &name, Some(args.clone())).await;
        assert!(outcome.is_success(), "{kind}/{name} with {args} failed: {outcome:?}");
    }
}

#[tokio::test]
async fn test_omitting_each_required_field_fails_naming_it() {
    let d = dispatcher();
    let mut checked = 0;

    for (kind, name, schema) in schemas_of_every_capability(&d) {
        for field in schema.required_fields() {
            let mut args = minimal_args(&schema);
            args.as_object_mut().unwrap().remove(&field.name);
            let outcome = d.invoke_kind(kind, &name, Some(args)).await;
            let (failure, message) = failure_of(&outcome);
            assert_eq!(failure, FailureKind::Validation);
            assert!(
                message.contains(&field.name),
                "{kind}/{name}: message should mention {}: {message}",
                field.name
            );
            checked += 1;
        }
    }
    // calculator 3, greet 1, weather 2, greeting 1, code_review 1
    assert_eq!(checked, 8);
}

#[tokio::test]
async fn test_enum_members_and_outsiders() {
    let d = dispatcher();
    for op in ["+", "-", "*", "/"] {
        let outcome = d
            .invoke(InvocationRequest::call_tool(
                "calculate",
                json!({ "number1": 6, "number2": 3, "operator": op }),
            ))
            .await;
        assert!(outcome.is_success(), "operator {op} should succeed");
    }
    for bad in ["%", "plus", "", "PLUS"] {
        let outcome = d
            .invoke(InvocationRequest::call_tool(
                "calculate",
                json!({ "number1": 6, "number2": 3, "operator": bad }),
            ))
            .await;
        assert_eq!(failure_of(&outcome).0, FailureKind::Validation);
    }
    for lang in ["ko", "en"] {
        let outcome = d
            .invoke(InvocationRequest::call_tool(
                "greet",
                json!({ "name": "Lee", "language": lang }),
            ))
            .await;
        assert!(outcome.is_success());
    }
    let outcome = d
        .invoke(InvocationRequest::call_tool(
            "greet",
            json!({ "name": "Lee", "language": "Ko" }),
        ))
        .await;
    assert_eq!(failure_of(&outcome).0, FailureKind::Validation);
}

#[tokio::test]
async fn test_numeric_bounds() {
    let d = dispatcher();
    let cases = [
        (json!({ "latitude": -90, "longitude": 0 }), true),
        (json!({ "latitude": 90, "longitude": 0 }), true),
        (json!({ "latitude": 0, "longitude": -180 }), true),
        (json!({ "latitude": 0, "longitude": 180 }), true),
        (json!({ "latitude": 0, "longitude": 0, "forecast_days": 1 }), true),
        (json!({ "latitude": 0, "longitude": 0, "forecast_days": 16 }), true),
        (json!({ "latitude": -91, "longitude": 0 }), false),
        (json!({ "latitude": 91, "longitude": 0 }), false),
        (json!({ "latitude": 0, "longitude": -181 }), false),
        (json!({ "latitude": 0, "longitude": 181 }), false),
        (json!({ "latitude": 0, "longitude": 0, "forecast_days": 0 }), false),
        (json!({ "latitude": 0, "longitude": 0, "forecast_days": 17 }), false),
    ];
    for (args, ok) in cases {
        let outcome = d.invoke(InvocationRequest::call_tool("weather", args.clone())).await;
        assert_eq!(outcome.is_success(), ok, "weather {args}");
    }
}

#[tokio::test]
async fn test_all_errors_reported_together() {
    let d = dispatcher();
    let outcome = d
        .invoke(InvocationRequest::call_tool(
            "weather",
            json!({ "latitude": "north", "longitude": 500, "forecast_days": 2.5 }),
        ))
        .await;
    let (_, message) = failure_of(&outcome);
    assert!(message.starts_with("invalid arguments for tool/weather: "));
    assert!(message.contains("latitude"));
    assert!(message.contains("longitude"));
    assert!(message.contains("forecast_days"));
}

#[tokio::test]
async fn test_unknown_capabilities_fail() {
    let d = dispatcher();
    let requests = [
        InvocationRequest::call_tool("nope", json!({})),
        InvocationRequest::read_resource("nope://x"),
        InvocationRequest::get_prompt("nope", json!({})),
        // right name, wrong namespace
        InvocationRequest::get_prompt("greet", json!({ "name": "x" })),
    ];
    for request in requests {
        let kind = request.kind();
        let target = request.target().to_string();
        let outcome = d.invoke(request).await;
        let (failure_kind, message) = failure_of(&outcome);
        assert_eq!(failure_kind, FailureKind::Lookup);
        assert_eq!(message, format!("unknown capability: {kind}/{target}"));
    }

    let outcome = d.invoke_kind(CapabilityKind::Resource, "nope", None).await;
    assert_eq!(failure_of(&outcome).0, FailureKind::Lookup);
}

#[tokio::test]
async fn test_idempotent_invocations() {
    let d = dispatcher();
    let request = InvocationRequest::call_tool(
        "calculate",
        json!({ "number1": 2.5, "number2": 4, "operator": "*" }),
    );
    let first = d.invoke(request.clone()).await;
    let second = d.invoke(request).await;
    assert!(first.is_success());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unknown_fields_ignored() {
    let d = dispatcher();
    let outcome = d
        .invoke(InvocationRequest::call_tool(
            "greet",
            json!({ "name": "Park", "mood": "happy" }),
        ))
        .await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_unknown_fields_rejected_when_strict() {
    let mut registry = Registry::new();
    registry
        .register(Descriptor::tool(
            "strict",
            ObjectSchema::new()
                .field(FieldSpec::string("name"))
                .unknown_fields(UnknownFields::Reject),
            ToolFn(|_args: Arguments| async move { Ok::<_, HandlerError>(ToolOutput::text("ok")) }),
        ))
        .unwrap();
    let d = Dispatcher::new(Arc::new(registry));
    let outcome = d
        .invoke(InvocationRequest::call_tool(
            "strict",
            json!({ "name": "x", "extra": 1 }),
        ))
        .await;
    let (kind, message) = failure_of(&outcome);
    assert_eq!(kind, FailureKind::Validation);
    assert!(message.contains("extra"));
}

// ─────────────────────── failure containment ───────────────────────

#[tokio::test]
async fn test_output_contract_violation() {
    let mut registry = Registry::new();
    registry
        .register(
            Descriptor::tool(
                "liar",
                ObjectSchema::new(),
                ToolFn(|_args: Arguments| async move {
                    Ok::<_, HandlerError>(
                        ToolOutput::text("42").with_structured(json!({ "result": "forty-two" })),
                    )
                }),
            )
            .output_schema(ObjectSchema::new().field(FieldSpec::number("result"))),
        )
        .unwrap();
    registry
        .register(
            Descriptor::tool(
                "silent",
                ObjectSchema::new(),
                ToolFn(|_args: Arguments| async move {
                    Ok::<_, HandlerError>(ToolOutput::text("no payload"))
                }),
            )
            .output_schema(ObjectSchema::new().field(FieldSpec::number("result"))),
        )
        .unwrap();
    let d = Dispatcher::new(Arc::new(registry));

    let outcome = d.invoke(InvocationRequest::call_tool("liar", json!({}))).await;
    let (kind, message) = failure_of(&outcome);
    assert_eq!(kind, FailureKind::OutputContract);
    assert!(message.starts_with("output contract violated by tool/liar"));
    assert!(message.contains("result"));

    let outcome = d.invoke(InvocationRequest::call_tool("silent", json!({}))).await;
    assert_eq!(failure_of(&outcome).0, FailureKind::OutputContract);
}

#[tokio::test]
async fn test_handler_panic_is_contained() {
    let mut registry = Registry::new();
    registry
        .register(Descriptor::tool(
            "boom",
            ObjectSchema::new(),
            ToolFn(|_args: Arguments| async move {
                if true {
                    panic!("kaboom");
                }
                Ok::<_, HandlerError>(ToolOutput::default())
            }),
        ))
        .unwrap();
    let d = Dispatcher::new(Arc::new(registry));

    let outcome = d.invoke(InvocationRequest::call_tool("boom", json!({}))).await;
    let (kind, message) = failure_of(&outcome);
    assert_eq!(kind, FailureKind::Handler);
    assert_eq!(message, "handler panicked: kaboom");

    // the dispatcher keeps serving afterwards
    let again = d.invoke(InvocationRequest::call_tool("boom", json!({}))).await;
    assert!(again.failure().is_some());
}

#[tokio::test]
async fn test_content_order_preserved() {
    let mut registry = Registry::new();
    registry
        .register(Descriptor::tool(
            "multi",
            ObjectSchema::new(),
            ToolFn(|_args: Arguments| async move {
                Ok::<_, HandlerError>(ToolOutput::new(vec![
                    ContentBlock::image(vec![1, 2], "image/png"),
                    ContentBlock::text("second"),
                    ContentBlock::text("third"),
                ]))
            }),
        ))
        .unwrap();
    let d = Dispatcher::new(Arc::new(registry));
    let outcome = d.invoke(InvocationRequest::call_tool("multi", json!(null))).await;
    let content = outcome.content();
    assert!(matches!(content[0], ContentBlock::Image { .. }));
    assert_eq!(content[1].as_text(), Some("second"));
    assert_eq!(content[2].as_text(), Some("third"));
}

#[tokio::test]
async fn test_concurrent_invocations() {
    let d = dispatcher();
    let calls = (0..32).map(|i| {
        let d = d.clone();
        async move {
            d.invoke(InvocationRequest::call_tool(
                "weather",
                json!({ "latitude": i, "longitude": i }),
            ))
            .await
        }
    });
    let outcomes = futures::future::join_all(calls).await;
    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(
            outcome.content()[0].as_text(),
            Some(format!("{i},{i} x3").as_str())
        );
    }
}

// ─────────────────────── resources and prompts ───────────────────────

#[tokio::test]
async fn test_resource_read_by_uri() {
    let d = dispatcher();
    let outcome = d
        .invoke(InvocationRequest::read_resource("greeting://Alice"))
        .await;
    match &outcome {
        InvocationOutcome::Success(SuccessPayload::Resource { uri, mime_type, content }) => {
            assert_eq!(uri, "greeting://Alice");
            assert_eq!(mime_type.as_deref(), Some("text/plain"));
            assert_eq!(content[0].as_text(), Some("Hello, Alice!"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let envelope = build_envelope(outcome).to_value();
    assert_eq!(envelope["contents"][0]["uri"], "greeting://Alice");
    assert_eq!(envelope["contents"][0]["text"], "Hello, Alice!");
}

#[tokio::test]
async fn test_resource_by_kind_and_name() {
    let d = dispatcher();
    let outcome = d
        .invoke_kind(
            CapabilityKind::Resource,
            "greeting",
            Some(json!({ "name": "Kim Minsu" })),
        )
        .await;
    match outcome {
        InvocationOutcome::Success(SuccessPayload::Resource { uri, content, .. }) => {
            assert_eq!(uri, "greeting://Kim%20Minsu");
            assert_eq!(content[0].as_text(), Some("Hello, Kim Minsu!"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let missing = d.invoke_kind(CapabilityKind::Resource, "greeting", None).await;
    assert_eq!(failure_of(&missing).0, FailureKind::Validation);
}

#[tokio::test]
async fn test_prompt_get() {
    let d = dispatcher();
    let outcome = d
        .invoke(InvocationRequest::get_prompt(
            "code_review",
            json!({ "code": "fn main() {}" }),
        ))
        .await;
    let envelope = build_envelope(outcome).to_value();
    assert_eq!(envelope["description"], "Ask for a code review");
    assert_eq!(envelope["messages"][0]["role"], "user");
    assert_eq!(
        envelope["messages"][0]["content"]["text"],
        "Review:\nfn main() {}"
    );

    let outcome = d
        .invoke_kind(CapabilityKind::Prompt, "code_review", Some(json!({})))
        .await;
    let (kind, message) = failure_of(&outcome);
    assert_eq!(kind, FailureKind::Validation);
    assert!(message.contains("code"));
}

// ─────────────────────── logging ───────────────────────

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLog {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test]
async fn test_resource_by_name_logs_entry_and_outcome() {
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let d = dispatcher();
    let ok = d
        .invoke_kind(CapabilityKind::Resource, "greeting", Some(json!({ "name": "Ann" })))
        .await;
    assert!(ok.is_success());
    let missing = d.invoke_kind(CapabilityKind::Resource, "nope", None).await;
    assert!(!missing.is_success());

    let text = log.text();
    assert!(text.contains("Invoking resource/greeting"), "{text}");
    assert!(text.contains("resource/greeting succeeded in"), "{text}");
    assert!(text.contains("Invoking resource/nope"), "{text}");
    assert!(text.contains("resource/nope failed (lookup)"), "{text}");
}
