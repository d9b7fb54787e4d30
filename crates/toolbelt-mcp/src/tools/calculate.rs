//! Tool: calculate — Basic arithmetic on two numbers.

use std::fmt;

use serde::Deserialize;
use serde_json::json;
use toolbelt::{
    Arguments, Descriptor, FieldSpec, HandlerError, HandlerResult, ObjectSchema, ToolFn,
    ToolOutput,
};

use super::parse_args;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Deserialize)]
struct CalculateParams {
    number1: f64,
    number2: f64,
    operator: Operator,
}

pub fn apply(a: f64, op: Operator, b: f64) -> Result<f64, HandlerError> {
    let result = match op {
        Operator::Add => a + b,
        Operator::Subtract => a - b,
        Operator::Multiply => a * b,
        Operator::Divide if b == 0.0 => return Err(HandlerError::new("Cannot divide by zero")),
        Operator::Divide => a / b,
    };
    if !result.is_finite() {
        return Err(HandlerError::new(format!(
            "Result of {} {op} {} is not a finite number",
            render(a),
            render(b)
        )));
    }
    Ok(result)
}

/// Integral values print without a fractional part; `-0` prints as `0`.
pub fn render(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

pub fn descriptor() -> Descriptor {
    let input = ObjectSchema::new()
        .field(FieldSpec::number("number1").describe("Left operand"))
        .field(FieldSpec::number("number2").describe("Right operand"))
        .field(FieldSpec::enumeration("operator", ["+", "-", "*", "/"]).describe("Operation"));
    let output = ObjectSchema::new().field(FieldSpec::number("result"));

    Descriptor::tool("calculate", input, ToolFn(execute))
        .title("Calculator")
        .describe("Add, subtract, multiply, or divide two numbers")
        .output_schema(output)
}

async fn execute(args: Arguments) -> HandlerResult<ToolOutput> {
    let params: CalculateParams = parse_args(args)?;
    let result = apply(params.number1, params.operator, params.number2)?;
    let text = format!(
        "{} {} {} = {}",
        render(params.number1),
        params.operator,
        render(params.number2),
        render(result)
    );
    Ok(ToolOutput::text(text).with_structured(json!({ "result": result })))
}
