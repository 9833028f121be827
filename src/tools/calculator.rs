//! Arithmetic expression evaluation
//!
//! Expressions move through a fixed pipeline: denylist screen, parenthesis
//! balance scan, then a real tokenizer and recursive-descent parser over a
//! closed grammar. The grammar admits number literals, `+ - * /`, unary
//! minus, parentheses, the constants `PI` and `E`, and a fixed function
//! table. Nothing else tokenizes, so no input can reach ambient state.

mod parser;

#[cfg(test)]
mod proptests;

use super::{Tool, ToolContext, ToolOutput};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

/// Substrings rejected before parsing. The parser's closed grammar already
/// cannot execute any of these, but the screen keeps the rejection cheap and
/// the error explicit when a model tries to smuggle code into an expression.
const DENYLIST: [&str; 9] = [
    "eval",
    "function",
    "constructor",
    "import",
    "require",
    "process",
    "global",
    "window",
    "document",
];

/// Which side of a parenthesis pair was left unmatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paren {
    Opening,
    Closing,
}

impl fmt::Display for Paren {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Paren::Opening => write!(f, "opening"),
            Paren::Closing => write!(f, "closing"),
        }
    }
}

/// Why an expression was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The raw input contains a denylisted substring.
    #[error("unsafe expression: contains disallowed token `{0}`")]
    UnsafeInput(String),
    /// Parentheses do not balance; the expression is never evaluated.
    #[error("unmatched {0} parenthesis")]
    UnmatchedParenthesis(Paren),
    /// Evaluation finished but produced NaN or an infinity.
    #[error("expression did not produce a finite number")]
    InvalidResult,
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
}

/// Evaluate an arithmetic expression to its formatted result.
pub fn evaluate(expression: &str) -> Result<String, EvalError> {
    let lowered = expression.to_ascii_lowercase();
    if let Some(token) = DENYLIST.iter().copied().find(|t| lowered.contains(t)) {
        return Err(EvalError::UnsafeInput(token.to_string()));
    }

    check_parens(expression)?;

    let value = parser::evaluate_expression(expression)?;
    if !value.is_finite() {
        return Err(EvalError::InvalidResult);
    }
    Ok(format_number(value))
}

/// Single left-to-right depth scan. A negative depth means a `)` arrived
/// with nothing open; a positive depth at the end means a `(` never closed.
fn check_parens(expression: &str) -> Result<(), EvalError> {
    let mut depth: i32 = 0;
    for c in expression.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(EvalError::UnmatchedParenthesis(Paren::Closing));
                }
            }
            _ => {}
        }
    }
    if depth > 0 {
        return Err(EvalError::UnmatchedParenthesis(Paren::Opening));
    }
    Ok(())
}

/// Integral values render without a decimal point; everything else is
/// rounded to ten fractional digits with trailing zeros stripped.
fn format_number(value: f64) -> String {
    // -0.0 renders as "0", not "-0".
    let value = if value == 0.0 { 0.0 } else { value };
    if value.fract() == 0.0 {
        return format!("{value:.0}");
    }
    let fixed = format!("{value:.10}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Calculator tool exposed to the model
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> String {
        "Performs mathematical calculations. Use this when users ask math questions, \
         need computations, or want to solve equations."
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The mathematical expression to evaluate, e.g. '2 + 2' or 'sqrt(16) * 3'"
                }
            },
            "required": ["expression"]
        })
    }

    async fn run(&self, args: Value, _ctx: ToolContext) -> ToolOutput {
        let Some(expression) = args.get("expression").and_then(Value::as_str) else {
            return ToolOutput::error("calculator requires a string `expression` argument");
        };
        match evaluate(expression) {
            Ok(result) => ToolOutput::ok(result),
            Err(e) => ToolOutput::error(format!("calculation error: {e}")),
        }
    }
}
