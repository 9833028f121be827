//! Date and time readings
//!
//! A reading is taken from a single instant and carries both the formatted
//! local view and machine-readable UTC fields, so one tool call can answer
//! "what time is it" and still give the model something it can compute with.

use super::{Tool, ToolContext, ToolOutput};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("invalid timezone `{0}`")]
    InvalidTimezone(String),
}

/// How much of the reading to render into `datetime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockFormat {
    #[default]
    Full,
    Date,
    Time,
}

impl ClockFormat {
    /// The format argument is a hint, not a strict enum: anything
    /// unrecognized falls back to the full rendering.
    pub fn parse(name: Option<&str>) -> Self {
        match name {
            Some("date") => ClockFormat::Date,
            Some("time") => ClockFormat::Time,
            _ => ClockFormat::Full,
        }
    }
}

/// One observation of the clock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClockReading {
    /// Human-readable rendering in the requested timezone.
    pub datetime: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// RFC 3339 in UTC, millisecond precision.
    pub iso: String,
    /// Canonical IANA name of the timezone the reading was rendered in.
    pub timezone: String,
}

/// Resolve an optional IANA timezone name, defaulting to UTC.
pub fn resolve_timezone(name: Option<&str>) -> Result<Tz, ClockError> {
    match name {
        None => Ok(Tz::UTC),
        Some(name) => name
            .parse()
            .map_err(|_| ClockError::InvalidTimezone(name.to_string())),
    }
}

/// Render a reading of `instant` in `tz`. Split out from [`now`] so tests
/// can pin the instant.
pub fn reading_at(instant: DateTime<Utc>, tz: Tz, format: ClockFormat) -> ClockReading {
    let local = instant.with_timezone(&tz);
    let datetime = match format {
        ClockFormat::Date => format_date(&local),
        ClockFormat::Time => format_time(&local),
        ClockFormat::Full => format!("{} at {}", format_date(&local), format_time(&local)),
    };
    ClockReading {
        datetime,
        timestamp: instant.timestamp_millis(),
        iso: instant.to_rfc3339_opts(SecondsFormat::Millis, true),
        timezone: tz.name().to_string(),
    }
}

pub fn now(tz: Tz, format: ClockFormat) -> ClockReading {
    reading_at(Utc::now(), tz, format)
}

fn format_date(local: &DateTime<Tz>) -> String {
    local.format("%A, %B %-d, %Y").to_string()
}

fn format_time(local: &DateTime<Tz>) -> String {
    local.format("%I:%M:%S %p %Z").to_string()
}

/// Clock tool exposed to the model
pub struct ClockTool;

#[async_trait]
impl Tool for ClockTool {
    fn name(&self) -> &str {
        "getCurrentDateTime"
    }

    fn description(&self) -> String {
        "Gets the current date and time. Use this when users ask about the current date, \
         time, day of the week, or other time-related questions."
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "timezone": {
                    "type": "string",
                    "description": "IANA timezone name, e.g. 'America/New_York'. Defaults to UTC."
                },
                "format": {
                    "type": "string",
                    "enum": ["full", "date", "time"],
                    "description": "How much of the reading to return. Defaults to 'full'."
                }
            },
            "required": []
        })
    }

    async fn run(&self, args: Value, _ctx: ToolContext) -> ToolOutput {
        let tz = match resolve_timezone(args.get("timezone").and_then(Value::as_str)) {
            Ok(tz) => tz,
            Err(e) => return ToolOutput::error(format!("date/time error: {e}")),
        };
        let format = ClockFormat::parse(args.get("format").and_then(Value::as_str));
        match serde_json::to_string(&now(tz, format)) {
            Ok(reading) => ToolOutput::ok(reading),
            Err(e) => ToolOutput::error(format!("date/time error: {e}")),
        }
    }
}
