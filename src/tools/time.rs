//! Host clock tool.
//!
//! Lets the model ask for the current wall-clock time instead of guessing it.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::Tool;
use crate::error::ToolError;
use crate::types::ToolDefinition;

/// Tool that returns the host's current time.
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &'static str {
        "current_time"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            self.name(),
            "Return the current wall-clock time of the machine running this assistant, as Unix epoch values and an ISO-8601 UTC string.",
            serde_json::json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        )
    }

    async fn execute(&self, _arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ToolError::ExecutionFailed(format!("failed to read host clock: {e}")))?;
        serde_json::to_value(snapshot(now)).map_err(|e| {
            ToolError::ExecutionFailed(format!("failed to serialize time snapshot: {e}"))
        })
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct TimeSnapshot {
    unix_seconds: u64,
    unix_millis: u64,
    iso_8601_utc: String,
}

fn snapshot(since_epoch: Duration) -> TimeSnapshot {
    let unix_seconds = since_epoch.as_secs();
    let days = (unix_seconds / 86_400) as i64;
    let secs_of_day = unix_seconds % 86_400;
    let (year, month, day) = civil_from_days(days);
    TimeSnapshot {
        unix_seconds,
        unix_millis: since_epoch.as_millis() as u64,
        iso_8601_utc: format!(
            "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}Z",
            secs_of_day / 3_600,
            (secs_of_day % 3_600) / 60,
            secs_of_day % 60
        ),
    }
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
