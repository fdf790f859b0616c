//! Template filters operating on module results.

use serde_json::Value;
use thiserror::Error;

/// Errors raised by filters on unexpected input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The input lacks a required field.
    #[error("{filter} - missing or invalid field '{field}'")]
    InvalidInput {
        /// Filter name.
        filter: &'static str,
        /// Field name.
        field: &'static str,
    },
}

/// Health of a Load Balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// All targets are healthy.
    Healthy,
    /// At least one target is unhealthy.
    Unhealthy,
    /// At least one target has no health information.
    Unknown,
}

impl HealthStatus {
    /// String form used in results.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn invalid(field: &'static str) -> FilterError {
    FilterError::InvalidInput {
        filter: "load_balancer_status",
        field,
    }
}

fn targets_status(targets: &[Value]) -> Result<HealthStatus, FilterError> {
    let mut result = HealthStatus::Healthy;

    for target in targets {
        let kind = target
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("type"))?;

        // Label selector targets have child targets that must be checked
        if kind == "label_selector" {
            let children = target
                .get("targets")
                .and_then(Value::as_array)
                .ok_or_else(|| invalid("targets"))?;
            match targets_status(children)? {
                HealthStatus::Unhealthy => return Ok(HealthStatus::Unhealthy),
                HealthStatus::Unknown => result = HealthStatus::Unknown,
                HealthStatus::Healthy => {}
            }
            continue;
        }

        let Some(health) = target
            .get("health_status")
            .and_then(Value::as_array)
            .filter(|h| !h.is_empty())
        else {
            return Ok(HealthStatus::Unknown);
        };

        for entry in health {
            match entry.get("status").and_then(Value::as_str) {
                Some("unhealthy") => return Ok(HealthStatus::Unhealthy),
                None | Some("unknown") => result = HealthStatus::Unknown,
                Some(_) => {}
            }
        }
    }

    Ok(result)
}

/// Status of a Load Balancer based on the health of its targets.
///
/// # Errors
/// Returns error if the Load Balancer has no `targets` list or a target has
/// no `type`.
pub fn load_balancer_status(load_balancer: &Value) -> Result<HealthStatus, FilterError> {
    let targets = load_balancer
        .get("targets")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("targets"))?;
    targets_status(targets)
}

/// Maximum length of a single TXT record string.
const TXT_CHUNK: usize = 255;

/// Format a value as a TXT record: quotes are escaped and the value is
/// split into quoted strings of at most 255 characters.
#[must_use]
pub fn txt_record(record: &str) -> String {
    let escaped = record.replace('"', "\\\"");
    let chars: Vec<char> = escaped.chars().collect();

    chars
        .chunks(TXT_CHUNK)
        .map(|chunk| format!("\"{}\"", chunk.iter().collect::<String>()))
        .collect::<Vec<_>>()
        .join(" ")
}
