//! Deprecation warnings for server types.
//!
//! A server type may be deprecated globally, or independently in each
//! location. The functions here classify the deprecation state and turn it
//! into at most one message for the operator.

use chrono::{DateTime, Utc};

use crate::models::{Deprecation, ServerType, ServerTypeLocation};
use crate::warn::Warn;

const DEPRECATED_EXISTING_SERVERS: &str = "Existing servers of that type will continue to work \
as before and no action is required on your part.";

fn date(deprecation: &Deprecation) -> String {
    deprecation.unavailable_after.format("%Y-%m-%d").to_string()
}

fn join(locations: &[&ServerTypeLocation]) -> String {
    locations
        .iter()
        .map(|o| o.name.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the deprecation warning for a resource, if any.
///
/// `global` takes precedence over the per location data. When
/// `target_location` is given, only that location is considered; a location
/// missing from `locations` counts as not deprecated. Without a target, a
/// warning is only produced when every location is deprecated.
#[must_use]
pub fn deprecation_message(
    resource_name: &str,
    global: Option<&Deprecation>,
    locations: &[ServerTypeLocation],
    target_location: Option<&str>,
    now: DateTime<Utc>,
) -> Option<String> {
    if let Some(deprecation) = global {
        let message = if deprecation.is_unavailable(now) {
            format!(
                "Server type {resource_name} is unavailable in all locations and can no longer be ordered. "
            )
        } else {
            format!(
                "Server type {resource_name} is deprecated in all locations and will no longer be available \
                 for order as of {}. ",
                date(deprecation)
            )
        };
        return Some(message + DEPRECATED_EXISTING_SERVERS);
    }

    let deprecated: Vec<&ServerTypeLocation> = locations
        .iter()
        .filter(|o| o.deprecation.is_some())
        .collect();
    let unavailable: Vec<&ServerTypeLocation> = deprecated
        .iter()
        .copied()
        .filter(|o| o.deprecation.as_ref().is_some_and(|d| d.is_unavailable(now)))
        .collect();

    if deprecated.is_empty() {
        return None;
    }

    if let Some(target) = target_location {
        let found = deprecated.iter().find(|o| o.name == target)?;
        let deprecation = found.deprecation.as_ref()?;

        let message = if deprecation.is_unavailable(now) {
            format!(
                "Server type {resource_name} is unavailable in {} and can no longer be ordered. ",
                found.name
            )
        } else {
            format!(
                "Server type {resource_name} is deprecated in {} and will no longer be available \
                 for order as of {}. ",
                found.name,
                date(deprecation)
            )
        };
        return Some(message + DEPRECATED_EXISTING_SERVERS);
    }

    // Without a target location only a type deprecated everywhere warns
    if deprecated.len() != locations.len() {
        return None;
    }

    let message = if unavailable.is_empty() {
        format!(
            "Server type {resource_name} is deprecated in all locations ({}) and will no longer be \
             available for order. ",
            join(&deprecated)
        )
    } else if unavailable.len() == deprecated.len() {
        format!(
            "Server type {resource_name} is unavailable in all locations ({}) and can no longer be \
             ordered. ",
            join(&unavailable)
        )
    } else {
        format!(
            "Server type {resource_name} is deprecated in all locations ({}) and can no longer be \
             ordered in some locations ({}). ",
            join(&deprecated),
            join(&unavailable)
        )
    };
    Some(message + DEPRECATED_EXISTING_SERVERS)
}

/// Warn when a server type is deprecated, optionally in a given location.
///
/// Returns whether a warning was emitted.
pub fn deprecated_server_type_warning(
    server_type: &ServerType,
    location: Option<&str>,
    now: DateTime<Utc>,
    warn: &mut impl Warn,
) -> bool {
    match deprecation_message(
        &server_type.name,
        server_type.deprecation.as_ref(),
        &server_type.locations,
        location,
        now,
    ) {
        Some(message) => {
            warn.warn(message);
            true
        }
        None => false,
    }
}
