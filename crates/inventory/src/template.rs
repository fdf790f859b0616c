//! Template rendering for tokens, hostnames and constructed variables.
//!
//! Templates use Handlebars syntax, e.g. `{{ hcloud_name }}.example.com`.
//! Conditions are Handlebars expressions such as `hcloud_labels.env` or
//! `(eq hcloud_status "running")`.

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::Value;

use crate::error::{InventoryError, Result};

/// Renders templates against host and extra variables.
pub struct Templar {
    handlebars: Handlebars<'static>,
}

impl Templar {
    /// Create a renderer. In strict mode missing variables are errors.
    #[must_use]
    pub fn new(strict: bool) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(strict);
        Self { handlebars }
    }

    /// Render `template` with `vars`.
    ///
    /// # Errors
    /// Returns [`InventoryError::Template`] if the template is invalid or, in
    /// strict mode, references a missing variable.
    pub fn render<T: Serialize>(&self, template: &str, vars: &T) -> Result<String> {
        self.handlebars
            .render_template(template, vars)
            .map_err(|e| InventoryError::Template {
                template: template.to_string(),
                message: e.to_string(),
            })
    }

    /// Evaluate a condition expression.
    ///
    /// # Errors
    /// Same as [`Templar::render`].
    pub fn is_true<T: Serialize>(&self, condition: &str, vars: &T) -> Result<bool> {
        let template = format!("{{{{#if {}}}}}true{{{{/if}}}}", condition.trim());
        Ok(self.render(&template, vars)?.trim() == "true")
    }
}

/// Whether `expr` is a plain variable path like `hcloud_labels.env`.
#[must_use]
pub fn is_variable_path(expr: &str) -> bool {
    let expr = expr.trim();
    !expr.is_empty()
        && expr
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

/// Resolve a dotted variable path. Numeric segments index arrays.
#[must_use]
pub fn lookup<'a>(vars: &'a Value, path: &str) -> Option<&'a Value> {
    path.trim().split('.').try_fold(vars, |value, part| match value {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Merge two variable maps, `overrides` wins.
#[must_use]
pub fn combine_vars(base: &serde_json::Map<String, Value>, overrides: &serde_json::Map<String, Value>) -> Value {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    Value::Object(merged)
}
