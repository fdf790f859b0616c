//! Composed variables, conditional groups and keyed groups.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::config::KeyedGroup;
use crate::error::{InventoryError, Result};
use crate::inventory::Inventory;
use crate::template::{is_variable_path, lookup, Templar};

/// Replace characters that are not valid in group names with `_`.
#[must_use]
pub fn sanitize_group_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Applies `compose`, `groups` and `keyed_groups` to a host.
///
/// Outside strict mode, expressions that fail are skipped.
pub struct Constructed<'a> {
    templar: &'a Templar,
    conditions: &'a Templar,
    strict: bool,
}

impl<'a> Constructed<'a> {
    /// Create a constructor. `templar` renders `compose` templates and must
    /// fail on undefined variables, `conditions` evaluates `groups`.
    #[must_use]
    pub fn new(templar: &'a Templar, conditions: &'a Templar, strict: bool) -> Self {
        Self {
            templar,
            conditions,
            strict,
        }
    }

    fn vars(inventory: &impl Inventory, host: &str) -> Value {
        Value::Object(inventory.host_vars(host).cloned().unwrap_or_default())
    }

    fn tolerate<T>(&self, host: &str, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                debug!(host, error = %e, "Skipping expression");
                Ok(None)
            }
        }
    }

    /// Set variables from expressions. A plain variable path copies the
    /// value, anything else is rendered as a template.
    ///
    /// # Errors
    /// Returns error in strict mode if an expression fails.
    pub fn set_composite_vars(
        &self,
        compose: &BTreeMap<String, String>,
        host: &str,
        inventory: &mut impl Inventory,
    ) -> Result<()> {
        for (name, expr) in compose {
            let vars = Self::vars(&*inventory, host);
            let value = if is_variable_path(expr) {
                lookup(&vars, expr)
                    .cloned()
                    .ok_or_else(|| InventoryError::MissingVariable(expr.trim().to_string()))
            } else {
                self.templar.render(expr, &vars).map(Value::String)
            };

            if let Some(value) = self.tolerate(host, value)? {
                inventory.set_variable(host, name, value);
            }
        }
        Ok(())
    }

    /// Add the host to every group whose condition holds.
    ///
    /// # Errors
    /// Returns error in strict mode if a condition fails.
    pub fn add_host_to_composed_groups(
        &self,
        groups: &BTreeMap<String, String>,
        host: &str,
        inventory: &mut impl Inventory,
    ) -> Result<()> {
        for (group, condition) in groups {
            let vars = Self::vars(&*inventory, host);
            let matched = self.conditions.is_true(condition, &vars);
            if self.tolerate(host, matched)? == Some(true) {
                let group = sanitize_group_name(group);
                inventory.add_group(&group);
                inventory.add_host(host, Some(&group));
            }
        }
        Ok(())
    }

    /// Add the host to groups named after variable values.
    ///
    /// Strings and numbers give one group, lists one group per element and
    /// maps one group per `key{separator}value` pair.
    ///
    /// # Errors
    /// Returns error in strict mode if a key is missing.
    pub fn add_host_to_keyed_groups(
        &self,
        keyed_groups: &[KeyedGroup],
        host: &str,
        inventory: &mut impl Inventory,
    ) -> Result<()> {
        for keyed in keyed_groups {
            let vars = Self::vars(&*inventory, host);
            let value = lookup(&vars, &keyed.key)
                .filter(|v| !v.is_null())
                .ok_or_else(|| InventoryError::MissingVariable(keyed.key.clone()));
            let Some(value) = self.tolerate(host, value)? else {
                continue;
            };

            let bare_names: Vec<String> = match value {
                Value::String(s) if s.is_empty() => {
                    keyed.default_value.clone().into_iter().collect()
                }
                Value::Array(items) => items.iter().filter_map(scalar).collect(),
                Value::Object(map) => map
                    .iter()
                    .filter_map(|(k, v)| {
                        let v = scalar(v)?;
                        Some(match (&keyed.default_value, v.is_empty()) {
                            (Some(default), true) => format!("{k}{}{default}", keyed.separator),
                            _ => format!("{k}{}{v}", keyed.separator),
                        })
                    })
                    .collect(),
                other => scalar(other).into_iter().collect(),
            };

            let separator = if keyed.prefix.is_empty() && !keyed.leading_separator {
                ""
            } else {
                keyed.separator.as_str()
            };

            for bare in bare_names {
                let group = sanitize_group_name(&format!("{}{separator}{bare}", keyed.prefix));
                inventory.add_group(&group);
                inventory.add_host(host, Some(&group));

                if let Some(parent) = &keyed.parent_group {
                    let parent = sanitize_group_name(parent);
                    inventory.add_group(&parent);
                    inventory.add_child(&parent, &group);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::inventory::InventoryData;

    fn keyed(key: &str, prefix: &str) -> KeyedGroup {
        KeyedGroup {
            key: key.to_string(),
            prefix: prefix.to_string(),
            separator: "_".to_string(),
            parent_group: None,
            leading_separator: true,
            default_value: None,
        }
    }

    fn inventory() -> InventoryData {
        let mut inventory = InventoryData::new();
        inventory.add_host("web-1", Some("hcloud"));
        inventory.set_variable("web-1", "hcloud_status", json!("running"));
        inventory.set_variable("web-1", "hcloud_location", json!("fsn1"));
        inventory.set_variable("web-1", "hcloud_private_ipv4", json!("10.0.0.2"));
        inventory.set_variable("web-1", "hcloud_image_id", json!(42));
        inventory.set_variable(
            "web-1",
            "hcloud_labels",
            json!({"env": "prod", "team": "core-infra", "empty": ""}),
        );
        inventory
    }

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_sanitize_group_name() {
        assert_eq!(sanitize_group_name("label_team_core-infra"), "label_team_core_infra");
        assert_eq!(sanitize_group_name("_fsn1"), "_fsn1");
        assert_eq!(sanitize_group_name("a.b c"), "a_b_c");
    }

    #[test]
    fn test_compose() {
        let templar = Templar::new(true);
        let conditions = Templar::new(false);
        let mut inventory = inventory();
        Constructed::new(&templar, &conditions, false)
            .set_composite_vars(
                &map(&[
                    ("ansible_host", "hcloud_private_ipv4"),
                    ("env", "hcloud_labels.env"),
                    ("fqdn", "{{ hcloud_location }}.example.com"),
                    ("missing", "hcloud_nothing"),
                    ("typo", "{{ hcloud_locaton }}.example.com"),
                ]),
                "web-1",
                &mut inventory,
            )
            .unwrap();

        let vars = inventory.host_vars("web-1").unwrap();
        assert_eq!(vars.get("ansible_host"), Some(&json!("10.0.0.2")));
        assert_eq!(vars.get("env"), Some(&json!("prod")));
        assert_eq!(vars.get("fqdn"), Some(&json!("fsn1.example.com")));
        assert!(!vars.contains_key("missing"));
        assert!(!vars.contains_key("typo"));
    }

    #[test]
    fn test_compose_strict() {
        let templar = Templar::new(true);
        let mut inventory = inventory();
        let err = Constructed::new(&templar, &templar, true)
            .set_composite_vars(&map(&[("missing", "hcloud_nothing")]), "web-1", &mut inventory)
            .unwrap_err();
        assert!(matches!(err, InventoryError::MissingVariable(v) if v == "hcloud_nothing"));
    }

    #[test]
    fn test_composed_groups() {
        let templar = Templar::new(false);
        let mut inventory = inventory();
        Constructed::new(&templar, &templar, false)
            .add_host_to_composed_groups(
                &map(&[
                    ("running", "(eq hcloud_status \"running\")"),
                    ("stopped", "(eq hcloud_status \"off\")"),
                    ("prod-hosts", "hcloud_labels.env"),
                ]),
                "web-1",
                &mut inventory,
            )
            .unwrap();

        assert_eq!(inventory.group_hosts("running").map(<[String]>::len), Some(1));
        assert_eq!(inventory.group_hosts("prod_hosts").map(<[String]>::len), Some(1));
        assert!(!inventory.has_group("stopped"));
    }

    #[test]
    fn test_keyed_groups() {
        let templar = Templar::new(false);
        let mut inventory = inventory();
        let mut location = keyed("hcloud_location", "");
        location.parent_group = Some("locations".to_string());

        Constructed::new(&templar, &templar, false)
            .add_host_to_keyed_groups(
                &[
                    keyed("hcloud_labels", "label"),
                    location,
                    keyed("hcloud_image_id", "image"),
                    keyed("hcloud_nothing", "missing"),
                ],
                "web-1",
                &mut inventory,
            )
            .unwrap();

        for group in [
            "label_env_prod",
            "label_team_core_infra",
            "label_empty_",
            "_fsn1",
            "image_42",
        ] {
            assert!(inventory.has_group(group), "missing group {group}");
        }
        assert_eq!(inventory.group_children("locations"), vec!["_fsn1"]);
    }

    #[test]
    fn test_keyed_groups_without_leading_separator() {
        let templar = Templar::new(false);
        let mut inventory = inventory();
        let mut location = keyed("hcloud_location", "");
        location.leading_separator = false;
        let mut labels = keyed("hcloud_labels", "label");
        labels.default_value = Some("none".to_string());

        Constructed::new(&templar, &templar, false)
            .add_host_to_keyed_groups(&[location, labels], "web-1", &mut inventory)
            .unwrap();

        assert!(inventory.has_group("fsn1"));
        assert!(inventory.has_group("label_empty_none"));
    }

    #[test]
    fn test_keyed_groups_strict() {
        let templar = Templar::new(true);
        let mut inventory = inventory();
        let result = Constructed::new(&templar, &templar, true).add_host_to_keyed_groups(
            &[keyed("hcloud_nothing", "missing")],
            "web-1",
            &mut inventory,
        );
        assert!(matches!(result, Err(InventoryError::MissingVariable(_))));
    }
}
