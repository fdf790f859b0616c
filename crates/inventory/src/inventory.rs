//! Inventory host and group store.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Map, Value};

/// Group every host belongs to implicitly.
pub const ALL_GROUP: &str = "all";

/// Group of hosts added without a group.
pub const UNGROUPED_GROUP: &str = "ungrouped";

/// Receiver of hosts, groups and host variables.
pub trait Inventory {
    /// Add a group, if it does not exist yet.
    fn add_group(&mut self, group: &str);

    /// Add a host, optionally to a group. The group is created if needed.
    fn add_host(&mut self, host: &str, group: Option<&str>);

    /// Make `child` a child group of `group`. Both are created if needed.
    fn add_child(&mut self, group: &str, child: &str);

    /// Set a variable on a host.
    fn set_variable(&mut self, host: &str, key: &str, value: Value);

    /// Variables of a host.
    fn host_vars(&self, host: &str) -> Option<&Map<String, Value>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Group {
    hosts: Vec<String>,
    children: BTreeSet<String>,
}

/// In-memory inventory.
#[derive(Debug, Clone, Default)]
pub struct InventoryData {
    groups: BTreeMap<String, Group>,
    hosts: BTreeMap<String, Map<String, Value>>,
}

impl InventoryData {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hosts of a group, in insertion order.
    #[must_use]
    pub fn group_hosts(&self, group: &str) -> Option<&[String]> {
        self.groups.get(group).map(|g| g.hosts.as_slice())
    }

    /// Child groups of a group.
    #[must_use]
    pub fn group_children(&self, group: &str) -> Vec<&str> {
        self.groups
            .get(group)
            .map(|g| g.children.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether the group exists.
    #[must_use]
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// All host names, sorted.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.keys().map(String::as_str)
    }

    /// Render the inventory in the `ansible-inventory --list` format.
    #[must_use]
    pub fn to_list_json(&self) -> Value {
        let mut document = Map::new();

        let nested: BTreeSet<&str> = self
            .groups
            .values()
            .flat_map(|g| g.children.iter().map(String::as_str))
            .collect();

        let mut top_level: Vec<&str> = self
            .groups
            .keys()
            .map(String::as_str)
            .filter(|name| !nested.contains(name))
            .collect();
        if !top_level.contains(&UNGROUPED_GROUP) {
            top_level.push(UNGROUPED_GROUP);
        }
        document.insert(ALL_GROUP.to_string(), json!({ "children": top_level }));

        for (name, group) in &self.groups {
            let mut entry = Map::new();
            if !group.hosts.is_empty() {
                entry.insert("hosts".to_string(), json!(group.hosts));
            }
            if !group.children.is_empty() {
                entry.insert("children".to_string(), json!(group.children));
            }
            document.insert(name.clone(), Value::Object(entry));
        }

        document.insert(
            "_meta".to_string(),
            json!({ "hostvars": self.hosts }),
        );
        Value::Object(document)
    }
}

impl Inventory for InventoryData {
    fn add_group(&mut self, group: &str) {
        self.groups.entry(group.to_string()).or_default();
    }

    fn add_host(&mut self, host: &str, group: Option<&str>) {
        self.hosts.entry(host.to_string()).or_default();
        let group = self
            .groups
            .entry(group.unwrap_or(UNGROUPED_GROUP).to_string())
            .or_default();
        if !group.hosts.iter().any(|h| h == host) {
            group.hosts.push(host.to_string());
        }
    }

    fn add_child(&mut self, group: &str, child: &str) {
        self.groups.entry(child.to_string()).or_default();
        self.groups
            .entry(group.to_string())
            .or_default()
            .children
            .insert(child.to_string());
    }

    fn set_variable(&mut self, host: &str, key: &str, value: Value) {
        self.hosts
            .entry(host.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    fn host_vars(&self, host: &str) -> Option<&Map<String, Value>> {
        self.hosts.get(host)
    }
}
