//! Plan, import and metadata types shared by the provider and the gRPC layer.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::generated as pb;

/// The protocol version for the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// The handshake prefix output by providers.
pub const HANDSHAKE_PREFIX: &str = "HEMMER_PROVIDER";

/// One attribute that differs between prior and planned state.
///
/// `before` is `None` for attributes being set for the first time, `after` is
/// `None` for attributes being cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChange {
    /// Attribute name.
    pub path: String,
    /// Prior value.
    pub before: Option<Value>,
    /// Planned value.
    pub after: Option<Value>,
}

impl AttributeChange {
    /// A change of `path` from `before` to `after`.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Compare two state documents attribute by attribute.
    ///
    /// A missing prior document means every set attribute is added; a null
    /// planned document means every set attribute is removed. `null` and
    /// absent are treated alike. Changes are ordered by attribute name.
    ///
    /// ```
    /// use hemmer_provider_instatus::AttributeChange;
    /// use serde_json::json;
    ///
    /// let prior = json!({"name": "API", "status": "OPERATIONAL"});
    /// let planned = json!({"name": "API", "status": "MAJOROUTAGE"});
    /// let changes = AttributeChange::diff(Some(&prior), &planned);
    ///
    /// assert_eq!(changes.len(), 1);
    /// assert_eq!(changes[0].path, "status");
    /// ```
    pub fn diff(prior: Option<&Value>, planned: &Value) -> Vec<AttributeChange> {
        let empty = Map::new();
        let before = prior.and_then(Value::as_object).unwrap_or(&empty);
        let after = planned.as_object().unwrap_or(&empty);

        let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

        keys.into_iter()
            .filter_map(|key| {
                let old = before.get(key).filter(|v| !v.is_null());
                let new = after.get(key).filter(|v| !v.is_null());
                match (old, new) {
                    (None, None) => None,
                    (Some(a), Some(b)) if a == b => None,
                    (old, new) => Some(AttributeChange::new(key.clone(), old.cloned(), new.cloned())),
                }
            })
            .collect()
    }
}

fn encode_optional(value: Option<Value>) -> Vec<u8> {
    value
        .and_then(|v| serde_json::to_vec(&v).ok())
        .unwrap_or_default()
}

impl From<AttributeChange> for pb::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            path: change.path,
            before: encode_optional(change.before),
            after: encode_optional(change.after),
        }
    }
}

/// Outcome of planning one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanResult {
    /// State the host should expect after apply; null for a destroy.
    pub planned_state: Value,
    /// Attribute-level differences from the prior state.
    pub changes: Vec<AttributeChange>,
    /// Whether apply must destroy and recreate the resource.
    pub requires_replace: bool,
}

impl PlanResult {
    /// An in-place plan. Empty `changes` means nothing to apply.
    pub fn in_place(planned_state: Value, changes: Vec<AttributeChange>) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace: false,
        }
    }

    /// A plan that leaves `state` as it is.
    pub fn no_change(state: Value) -> Self {
        Self::in_place(state, Vec::new())
    }

    /// A plan that removes the resource.
    pub fn destroy(changes: Vec<AttributeChange>) -> Self {
        Self::in_place(Value::Null, changes)
    }

    /// Whether applying the plan would destroy the resource.
    pub fn is_destroy(&self) -> bool {
        self.planned_state.is_null()
    }
}

/// A resource found by import, ready to be written to state.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedResource {
    /// Resource type name.
    pub resource_type: String,
    /// Full state document.
    pub state: Value,
}

impl ImportedResource {
    /// An imported resource of `resource_type`.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

impl From<ImportedResource> for pb::ImportedResource {
    fn from(imported: ImportedResource) -> Self {
        Self {
            resource_type: imported.resource_type,
            state: encode_optional(Some(imported.state)),
        }
    }
}

/// What GetMetadata reports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderMetadata {
    /// Resource type names, sorted.
    pub resources: Vec<String>,
    /// Optional protocol features.
    pub capabilities: ServerCapabilities,
}

/// Optional protocol features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerCapabilities {
    /// The host should call Plan for destroys too.
    pub plan_destroy: bool,
}

impl From<ServerCapabilities> for pb::ServerCapabilities {
    fn from(capabilities: ServerCapabilities) -> Self {
        Self {
            plan_destroy: capabilities.plan_destroy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_to_proto() {
        let change = AttributeChange::new("status", Some(json!("OPERATIONAL")), Some(json!("MAJOROUTAGE")));
        let proto: pb::AttributeChange = change.into();
        assert_eq!(proto.path, "status");
        assert_eq!(proto.before, br#""OPERATIONAL""#.to_vec());
        assert_eq!(proto.after, br#""MAJOROUTAGE""#.to_vec());

        let added: pb::AttributeChange = AttributeChange::new("name", None, Some(json!("API"))).into();
        assert!(added.before.is_empty());
    }

    #[test]
    fn test_diff_create() {
        let changes = AttributeChange::diff(
            None,
            &json!({"name": "API", "id": null, "show_uptime": true}),
        );

        let paths: Vec<_> = changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "show_uptime"]);
        assert!(changes.iter().all(|c| c.before.is_none()));
    }

    #[test]
    fn test_diff_update_and_destroy() {
        let prior = json!({"id": "cmp-1", "name": "API", "order": 1, "group_id": "grp-1"});
        let planned = json!({"id": "cmp-1", "name": "Public API", "order": 1, "group_id": null});

        let changes = AttributeChange::diff(Some(&prior), &planned);
        assert_eq!(
            changes,
            vec![
                AttributeChange::new("group_id", Some(json!("grp-1")), None),
                AttributeChange::new("name", Some(json!("API")), Some(json!("Public API"))),
            ]
        );

        let destroy = AttributeChange::diff(Some(&prior), &Value::Null);
        assert_eq!(destroy.len(), 4);
        assert!(destroy.iter().all(|c| c.after.is_none()));
    }

    #[test]
    fn test_plan_result() {
        let no_change = PlanResult::no_change(json!({"id": "cmp-1"}));
        assert!(no_change.changes.is_empty());
        assert!(!no_change.requires_replace);
        assert!(!no_change.is_destroy());

        let destroy = PlanResult::destroy(vec![AttributeChange::new("name", Some(json!("API")), None)]);
        assert!(destroy.is_destroy());
        assert!(!destroy.requires_replace);
    }

    #[test]
    fn test_imported_resource_to_proto() {
        let imported = ImportedResource::new("instatus_component", json!({"id": "cmp-1"}));
        let proto: pb::ImportedResource = imported.into();
        assert_eq!(proto.resource_type, "instatus_component");
        assert_eq!(proto.state, br#"{"id":"cmp-1"}"#.to_vec());
    }
}
