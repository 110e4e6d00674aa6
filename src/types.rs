//! Plan, import and metadata values exchanged with the host, and their
//! protobuf counterparts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generated;

/// The protocol version announced in the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// The handshake prefix written to stdout on startup.
pub const HANDSHAKE_PREFIX: &str = "AUTHENTIK_PROVIDER";

/// A change to one top-level attribute in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Attribute name.
    pub path: String,
    /// Value before the change, `None` when the attribute is being set.
    pub before: Option<Value>,
    /// Value after the change, `None` when the attribute is being removed.
    pub after: Option<Value>,
}

impl AttributeChange {
    /// The attribute goes from unset to `value`.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: None,
            after: Some(value),
        }
    }

    /// The attribute goes from `value` to unset.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(value),
            after: None,
        }
    }

    /// The attribute changes from `before` to `after`.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(before),
            after: Some(after),
        }
    }
}

fn encode(value: Option<&Value>) -> Vec<u8> {
    value
        .and_then(|v| serde_json::to_vec(v).ok())
        .unwrap_or_default()
}

fn decode(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(bytes).ok()
    }
}

impl From<generated::AttributeChange> for AttributeChange {
    fn from(proto: generated::AttributeChange) -> Self {
        Self {
            before: decode(&proto.before),
            after: decode(&proto.after),
            path: proto.path,
        }
    }
}

impl From<AttributeChange> for generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            before: encode(change.before.as_ref()),
            after: encode(change.after.as_ref()),
            path: change.path,
        }
    }
}

/// Outcome of planning one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// State the resource will have after apply. Null for a destroy.
    pub planned_state: Value,
    /// Attribute-level differences against the prior state.
    pub changes: Vec<AttributeChange>,
    /// A `force_new` attribute changed, so the object must be recreated.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Nothing to do.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// A plan carrying `changes`.
    pub fn with_changes(planned_state: Value, changes: Vec<AttributeChange>, requires_replace: bool) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// Whether applying the plan does anything.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Names of the changed attributes.
    pub fn changed_paths(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.path.as_str()).collect()
    }
}

impl PlanResult {
    pub(crate) fn into_response(self) -> generated::PlanResponse {
        generated::PlanResponse {
            planned_state: if self.planned_state.is_null() {
                Vec::new()
            } else {
                encode(Some(&self.planned_state))
            },
            changes: self.changes.into_iter().map(Into::into).collect(),
            requires_replace: self.requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// An object adopted through ImportResourceState.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// Resource type name.
    pub resource_type: String,
    /// Full state read from the server.
    pub state: Value,
}

impl ImportedResource {
    /// Pair a type name with its state.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

impl From<ImportedResource> for generated::ImportedResource {
    fn from(imported: ImportedResource) -> Self {
        Self {
            state: encode(Some(&imported.state)),
            resource_type: imported.resource_type,
        }
    }
}

/// What GetMetadata reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names.
    pub resources: Vec<String>,
    /// Data source type names.
    pub data_sources: Vec<String>,
    /// Optional protocol features.
    pub capabilities: ServerCapabilities,
}

/// Optional protocol features the provider implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Plan is called for deletions too.
    pub plan_destroy: bool,
}

impl From<ProviderMetadata> for generated::GetMetadataResponse {
    fn from(metadata: ProviderMetadata) -> Self {
        Self {
            server_capabilities: Some(generated::ServerCapabilities {
                plan_destroy: metadata.capabilities.plan_destroy,
            }),
            resources: metadata.resources,
            data_sources: metadata.data_sources,
            diagnostics: Vec::new(),
        }
    }
}
