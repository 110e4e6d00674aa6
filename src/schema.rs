//! Schema types for describing provider, resource and data source structure.
//!
//! A [`Schema`] is the local mirror of one remote object type: the field
//! names, their types, how they may be set, defaults and the validators that
//! run at plan time before any request reaches the API.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Value shape of an attribute, as stored in the JSON state.
///
/// authentik objects only need strings, integers (primary keys), booleans,
/// ordered lists and string maps. Set-like lists are plain lists reconciled
/// with [`list_consistent_merge`](crate::helpers::list_consistent_merge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// UTF-8 text, also used for JSON documents.
    String,
    /// Integer primary keys and counters.
    Int64,
    /// `true` or `false`.
    Bool,
    /// Ordered list with one element type.
    List(Box<AttributeType>),
    /// String-keyed map with one value type.
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// `List` of `element_type`.
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// `Map` of `element_type`.
    pub fn map(element_type: AttributeType) -> Self {
        Self::Map(Box::new(element_type))
    }
}

/// Who may set an attribute: the user, the API, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// Must be present in configuration.
    pub required: bool,
    /// May be present in configuration.
    pub optional: bool,
    /// Filled in from the API response.
    pub computed: bool,
    /// Redacted from plan output and logs.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Flags for a required attribute.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Flags for an optional attribute.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Flags for a computed attribute.
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Flags for an attribute that may be set, and is filled in by the API otherwise.
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }
}

/// A plan-time check applied to a configured attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "values")]
pub enum Validator {
    /// The value must be one of the listed strings.
    OneOf(Vec<String>),
    /// The value must be a well-formed JSON document.
    Json,
    /// The value must be an absolute http(s) URL.
    Url,
}

/// One field of a remote object mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Value shape.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Who may set the value.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Shown in generated documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Changing the value destroys and recreates the object.
    #[serde(default)]
    pub force_new: bool,
    /// Default value used when the attribute is not configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Validators run against configured values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
}

impl Attribute {
    /// Attribute with no description, default or validators.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            default: None,
            validators: Vec::new(),
        }
    }

    /// `String` that must be configured.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// `String` that may be configured.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// `String` read back from the API.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// String lookup key of a data source, echoed back after the read.
    pub fn optional_computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional_computed())
    }

    /// `Int64` that may be configured.
    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    /// Integer lookup key of a data source, echoed back after the read.
    pub fn optional_computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional_computed())
    }

    /// `Int64` read back from the API.
    pub fn computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::computed())
    }

    /// `Bool` that may be configured.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    /// `Bool` read back from the API.
    pub fn computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::computed())
    }

    /// List that may be configured.
    pub fn optional_list(element_type: AttributeType) -> Self {
        Self::new(AttributeType::list(element_type), AttributeFlags::optional())
    }

    /// List read back from the API.
    pub fn computed_list(element_type: AttributeType) -> Self {
        Self::new(AttributeType::list(element_type), AttributeFlags::computed())
    }

    /// Map that may be configured, such as static request headers.
    pub fn optional_map(element_type: AttributeType) -> Self {
        Self::new(AttributeType::map(element_type), AttributeFlags::optional())
    }

    /// Create an optional string attribute holding a JSON document.
    ///
    /// Defaults to `{}` and is compared semantically when planning.
    pub fn json_string() -> Self {
        Self::optional_string()
            .with_default(serde_json::json!("{}"))
            .with_validator(Validator::Json)
    }

    /// Attach documentation text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the object when this value changes.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Value planned when the attribute is not configured.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Add a validator.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Restrict the attribute to a fixed set of values.
    ///
    /// The allowed values are appended to the description.
    pub fn one_of(mut self, values: &[&str]) -> Self {
        let allowed = values
            .iter()
            .map(|v| format!("`{}`", v))
            .collect::<Vec<_>>()
            .join(", ");
        let description = match self.description.take() {
            Some(d) => format!("{} Allowed values: {}", d, allowed),
            None => format!("Allowed values: {}", allowed),
        };
        self.description = Some(description);
        self.with_validator(Validator::OneOf(
            values.iter().map(|v| v.to_string()).collect(),
        ))
    }

    /// Redact the value, used for tokens and passwords.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }

    /// Whether the attribute holds a JSON document.
    pub fn is_json(&self) -> bool {
        self.validators.contains(&Validator::Json)
    }

    /// Values accepted by a `OneOf` validator, if any.
    pub fn allowed_values(&self) -> &[String] {
        self.validators
            .iter()
            .find_map(|v| match v {
                Validator::OneOf(values) => Some(values.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }
}

/// Schema for a resource, data source or the provider block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Bumped when the stored state layout changes.
    #[serde(default)]
    pub version: u64,
    /// Attributes keyed by name.
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Schema {
    /// Empty schema at `version`.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            attributes: BTreeMap::new(),
            description: None,
        }
    }

    /// Empty schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Create a version 0 resource schema with the computed `id` attribute.
    pub fn resource() -> Self {
        Self::v0().with_attribute("id", Attribute::computed_string())
    }

    /// Add or replace the attribute `name`.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Set the description for this schema.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

/// Everything the host needs to know about the provider's types, keyed by
/// type name (`authentik_group`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// The `provider "authentik"` block.
    #[serde(default)]
    pub provider: Schema,
    /// Managed object types.
    #[serde(default)]
    pub resources: HashMap<String, Schema>,
    /// Read-only lookup types.
    #[serde(default)]
    pub data_sources: HashMap<String, Schema>,
}

impl ProviderSchema {
    /// No types and an empty provider block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `schema` for the provider block.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Register a resource type.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Register a data source type.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

/// Whether a diagnostic fails the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// The operation failed.
    Error,
    /// Informational, the operation continues.
    Warning,
}

/// A message shown to the operator running the host.
///
/// API failures carry the HTTP status in `summary` and the response body in
/// `detail`; validation failures set `attribute` to the offending path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: DiagnosticSeverity,
    /// One-line headline.
    pub summary: String,
    /// Longer text, usually a response body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Dotted path such as `groups.0`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Error diagnostic with no detail.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Warning diagnostic with no detail.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Attach longer text.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Point the diagnostic at an attribute path.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}
