//! Schema types for describing provider and resource structure.
//!
//! Schemas describe the shape of the provider configuration and of each
//! resource. The host uses them for documentation and plan rendering; the
//! provider uses them to validate configuration and apply defaults.

use serde::Serialize;
use std::collections::HashMap;

/// The type of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 64-bit integer.
    Int64,
    /// A boolean value.
    Bool,
}

impl AttributeType {
    /// Whether a JSON value has this type. `null` never matches.
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Int64 => value.is_i64() || value.is_u64(),
            Self::Bool => value.is_boolean(),
        }
    }

    /// The type name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int64 => "int64",
            Self::Bool => "bool",
        }
    }
}

/// How an attribute may be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttributeFlags {
    /// Must be present in configuration.
    pub required: bool,
    /// May be present in configuration.
    pub optional: bool,
    /// Filled in by the provider.
    pub computed: bool,
    /// Hidden from plan output and logs.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Set by the user, always.
    pub const REQUIRED: Self = Self::with(true, false, false);
    /// Set by the user, or left unset.
    pub const OPTIONAL: Self = Self::with(false, true, false);
    /// Set only by the provider.
    pub const COMPUTED: Self = Self::with(false, false, true);
    /// Set by the user, or by the provider when the user leaves it unset.
    pub const OPTIONAL_COMPUTED: Self = Self::with(false, true, true);

    const fn with(required: bool, optional: bool, computed: bool) -> Self {
        Self {
            required,
            optional,
            computed,
            sensitive: false,
        }
    }

    /// Whether the value can only come from the provider.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// One attribute of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Value type.
    pub attr_type: AttributeType,
    /// How the attribute may be set.
    pub flags: AttributeFlags,
    /// Shown in generated docs.
    pub description: Option<String>,
    /// Changing the value replaces the resource.
    pub force_new: bool,
    /// Value used when configuration leaves the attribute unset.
    pub default: Option<serde_json::Value>,
}

impl Attribute {
    /// An attribute of `attr_type` with the given flags.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            default: None,
        }
    }

    /// `string`, required.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::REQUIRED)
    }

    /// `string`, optional.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::OPTIONAL)
    }

    /// `string`, computed only.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::COMPUTED)
    }

    /// `int64`, optional and computed.
    pub fn optional_computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::OPTIONAL_COMPUTED)
    }

    /// `bool`, optional.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::OPTIONAL)
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a default value.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }
}

/// The attributes making up a provider config or resource.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    /// Attributes by name.
    pub attributes: HashMap<String, Attribute>,
    /// Shown in generated docs.
    pub description: Option<String>,
}

/// Schema for a resource or the provider configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    /// Bumped when the state layout changes.
    pub version: u64,
    /// Top-level attributes.
    pub block: Block,
}

impl Schema {
    /// An empty schema at version 0.
    pub fn v0() -> Self {
        Self::default()
    }

    /// Add an attribute to the schema.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    /// Set the description of the schema's root block.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block.description = Some(description.into());
        self
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.get(name)
    }

    /// Fill every unset or null attribute that has a default.
    ///
    /// Non-object values are returned unchanged.
    pub fn apply_defaults(&self, mut value: serde_json::Value) -> serde_json::Value {
        if let Some(obj) = value.as_object_mut() {
            for (name, attr) in &self.block.attributes {
                let Some(default) = &attr.default else {
                    continue;
                };
                let unset = obj.get(name).map_or(true, |v| v.is_null());
                if unset {
                    obj.insert(name.clone(), default.clone());
                }
            }
        }
        value
    }
}

/// Schema for the provider configuration and every resource it serves.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderSchema {
    /// The provider block.
    pub provider: Schema,
    /// Resource schemas by type name.
    pub resources: HashMap<String, Schema>,
}

impl ProviderSchema {
    /// Create a new empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Add a resource schema.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    /// The operation failed.
    Error,
    /// The operation went through, but the user should look.
    Warning,
}

/// A message for the user, optionally tied to an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: DiagnosticSeverity,
    /// One-line summary.
    pub summary: String,
    /// Longer explanation.
    pub detail: Option<String>,
    /// Attribute the message is about.
    pub attribute: Option<String>,
}

impl Diagnostic {
    fn new(severity: DiagnosticSeverity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// An error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Error, summary)
    }

    /// A warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, summary)
    }

    /// Add detail to this diagnostic.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path for this diagnostic.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// Whether any diagnostic in the list is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
