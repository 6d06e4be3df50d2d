//! The `instatus_component` resource.
//!
//! Maps the snake_case state document the host stores to the client's request
//! types and back, and drives the create/read/update/delete/import calls.
//!
//! Two attributes need care:
//!
//! - `grouped` is never returned by the API. Reads keep whatever the prior
//!   state held, and updates derive it from the presence of `group_id`.
//! - `order` is also managed from the Instatus dashboard. Creates send it only
//!   when set, and updates send it only when the planned value differs from
//!   the prior one, so reordering done in the UI survives an unrelated apply.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::client::{
    Component, ComponentStatus, CreateComponentRequest, InstatusClient, UpdateComponentRequest,
};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::types::{AttributeChange, ImportedResource, PlanResult};
use crate::validation;

/// Resource type name registered with the host.
pub const RESOURCE_TYPE: &str = "instatus_component";

/// Persisted state of one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentState {
    /// Server-assigned identifier, absent until created.
    #[serde(default)]
    pub id: Option<String>,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Status wire name.
    #[serde(default = "default_status")]
    pub status: String,
    /// Whether uptime is shown on the page.
    #[serde(default = "default_true")]
    pub show_uptime: bool,
    /// Position on the page, absent until known.
    #[serde(default)]
    pub order: Option<i64>,
    /// Whether the component sits in a group.
    #[serde(default)]
    pub grouped: bool,
    /// Parent group ID.
    #[serde(default)]
    pub group_id: Option<String>,
    /// Parent group name, filled in on read.
    #[serde(default)]
    pub group_name: Option<String>,
    /// Whether the component is archived.
    #[serde(default)]
    pub archived: bool,
    /// Email address that updates the component by mail.
    #[serde(default)]
    pub unique_email: Option<String>,
}

fn default_status() -> String {
    ComponentStatus::default().as_str().to_string()
}

fn default_true() -> bool {
    true
}

impl ComponentState {
    /// Decode a state or config document, applying schema defaults first.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        let value = schema().apply_defaults(value);
        let mut state: ComponentState = serde_json::from_value(value)
            .map_err(|e| ProviderError::Validation(format!("invalid component state: {}", e)))?;
        state.group_id = state.group_id.filter(|id| !id.is_empty());
        state.id = state.id.filter(|id| !id.is_empty());
        Ok(state)
    }

    /// Encode as a state document.
    pub fn into_value(self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Build state from an API component. `grouped` is carried over because
    /// the API does not return it.
    pub fn from_component(component: Component, grouped: bool) -> Self {
        Self {
            id: Some(component.id),
            name: component.name,
            description: component.description,
            status: component.status,
            show_uptime: component.show_uptime,
            order: Some(component.order),
            grouped,
            group_id: component.group_id,
            group_name: component.group_name,
            archived: component.archived,
            unique_email: component.unique_email,
        }
    }

    fn require_id(&self) -> Result<&str, ProviderError> {
        self.id
            .as_deref()
            .ok_or_else(|| ProviderError::Validation("component state has no id".to_string()))
    }

    /// Body for the create call.
    pub fn to_create_request(&self) -> CreateComponentRequest {
        CreateComponentRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
            show_uptime: self.show_uptime,
            order: self.order.filter(|order| *order != 0),
            grouped: self.grouped,
            group_id: self.group_id.clone(),
            archived: self.archived,
        }
    }

    /// Body for the update call, given the state being replaced.
    pub fn to_update_request(&self, prior: &ComponentState) -> UpdateComponentRequest {
        let order = if self.order != prior.order {
            self.order
        } else {
            None
        };

        UpdateComponentRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
            show_uptime: self.show_uptime,
            order,
            grouped: self.group_id.is_some(),
            group_id: self.group_id.clone(),
            archived: self.archived,
        }
    }
}

/// Resource schema for `instatus_component`.
pub fn schema() -> Schema {
    let statuses = ComponentStatus::ALL.map(|s| s.as_str()).join(", ");

    Schema::v0()
        .with_description("A component on an Instatus status page.")
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("The ID of the component"),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("The name of the component"),
        )
        .with_attribute(
            "description",
            Attribute::optional_string()
                .with_description("The description of the component")
                .with_default(json!("")),
        )
        .with_attribute(
            "status",
            Attribute::optional_string()
                .with_description(format!("The status of the component ({})", statuses))
                .with_default(json!(ComponentStatus::default().as_str())),
        )
        .with_attribute(
            "show_uptime",
            Attribute::optional_bool()
                .with_description("Whether to show uptime for this component")
                .with_default(json!(true)),
        )
        .with_attribute(
            "order",
            Attribute::optional_computed_int64()
                .with_description("The display order of the component"),
        )
        .with_attribute(
            "grouped",
            Attribute::optional_bool()
                .with_description("Whether this component is part of a group")
                .with_default(json!(false)),
        )
        .with_attribute(
            "group_id",
            Attribute::optional_string()
                .with_description("The ID of the parent group (if grouped is true)"),
        )
        .with_attribute(
            "group_name",
            Attribute::computed_string().with_description("The name of the parent group"),
        )
        .with_attribute(
            "archived",
            Attribute::optional_bool()
                .with_description("Whether the component is archived")
                .with_default(json!(false)),
        )
        .with_attribute(
            "unique_email",
            Attribute::computed_string()
                .with_description("Email address that updates this component's status"),
        )
}

/// Validate a component configuration.
pub fn validate(config: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = validation::validate(&schema(), config);

    if let Some(status) = config.get("status").and_then(Value::as_str) {
        if ComponentStatus::parse(status).is_none() {
            let allowed: Vec<_> = ComponentStatus::ALL.iter().map(|s| s.as_str()).collect();
            diagnostics.push(
                Diagnostic::error(format!("Invalid component status '{}'", status))
                    .with_detail(format!("Expected one of: {}", allowed.join(", ")))
                    .with_attribute("status"),
            );
        }
    }

    diagnostics
}

/// Plan the transition from `prior` to `proposed`.
///
/// Computed values the host cannot know (`id`, `unique_email`, `group_name`
/// and an unset `order`) are carried forward from prior state. Components are
/// always updated in place.
pub fn plan(prior: Option<&Value>, proposed: Value) -> Result<PlanResult, ProviderError> {
    if proposed.is_null() {
        let changes = AttributeChange::diff(prior, &Value::Null);
        return Ok(PlanResult::destroy(changes));
    }

    let mut planned = ComponentState::from_value(proposed)?;
    let prior = prior
        .map(|value| ComponentState::from_value(value.clone()))
        .transpose()?;

    match &prior {
        Some(prior_state) => {
            planned.id = prior_state.id.clone();
            planned.unique_email = prior_state.unique_email.clone();
            if planned.order.is_none() {
                planned.order = prior_state.order;
            }
            planned.group_name = if planned.group_id == prior_state.group_id {
                prior_state.group_name.clone()
            } else {
                None
            };
        },
        None => {
            planned.id = None;
            planned.unique_email = None;
            planned.group_name = None;
        },
    }

    // Diff against the normalized prior so defaults do not show up as changes.
    let prior = prior.map(ComponentState::into_value).transpose()?;
    let planned = planned.into_value()?;
    let changes = AttributeChange::diff(prior.as_ref(), &planned);
    Ok(PlanResult::in_place(planned, changes))
}

/// Create the component, then read it back.
pub async fn create(client: &InstatusClient, planned: Value) -> Result<Value, ProviderError> {
    let planned = ComponentState::from_value(planned)?;

    let created = client
        .create_component(&planned.to_create_request())
        .await
        .map_err(|e| ProviderError::from_api("error creating component", e))?;

    if created.id.is_empty() {
        return Err(ProviderError::Sdk(
            "error creating component: API returned no component ID".to_string(),
        ));
    }
    info!(
        page_id = %client.page_id(),
        component_id = %created.id,
        name = %created.name,
        "Created component"
    );

    refresh(client, &created.id, planned.grouped).await
}

/// Refresh state from the API.
pub async fn read(client: &InstatusClient, current: Value) -> Result<Value, ProviderError> {
    let current = ComponentState::from_value(current)?;
    let id = current.require_id()?;
    refresh(client, id, current.grouped).await
}

/// Update the component in place, then read it back.
pub async fn update(
    client: &InstatusClient,
    prior: Value,
    planned: Value,
) -> Result<Value, ProviderError> {
    let prior = ComponentState::from_value(prior)?;
    let planned = ComponentState::from_value(planned)?;
    let id = prior.require_id()?;

    let request = planned.to_update_request(&prior);
    debug!(component_id = %id, sends_order = request.order.is_some(), "Updating component");

    client
        .update_component(id, &request)
        .await
        .map_err(|e| ProviderError::from_api("error updating component", e))?;
    info!(component_id = %id, "Updated component");

    refresh(client, id, request.grouped).await
}

/// Delete the component.
pub async fn delete(client: &InstatusClient, current: Value) -> Result<(), ProviderError> {
    let current = ComponentState::from_value(current)?;
    let id = current.require_id()?;

    client
        .delete_component(id)
        .await
        .map_err(|e| ProviderError::from_api("error deleting component", e))?;
    info!(component_id = %id, "Deleted component");

    Ok(())
}

/// Import an existing component by ID.
pub async fn import(client: &InstatusClient, id: &str) -> Result<ImportedResource, ProviderError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ProviderError::InvalidRequest(
            "import requires a component ID".to_string(),
        ));
    }

    let component = client
        .get_component(id)
        .await
        .map_err(|e| ProviderError::from_api("error reading component", e))?;
    let grouped = component.group_id.is_some();

    let state = ComponentState::from_component(component, grouped).into_value()?;
    Ok(ImportedResource::new(RESOURCE_TYPE, state))
}

async fn refresh(client: &InstatusClient, id: &str, grouped: bool) -> Result<Value, ProviderError> {
    let component = client
        .get_component(id)
        .await
        .map_err(|e| ProviderError::from_api("error reading component", e))?;
    ComponentState::from_component(component, grouped).into_value()
}
