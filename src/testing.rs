//! Test harness for driving a provider in-process.
//!
//! [`ProviderTester`] calls a [`ProviderService`] the way the host would,
//! minus gRPC. Diagnostics with errors come back as [`TestError::Diagnostics`]
//! so tests can use `?` or `unwrap_err` on configuration steps.
//!
//! ```no_run
//! use hemmer_provider_instatus::testing::ProviderTester;
//! use hemmer_provider_instatus::InstatusProvider;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let tester = ProviderTester::new(InstatusProvider::new());
//! tester
//!     .configure(json!({"api_key": "key", "page_id": "page-1"}))
//!     .await?;
//!
//! let state = tester
//!     .lifecycle_create("instatus_component", json!({"name": "API"}))
//!     .await?;
//! assert_eq!(state["name"], "API");
//! # Ok(())
//! # }
//! ```

use serde_json::Value;
use thiserror::Error;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// Failure of a harness step.
#[derive(Debug, Error)]
pub enum TestError {
    /// The provider answered with error diagnostics.
    #[error("{}", render_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),
    /// The provider returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = format!("{} error diagnostic(s):", diagnostics.len());
    for diag in diagnostics {
        out.push_str("\n  ");
        out.push_str(&diag.summary);
        if let Some(detail) = &diag.detail {
            out.push_str(": ");
            out.push_str(detail);
        }
        if let Some(attr) = &diag.attribute {
            out.push_str(&format!(" (at {})", attr));
        }
    }
    out
}

fn errors_only(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Drives a [`ProviderService`] without a server.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The provider's full schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Registered resource type names, sorted.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Validate a provider block. Warnings are ignored.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        errors_only(self.provider.validate_provider_config(config).await?)
    }

    /// Configure the provider. Warnings are ignored.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        errors_only(self.provider.configure(config).await?)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    /// Validate a resource block. Warnings are ignored.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        errors_only(
            self.provider
                .validate_resource_config(resource_type, config)
                .await?,
        )
    }

    /// Plan a resource that does not exist yet.
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed.clone(), proposed)
            .await
    }

    /// Plan a change to an existing resource.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior: Value,
        proposed: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior), proposed.clone(), proposed)
            .await
    }

    /// Plan removal of an existing resource.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior), Value::Null, Value::Null)
            .await
    }

    /// Create a resource from a planned state.
    pub async fn create(&self, resource_type: &str, planned: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned).await
    }

    /// Refresh a resource.
    pub async fn read(&self, resource_type: &str, current: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current).await
    }

    /// Update a resource in place.
    pub async fn update(
        &self,
        resource_type: &str,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.update(resource_type, prior, planned).await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current).await
    }

    /// Import a resource by its remote ID.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Plan, create, then read back. Returns the read state.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Plan, update, then read back. Returns the read state.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior: Value,
        proposed: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior.clone(), proposed)
            .await?;
        let updated = self.update(resource_type, prior, plan.planned_state).await?;
        self.read(resource_type, updated).await
    }

    /// Plan a destroy, then delete.
    ///
    /// Fails without calling delete if the plan is not a destroy plan.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current: Value,
    ) -> Result<(), ProviderError> {
        let plan = self.plan_delete(resource_type, current.clone()).await?;
        if !plan.is_destroy() {
            return Err(ProviderError::Sdk(format!(
                "plan for deleting {} did not produce a destroy plan",
                resource_type
            )));
        }
        self.delete(resource_type, current).await
    }
}

fn changed_paths(plan: &PlanResult) -> Vec<&str> {
    plan.changes.iter().map(|c| c.path.as_str()).collect()
}

fn error_summaries(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.summary.as_str())
        .collect()
}

/// Panics unless the plan has changes and creates in place.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(!plan.changes.is_empty(), "Expected a create plan, got no changes");
    assert!(!plan.requires_replace, "Expected a create plan, got a replacement");
}

/// Panics if the plan has any change.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, got {:?}",
        changed_paths(plan)
    );
}

/// Panics if the plan has no change.
pub fn assert_plan_has_changes(plan: &PlanResult) {
    assert!(!plan.changes.is_empty(), "Expected changes, got none");
}

/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected an in-place update, got a replacement"
    );
}

/// Panics unless `path` is among the plan's changes.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let paths = changed_paths(plan);
    assert!(
        paths.contains(&path),
        "Expected '{}' to change, changed: {:?}",
        path,
        paths
    );
}

/// Panics if `path` is among the plan's changes.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    assert!(
        !changed_paths(plan).contains(&path),
        "Expected '{}' to stay unchanged",
        path
    );
}

/// Panics if any diagnostic is an error.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors = error_summaries(diagnostics);
    assert!(errors.is_empty(), "Expected no errors, got {:?}", errors);
}

/// Panics unless at least one diagnostic is an error.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    assert!(
        !error_summaries(diagnostics).is_empty(),
        "Expected at least one error, got none"
    );
}

/// Panics unless an error diagnostic's summary contains `substring`.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let errors = error_summaries(diagnostics);
    assert!(
        errors.iter().any(|s| s.contains(substring)),
        "Expected an error containing '{}', got {:?}",
        substring,
        errors
    );
}
