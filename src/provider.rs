//! Provider registration for Instatus.
//!
//! [`InstatusProvider`] implements [`ProviderService`]: it declares the provider
//! configuration schema, builds an [`InstatusClient`] on `configure`, and routes
//! resource operations to the [`component`](crate::component) adapter.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::{ClientConfig, InstatusClient, DEFAULT_BASE_URL};
use crate::component::{self, RESOURCE_TYPE};
use crate::error::ProviderError;
use crate::schema::{has_errors, Attribute, Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities};
use crate::validation;

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "INSTATUS_API_KEY";
/// Environment variable holding the status page ID.
pub const ENV_PAGE_ID: &str = "INSTATUS_PAGE_ID";
/// Environment variable overriding the API base URL.
pub const ENV_ENDPOINT: &str = "INSTATUS_ENDPOINT";

/// Resolved provider configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Instatus API key.
    pub api_key: String,
    /// Status page ID.
    pub page_id: String,
    /// API base URL.
    pub endpoint: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("page_id", &self.page_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve configuration from the provider block, falling back to `env`.
    ///
    /// Explicit values win over the environment; empty strings count as unset.
    /// All problems are reported at once as error diagnostics.
    ///
    /// ```
    /// use hemmer_provider_instatus::provider::ProviderConfig;
    /// use serde_json::json;
    ///
    /// let env = |name: &str| (name == "INSTATUS_API_KEY").then(|| "from-env".to_string());
    /// let config = ProviderConfig::resolve(&json!({"page_id": "page-1"}), env).unwrap();
    /// assert_eq!(config.api_key, "from-env");
    /// assert_eq!(config.endpoint, "https://api.instatus.com");
    ///
    /// let diagnostics = ProviderConfig::resolve(&json!({}), |_| None).unwrap_err();
    /// assert_eq!(diagnostics.len(), 2);
    /// ```
    pub fn resolve<F>(config: &Value, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str, var: &str| {
            config
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .filter(|v| !v.is_empty())
                .or_else(|| env(var).filter(|v| !v.is_empty()))
        };

        let api_key = lookup("api_key", ENV_API_KEY);
        let page_id = lookup("page_id", ENV_PAGE_ID);
        let endpoint = lookup("endpoint", ENV_ENDPOINT);

        let mut diagnostics = Vec::new();
        if api_key.is_none() {
            diagnostics.push(
                Diagnostic::error("Missing API Key")
                    .with_detail(format!(
                        "The provider cannot create the Instatus API client as there is a missing or empty value for the Instatus API key. \
                         Set the api_key value in the configuration or use the {} environment variable.",
                        ENV_API_KEY
                    ))
                    .with_attribute("api_key"),
            );
        }
        if page_id.is_none() {
            diagnostics.push(
                Diagnostic::error("Missing Page ID")
                    .with_detail(format!(
                        "The provider cannot create the Instatus API client as there is a missing or empty value for the Instatus page ID. \
                         Set the page_id value in the configuration or use the {} environment variable.",
                        ENV_PAGE_ID
                    ))
                    .with_attribute("page_id"),
            );
        }

        match (api_key, page_id) {
            (Some(api_key), Some(page_id)) => Ok(Self {
                api_key,
                page_id,
                endpoint: endpoint.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            }),
            _ => Err(diagnostics),
        }
    }

    /// Client settings for this configuration.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.api_key, &self.page_id).with_base_url(&self.endpoint)
    }
}

/// Provider configuration schema.
pub fn provider_schema() -> Schema {
    Schema::v0()
        .with_description("Manage Instatus status pages.")
        .with_attribute(
            "api_key",
            Attribute::optional_string()
                .sensitive()
                .with_description(format!(
                    "Instatus API key. Can also be set with the {} environment variable.",
                    ENV_API_KEY
                )),
        )
        .with_attribute(
            "page_id",
            Attribute::optional_string().with_description(format!(
                "Instatus status page ID. Can also be set with the {} environment variable.",
                ENV_PAGE_ID
            )),
        )
        .with_attribute(
            "endpoint",
            Attribute::optional_string().with_description(format!(
                "Instatus API base URL. Defaults to {}; can also be set with the {} environment variable.",
                DEFAULT_BASE_URL, ENV_ENDPOINT
            )),
        )
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// The Instatus provider.
pub struct InstatusProvider {
    client: RwLock<Option<Arc<InstatusClient>>>,
    env: EnvLookup,
}

impl InstatusProvider {
    /// A provider that falls back to the process environment.
    pub fn new() -> Self {
        Self::with_env(|var| std::env::var(var).ok())
    }

    /// A provider with a custom environment lookup.
    pub fn with_env<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            client: RwLock::new(None),
            env: Arc::new(env),
        }
    }

    /// Whether `configure` has succeeded.
    pub async fn is_configured(&self) -> bool {
        self.client.read().await.is_some()
    }

    async fn client(&self) -> Result<Arc<InstatusClient>, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration(
                "provider is not configured; call Configure before managing resources"
                    .to_string(),
            )
        })
    }

    /// Type-check `config` and resolve it against the environment.
    ///
    /// A value of the wrong type is reported once, as a type error, rather
    /// than again as missing.
    fn check_config(&self, config: &Value) -> Result<ProviderConfig, Vec<Diagnostic>> {
        let mut diagnostics = validation::validate(&provider_schema(), config);
        match ProviderConfig::resolve(config, self.env.as_ref()) {
            Ok(resolved) if !has_errors(&diagnostics) => Ok(resolved),
            Ok(_) => Err(diagnostics),
            Err(missing) => {
                let flagged: Vec<Option<String>> =
                    diagnostics.iter().map(|d| d.attribute.clone()).collect();
                diagnostics.extend(missing.into_iter().filter(|d| !flagged.contains(&d.attribute)));
                Err(diagnostics)
            },
        }
    }

    fn check_resource_type(resource_type: &str) -> Result<(), ProviderError> {
        if resource_type == RESOURCE_TYPE {
            Ok(())
        } else {
            Err(ProviderError::UnknownResource(resource_type.to_string()))
        }
    }
}

impl Default for InstatusProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProviderService for InstatusProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(provider_schema())
            .with_resource(RESOURCE_TYPE, component::schema())
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: vec![RESOURCE_TYPE.to_string()],
            capabilities: ServerCapabilities { plan_destroy: true },
        }
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.check_config(&config).err().unwrap_or_default())
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let resolved = match self.check_config(&config) {
            Ok(resolved) => resolved,
            Err(diagnostics) => {
                warn!(count = diagnostics.len(), "Provider configuration rejected");
                return Ok(diagnostics);
            },
        };

        let client = InstatusClient::new(resolved.client_config()).map_err(|e| {
            ProviderError::from_api("error creating Instatus client", e)
        })?;

        info!(page_id = %resolved.page_id, endpoint = %resolved.endpoint, "Configured Instatus provider");
        *self.client.write().await = Some(Arc::new(client));
        Ok(vec![])
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        debug!("Releasing Instatus client");
        self.client.write().await.take();
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Self::check_resource_type(resource_type)?;
        Ok(component::validate(&config))
    }

    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        Self::check_resource_type(resource_type)?;
        if version > 0 {
            return Err(ProviderError::FailedPrecondition(format!(
                "state version {} is newer than this provider supports (0)",
                version
            )));
        }
        Ok(state)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        Self::check_resource_type(resource_type)?;
        component::plan(prior_state.as_ref(), proposed_state)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        Self::check_resource_type(resource_type)?;
        let client = self.client().await?;
        component::create(&client, planned_state).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        Self::check_resource_type(resource_type)?;
        let client = self.client().await?;
        component::read(&client, current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        Self::check_resource_type(resource_type)?;
        let client = self.client().await?;
        component::update(&client, prior_state, planned_state).await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        Self::check_resource_type(resource_type)?;
        let client = self.client().await?;
        component::delete(&client, current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Self::check_resource_type(resource_type)?;
        let client = self.client().await?;
        Ok(vec![component::import(&client, id).await?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn example_config(api_key: &str, page_id: &str) -> Value {
        json!({ "api_key": api_key, "page_id": page_id })
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_resolve_explicit_wins() {
        let env = env_from(&[(ENV_API_KEY, "env-key"), (ENV_PAGE_ID, "env-page")]);
        let config = ProviderConfig::resolve(&example_config("cfg-key", "cfg-page"), env).unwrap();

        assert_eq!(config.api_key, "cfg-key");
        assert_eq!(config.page_id, "cfg-page");
        assert_eq!(config.endpoint, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_resolve_env_fallback_and_empty_strings() {
        let env = env_from(&[
            (ENV_API_KEY, "env-key"),
            (ENV_PAGE_ID, "env-page"),
            (ENV_ENDPOINT, "http://localhost:9000"),
        ]);
        let config = ProviderConfig::resolve(&example_config("", ""), env).unwrap();

        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.page_id, "env-page");
        assert_eq!(config.endpoint, "http://localhost:9000");
    }

    #[test]
    fn test_resolve_reports_each_missing_value() {
        let diagnostics =
            ProviderConfig::resolve(&json!({"api_key": "k"}), env_from(&[])).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Missing Page ID");
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .unwrap_or_default()
            .contains(ENV_PAGE_ID));

        let diagnostics = ProviderConfig::resolve(&json!({}), env_from(&[])).unwrap_err();
        let summaries: Vec<_> = diagnostics.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["Missing API Key", "Missing Page ID"]);
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let config =
            ProviderConfig::resolve(&example_config("super-secret", "page-1"), env_from(&[]))
                .unwrap();
        assert!(!format!("{:?}", config).contains("super-secret"));
    }

    #[test]
    fn test_schema_registers_one_resource() {
        let provider = InstatusProvider::with_env(|_| None);
        let schema = provider.schema();

        assert_eq!(schema.resources.len(), 1);
        assert!(schema.resources.contains_key(RESOURCE_TYPE));
        assert!(schema.provider.attribute("api_key").unwrap().flags.sensitive);
        assert_eq!(provider.metadata().resources, vec![RESOURCE_TYPE.to_string()]);
    }

    #[tokio::test]
    async fn test_metadata_advertises_destroy_plans() {
        let provider = InstatusProvider::with_env(|_| None);
        assert!(provider.metadata().capabilities.plan_destroy);

        let plan = provider
            .plan(
                RESOURCE_TYPE,
                Some(json!({"id": "cmp-1", "name": "API"})),
                Value::Null,
                Value::Null,
            )
            .await
            .unwrap();
        assert!(plan.is_destroy());
    }

    #[tokio::test]
    async fn test_configure_rejects_wrong_types() {
        let provider = InstatusProvider::with_env(|_| None);
        let diagnostics = provider
            .configure(json!({"api_key": 123, "page_id": "page-1"}))
            .await
            .unwrap();

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid type for attribute 'api_key'");
        assert_eq!(diagnostics[0].detail.as_deref(), Some("Expected string, got number"));
        assert!(!provider.is_configured().await);

        let env_backed = InstatusProvider::with_env(|var| {
            (var == ENV_API_KEY).then(|| "env-key".to_string())
        });
        let diagnostics = env_backed
            .configure(json!({"api_key": 123, "page_id": "page-1"}))
            .await
            .unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(!env_backed.is_configured().await);

        let diagnostics = provider
            .validate_provider_config(json!({"page_id": false}))
            .await
            .unwrap();
        let summaries: Vec<_> = diagnostics.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(
            summaries,
            vec!["Invalid type for attribute 'page_id'", "Missing API Key"]
        );
    }

    #[tokio::test]
    async fn test_configure_missing_values() {
        let provider = InstatusProvider::with_env(|_| None);
        let diagnostics = provider.configure(json!({})).await.unwrap();

        assert_eq!(diagnostics.len(), 2);
        assert!(!provider.is_configured().await);
    }

    #[tokio::test]
    async fn test_unconfigured_operations_fail() {
        let provider = InstatusProvider::with_env(|_| None);
        let err = provider
            .read(RESOURCE_TYPE, json!({"id": "cmp-1", "name": "API"}))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let provider = InstatusProvider::with_env(|_| None);
        let err = provider
            .plan("instatus_incident", None, json!({}), json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::UnknownResource(ref t) if t == "instatus_incident"));
    }

    #[tokio::test]
    async fn test_configure_and_stop() {
        let provider = InstatusProvider::with_env(|_| None);
        let diagnostics = provider
            .configure(example_config("key", "page-1"))
            .await
            .unwrap();

        assert!(diagnostics.is_empty());
        assert!(provider.is_configured().await);

        provider.stop().await.unwrap();
        assert!(!provider.is_configured().await);
    }

    #[tokio::test]
    async fn test_upgrade_state_versions() {
        let provider = InstatusProvider::with_env(|_| None);
        let state = json!({"id": "cmp-1", "name": "API"});

        let upgraded = provider
            .upgrade_resource_state(RESOURCE_TYPE, 0, state.clone())
            .await
            .unwrap();
        assert_eq!(upgraded, state);

        let err = provider
            .upgrade_resource_state(RESOURCE_TYPE, 1, state)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::FailedPrecondition(_)));
    }
}
