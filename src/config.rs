//! Configuration management for agentroute
//!
//! Parses TOML configuration files and provides typed access to settings.

use crate::catalog::{Product, ProductCatalog};
use crate::error::{AppError, AppResult};
use crate::router::{Agent, AgentRegistry};
use crate::session::DEFAULT_MAX_SESSIONS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Upper bound for `llm.timeout_seconds`
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub personality: PersonalityConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Agent registry override; built-in registry when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    agents: Option<Vec<Agent>>,
    /// Product catalog override; built-in catalog when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    products: Option<Vec<Product>>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Live chat sessions kept before the least recently used is evicted
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

/// Completion API configuration
///
/// Fields are private; values are checked by [`Config::validate`] and cannot
/// be mutated afterwards.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default = "default_model")]
    model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    api_key_env: String,
    #[serde(default = "default_llm_timeout")]
    timeout_seconds: u64,
}

impl LlmConfig {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_key_env(&self) -> &str {
        &self.api_key_env
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> AppResult<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(AppError::MissingCredential {
                var: self.api_key_env.clone(),
            }),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_seconds: default_llm_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_llm_timeout() -> u64 {
    30
}

/// Routing configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RoutingConfig {
    /// Show the matched product's details instead of the canned sales text
    /// when a product name forced the sales agent
    #[serde(default)]
    pub substitute_product_detail: bool,
}

/// Personality generator configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PersonalityConfig {
    /// Model override; `llm.model` when absent
    #[serde(default)]
    pub model: Option<String>,
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()` and `from_str()`; call it explicitly when
    /// constructing Config via other means (e.g., in tests).
    pub fn validate(&self) -> AppResult<()> {
        if self.server.max_sessions == 0 {
            return Err(AppError::Config(
                "server.max_sessions must be at least 1".to_string(),
            ));
        }

        let base_url = self.llm.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "llm.base_url must start with http:// or https:// (got '{}')",
                self.llm.base_url
            )));
        }

        if self.llm.model.trim().is_empty() {
            return Err(AppError::Config("llm.model cannot be empty".to_string()));
        }

        if self.llm.api_key_env.trim().is_empty() {
            return Err(AppError::Config(
                "llm.api_key_env cannot be empty".to_string(),
            ));
        }

        if self.llm.timeout_seconds == 0 || self.llm.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "llm.timeout_seconds must be between 1 and {} (got {})",
                MAX_TIMEOUT_SECONDS, self.llm.timeout_seconds
            )));
        }

        if let Some(model) = &self.personality.model
            && model.trim().is_empty()
        {
            return Err(AppError::Config(
                "personality.model cannot be empty when set".to_string(),
            ));
        }

        // Registry and catalog constructors carry their own invariants
        self.agent_registry()?;
        self.product_catalog()?;

        Ok(())
    }

    /// Agent registry for a new session
    pub fn agent_registry(&self) -> AppResult<AgentRegistry> {
        match &self.agents {
            Some(agents) => AgentRegistry::new(agents.clone()),
            None => Ok(AgentRegistry::builtin()),
        }
    }

    /// Product catalog shared by all sessions
    pub fn product_catalog(&self) -> AppResult<ProductCatalog> {
        match &self.products {
            Some(products) => ProductCatalog::new(products.clone()),
            None => Ok(ProductCatalog::builtin()),
        }
    }

    /// Model used by the personality generator
    pub fn personality_model(&self) -> &str {
        self.personality
            .model
            .as_deref()
            .unwrap_or(self.llm.model())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            routing: RoutingConfig::default(),
            personality: PersonalityConfig::default(),
            observability: ObservabilityConfig::default(),
            agents: None,
            products: None,
        }
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        // Validate config before returning
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CONFIG: &str = r#"
[server]
host = "0.0.0.0"
port = 8080

[llm]
base_url = "http://localhost:1234/v1"
model = "gpt-4o-mini"
api_key_env = "TEST_AGENTROUTE_KEY"
timeout_seconds = 10

[routing]
substitute_product_detail = true

[personality]
model = "gpt-4o"

[observability]
log_level = "debug"
"#;

    #[test]
    fn test_config_from_str_parses_successfully() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.base_url(), "http://localhost:1234/v1");
        assert_eq!(config.llm.model(), "gpt-4o-mini");
        assert_eq!(config.llm.api_key_env(), "TEST_AGENTROUTE_KEY");
        assert_eq!(config.llm.timeout_seconds(), 10);
        assert!(config.routing.substitute_product_detail);
        assert_eq!(config.personality_model(), "gpt-4o");
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_str("[llm]\n").expect("should parse minimal config");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.llm.base_url(), "https://api.openai.com/v1");
        assert_eq!(config.llm.model(), "gpt-3.5-turbo");
        assert_eq!(config.llm.api_key_env(), "OPENAI_API_KEY");
        assert_eq!(config.llm.timeout_seconds(), 30);
        assert!(!config.routing.substitute_product_detail);
        assert_eq!(config.personality_model(), "gpt-3.5-turbo");
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_missing_llm_section_fails() {
        assert!(matches!(
            Config::from_str("[server]\nport = 3000\n"),
            Err(AppError::ConfigParseFailed { .. })
        ));
    }

    #[test]
    fn test_builtin_registry_and_catalog_when_not_overridden() {
        let config = Config::default();
        assert_eq!(
            config.agent_registry().unwrap(),
            AgentRegistry::builtin()
        );
        assert_eq!(
            config.product_catalog().unwrap(),
            ProductCatalog::builtin()
        );
    }

    #[test]
    fn test_agents_override() {
        let config = Config::from_str(
            r#"
[llm]

[[agents]]
key = "default"
description = "Fallback"
content = "Hi"

[[agents]]
key = "sales"
description = "Sales"
content = "Buy things"

[[agents]]
key = "billing"
description = "Invoices and refunds"
content = "Billing here"
"#,
        )
        .expect("should parse agent override");

        let registry = config.agent_registry().unwrap();
        let keys: Vec<_> = registry.keys().collect();
        assert_eq!(keys, ["default", "sales", "billing"]);
    }

    #[test]
    fn test_agents_override_without_default_fails() {
        let result = Config::from_str(
            r#"
[llm]

[[agents]]
key = "sales"
description = "Sales"
content = "Buy things"
"#,
        );
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("'default'"));
    }

    #[test]
    fn test_products_override() {
        let config = Config::from_str(
            r#"
[llm]

[[products]]
name = "Widget 9000"
price = "$99"
features = ["Shiny", "Loud"]
link = "https://example.com/widget"

[products.competitor]
name = "Gadget X"
price = "$120"
comparison = "Widget is cheaper."
"#,
        )
        .expect("should parse product override");

        let catalog = config.product_catalog().unwrap();
        assert_eq!(catalog.len(), 1);
        let product = catalog.find("do you sell the WIDGET 9000?").unwrap();
        assert_eq!(product.price(), "$99");
        assert_eq!(product.competitor().name(), "Gadget X");
    }

    #[test]
    fn test_invalid_base_url_fails() {
        let err = Config::from_str("[llm]\nbase_url = \"api.openai.com/v1\"\n").unwrap_err();
        assert!(err.to_string().contains("llm.base_url"));
    }

    #[test]
    fn test_max_sessions_defaults_and_rejects_zero() {
        let config = Config::from_str("[llm]\n").unwrap();
        assert_eq!(config.server.max_sessions, DEFAULT_MAX_SESSIONS);

        let config = Config::from_str("[server]\nmax_sessions = 5\n\n[llm]\n").unwrap();
        assert_eq!(config.server.max_sessions, 5);

        let err = Config::from_str("[server]\nmax_sessions = 0\n\n[llm]\n").unwrap_err();
        assert!(err.to_string().contains("server.max_sessions"));
    }

    #[test]
    fn test_zero_timeout_fails() {
        let err = Config::from_str("[llm]\ntimeout_seconds = 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));
    }

    #[test]
    fn test_excessive_timeout_fails() {
        assert!(Config::from_str("[llm]\ntimeout_seconds = 301\n").is_err());
        assert!(Config::from_str("[llm]\ntimeout_seconds = 300\n").is_ok());
    }

    #[test]
    fn test_empty_model_fails() {
        assert!(Config::from_str("[llm]\nmodel = \"  \"\n").is_err());
    }

    #[test]
    fn test_empty_personality_model_fails() {
        assert!(Config::from_str("[llm]\n[personality]\nmodel = \"\"\n").is_err());
    }

    #[test]
    fn test_api_key_missing_variable() {
        let config = Config::from_str(
            "[llm]\napi_key_env = \"AGENTROUTE_TEST_KEY_THAT_IS_NEVER_SET\"\n",
        )
        .unwrap();
        assert!(matches!(
            config.llm.api_key(),
            Err(AppError::MissingCredential { ref var }) if var == "AGENTROUTE_TEST_KEY_THAT_IS_NEVER_SET"
        ));
    }
}
