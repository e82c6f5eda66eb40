//! Council configuration: provider endpoint, credentials, storage, and the
//! debate engine settings.
//!
//! Resolution order, later wins: built-in defaults, TOML file, environment,
//! command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use prd_coordination::DebateConfig;
use serde::{Deserialize, Serialize};

pub const CONFIG_PATH_VAR: &str = "PRD_COUNCIL_CONFIG";

/// Which wire protocol the advisor backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// OpenAI-compatible `/v1/chat/completions` (also vLLM, llama.cpp, proxies)
    #[default]
    Openai,
    /// Anthropic `/v1/messages`
    Anthropic,
}

impl Provider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Openai => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Openai => "gpt-4o-mini",
            Self::Anthropic => "claude-sonnet-4-20250514",
        }
    }

    /// Provider-specific API key variable, consulted when
    /// `PRD_COUNCIL_API_KEY` is unset.
    pub fn key_var(self) -> &'static str {
        match self {
            Self::Openai => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Openai => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "openai_compatible" | "chat_completions" => Ok(Self::Openai),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Top-level council configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouncilConfig {
    pub provider: Provider,
    /// Endpoint root without the API path (None = provider default).
    pub base_url: Option<String>,
    /// Model name sent in each request (None = provider default).
    pub model: Option<String>,
    /// Never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Directory holding one JSON file per session.
    pub sessions_dir: PathBuf,
    pub debate: DebateConfig,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            base_url: None,
            model: None,
            api_key: None,
            timeout_secs: 120,
            max_tokens: 2048,
            temperature: 0.7,
            sessions_dir: PathBuf::from("data/debates"),
            debate: DebateConfig::default(),
        }
    }
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub provider: Option<Provider>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub sessions_dir: Option<PathBuf>,
}

impl CouncilConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("invalid council config")
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), provider = %config.provider, "config file loaded");
        Ok(config)
    }

    /// Full resolution against the process environment.
    pub fn resolve(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        Self::resolve_with(config_path, overrides, |key| std::env::var(key).ok())
    }

    /// Resolution with an injectable environment lookup.
    pub fn resolve_with(
        config_path: Option<&Path>,
        overrides: &ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file = config_path
            .map(Path::to_path_buf)
            .or_else(|| env(CONFIG_PATH_VAR).map(PathBuf::from));
        let mut config = match file {
            Some(path) => Self::load_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(&env)?;
        config.apply_overrides(overrides);
        if config.api_key.is_none() {
            config.api_key = non_empty(env(config.provider.key_var()));
        }
        Ok(config)
    }

    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(provider) = non_empty(env("PRD_COUNCIL_PROVIDER")) {
            self.provider = provider
                .parse()
                .map_err(anyhow::Error::msg)
                .context("PRD_COUNCIL_PROVIDER")?;
        }
        if let Some(url) = non_empty(env("PRD_COUNCIL_BASE_URL")) {
            self.base_url = Some(url);
        }
        if let Some(model) = non_empty(env("PRD_COUNCIL_MODEL")) {
            self.model = Some(model);
        }
        if let Some(key) = non_empty(env("PRD_COUNCIL_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(dir) = non_empty(env("PRD_COUNCIL_SESSIONS_DIR")) {
            self.sessions_dir = PathBuf::from(dir);
        }
        if let Some(secs) = non_empty(env("PRD_COUNCIL_TIMEOUT_SECS")) {
            self.timeout_secs = secs
                .parse()
                .with_context(|| format!("PRD_COUNCIL_TIMEOUT_SECS is not a number: {secs}"))?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(provider) = overrides.provider {
            self.provider = provider;
        }
        if let Some(url) = &overrides.base_url {
            self.base_url = Some(url.clone());
        }
        if let Some(model) = &overrides.model {
            self.model = Some(model.clone());
        }
        if let Some(secs) = overrides.timeout_secs {
            self.timeout_secs = secs;
        }
        if let Some(dir) = &overrides.sessions_dir {
            self.sessions_dir = dir.clone();
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(self.provider.default_base_url())
            .trim_end_matches('/')
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or(self.provider.default_model())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prd_coordination::debate::{OpeningMode, StabilityMode};
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CouncilConfig::default();
        assert_eq!(config.provider, Provider::Openai);
        assert_eq!(config.base_url(), "https://api.openai.com");
        assert_eq!(config.model(), "gpt-4o-mini");
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert_eq!(config.debate, DebateConfig::default());
    }

    #[test]
    fn test_toml_file_sets_debate_settings() {
        let config = CouncilConfig::from_toml_str(
            r#"
provider = "anthropic"
model = "claude-opus"
sessions_dir = "/var/lib/prd"

[debate]
opening_mode = "fan_out"
history_window = 3

[debate.stability]
policy = "coverage"
min_populated_sections = 4

[debate.guardrails]
max_stalled_rounds = 5
"#,
        )
        .unwrap();

        assert_eq!(config.provider, Provider::Anthropic);
        assert_eq!(config.base_url(), "https://api.anthropic.com");
        assert_eq!(config.model(), "claude-opus");
        assert_eq!(config.sessions_dir, PathBuf::from("/var/lib/prd"));
        assert_eq!(config.debate.opening_mode, OpeningMode::FanOut);
        assert_eq!(config.debate.history_window, 3);
        assert_eq!(
            config.debate.stability,
            StabilityMode::Coverage {
                min_populated_sections: 4
            }
        );
        assert_eq!(config.debate.guardrails.max_stalled_rounds, 5);
        assert_eq!(config.debate.guardrails.max_rounds, Some(10));
    }

    #[test]
    fn test_env_overrides_file_and_cli_overrides_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("council.toml");
        std::fs::write(&path, "model = \"from-file\"\ntimeout_secs = 30\n").unwrap();

        let env = env_of(&[
            ("PRD_COUNCIL_MODEL", "from-env"),
            ("PRD_COUNCIL_TIMEOUT_SECS", "45"),
            ("PRD_COUNCIL_BASE_URL", "http://localhost:8080/"),
        ]);
        let overrides = ConfigOverrides {
            model: Some("from-cli".into()),
            ..ConfigOverrides::default()
        };
        let config = CouncilConfig::resolve_with(Some(&path), &overrides, env).unwrap();

        assert_eq!(config.model(), "from-cli");
        assert_eq!(config.timeout_secs, 45);
        assert_eq!(config.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_config_path_from_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("council.toml");
        std::fs::write(&path, "provider = \"anthropic\"\n").unwrap();

        let env = env_of(&[(CONFIG_PATH_VAR, path.to_str().unwrap())]);
        let config = CouncilConfig::resolve_with(None, &ConfigOverrides::default(), env).unwrap();
        assert_eq!(config.provider, Provider::Anthropic);
    }

    #[test]
    fn test_api_key_precedence() {
        let env = env_of(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
        ]);
        let config = CouncilConfig::resolve_with(None, &ConfigOverrides::default(), &env).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-openai"));

        let overrides = ConfigOverrides {
            provider: Some(Provider::Anthropic),
            ..ConfigOverrides::default()
        };
        let config = CouncilConfig::resolve_with(None, &overrides, &env).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-ant"));

        let env = env_of(&[("PRD_COUNCIL_API_KEY", "sk-council"), ("OPENAI_API_KEY", "sk-openai")]);
        let config = CouncilConfig::resolve_with(None, &ConfigOverrides::default(), env).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-council"));
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        let env = env_of(&[("PRD_COUNCIL_TIMEOUT_SECS", "soon")]);
        assert!(CouncilConfig::resolve_with(None, &ConfigOverrides::default(), env).is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let result = CouncilConfig::resolve_with(
            Some(Path::new("/nonexistent/council.toml")),
            &ConfigOverrides::default(),
            |_| None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let config = CouncilConfig {
            api_key: Some("secret".into()),
            ..CouncilConfig::default()
        };
        let raw = serde_json::to_string(&config).unwrap();
        assert!(!raw.contains("secret"));
    }
}
