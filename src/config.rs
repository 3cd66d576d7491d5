use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "aging-causes.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input_files: Vec<PathBuf>,
    pub output_file: PathBuf,
    pub llm: LLMConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f64,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LLMProvider {
    OpenAI,
    Ollama,
    Anthropic,
}

impl LLMProvider {
    /// Environment variable holding the provider's API key, if it needs one.
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            LLMProvider::OpenAI => Some("OPENAI_API_KEY"),
            LLMProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LLMProvider::Ollama => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_files: vec![
                PathBuf::from("Data/Email Thread #1.txt"),
                PathBuf::from("Data/Email Thread #2.txt"),
            ],
            output_file: PathBuf::from("causesofaging.md"),
            llm: LLMConfig::default(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::OpenAI,
            api_key: None,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 10_000,
            temperature: 0.3,
            timeout_seconds: None,
        }
    }
}

impl Config {
    /// Load `./aging-causes.toml` if present, otherwise the built-in defaults.
    pub fn load() -> crate::Result<Self> {
        let config_path = PathBuf::from(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            println!("📝 Loading configuration from: {}", config_path.display());
            return Self::from_file(&config_path);
        }

        println!("ℹ️  No config file found at {}, using defaults", config_path.display());
        println!("💡 Run 'aging-causes config' to create a default configuration file");
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Load config from a specific file path
    pub fn from_file(path: &PathBuf) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    /// Fill the API key from the environment when the file leaves it unset.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|var| env::var(var).ok());
    }

    /// [`Config::apply_env`] with an explicit variable lookup. Blank values
    /// count as unset.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = self
                .llm
                .provider
                .api_key_var()
                .and_then(|var| lookup(var))
                .filter(|key| !key.trim().is_empty());
        }
    }

    /// Create a config file with all available options documented
    pub fn create_documented_config() -> String {
        r#"# aging-causes configuration file
# Controls which email threads are analyzed and how the LLM is called

# Email thread files, processed in this order
input_files = [
    "Data/Email Thread #1.txt",
    "Data/Email Thread #2.txt",
]

# Markdown table destination (overwritten on every successful run)
output_file = "causesofaging.md"

[llm]
# LLM Provider: "OpenAI", "Ollama", or "Anthropic"
provider = "OpenAI"

# API key for the provider (can also be set via environment variables or .env)
# OpenAI: OPENAI_API_KEY
# Anthropic: ANTHROPIC_API_KEY
# api_key = "your-api-key-here"

# Endpoint override (Ollama defaults to http://localhost:11434)
# base_url = "http://localhost:11434"

# Model to use
model = "gpt-4o-mini"

# Maximum tokens for the completion; large enough for a long list of causes
max_tokens = 10000

# Temperature (0.0 = literal extraction, 1.0 = creative)
temperature = 0.3

# Request timeout in seconds; unset keeps the HTTP client default
# timeout_seconds = 120
"#
        .to_string()
    }
}
