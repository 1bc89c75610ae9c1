use lazy_static::lazy_static;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "TUTORLOOP_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub server: ServerConfig,
    pub generator: GeneratorConfig,
    pub session: SessionConfig,
    pub profile: ProfileConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "TUTORLOOP_API_KEY".to_string(),
            temperature: 0.7,
            max_output_tokens: 2048,
            timeout_secs: 30,
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reads the API key from the configured environment variable, after
    /// giving a local `.env` file the chance to populate it.
    pub fn api_key(&self) -> Option<String> {
        dotenvy::dotenv().ok();
        std::env::var(&self.api_key_env).ok().filter(|k| !k.trim().is_empty())
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub debounce_ms: u64,
    pub history_limit: usize,
    pub step_count: u32,
    /// Where a client goes when the learner leaves the assessment.
    pub exit_destination: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            history_limit: 10,
            step_count: 5,
            exit_destination: "/dashboard".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ProfileConfig {
    pub display_name: String,
    pub role: String,
    pub focus_skill: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            display_name: "Learner".to_string(),
            role: "Software Engineer".to_string(),
            focus_skill: "problem solving".to_string(),
        }
    }
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Could not read config file {}: {}", path.display(), e))?;
        Ok(Self::from_yaml(&content)?)
    }

    /// Loads the config file if it exists. A missing file means defaults; a
    /// malformed one is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}

fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

lazy_static! {
    pub static ref CONFIG: Config = Config::load(Path::new(&config_path())).unwrap_or_else(|e| {
        eprintln!("Your config file could not be parsed, falling back to defaults: {}", e);
        Config::default()
    });
}
