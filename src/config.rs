use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    telegram_bot_token: String,
    /// Chat that receives start/stop/restart notices.
    operator_chat_id: Option<i64>,
    /// Bot username without @, shown in "open a private chat" instructions.
    /// Fetched from Telegram when not set.
    bot_username: Option<String>,
    /// Reference data file. Relative paths resolve against the working directory.
    data_file: Option<String>,
    /// Directory for state and logs. Defaults to current directory.
    data_dir: Option<String>,
    /// Substrings that make the bot answer free text in groups.
    trigger_words: Option<Vec<String>>,
    /// Seconds between connection probes (0 = disabled).
    #[serde(default)]
    health_check_interval_secs: u64,
}

pub struct Config {
    pub telegram_bot_token: String,
    pub operator_chat_id: Option<i64>,
    pub bot_username: Option<String>,
    pub data_file: PathBuf,
    pub data_dir: PathBuf,
    pub trigger_words: Vec<String>,
    pub health_check_interval_secs: u64,
}

/// Values taken from the environment (and `.env`), overriding the file.
#[derive(Debug, Default)]
pub struct EnvOverrides {
    pub bot_token: Option<String>,
    pub admin_id: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            bot_token: std::env::var("BOT_TOKEN").ok().filter(|v| !v.is_empty()),
            admin_id: std::env::var("ADMIN_ID").ok().filter(|v| !v.is_empty()),
        }
    }
}

impl Config {
    /// Load the config file, then apply environment overrides. The file may be
    /// missing when the token comes from `BOT_TOKEN`.
    pub fn load<P: AsRef<Path>>(path: P, env: EnvOverrides) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let file = if config_path.exists() || env.bot_token.is_none() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
            serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?
        } else {
            ConfigFile::default()
        };

        let telegram_bot_token = env.bot_token.unwrap_or(file.telegram_bot_token);
        if telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token is required (or set BOT_TOKEN)".into(),
            ));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }

        let operator_chat_id = match env.admin_id {
            Some(id) => Some(id.trim().parse::<i64>().map_err(|_| {
                ConfigError::Validation(format!("ADMIN_ID must be a numeric chat id, got '{id}'"))
            })?),
            None => file.operator_chat_id,
        };

        let trigger_words = file
            .trigger_words
            .unwrap_or_else(default_trigger_words)
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token,
            operator_chat_id,
            bot_username: file.bot_username.map(|s| s.trim_start_matches('@').to_string()),
            data_file: PathBuf::from(file.data_file.unwrap_or_else(|| "data.json".to_string())),
            data_dir,
            trigger_words,
            health_check_interval_secs: file.health_check_interval_secs,
        })
    }

    pub fn state_file(&self) -> PathBuf {
        self.data_dir.join("bot_state.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn default_trigger_words() -> Vec<String> {
    vec!["бот".to_string(), "вечерницы".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz",
            "operator_chat_id": 42,
            "bot_username": "@vechernitsy_bot",
            "data_dir": "/var/lib/villagebot"
        }"#);
        let config = Config::load(file.path(), EnvOverrides::default()).expect("should load valid config");
        assert_eq!(config.operator_chat_id, Some(42));
        assert_eq!(config.bot_username.as_deref(), Some("vechernitsy_bot"));
        assert_eq!(config.state_file(), PathBuf::from("/var/lib/villagebot/bot_state.json"));
        assert_eq!(config.data_file, PathBuf::from("data.json"));
        assert_eq!(config.trigger_words, vec!["бот", "вечерницы"]);
        assert_eq!(config.health_check_interval_secs, 0);
    }

    #[test]
    fn test_empty_token() {
        let file = write_config(r#"{ "telegram_bot_token": "" }"#);
        let err = assert_err(Config::load(file.path(), EnvOverrides::default()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_missing_token() {
        let file = write_config(r#"{ "operator_chat_id": 1 }"#);
        let err = assert_err(Config::load(file.path(), EnvOverrides::default()));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let file = write_config(r#"{ "telegram_bot_token": "invalid_token_no_colon" }"#);
        let err = assert_err(Config::load(file.path(), EnvOverrides::default()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_non_numeric_id() {
        let file = write_config(r#"{ "telegram_bot_token": "notanumber:ABCdef" }"#);
        let err = assert_err(Config::load(file.path(), EnvOverrides::default()));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_env_token_without_file() {
        let env = EnvOverrides {
            bot_token: Some("123:abc".into()),
            admin_id: Some("-100500".into()),
        };
        let config = Config::load("/nonexistent/villagebot.json", env).expect("env is enough");
        assert_eq!(config.telegram_bot_token, "123:abc");
        assert_eq!(config.operator_chat_id, Some(-100500));
        assert_eq!(config.data_dir, PathBuf::from("."));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_config(r#"{
            "telegram_bot_token": "1:file",
            "operator_chat_id": 7
        }"#);
        let env = EnvOverrides {
            bot_token: Some("2:env".into()),
            admin_id: None,
        };
        let config = Config::load(file.path(), env).unwrap();
        assert_eq!(config.telegram_bot_token, "2:env");
        assert_eq!(config.operator_chat_id, Some(7));
    }

    #[test]
    fn test_bad_admin_id() {
        let env = EnvOverrides {
            bot_token: Some("1:x".into()),
            admin_id: Some("admin".into()),
        };
        let err = assert_err(Config::load("/nonexistent/villagebot.json", env));
        assert!(err.to_string().contains("ADMIN_ID"));
    }

    #[test]
    fn test_custom_trigger_words() {
        let file = write_config(r#"{
            "telegram_bot_token": "1:x",
            "trigger_words": ["  Помощник ", ""]
        }"#);
        let config = Config::load(file.path(), EnvOverrides::default()).unwrap();
        assert_eq!(config.trigger_words, vec!["помощник"]);
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/config.json", EnvOverrides::default()));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path(), EnvOverrides::default()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
