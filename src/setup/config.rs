//! Configuration for running this bot.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use poise::Framework;
use serde::Deserialize;
use serde::Serialize;
use serenity::GuildId;
use serenity::UserId;

use crate::error::ConfigError;
use crate::serenity;

/// The path to the config file
const CONFIG_PATH: &str = "config.toml";

/// Environment variable that overrides `discord_token`.
const TOKEN_VAR: &str = "DISCORD_TOKEN";

/// Placeholder written into freshly generated config files.
const PLACEHOLDER_TOKEN: &str = "put_token_here";

/// Settings read from [CONFIG_PATH] that modify bot behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Token needed to use a bot account.
    /// [TOKEN_VAR] takes precedence if it is set.
    discord_token: String,

    /// See [TrackingConfig]
    tracking: TrackingConfig,

    /// See [LoggingConfig]
    logging: LoggingConfig,

    /// Useful developer specific configs.
    dev_utils: DevConfig,
}

impl Config {
    /// Reads [CONFIG_PATH] to extract a [Config].
    ///
    /// A missing or blank file is (re)written with default values and the defaults are used,
    /// since the token may still come from the environment.
    /// A malformed file is an error naming the offending key.
    pub fn read() -> Result<Config, ConfigError> {
        match std::fs::read_to_string(CONFIG_PATH) {
            Ok(content) if content.trim().is_empty() => {
                eprintln!("Empty {CONFIG_PATH}, rewriting it with defaults.");
                Ok(Config::defaults_written_to(CONFIG_PATH))
            }
            Ok(content) => Config::parse(&content),
            Err(file_error) if file_error.kind() == std::io::ErrorKind::NotFound => {
                eprintln!("No {CONFIG_PATH} found, creating one with defaults.");
                Ok(Config::defaults_written_to(CONFIG_PATH))
            }
            Err(file_error) => Err(ConfigError::IoError(file_error)),
        }
    }

    /// Try to write the defaults to `path`, using them even if the write fails.
    fn defaults_written_to(path: impl AsRef<Path>) -> Config {
        let config = Config::default();
        if let Err(e) = write_file(&config, path.as_ref()) {
            eprintln!("Couldn't write {}, continuing with defaults. {e}", path.as_ref().display());
        }
        config
    }

    /// Deserialize a config from toml text.
    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        let de = toml::Deserializer::new(content);
        serde_path_to_error::deserialize(de).map_err(|error| ConfigError::InvalidConfig {
            reason: error.to_string(),
        })
    }

    /// The discord token, preferring [TOKEN_VAR] over the config file.
    pub fn token(&self) -> Result<String, ConfigError> {
        self.token_with(std::env::var(TOKEN_VAR).ok())
    }

    /// Pick between an environment token and the file token.
    /// Blank values and the placeholder count as missing.
    fn token_with(&self, from_env: Option<String>) -> Result<String, ConfigError> {
        let usable = |t: &str| !t.trim().is_empty() && !t.contains(PLACEHOLDER_TOKEN);

        from_env
            .filter(|t| usable(t))
            .or_else(|| Some(self.discord_token.clone()).filter(|t| usable(t)))
            .map(|t| t.trim().to_string())
            .ok_or(ConfigError::MissingToken)
    }

    /// Construct a bug notification notify list based on the config.
    /// Wrapper for [NotifyConfig::notify_list]
    pub fn notify_list<U, E>(&self, fw: &Framework<U, E>) -> HashSet<UserId> {
        self.dev_utils
            .notifications
            .notify_list(&fw.options().owners)
    }

    pub fn tracking(&self) -> &TrackingConfig {
        &self.tracking
    }

    /// Getter for log_dir.
    pub fn log_dir(&self) -> &str {
        &self.logging.log_dir
    }

    /// Is debug mode enabled for console logs
    pub fn console_debug(&self) -> bool {
        self.logging.console_debug
    }

    /// Is file logging enabled.
    pub fn logs_enabled(&self) -> bool {
        self.logging.logs_enabled
    }

    pub fn dev_guild(&self) -> Option<GuildId> {
        self.dev_utils.dev_guild
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: PLACEHOLDER_TOKEN.to_string(),

            tracking: TrackingConfig::default(),

            logging: LoggingConfig {
                console_debug: false,
                logs_enabled: true,
                log_dir: "logs".to_string(),
            },

            dev_utils: DevConfig {
                dev_guild: None,
                notifications: NotifyConfig {
                    enabled: false,
                    add_owners: true,
                    userids: vec![],
                },
            },
        }
    }
}

/// Where and how presence notices are posted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Name of the text channel that receives every notice.
    notify_channel: String,
    /// Upper bound on how long the shutdown announcement may take.
    shutdown_grace_secs: u64,
}

impl TrackingConfig {
    pub fn notify_channel(&self) -> &str {
        &self.notify_channel
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            notify_channel: "paddys-pub".to_string(),
            shutdown_grace_secs: 2,
        }
    }
}

/// Configs for console and file logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    /// Print debug traces to console?
    console_debug: bool,
    /// Enable writing to log file?
    logs_enabled: bool,
    /// Directory to store log files
    log_dir: String,
}

/// Optional configs to enable developer-specific behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DevConfig {
    /// Optional guild to register commands on quickly.
    #[serde(serialize_with = "serialize_opt", deserialize_with = "deserialize_opt")]
    dev_guild: Option<GuildId>,
    /// See [NotifyConfig]
    notifications: NotifyConfig,
}

/// Configs for notification behavior when encountering unexpected errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NotifyConfig {
    /// Enable this behavior or not. (bot sends a private message)
    enabled: bool,
    /// Whether to automatically add owners to the notify list.
    add_owners: bool,
    /// Additional users to add to the notify list.
    userids: Vec<UserId>,
}

impl NotifyConfig {
    /// Construct a bug notification notify list from the owners and configured users.
    fn notify_list(&self, owners: &HashSet<UserId>) -> HashSet<UserId> {
        if !self.enabled {
            return HashSet::new();
        }

        let owners = owners.iter().filter(|_| self.add_owners);
        owners.chain(self.userids.iter()).copied().collect()
    }
}

/// Write the given config to `path`.
fn write_file(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidConfig {
        reason: e.to_string(),
    })?;
    std::fs::write(path, content).map_err(ConfigError::IoError)
}

fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<GuildId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(OptVisitor)
}

fn serialize_opt<T, S>(val: &Option<T>, ser: S) -> Result<S::Ok, S::Error>
where
    T: serde::Serialize,
    S: serde::Serializer,
{
    match val {
        Some(v) => v.serialize(ser),
        None => ser.serialize_str(""),
    }
}

/// Accepts `""` as no guild, or a guild id as a string or integer.
struct OptVisitor;

impl<'de> serde::de::Visitor<'de> for OptVisitor {
    type Value = Option<GuildId>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a valid guild id or an empty string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        match v {
            "" => Ok(None),
            _ => {
                let num: u64 = v.parse().map_err(|_| E::custom("not u64"))?;
                self.visit_u64(num)
            }
        }
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        let num = u64::try_from(v).map_err(|_| E::custom("negative guild id"))?;
        self.visit_u64(num)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        if v == 0 {
            return Err(E::custom("guild id can't be 0"));
        }
        Ok(Some(GuildId::new(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
discord_token = "abc.def"

[tracking]
notify_channel = "bot-alerts"
shutdown_grace_secs = 5

[logging]
console_debug = true
logs_enabled = false
log_dir = "var/log"

[dev_utils]
dev_guild = "1234"

[dev_utils.notifications]
enabled = true
add_owners = false
userids = ["42"]
"#;

    #[test]
    fn parses_full_config() {
        let config = Config::parse(FULL).unwrap();

        assert_eq!(config.tracking().notify_channel(), "bot-alerts");
        assert_eq!(config.tracking().shutdown_grace(), Duration::from_secs(5));
        assert!(config.console_debug());
        assert!(!config.logs_enabled());
        assert_eq!(config.log_dir(), "var/log");
        assert_eq!(config.dev_guild(), Some(GuildId::new(1234)));
    }

    #[test]
    fn default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let config = Config::parse(&text).unwrap();

        assert_eq!(config.tracking().notify_channel(), "paddys-pub");
        assert_eq!(config.tracking().shutdown_grace(), Duration::from_secs(2));
        assert_eq!(config.dev_guild(), None);
    }

    #[test]
    fn malformed_config_names_the_key() {
        let broken = FULL.replace("shutdown_grace_secs = 5", "shutdown_grace_secs = \"soon\"");
        let err = Config::parse(&broken).unwrap_err();

        match err {
            ConfigError::InvalidConfig { reason } => {
                assert!(reason.contains("tracking.shutdown_grace_secs"), "{reason}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn env_token_wins_over_file() {
        let config = Config::parse(FULL).unwrap();

        let token = config.token_with(Some("from-env".to_string())).unwrap();
        assert_eq!(token, "from-env");

        let token = config.token_with(None).unwrap();
        assert_eq!(token, "abc.def");
    }

    #[test]
    fn placeholder_token_is_missing() {
        let config = Config::default();

        assert!(matches!(
            config.token_with(None),
            Err(ConfigError::MissingToken)
        ));
        assert!(matches!(
            config.token_with(Some("  ".to_string())),
            Err(ConfigError::MissingToken)
        ));
    }

    #[test]
    fn notify_list_respects_flags() {
        let owners: HashSet<UserId> = [UserId::new(1)].into();
        let mut notify = NotifyConfig {
            enabled: true,
            add_owners: true,
            userids: vec![UserId::new(2)],
        };
        assert_eq!(notify.notify_list(&owners).len(), 2);

        notify.add_owners = false;
        assert_eq!(
            notify.notify_list(&owners),
            [UserId::new(2)].into_iter().collect()
        );

        notify.enabled = false;
        assert!(notify.notify_list(&owners).is_empty());
    }

    #[test]
    fn unwritable_location_still_yields_defaults() {
        let unwritable = std::env::temp_dir()
            .join("herald-bot-no-such-dir")
            .join("nested")
            .join("config.toml");

        let config = Config::defaults_written_to(&unwritable);

        assert!(!unwritable.exists());
        assert_eq!(config.tracking().notify_channel(), "paddys-pub");
        assert!(config.logs_enabled());
    }
}
