//! Process configuration.
//!
//! Values come from command-line flags with environment fallbacks and are
//! validated into a [`Config`] before anything connects.

use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::error::{FinderError, Result};

/// Upper bound on autocomplete choices the platform accepts.
pub const MAX_SUGGESTIONS: usize = 25;

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_AUTOCOMPLETE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(160);
/// How long in-flight handlers get to finish after a shutdown signal.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Default maximum concurrent handlers.
pub const DEFAULT_MAX_CONCURRENT_HANDLERS: usize = 256;

#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    /// Connection string of the document store.
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongo_uri: String,

    #[arg(long, env = "MONGODB_DATABASE", default_value = "cc")]
    pub database: String,

    /// Collection searched by `/wiki`.
    #[arg(long, env = "CC_COLLECTION", default_value = "tcs")]
    pub collection: String,

    /// Emit the command sync message on startup.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub sync_commands: bool,

    /// Sync commands to the listed guilds only, instead of globally.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub dev_mode: bool,

    #[arg(long = "guild-id", env = "DISCORD_GUILD_ID", value_delimiter = ',')]
    pub guild_ids: Vec<u64>,

    #[arg(long, default_value_t = 10)]
    pub lookup_timeout_secs: u64,

    #[arg(long, default_value_t = 60)]
    pub autocomplete_timeout_secs: u64,

    #[arg(long, default_value_t = 160)]
    pub connect_timeout_secs: u64,

    #[arg(long, default_value_t = 10)]
    pub shutdown_grace_secs: u64,

    #[arg(long, default_value_t = MAX_SUGGESTIONS)]
    pub max_suggestions: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_HANDLERS)]
    pub max_concurrent_handlers: usize,

    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub uri: String,
    pub database: String,
    /// How long to wait for the store to answer before giving up at startup.
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WikiConfig {
    pub collection: String,
    pub lookup_timeout: Duration,
    pub autocomplete_timeout: Duration,
    pub max_suggestions: usize,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            collection: "tcs".to_string(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            autocomplete_timeout: DEFAULT_AUTOCOMPLETE_TIMEOUT,
            max_suggestions: MAX_SUGGESTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub enabled: bool,
    /// Empty means global registration.
    pub guild_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub store: StoreConfig,
    pub wiki: WikiConfig,
    pub sync: SyncConfig,
    pub max_concurrent_handlers: usize,
    pub shutdown_grace: Duration,
    pub log_level: String,
}

fn non_zero_secs(name: &str, secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(FinderError::Config(format!(
            "{} must be greater than zero",
            name
        )));
    }
    Ok(Duration::from_secs(secs))
}

impl Args {
    /// Validate the flags into a [`Config`].
    pub fn into_config(self) -> Result<Config> {
        for (name, value) in [
            ("mongo-uri", &self.mongo_uri),
            ("database", &self.database),
            ("collection", &self.collection),
        ] {
            if value.trim().is_empty() {
                return Err(FinderError::Config(format!("{} must be non-empty", name)));
            }
        }
        if self.max_suggestions == 0 || self.max_suggestions > MAX_SUGGESTIONS {
            return Err(FinderError::Config(format!(
                "max-suggestions must be between 1 and {}",
                MAX_SUGGESTIONS
            )));
        }
        if self.max_concurrent_handlers == 0 {
            return Err(FinderError::Config(
                "max-concurrent-handlers must be greater than zero".to_string(),
            ));
        }

        let guild_ids = if self.dev_mode {
            if self.sync_commands && self.guild_ids.is_empty() {
                return Err(FinderError::Config(
                    "no discord guild id provided".to_string(),
                ));
            }
            self.guild_ids
        } else {
            Vec::new()
        };

        Ok(Config {
            store: StoreConfig {
                uri: self.mongo_uri,
                database: self.database,
                connect_timeout: non_zero_secs("connect-timeout-secs", self.connect_timeout_secs)?,
            },
            wiki: WikiConfig {
                collection: self.collection,
                lookup_timeout: non_zero_secs("lookup-timeout-secs", self.lookup_timeout_secs)?,
                autocomplete_timeout: non_zero_secs(
                    "autocomplete-timeout-secs",
                    self.autocomplete_timeout_secs,
                )?,
                max_suggestions: self.max_suggestions,
            },
            sync: SyncConfig {
                enabled: self.sync_commands,
                guild_ids,
            },
            max_concurrent_handlers: self.max_concurrent_handlers,
            shutdown_grace: non_zero_secs("shutdown-grace-secs", self.shutdown_grace_secs)?,
            log_level: self.log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Variables read as flag fallbacks.
    const ENV_VARS: [&str; 5] = [
        "MONGODB_URI",
        "MONGODB_DATABASE",
        "CC_COLLECTION",
        "DISCORD_GUILD_ID",
        "RUST_LOG",
    ];

    /// Serializes tests that read or write the fallback variables.
    static ENV_LOCK: Mutex<()> = parking_lot::const_mutex(());

    fn parse_with_env(args: &[&str], env: &[(&str, &str)]) -> Result<Config> {
        let _guard = ENV_LOCK.lock();
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
        for (var, value) in env {
            std::env::set_var(var, value);
        }

        let mut argv = vec!["cc-finder"];
        argv.extend_from_slice(args);
        let parsed = Args::try_parse_from(argv);

        for (var, _) in env {
            std::env::remove_var(var);
        }
        parsed.unwrap().into_config()
    }

    fn parse(args: &[&str]) -> Result<Config> {
        parse_with_env(args, &[])
    }

    #[test]
    fn test_defaults_with_guild() {
        let config = parse(&["--guild-id", "42"]).unwrap();

        assert_eq!(config.store.uri, "mongodb://localhost:27017");
        assert_eq!(config.store.database, "cc");
        assert_eq!(config.store.connect_timeout, Duration::from_secs(160));
        assert_eq!(config.wiki, WikiConfig::default());
        assert_eq!(
            config.sync,
            SyncConfig {
                enabled: true,
                guild_ids: vec![42]
            }
        );
        assert_eq!(config.max_concurrent_handlers, 256);
        assert_eq!(config.shutdown_grace, DEFAULT_SHUTDOWN_GRACE);
    }

    #[test]
    fn test_dev_mode_sync_requires_guild() {
        let err = parse(&[]).unwrap_err();
        assert!(matches!(err, FinderError::Config(m) if m == "no discord guild id provided"));
    }

    #[test]
    fn test_dev_mode_without_sync_needs_no_guild() {
        let config = parse(&["--sync-commands", "false"]).unwrap();
        assert!(!config.sync.enabled);
    }

    #[test]
    fn test_global_sync_drops_guilds() {
        let config = parse(&["--dev-mode", "false", "--guild-id", "42"]).unwrap();
        assert!(config.sync.enabled);
        assert!(config.sync.guild_ids.is_empty());
    }

    #[test]
    fn test_guild_ids_comma_separated() {
        let config = parse(&["--guild-id", "1,2,3"]).unwrap();
        assert_eq!(config.sync.guild_ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(parse(&["--guild-id", "1", "--max-suggestions", "26"]).is_err());
        assert!(parse(&["--guild-id", "1", "--max-suggestions", "0"]).is_err());
        assert!(parse(&["--guild-id", "1", "--max-concurrent-handlers", "0"]).is_err());
        assert!(parse(&["--guild-id", "1", "--autocomplete-timeout-secs", "0"]).is_err());
        assert!(parse(&["--guild-id", "1", "--collection", " "]).is_err());
    }

    #[test]
    fn test_custom_timeouts() {
        let config = parse(&[
            "--guild-id",
            "1",
            "--autocomplete-timeout-secs",
            "3",
            "--lookup-timeout-secs",
            "2",
        ])
        .unwrap();
        assert_eq!(config.wiki.autocomplete_timeout, Duration::from_secs(3));
        assert_eq!(config.wiki.lookup_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_env_fallbacks() {
        let config = parse_with_env(
            &[],
            &[
                ("DISCORD_GUILD_ID", "5,6"),
                ("MONGODB_DATABASE", "cards"),
                ("RUST_LOG", "debug"),
            ],
        )
        .unwrap();
        assert_eq!(config.sync.guild_ids, vec![5, 6]);
        assert_eq!(config.store.database, "cards");
        assert_eq!(config.log_level, "debug");

        // Flags win over the environment.
        let config =
            parse_with_env(&["--guild-id", "7"], &[("DISCORD_GUILD_ID", "5")]).unwrap();
        assert_eq!(config.sync.guild_ids, vec![7]);
    }

    #[test]
    fn test_ambient_guild_id_is_ignored() {
        // A guild id left in the environment must not leak into parsing.
        let guard = ENV_LOCK.lock();
        std::env::set_var("DISCORD_GUILD_ID", "5");
        drop(guard);

        let err = parse(&[]).unwrap_err();
        assert!(matches!(err, FinderError::Config(m) if m == "no discord guild id provided"));
    }
}
