//! Command declarations and the sync control message.
//!
//! Declarations describe the commands this process answers so the gateway
//! side can register them with the platform before interactions arrive.
//!
//! # Example
//!
//! ```
//! use cc_finder::router::{build_sync_message, CommandDeclaration, OptionDeclaration};
//!
//! let wiki = CommandDeclaration::new("wiki", "Search the wiki").option(
//!     OptionDeclaration::string("query", "The name of the card to search for")
//!         .required()
//!         .autocomplete(),
//! );
//!
//! let json = build_sync_message(&[wiki], &[]);
//! assert!(json.contains("sync_commands"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::Router;
use crate::error::{FinderError, Result};

/// `op` value of the sync control message.
pub const SYNC_OP: &str = "sync_commands";

/// Value type of a command option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDeclaration {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub autocomplete: bool,
}

impl OptionDeclaration {
    pub fn new(name: &str, description: &str, kind: OptionKind) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            required: false,
            autocomplete: false,
        }
    }

    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, description, OptionKind::String)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Suggestions are served while the user types this option.
    pub fn autocomplete(mut self) -> Self {
        self.autocomplete = true;
        self
    }
}

/// A top-level slash command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDeclaration {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDeclaration>,
}

impl CommandDeclaration {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            options: Vec::new(),
        }
    }

    pub fn option(mut self, option: OptionDeclaration) -> Self {
        self.options.push(option);
        self
    }

    pub fn get_option(&self, name: &str) -> Option<&OptionDeclaration> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Router path serving this command.
    pub fn path(&self) -> String {
        format!("/{}", self.name)
    }

    pub fn has_autocomplete(&self) -> bool {
        self.options.iter().any(|o| o.autocomplete)
    }
}

/// Where declarations are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncScope {
    /// Only in the listed guilds (development).
    Guild,
    /// Everywhere.
    Global,
}

/// Build the sync control message.
///
/// An empty `guild_ids` means global registration.
pub fn build_sync_message(commands: &[CommandDeclaration], guild_ids: &[u64]) -> String {
    let scope = if guild_ids.is_empty() {
        SyncScope::Global
    } else {
        SyncScope::Guild
    };
    // Snowflakes exceed JS number precision; send them as strings.
    let guild_ids: Vec<String> = guild_ids.iter().map(u64::to_string).collect();

    json!({
        "op": SYNC_OP,
        "scope": scope,
        "guild_ids": guild_ids,
        "commands": commands,
    })
    .to_string()
}

impl Router {
    /// Check that every declared command is routable, and that commands with
    /// autocomplete options have an autocomplete handler.
    pub fn check_declarations(&self, commands: &[CommandDeclaration]) -> Result<()> {
        for command in commands {
            let path = command.path();
            if !self.contains(&path) {
                return Err(FinderError::Config(format!(
                    "command {} is declared but {} has no handler",
                    command.name, path
                )));
            }
            if command.has_autocomplete() && !self.has_autocomplete(&path) {
                return Err(FinderError::Config(format!(
                    "command {} declares autocomplete but {} has no autocomplete handler",
                    command.name, path
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::CommandRegistry;

    fn wiki() -> CommandDeclaration {
        CommandDeclaration::new("wiki", "Search the wiki").option(
            OptionDeclaration::string("query", "The name of the card to search for")
                .required()
                .autocomplete(),
        )
    }

    #[test]
    fn test_declaration_builder() {
        let decl = wiki();
        let query = decl.get_option("query").unwrap();

        assert_eq!(query.kind, OptionKind::String);
        assert!(query.required);
        assert!(query.autocomplete);
        assert_eq!(decl.path(), "/wiki");
        assert!(decl.has_autocomplete());
    }

    #[test]
    fn test_sync_message_global() {
        let json = build_sync_message(&[wiki()], &[]);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["op"], SYNC_OP);
        assert_eq!(parsed["scope"], "global");
        assert_eq!(parsed["guild_ids"].as_array().unwrap().len(), 0);
        assert_eq!(parsed["commands"][0]["name"], "wiki");
        assert_eq!(parsed["commands"][0]["options"][0]["type"], "string");
        assert_eq!(parsed["commands"][0]["options"][0]["autocomplete"], true);
    }

    #[test]
    fn test_sync_message_guild_scoped() {
        let json = build_sync_message(&[wiki()], &[1_130_000_000_000_000_001]);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["scope"], "guild");
        assert_eq!(parsed["guild_ids"][0], "1130000000000000001");
    }

    #[test]
    fn test_check_declarations() {
        let mut registry = CommandRegistry::new();
        registry.command("/wiki", |_| async { Ok(()) });
        let router = registry.seal().unwrap();

        // Declared autocomplete without a handler.
        assert!(matches!(
            router.check_declarations(&[wiki()]),
            Err(FinderError::Config(_))
        ));

        let missing = CommandDeclaration::new("ping", "Ping");
        assert!(router.check_declarations(&[missing]).is_err());

        let mut registry = CommandRegistry::new();
        registry
            .command("/wiki", |_| async { Ok(()) })
            .autocomplete("/wiki", |_| async { Ok(()) });
        let router = registry.seal().unwrap();
        assert!(router.check_declarations(&[wiki()]).is_ok());
    }
}
