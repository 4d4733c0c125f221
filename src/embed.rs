//! Response payloads.
//!
//! Builds the structured message (title, author, description, fields) sent
//! back for a command, independent of how it is delivered.

use serde::{Deserialize, Serialize};

use crate::error::FinderError;
use crate::record::Record;

/// Message flag marking a reply visible only to the requester.
pub const EPHEMERAL: u64 = 1 << 6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

/// Fluent builder for [`Embed`].
///
/// Empty strings are treated as "unset", so record fields can be passed
/// through without checking them first.
#[derive(Debug, Default)]
pub struct EmbedBuilder {
    embed: Embed,
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

impl EmbedBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: &str) -> Self {
        self.embed.title = non_empty(title);
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.embed.description = non_empty(description);
        self
    }

    /// Set the author line. An empty name clears it.
    pub fn author(mut self, name: &str, url: &str, icon_url: &str) -> Self {
        self.embed.author = non_empty(name).map(|name| EmbedAuthor {
            name,
            url: non_empty(url),
            icon_url: non_empty(icon_url),
        });
        self
    }

    pub fn field(mut self, name: &str, value: &str, inline: bool) -> Self {
        self.embed.fields.push(EmbedField {
            name: name.to_string(),
            value: value.to_string(),
            inline,
        });
        self
    }

    pub fn build(self) -> Embed {
        self.embed
    }
}

/// A message sent in reply to a command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageCreate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub flags: u64,
}

impl MessageCreate {
    /// Ephemeral message carrying a single embed.
    pub fn ephemeral_embed(embed: Embed) -> Self {
        Self {
            content: None,
            embeds: vec![embed],
            flags: EPHEMERAL,
        }
    }

    /// Ephemeral plain-text message.
    pub fn ephemeral_text(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            embeds: Vec::new(),
            flags: EPHEMERAL,
        }
    }

    #[inline]
    pub fn is_ephemeral(&self) -> bool {
        self.flags & EPHEMERAL != 0
    }
}

/// Render a record: author linked to its wiki page, classification fields
/// appended inline.
pub fn record_embed(record: &Record) -> Embed {
    record
        .classifications()
        .fold(
            EmbedBuilder::new()
                .author(&record.name, &record.wiki, &record.image)
                .description(&record.description),
            |builder, (label, value)| builder.field(label, value, true),
        )
        .build()
}

/// Render any lookup failure as a single `Error` field.
///
/// Missing records and store failures share this presentation; only the
/// message differs.
pub fn error_embed(err: &FinderError) -> Embed {
    EmbedBuilder::new()
        .field("Error", &err.to_string(), false)
        .build()
}

/// Render the outcome of a lookup.
pub fn lookup_embed(result: &Result<Record, FinderError>) -> Embed {
    match result {
        Ok(record) => record_embed(record),
        Err(err) => error_embed(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    fn fire_cat() -> Record {
        Record {
            id: ObjectId::new(),
            name: "Fire Cat".to_string(),
            description: "Deals 80-120 fire damage.".to_string(),
            image: "https://img.example/fire-cat.png".to_string(),
            wiki: "https://wiki.example/Fire_Cat".to_string(),
            pack: Some("Hoard".to_string()),
            school: None,
        }
    }

    #[test]
    fn test_record_embed_author_and_description() {
        let embed = record_embed(&fire_cat());

        let author = embed.author.unwrap();
        assert_eq!(author.name, "Fire Cat");
        assert_eq!(author.url.as_deref(), Some("https://wiki.example/Fire_Cat"));
        assert_eq!(
            author.icon_url.as_deref(),
            Some("https://img.example/fire-cat.png")
        );
        assert_eq!(
            embed.description.as_deref(),
            Some("Deals 80-120 fire damage.")
        );
        assert_eq!(embed.title, None);
    }

    #[test]
    fn test_record_embed_appends_non_empty_classifications() {
        let embed = record_embed(&fire_cat());
        assert_eq!(
            embed.fields,
            vec![EmbedField {
                name: "Pack".to_string(),
                value: "Hoard".to_string(),
                inline: true,
            }]
        );

        let mut bare = fire_cat();
        bare.pack = Some(String::new());
        assert!(record_embed(&bare).fields.is_empty());
    }

    #[test]
    fn test_error_embed_single_field() {
        let embed = error_embed(&FinderError::NotFound);

        assert!(embed.author.is_none());
        assert!(embed.description.is_none());
        assert_eq!(embed.fields.len(), 1);
        assert_eq!(embed.fields[0].name, "Error");
        assert_eq!(embed.fields[0].value, "no documents in result");
    }

    #[test]
    fn test_not_found_and_connection_failure_share_shape() {
        let a = error_embed(&FinderError::NotFound);
        let b = error_embed(&FinderError::ConnectionFailure("down".to_string()));

        assert_eq!(a.fields.len(), b.fields.len());
        assert_eq!(a.fields[0].name, b.fields[0].name);
        assert_ne!(a.fields[0].value, b.fields[0].value);
    }

    #[test]
    fn test_ephemeral_message_serialization() {
        let message = MessageCreate::ephemeral_embed(error_embed(&FinderError::NotFound));
        assert!(message.is_ephemeral());

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["flags"], 64);
        assert_eq!(json["embeds"][0]["fields"][0]["name"], "Error");
        assert!(json.get("content").is_none());
    }
}
