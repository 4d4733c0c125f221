//! Record data model.
//!
//! - [`Record`] - a full document as stored in a lookup collection
//! - [`RecordSummary`] - the `{_id, name}` projection returned by prefix search
//! - [`RecordId`] - a parsed record key
//! - [`Suggestion`] - an autocomplete choice built from a summary

use std::fmt;
use std::str::FromStr;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, doc, Document};
use serde::{Deserialize, Serialize};

use crate::error::{FinderError, Result};

/// A searchable entity in a lookup collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "image_link")]
    pub image: String,
    #[serde(default, rename = "wiki_link")]
    pub wiki: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
}

impl Record {
    /// Decode a record from a raw store document.
    pub fn from_document(doc: Document) -> Result<Self> {
        Ok(bson::from_document(doc)?)
    }

    /// Classification fields that carry a non-empty value, labelled.
    pub fn classifications(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [("Pack", self.pack.as_deref()), ("School", self.school.as_deref())]
            .into_iter()
            .filter_map(|(label, value)| match value {
                Some(v) if !v.is_empty() => Some((label, v)),
                _ => None,
            })
    }
}

/// Name projection of a record, as returned by prefix search.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordSummary {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
}

impl RecordSummary {
    pub fn from_document(doc: Document) -> Result<Self> {
        Ok(bson::from_document(doc)?)
    }
}

/// A parsed record key.
///
/// Keys travel through interactions as 24-digit hex strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(ObjectId);

impl RecordId {
    pub fn parse(raw: &str) -> Result<Self> {
        ObjectId::parse_str(raw.trim())
            .map(RecordId)
            .map_err(|_| FinderError::InvalidIdentifier(raw.to_string()))
    }

    #[inline]
    pub fn object_id(&self) -> ObjectId {
        self.0
    }

    /// Filter document selecting this record by key.
    pub fn filter(&self) -> Document {
        doc! { "_id": self.0 }
    }
}

impl From<ObjectId> for RecordId {
    fn from(id: ObjectId) -> Self {
        RecordId(id)
    }
}

impl FromStr for RecordId {
    type Err = FinderError;

    fn from_str(s: &str) -> Result<Self> {
        RecordId::parse(s)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

/// An autocomplete choice: display label plus the backing record key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    pub value: String,
}

impl From<RecordSummary> for Suggestion {
    fn from(summary: RecordSummary) -> Self {
        Suggestion {
            value: summary.id.to_hex(),
            name: summary.name,
        }
    }
}
