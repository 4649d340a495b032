use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Classification of a project note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// A free-form research note (default).
    #[default]
    Note,
    /// A draft of academic prose.
    Draft,
    /// A summary of one or more sources.
    Summary,
}

impl NoteKind {
    /// All kinds, in declaration order.
    pub const ALL: [NoteKind; 3] = [NoteKind::Note, NoteKind::Draft, NoteKind::Summary];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Note => "note",
            NoteKind::Draft => "draft",
            NoteKind::Summary => "summary",
        }
    }

    /// Parse a kind, falling back to `Note` for absent or unrecognized values.
    pub fn normalize(value: Option<&str>) -> NoteKind {
        value
            .and_then(|v| v.trim().to_ascii_lowercase().parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NoteKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "note" => Ok(NoteKind::Note),
            "draft" => Ok(NoteKind::Draft),
            "summary" => Ok(NoteKind::Summary),
            _ => Err(format!("Unknown note kind: {}", s)),
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// Top-level container for a body of research work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A note, draft, or summary owned by a project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub content: String,
    /// Serialized as `type` to keep the wire shape the web UI expects.
    #[serde(rename = "type", alias = "kind")]
    pub kind: NoteKind,
    pub created_at: DateTime<Utc>,
}

/// A bibliographic record owned by a project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub authors: String,
    pub year: String,
    pub url: String,
    pub doi: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub citation_count: u32,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Creation payloads
// =============================================================================

/// Fields required to create a project.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl NewProject {
    /// Reject projects whose title is blank.
    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() {
            return Err(crate::ScholarError::Validation(
                "project title must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fields required to create a note. The owning project is supplied separately.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: NoteKind,
}

/// Fields required to create a citation. The owning project is supplied separately.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCitation {
    pub title: String,
    pub authors: String,
    pub year: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub doi: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub citation_count: u32,
}
