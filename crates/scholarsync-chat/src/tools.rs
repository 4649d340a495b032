//! Tool declarations offered to the model and coercion of the model's raw
//! function calls into typed commands.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use scholarsync_core::types::{NewCitation, NewNote, NoteKind};

pub const SAVE_NOTE: &str = "saveNote";
pub const SAVE_CITATION: &str = "saveCitation";

/// A function the model may call, with its JSON parameter schema.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Declares the tools available to the model. Performs no validation beyond
/// schema shape; see [`coerce`] for argument handling.
#[derive(Clone, Debug)]
pub struct ToolRegistry {
    declarations: Vec<ToolDeclaration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            declarations: vec![save_note_declaration(), save_citation_declaration()],
        }
    }

    pub fn declarations(&self) -> &[ToolDeclaration] {
        &self.declarations
    }

    pub fn get(&self, name: &str) -> Option<&ToolDeclaration> {
        self.declarations.iter().find(|d| d.name == name)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn save_note_declaration() -> ToolDeclaration {
    let kinds: Vec<&str> = NoteKind::ALL.iter().map(|k| k.as_str()).collect();
    ToolDeclaration {
        name: SAVE_NOTE.to_string(),
        description: "Save a research note, draft, or summary to the current project.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "The title of the note." },
                "content": { "type": "string", "description": "The content of the note in markdown format." },
                "kind": { "type": "string", "enum": kinds, "description": "The type of note." }
            },
            "required": ["title", "content", "kind"]
        }),
    }
}

fn save_citation_declaration() -> ToolDeclaration {
    ToolDeclaration {
        name: SAVE_CITATION.to_string(),
        description: "Save a research citation to the current project.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "The title of the paper." },
                "authors": { "type": "string", "description": "The authors of the paper." },
                "year": { "type": "string", "description": "The publication year." },
                "url": { "type": "string", "description": "The URL to the paper." },
                "doi": { "type": "string", "description": "The DOI of the paper." },
                "abstract": { "type": "string", "description": "A brief abstract or summary of the paper." },
                "citationCount": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "The number of citations the paper has received."
                }
            },
            "required": ["title", "authors", "year"]
        }),
    }
}

// =============================================================================
// Raw calls and coercion
// =============================================================================

/// A function call as emitted by the model: a name and untyped arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawToolCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl RawToolCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// A validated tool call, ready to execute. The owning project is never
/// taken from the model; the orchestrator supplies it.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolCommand {
    SaveNote(NewNote),
    SaveCitation(NewCitation),
    Unknown { name: String },
}

/// A tool call whose arguments could not be coerced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{tool}: invalid `{field}`: {reason}")]
pub struct ValidationAnomaly {
    pub tool: String,
    pub field: String,
    pub reason: String,
}

/// Convert a raw call into a [`ToolCommand`].
///
/// Required strings must be present and non-blank. An absent or unknown note
/// kind becomes `note`; a numeric year is stringified; a missing, negative, or
/// non-numeric citation count becomes 0.
pub fn coerce(call: &RawToolCall) -> Result<ToolCommand, ValidationAnomaly> {
    match call.name.as_str() {
        SAVE_NOTE => {
            let args = args_object(call)?;
            let kind = args
                .get("kind")
                .or_else(|| args.get("type"))
                .and_then(Value::as_str);
            Ok(ToolCommand::SaveNote(NewNote {
                title: required_str(call, args, "title")?,
                content: required_str(call, args, "content")?,
                kind: NoteKind::normalize(kind),
            }))
        }
        SAVE_CITATION => {
            let args = args_object(call)?;
            let year = match args.get("year") {
                Some(Value::Number(n)) => n.to_string(),
                _ => required_str(call, args, "year")?,
            };
            Ok(ToolCommand::SaveCitation(NewCitation {
                title: required_str(call, args, "title")?,
                authors: required_str(call, args, "authors")?,
                year,
                url: optional_str(args, "url"),
                doi: optional_str(args, "doi"),
                abstract_text: optional_str(args, "abstract"),
                citation_count: citation_count(
                    args.get("citationCount").or_else(|| args.get("citation_count")),
                ),
            }))
        }
        other => Ok(ToolCommand::Unknown {
            name: other.to_string(),
        }),
    }
}

fn anomaly(call: &RawToolCall, field: &str, reason: &str) -> ValidationAnomaly {
    ValidationAnomaly {
        tool: call.name.clone(),
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn args_object(call: &RawToolCall) -> Result<&Map<String, Value>, ValidationAnomaly> {
    call.args
        .as_object()
        .ok_or_else(|| anomaly(call, "args", "expected an object"))
}

fn required_str(
    call: &RawToolCall,
    args: &Map<String, Value>,
    field: &str,
) -> Result<String, ValidationAnomaly> {
    match args.get(field) {
        None | Some(Value::Null) => Err(anomaly(call, field, "missing")),
        Some(Value::String(s)) if s.trim().is_empty() => Err(anomaly(call, field, "blank")),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(anomaly(call, field, "expected a string")),
    }
}

/// Optional strings that are absent or not strings become empty.
fn optional_str(args: &Map<String, Value>, field: &str) -> String {
    args.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn citation_count(value: Option<&Value>) -> u32 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        // `as` saturates at u32::MAX and truncates fractions.
        Some(n) if n.is_finite() && n > 0.0 => n as u32,
        _ => 0,
    }
}
