//! Project context: the text summary of a project's notes and citations that
//! is embedded in the model's system instruction.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use scholarsync_core::config::ChatConfig;
use scholarsync_core::types::{Citation, Note, Project};

/// Marker line for a section with no entries.
pub const EMPTY_MARKER: &str = "- none yet";
/// Marker line for a section whose data could not be loaded.
pub const UNAVAILABLE_MARKER: &str = "- unavailable";

/// Cached view of a project's notes and citations, refreshed after a turn
/// saves something.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProjectSnapshot {
    pub project_id: i64,
    pub notes: Vec<Note>,
    pub citations: Vec<Citation>,
    pub refreshed_at: DateTime<Utc>,
}

/// Builds the bounded `PROJECT CONTEXT` block.
#[derive(Clone, Debug)]
pub struct ProjectContextBuilder {
    note_preview_chars: usize,
    abstract_preview_chars: usize,
    max_items: usize,
}

impl ProjectContextBuilder {
    pub fn new(note_preview_chars: usize, abstract_preview_chars: usize, max_items: usize) -> Self {
        Self {
            note_preview_chars,
            abstract_preview_chars,
            max_items,
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(
            config.note_preview_chars,
            config.abstract_preview_chars,
            config.max_context_items,
        )
    }

    /// Render the context. `None` for a section means it could not be loaded.
    ///
    /// The result is never empty: empty sections carry an explicit marker.
    pub fn build(
        &self,
        project: &Project,
        notes: Option<&[Note]>,
        citations: Option<&[Citation]>,
    ) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Current Project: {}", project.title);

        out.push_str("Saved Citations:\n");
        match citations {
            None => push_line(&mut out, UNAVAILABLE_MARKER),
            Some([]) => push_line(&mut out, EMPTY_MARKER),
            Some(citations) => self.push_bounded(&mut out, citations, |c| {
                let abstract_text = if c.abstract_text.trim().is_empty() {
                    "N/A".to_string()
                } else {
                    truncate_chars(&c.abstract_text, self.abstract_preview_chars)
                };
                format!(
                    "- {} ({}) by {}. Abstract: {}",
                    c.title, c.year, c.authors, abstract_text
                )
            }),
        }

        out.push('\n');
        out.push_str("Saved Notes:\n");
        match notes {
            None => push_line(&mut out, UNAVAILABLE_MARKER),
            Some([]) => push_line(&mut out, EMPTY_MARKER),
            Some(notes) => self.push_bounded(&mut out, notes, |n| {
                format!(
                    "- {} ({}): {}...",
                    n.title,
                    n.kind,
                    truncate_chars(&n.content, self.note_preview_chars)
                )
            }),
        }

        out
    }

    fn push_bounded<T>(&self, out: &mut String, items: &[T], render: impl Fn(&T) -> String) {
        for item in items.iter().take(self.max_items) {
            push_line(out, &render(item));
        }
        if items.len() > self.max_items {
            let _ = writeln!(out, "- ({} more not shown)", items.len() - self.max_items);
        }
    }
}

impl Default for ProjectContextBuilder {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

/// First `max` characters of `s`, never splitting a character.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholarsync_core::types::NoteKind;

    fn project() -> Project {
        Project {
            id: 1,
            title: "Coral Reefs".to_string(),
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    fn note(title: &str, content: &str) -> Note {
        Note {
            id: 1,
            project_id: 1,
            title: title.to_string(),
            content: content.to_string(),
            kind: NoteKind::Summary,
            created_at: Utc::now(),
        }
    }

    fn citation(title: &str, abstract_text: &str) -> Citation {
        Citation {
            id: 1,
            project_id: 1,
            title: title.to_string(),
            authors: "Hughes et al.".to_string(),
            year: "2020".to_string(),
            url: String::new(),
            doi: String::new(),
            abstract_text: abstract_text.to_string(),
            citation_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_project_has_markers() {
        let ctx = ProjectContextBuilder::default().build(&project(), Some(&[]), Some(&[]));
        assert!(ctx.starts_with("Current Project: Coral Reefs\n"));
        assert!(ctx.contains("Saved Citations:\n- none yet\n"));
        assert!(ctx.contains("Saved Notes:\n- none yet\n"));
    }

    #[test]
    fn test_unavailable_sections_are_distinct_from_empty() {
        let ctx = ProjectContextBuilder::default().build(&project(), None, Some(&[]));
        assert!(ctx.contains("Saved Notes:\n- unavailable\n"));
        assert!(ctx.contains("Saved Citations:\n- none yet\n"));
    }

    #[test]
    fn test_lines_are_formatted() {
        let notes = vec![note("Heat stress", "Bleaching follows marine heatwaves.")];
        let citations = vec![
            citation("Coral Bleaching Trends", "Reefs are warming."),
            citation("No Abstract", ""),
        ];
        let ctx = ProjectContextBuilder::default().build(&project(), Some(&notes), Some(&citations));

        assert!(ctx.contains(
            "- Coral Bleaching Trends (2020) by Hughes et al.. Abstract: Reefs are warming.\n"
        ));
        assert!(ctx.contains("- No Abstract (2020) by Hughes et al.. Abstract: N/A\n"));
        assert!(ctx.contains("- Heat stress (summary): Bleaching follows marine heatwaves....\n"));
    }

    #[test]
    fn test_note_content_truncated() {
        let long = "a".repeat(500);
        let notes = vec![note("Long", &long)];
        let ctx = ProjectContextBuilder::new(200, 300, 50).build(&project(), Some(&notes), Some(&[]));
        let expected = format!("- Long (summary): {}...\n", "a".repeat(200));
        assert!(ctx.contains(&expected));
        assert!(!ctx.contains(&"a".repeat(201)));
    }

    #[test]
    fn test_section_item_cap() {
        let notes: Vec<Note> = (0..5).map(|i| note(&format!("n{}", i), "x")).collect();
        let ctx = ProjectContextBuilder::new(200, 300, 3).build(&project(), Some(&notes), Some(&[]));
        assert!(ctx.contains("- n2 (summary)"));
        assert!(!ctx.contains("- n3 (summary)"));
        assert!(ctx.contains("- (2 more not shown)\n"));
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("🌊🐠🪸", 2), "🌊🐠");
        assert_eq!(truncate_chars("short", 200), "short");
        assert_eq!(truncate_chars("", 3), "");
    }
}
