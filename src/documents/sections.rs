//! Section splitting and chunking for uploaded document text.
//!
//! Heading detection is heuristic: a short line matching a known section
//! name (per document kind) opens a new section. Text before the first
//! heading lands in a synthetic "preamble" section.

use crate::models::document::{DocumentKind, DocumentSection};

const RESUME_SECTIONS: &[&str] = &[
    "experience",
    "work experience",
    "professional experience",
    "education",
    "projects",
    "skills",
    "summary",
    "objective",
    "interests",
    "hobbies",
    "certifications",
    "publications",
];

const JD_SECTIONS: &[&str] = &[
    "responsibilities",
    "requirements",
    "qualifications",
    "about the role",
    "about you",
    "about us",
    "nice to have",
    "benefits",
];

const MAX_CHUNK_CHARS: usize = 1200;

/// Normalize whitespace: trim lines, collapse blank-line runs into one.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut previous_blank = false;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !previous_blank {
                out.push("");
            }
            previous_blank = true;
        } else {
            out.push(line);
            previous_blank = false;
        }
    }
    out.join("\n").trim().to_string()
}

fn heading_name(line: &str, kind: DocumentKind) -> Option<String> {
    let normalized = line.trim().trim_end_matches(':').to_lowercase();
    if normalized.is_empty() || normalized.len() > 40 {
        return None;
    }
    let candidates = match kind {
        DocumentKind::Resume => RESUME_SECTIONS,
        DocumentKind::Jd => JD_SECTIONS,
    };
    candidates
        .iter()
        .find(|s| {
            normalized == **s || normalized.replace(' ', "") == s.replace(' ', "")
        })
        .map(|s| s.to_string())
}

/// Splits normalized text into ordered named sections with byte offsets.
pub fn split_sections(text: &str, kind: DocumentKind) -> Vec<DocumentSection> {
    let mut sections: Vec<DocumentSection> = Vec::new();
    let mut current_name = "preamble".to_string();
    let mut current_start = 0usize;
    let mut current_body: Vec<&str> = Vec::new();
    let mut offset = 0usize;

    for line in text.lines() {
        if let Some(name) = heading_name(line, kind) {
            let body = current_body.join("\n");
            if !body.trim().is_empty() {
                sections.push(DocumentSection {
                    name: current_name.clone(),
                    text: body,
                    offset: current_start,
                });
            }
            current_name = name;
            current_body = Vec::new();
            current_start = offset + line.len() + 1;
        } else {
            current_body.push(line);
        }
        offset += line.len() + 1;
    }

    let body = current_body.join("\n");
    if !body.trim().is_empty() {
        sections.push(DocumentSection {
            name: current_name,
            text: body,
            offset: current_start,
        });
    }

    sections
}

/// Splits section texts into chunks bounded by `MAX_CHUNK_CHARS`,
/// breaking on paragraph boundaries where possible.
pub fn chunk_sections(sections: &[DocumentSection]) -> Vec<String> {
    let mut chunks = Vec::new();
    for section in sections {
        let mut current = String::new();
        for paragraph in section.text.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            if !current.is_empty() && current.len() + paragraph.len() + 2 > MAX_CHUNK_CHARS {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
            // A single oversized paragraph still becomes its own chunk.
            while current.len() > MAX_CHUNK_CHARS {
                let mut boundary = MAX_CHUNK_CHARS;
                while !current.is_char_boundary(boundary) {
                    boundary -= 1;
                }
                let split_at = current[..boundary].rfind(' ').unwrap_or(boundary);
                let rest = current.split_off(split_at);
                chunks.push(std::mem::take(&mut current));
                current = rest.trim_start().to_string();
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESUME: &str = "Jane Doe\njane@example.com\n\nExperience\nBuilt data pipelines in Python at Acme.\nLed a team of 4 engineers.\n\nSkills\nPython, Kubernetes, PostgreSQL\n\nInterests\nChess, hiking";

    #[test]
    fn test_split_sections_finds_named_sections() {
        let sections = split_sections(SAMPLE_RESUME, DocumentKind::Resume);
        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["preamble", "experience", "skills", "interests"]);
    }

    #[test]
    fn test_split_sections_keeps_body_text() {
        let sections = split_sections(SAMPLE_RESUME, DocumentKind::Resume);
        let experience = sections.iter().find(|s| s.name == "experience").unwrap();
        assert!(experience.text.contains("data pipelines"));
    }

    #[test]
    fn test_split_sections_offsets_are_ascending() {
        let sections = split_sections(SAMPLE_RESUME, DocumentKind::Resume);
        for pair in sections.windows(2) {
            assert!(pair[0].offset < pair[1].offset);
        }
    }

    #[test]
    fn test_jd_headings_do_not_match_resume_text() {
        // "Skills" is a resume heading, not a JD heading.
        let sections = split_sections("Skills\nRust required", DocumentKind::Jd);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "preamble");
    }

    #[test]
    fn test_normalize_whitespace_collapses_blank_runs() {
        let input = "a\n\n\n\nb  \n c ";
        assert_eq!(normalize_whitespace(input), "a\n\nb\nc");
    }

    #[test]
    fn test_chunk_sections_respects_bound() {
        let long = "word ".repeat(600); // ~3000 chars
        let sections = vec![DocumentSection {
            name: "experience".into(),
            text: long,
            offset: 0,
        }];
        let chunks = chunk_sections(&sections);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= MAX_CHUNK_CHARS + 1);
        }
    }

    #[test]
    fn test_chunk_sections_empty_input() {
        assert!(chunk_sections(&[]).is_empty());
    }
}
