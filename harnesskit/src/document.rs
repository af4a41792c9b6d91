//! Harness documents
//!
//! A document is the parsed form of a harness YAML file: a mapping with the
//! optional sections `metadata`, `connectors`, `cables`, `connections` and
//! `mates`. It is kept as a [`serde_yaml::Value`] so key order, templates and
//! any sections this crate does not know about survive a round-trip through
//! the editor.

use std::fmt;
use std::str::FromStr;

use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Parsed harness document.
pub type Document = Value;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("YAML error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("YAML error: {0}")]
    Yaml(String),
    #[error("Document is not a mapping")]
    NotAMapping,
    #[error("Section '{section}' must be a {expected}")]
    SectionShape {
        section: Section,
        expected: &'static str,
    },
    #[error("Fragment for section '{section}' must be a mapping")]
    FragmentShape { section: Section },
    #[error("Unknown section: {0}")]
    UnknownSection(String),
}

impl DocumentError {
    /// 1-based line of a syntax error, if the parser reported one.
    pub fn line(&self) -> Option<usize> {
        match self {
            DocumentError::Syntax { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for DocumentError {
    fn from(e: serde_yaml::Error) -> Self {
        match e.location() {
            Some(location) => DocumentError::Syntax {
                line: location.line(),
                column: location.column(),
                message: e.to_string(),
            },
            None => DocumentError::Yaml(e.to_string()),
        }
    }
}

/// Top-level sections of a harness document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Metadata,
    Connectors,
    Cables,
    Connections,
    Mates,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Metadata,
        Section::Connectors,
        Section::Cables,
        Section::Connections,
        Section::Mates,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Section::Metadata => "metadata",
            Section::Connectors => "connectors",
            Section::Cables => "cables",
            Section::Connections => "connections",
            Section::Mates => "mates",
        }
    }

    /// List sections take one new entry per fragment; the others merge keys.
    pub fn is_list(&self) -> bool {
        matches!(self, Section::Connections | Section::Mates)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Section {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.key() == s)
            .ok_or_else(|| DocumentError::UnknownSection(s.to_string()))
    }
}

/// Parse harness YAML, expanding `<<: *template` merge keys.
///
/// Empty text yields a null document.
pub fn parse_document(text: &str) -> Result<Document, DocumentError> {
    let mut document = parse_document_raw(text)?;
    document.apply_merge()?;
    Ok(document)
}

/// Parse harness YAML without touching merge keys.
pub fn parse_document_raw(text: &str) -> Result<Document, DocumentError> {
    Ok(serde_yaml::from_str(text)?)
}

pub fn to_yaml(document: &Document) -> Result<String, DocumentError> {
    Ok(serde_yaml::to_string(document)?)
}

/// Merge `fragment` into `section` of `document`.
///
/// `metadata`, `connectors` and `cables` take a mapping fragment whose keys
/// replace same-named entries. `connections` and `mates` take any value and
/// append it as one new entry. A null document becomes an empty mapping and a
/// missing or null section is created.
pub fn update_section(
    document: &mut Document,
    section: Section,
    fragment: Value,
) -> Result<(), DocumentError> {
    if document.is_null() {
        *document = Value::Mapping(Mapping::new());
    }
    let root = document.as_mapping_mut().ok_or(DocumentError::NotAMapping)?;

    let key = Value::String(section.key().to_string());
    let slot = root.entry(key).or_insert(Value::Null);

    if section.is_list() {
        if slot.is_null() {
            *slot = Value::Sequence(Vec::new());
        }
        let entries = slot.as_sequence_mut().ok_or(DocumentError::SectionShape {
            section,
            expected: "list",
        })?;
        entries.push(fragment);
    } else {
        let Value::Mapping(additions) = fragment else {
            return Err(DocumentError::FragmentShape { section });
        };
        if slot.is_null() {
            *slot = Value::Mapping(Mapping::new());
        }
        let entries = slot.as_mapping_mut().ok_or(DocumentError::SectionShape {
            section,
            expected: "mapping",
        })?;
        for (name, value) in additions {
            entries.insert(name, value);
        }
    }

    tracing::debug!("Updated section '{}'", section);
    Ok(())
}

/// Parse `text`, merge `fragment` into `section` and serialize the result.
///
/// Merge keys are left as written so the editor keeps its templates.
pub fn update_section_text(
    text: &str,
    section: Section,
    fragment: Value,
) -> Result<String, DocumentError> {
    let mut document = parse_document_raw(text)?;
    update_section(&mut document, section, fragment)?;
    to_yaml(&document)
}
