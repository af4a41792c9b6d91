//! Rendering Engine Interface
//!
//! The diagram engine lives outside this crate. This module defines what it
//! is handed (always a normalized document) and what it may hand back, so a
//! front-end can swap engines without touching the normalization step.

use thiserror::Error;

use crate::document::{parse_document, Document, DocumentError};
use crate::normalizer::normalize;

/// Output requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Png,
    Svg,
    Html,
    /// The engine's structured view of the harness (connectors, cables,
    /// mates, bill of materials).
    Harness,
}

impl OutputKind {
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            OutputKind::Png => Some("png"),
            OutputKind::Svg => Some("svg"),
            OutputKind::Html => Some("html"),
            OutputKind::Harness => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutput {
    Image { kind: OutputKind, bytes: Vec<u8> },
    Harness(Document),
}

#[derive(Debug, Error)]
pub enum RenderError {
    /// The layout executable the engine drives could not be found.
    #[error("Rendering engine unavailable: {0}")]
    EngineUnavailable(String),
    /// The engine rejected the document (undefined designators, pin counts).
    #[error("Invalid harness: {0}")]
    Validation(String),
    #[error(transparent)]
    Parse(#[from] DocumentError),
}

/// A diagram engine that accepts normalized documents.
pub trait RenderEngine {
    fn name(&self) -> &str;

    /// Whether the engine can run (its external tools are installed).
    fn is_available(&self) -> bool;

    fn render(&self, document: &Document, kind: OutputKind) -> Result<RenderOutput, RenderError>;
}

/// Parse editor text, normalize it, and hand it to `engine`.
pub fn render_text(
    engine: &dyn RenderEngine,
    text: &str,
    kind: OutputKind,
) -> Result<RenderOutput, RenderError> {
    let document = normalize(parse_document(text)?);
    render_document(engine, &document, kind)
}

/// Hand an already-normalized document to `engine`.
pub fn render_document(
    engine: &dyn RenderEngine,
    document: &Document,
    kind: OutputKind,
) -> Result<RenderOutput, RenderError> {
    if !engine.is_available() {
        return Err(RenderError::EngineUnavailable(engine.name().to_string()));
    }
    tracing::info!("Rendering {:?} with engine: {}", kind, engine.name());
    engine.render(document, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;
    use std::cell::RefCell;

    struct RecordingEngine {
        available: bool,
        seen: RefCell<Vec<Document>>,
    }

    impl RecordingEngine {
        fn new(available: bool) -> Self {
            Self {
                available,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl RenderEngine for RecordingEngine {
        fn name(&self) -> &str {
            "recording"
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn render(&self, document: &Document, kind: OutputKind) -> Result<RenderOutput, RenderError> {
            self.seen.borrow_mut().push(document.clone());
            if document.get("connectors").is_none() {
                return Err(RenderError::Validation("no connectors defined".into()));
            }
            match kind {
                OutputKind::Harness => Ok(RenderOutput::Harness(document.clone())),
                kind => Ok(RenderOutput::Image {
                    kind,
                    bytes: vec![0x89, b'P', b'N', b'G'],
                }),
            }
        }
    }

    const FAN_OUT: &str = "connectors: {A: {}, B: {}}\ncables:\n  W1: {label: main}\nconnections:\n  - A.1:\n      - B.2: W1\n";

    #[test]
    fn test_engine_receives_normalized_document() {
        let engine = RecordingEngine::new(true);
        let output = render_text(&engine, FAN_OUT, OutputKind::Harness).unwrap();

        let expected: Value = serde_yaml::from_str(
            "connectors: {A: {}, B: {}}\ncables:\n  W1: {notes: main}\nconnections:\n  - [{A: '1'}, W1, {B: '2'}]\n",
        )
        .unwrap();
        assert_eq!(output, RenderOutput::Harness(expected.clone()));
        assert_eq!(engine.seen.borrow().as_slice(), &[expected]);
    }

    #[test]
    fn test_unavailable_engine() {
        let engine = RecordingEngine::new(false);
        let err = render_text(&engine, FAN_OUT, OutputKind::Png).unwrap_err();
        assert!(matches!(err, RenderError::EngineUnavailable(ref name) if name == "recording"));
        assert!(engine.seen.borrow().is_empty());
    }

    #[test]
    fn test_parse_error_never_reaches_engine() {
        let engine = RecordingEngine::new(true);
        let err = render_text(&engine, "connectors: [unclosed\n", OutputKind::Svg).unwrap_err();
        assert!(matches!(err, RenderError::Parse(_)));
        assert!(engine.seen.borrow().is_empty());
    }

    #[test]
    fn test_engine_validation_error_surfaces() {
        let engine = RecordingEngine::new(true);
        let err = render_text(&engine, "connections:\n  - [X1.1, X2.1]\n", OutputKind::Png).unwrap_err();
        assert!(err.to_string().contains("no connectors"));
    }

    #[test]
    fn test_output_extensions() {
        assert_eq!(OutputKind::Svg.extension(), Some("svg"));
        assert_eq!(OutputKind::Harness.extension(), None);
    }
}
