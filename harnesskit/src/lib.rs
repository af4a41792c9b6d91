//! HarnessKit - wiring-harness document normalization library
//!
//! This library prepares wiring-harness YAML documents for a diagram engine.
//! Authors write connections in whatever shorthand is convenient; the engine
//! only accepts flat connection chains. HarnessKit sits in between.
//!
//! # Quick Start
//!
//! ```
//! use harnesskit::{normalize, parse_document};
//!
//! let document = parse_document(
//!     "connectors: {A: {}, B: {}, C: {}}\n\
//!      connections:\n  - A:\n      - B: W1\n      - C: W2\n",
//! )
//! .unwrap();
//!
//! let canonical = normalize(document);
//! let expected = parse_document("[[A, W1, B], [A, W2, C]]").unwrap();
//! assert_eq!(canonical["connections"], expected);
//! ```
//!
//! # Features
//!
//! - **Normalization**: fan-outs, direct links and `Designator.Pin` shorthand
//!   become flat chains; cable labels move into notes
//! - **Editing**: typed connector/cable/connection/mate fragments merged into
//!   a document section by section
//! - **Examples**: bundled harness documents plus user example directories
//! - **Rendering seam**: a trait for the external diagram engine

pub mod catalog;
pub mod core;
pub mod document;
pub mod fragments;
pub mod normalizer;
pub mod render;

// Re-export main types
pub use crate::core::{
    discover_harness_files, HarnessCore, HarnessError, PrepareOptions, PreparedDocument,
};
pub use catalog::{find_example, get_all_examples, HarnessExample};
pub use document::{parse_document, to_yaml, update_section, Document, DocumentError, Section};
pub use fragments::{
    apply_fragment, CableFragment, ConnectionFragment, ConnectorFragment, Fragment, FragmentError,
    MateArrow, MateFragment, PinRef,
};
pub use normalizer::{
    normalize, normalize_with, normalize_with_report, ConnectionEntry, KnownConnectors,
    NormalizeOptions, NormalizeReport,
};
pub use render::{OutputKind, RenderEngine, RenderError, RenderOutput};

/// Prepare a harness file with default options (convenience wrapper).
pub fn prepare_file(path: &std::path::Path) -> Result<PreparedDocument, HarnessError> {
    HarnessCore::prepare_file(path, &PrepareOptions::default())
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        normalize, parse_document, Document, HarnessCore, HarnessError, NormalizeReport,
        PrepareOptions, PreparedDocument, Section,
    };
}
