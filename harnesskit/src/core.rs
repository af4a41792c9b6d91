//! Core preparation logic shared by every front-end.
//! No GUI or engine dependencies.

use std::path::{Path, PathBuf};

use crate::catalog::is_harness_file;
use crate::document::{parse_document, parse_document_raw, Document, DocumentError};
use crate::normalizer::{normalize_with, NormalizeOptions, NormalizeReport};

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options for preparing documents (CLI or GUI).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Expand `<<: *template` merge keys before normalizing.
    pub expand_merge_keys: bool,
    pub normalize: NormalizeOptions,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            expand_merge_keys: true,
            normalize: NormalizeOptions::default(),
        }
    }
}

/// A normalized document and what normalization changed.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub file: Option<PathBuf>,
    pub document: Document,
    pub report: NormalizeReport,
}

impl PreparedDocument {
    pub fn connection_count(&self) -> usize {
        self.document
            .get("connections")
            .and_then(|c| c.as_sequence())
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn changed(&self) -> bool {
        !self.report.is_noop()
    }
}

/// Recursively discover harness YAML files in a directory, sorted by path.
pub fn discover_harness_files(dir: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    let mut files = Vec::new();
    walk_dir(dir, &mut files, 0)?;
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>, depth: usize) -> Result<(), HarnessError> {
    if depth > 20 {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with('.') || name == "node_modules" || name == "target" || name == "build" {
                continue;
            }
            walk_dir(&path, files, depth + 1)?;
        } else if is_harness_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// Core preparation API used by every front-end.
pub struct HarnessCore;

impl HarnessCore {
    /// Parse and normalize editor text.
    pub fn prepare_text(text: &str, options: &PrepareOptions) -> Result<PreparedDocument, HarnessError> {
        let document = if options.expand_merge_keys {
            parse_document(text)?
        } else {
            parse_document_raw(text)?
        };
        let (document, report) = normalize_with(document, &options.normalize);
        Ok(PreparedDocument {
            file: None,
            document,
            report,
        })
    }

    /// Read, parse and normalize a single harness file.
    pub fn prepare_file(path: &Path, options: &PrepareOptions) -> Result<PreparedDocument, HarnessError> {
        let text = std::fs::read_to_string(path)?;
        let mut prepared = Self::prepare_text(&text, options)?;
        tracing::debug!("Prepared {}", path.display());
        prepared.file = Some(path.to_path_buf());
        Ok(prepared)
    }

    /// Prepare every harness file under `dir`. Stops at the first failure.
    pub fn prepare_project(dir: &Path, options: &PrepareOptions) -> Result<Vec<PreparedDocument>, HarnessError> {
        let files = discover_harness_files(dir)?;
        if files.is_empty() {
            tracing::warn!("No harness files found in {}", dir.display());
        }
        files
            .iter()
            .map(|path| Self::prepare_file(path, options))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_text_expands_templates_before_normalizing() {
        let text = "connectors:\n  X1: &kk\n    type: KK\n  X2:\n    <<: *kk\nconnections:\n  - X1.1: X2.1\n";
        let prepared = HarnessCore::prepare_text(text, &PrepareOptions::default()).unwrap();
        assert_eq!(prepared.document["connectors"]["X2"]["type"].as_str(), Some("KK"));
        assert_eq!(prepared.connection_count(), 1);
        assert!(prepared.changed());
    }

    #[test]
    fn test_prepare_text_keeps_merge_keys_when_asked() {
        let text = "connectors:\n  X1: &kk\n    type: KK\n  X2:\n    <<: *kk\n";
        let options = PrepareOptions {
            expand_merge_keys: false,
            ..Default::default()
        };
        let prepared = HarnessCore::prepare_text(text, &options).unwrap();
        assert!(prepared.document["connectors"]["X2"].get("<<").is_some());
    }

    #[test]
    fn test_discover_skips_hidden_and_build_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::create_dir_all(root.join("target")).unwrap();
        std::fs::write(root.join("top.yml"), "connectors: {}\n").unwrap();
        std::fs::write(root.join("sub/inner.yaml"), "cables: {}\n").unwrap();
        std::fs::write(root.join(".git/hidden.yml"), "{}\n").unwrap();
        std::fs::write(root.join("target/out.yml"), "{}\n").unwrap();
        std::fs::write(root.join("readme.md"), "# harness\n").unwrap();

        let files = discover_harness_files(root).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("sub/inner.yaml"), PathBuf::from("top.yml")]);
    }

    #[test]
    fn test_harness_error_sources() {
        let err = HarnessCore::prepare_text("connectors: [X1\n", &PrepareOptions::default()).unwrap_err();
        let message = err.to_string();
        match err {
            HarnessError::Document(e) => {
                assert!(e.line().is_some());
                assert!(message.starts_with("YAML error at line"));
            }
            HarnessError::Io(e) => panic!("unexpected IO error: {}", e),
        }

        let err = HarnessError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "IO error: gone");
    }

    #[test]
    fn test_prepare_file_missing() {
        let err = HarnessCore::prepare_file(Path::new("no/such/file.yml"), &PrepareOptions::default())
            .unwrap_err();
        assert!(matches!(err, HarnessError::Io(_)));
    }
}
