//! Example Harness Catalog
//!
//! This module provides example harness documents from:
//! 1. YAML files compiled into the binary (always available)
//! 2. A user directory of `.yml`/`.yaml` files, loaded at runtime
//!
//! Users can add their own starting points by dropping YAML files into a
//! directory without recompiling.

use std::path::Path;

use serde::Serialize;

use crate::document::{parse_document, Document, DocumentError};

// Embed the bundled examples into the binary
const EMBEDDED_DEMO_01: &str = include_str!("../designs/demo01.yml");
const EMBEDDED_DEMO_02: &str = include_str!("../designs/demo02.yml");
const EMBEDDED_EXAMPLE_01: &str = include_str!("../designs/example01.yml");
const EMBEDDED_EXAMPLE_02: &str = include_str!("../designs/example02.yml");
const EMBEDDED_EXAMPLE_03: &str = include_str!("../designs/example03.yml");
const EMBEDDED_EXAMPLE_04: &str = include_str!("../designs/example04.yml");
const EMBEDDED_EXAMPLE_05: &str = include_str!("../designs/example05.yml");
const EMBEDDED_EXAMPLE_06: &str = include_str!("../designs/example06.yml");
const EMBEDDED_EXAMPLE_07: &str = include_str!("../designs/example07.yml");
const EMBEDDED_EXAMPLE_08: &str = include_str!("../designs/example08.yml");
const EMBEDDED_EXAMPLE_09: &str = include_str!("../designs/example09.yml");
const EMBEDDED_EXAMPLE_10: &str = include_str!("../designs/example10.yml");
const EMBEDDED_EXAMPLE_11: &str = include_str!("../designs/example11.yml");
const EMBEDDED_EXAMPLE_12: &str = include_str!("../designs/example12.yml");
const EMBEDDED_EXAMPLE_13: &str = include_str!("../designs/example13.yml");
const EMBEDDED_EXAMPLE_14: &str = include_str!("../designs/example14.yml");
const EMBEDDED_SERIAL_CROSSOVER: &str = include_str!("../designs/serial_crossover.yml");
const EMBEDDED_POWER_TEMPLATES: &str = include_str!("../designs/power_templates.yml");
const EMBEDDED_BATTERY_STORAGE: &str = include_str!("../designs/battery_storage.yml");

/// A named example harness document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessExample {
    pub name: String,
    pub source: String,
}

impl HarnessExample {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn document(&self) -> Result<Document, DocumentError> {
        parse_document(&self.source)
    }
}

/// Get all bundled examples, in menu order
pub fn get_all_examples() -> Vec<HarnessExample> {
    [
        ("Demo 01", EMBEDDED_DEMO_01),
        ("Demo 02", EMBEDDED_DEMO_02),
        ("Example 01", EMBEDDED_EXAMPLE_01),
        ("Example 02", EMBEDDED_EXAMPLE_02),
        ("Example 03", EMBEDDED_EXAMPLE_03),
        ("Example 04", EMBEDDED_EXAMPLE_04),
        ("Example 05", EMBEDDED_EXAMPLE_05),
        ("Example 06", EMBEDDED_EXAMPLE_06),
        ("Example 07", EMBEDDED_EXAMPLE_07),
        ("Example 08", EMBEDDED_EXAMPLE_08),
        ("Example 09", EMBEDDED_EXAMPLE_09),
        ("Example 10", EMBEDDED_EXAMPLE_10),
        ("Example 11", EMBEDDED_EXAMPLE_11),
        ("Example 12", EMBEDDED_EXAMPLE_12),
        ("Example 13", EMBEDDED_EXAMPLE_13),
        ("Example 14", EMBEDDED_EXAMPLE_14),
        ("Serial Crossover", EMBEDDED_SERIAL_CROSSOVER),
        ("Power Templates", EMBEDDED_POWER_TEMPLATES),
        ("Battery Storage", EMBEDDED_BATTERY_STORAGE),
    ]
    .into_iter()
    .map(|(name, source)| HarnessExample::new(name, source))
    .collect()
}

/// Find a bundled example by name, ignoring case.
pub fn find_example(name: &str) -> Option<HarnessExample> {
    get_all_examples()
        .into_iter()
        .find(|example| example.name.eq_ignore_ascii_case(name.trim()))
}

/// Load examples from a directory of YAML files.
/// Returns both the loaded examples and any errors encountered.
pub fn load_examples_from_directory(dir: &Path) -> (Vec<HarnessExample>, Vec<String>) {
    let mut examples = Vec::new();
    let mut errors = Vec::new();

    if !dir.is_dir() {
        return (examples, errors);
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            errors.push(format!("Failed to read directory {:?}: {}", dir, e));
            return (examples, errors);
        }
    };

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| is_harness_file(path))
        .collect();
    paths.sort();

    for path in paths {
        match load_example_from_file(&path) {
            Ok(example) => {
                tracing::info!("Loaded example '{}' from {:?}", example.name, path.file_name());
                examples.push(example);
            }
            Err(e) => {
                let error_msg = format!("Failed to load {:?}: {}", path.file_name(), e);
                tracing::warn!("{}", error_msg);
                errors.push(error_msg);
            }
        }
    }

    (examples, errors)
}

/// Load a single example, checking that it parses. The name is the file stem.
pub fn load_example_from_file(path: &Path) -> Result<HarnessExample, String> {
    let source = std::fs::read_to_string(path).map_err(|e| format!("Failed to read file: {}", e))?;
    parse_document(&source).map_err(|e| format!("Failed to parse YAML: {}", e))?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unnamed")
        .to_string();
    Ok(HarnessExample::new(name, source))
}

/// `.yml` or `.yaml`, any case.
pub fn is_harness_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{normalize, normalize_with_report};

    #[test]
    fn test_all_examples_parse() {
        let examples = get_all_examples();
        assert_eq!(examples.len(), 19);
        assert_eq!(examples[0].name, "Demo 01");
        assert_eq!(examples[15].name, "Example 14");
        for example in &examples {
            let doc = example.document();
            assert!(doc.is_ok(), "{} failed to parse: {:?}", example.name, doc.err());
        }
    }

    #[test]
    fn test_all_examples_normalize_idempotently() {
        for example in get_all_examples() {
            let once = normalize(example.document().unwrap());
            let twice = normalize(once.clone());
            assert_eq!(once, twice, "{} is not stable under normalization", example.name);
        }
    }

    #[test]
    fn test_find_example_ignores_case() {
        assert!(find_example("demo 01").is_some());
        assert!(find_example("  BATTERY STORAGE ").is_some());
        assert!(find_example("Example 99").is_none());
    }

    #[test]
    fn test_battery_storage_expands_fan_outs() {
        let example = find_example("Battery Storage").unwrap();
        let (doc, report) = normalize_with_report(example.document().unwrap());

        assert_eq!(report.labels_relocated, 4);
        assert_eq!(report.fan_outs_expanded, 9);
        assert_eq!(report.direct_links, 1);
        assert_eq!(doc["connections"].as_sequence().unwrap().len(), 11);
        assert_eq!(
            doc["cables"]["Inv_Pos_1"]["notes"].as_str(),
            Some("Torque to 25 Nm\nFUSE1 -> INV BAT1+")
        );
    }

    #[test]
    fn test_ferrule_instances_not_resolved() {
        let example = find_example("Example 04").unwrap();
        let (doc, report) = normalize_with_report(example.document().unwrap());
        assert_eq!(report.shorthand_resolved, 0);
        assert_eq!(doc["connections"][0][0].as_str(), Some("F."));
    }

    #[test]
    fn test_demo_02_merges_template_sequence() {
        let doc = find_example("Demo 02").unwrap().document().unwrap();
        let x2 = &doc["connectors"]["X2"];
        assert_eq!(x2["type"].as_str(), Some("Molex KK 254"));
        assert_eq!(x2["pinlabels"].as_sequence().map(Vec::len), Some(4));
        assert!(x2.get("<<").is_none());
        assert_eq!(doc["connectors"]["X3"]["subtype"].as_str(), Some("female"));
    }

    #[test]
    fn test_splice_instances_kept_with_known_designator() {
        let doc = find_example("Example 14").unwrap().document().unwrap();
        assert!(doc["connectors"].get("S").is_some());

        let (doc, report) = normalize_with_report(doc);
        assert_eq!(report.shorthand_resolved, 0);
        assert_eq!(doc["connections"][0][4].as_str(), Some("S."));
    }

    #[test]
    fn test_load_examples_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_good.yml"), "connectors: {X1: {}}\n").unwrap();
        std::fs::write(dir.path().join("b_broken.yaml"), "connectors: [X1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a harness").unwrap();

        let (examples, errors) = load_examples_from_directory(dir.path());
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].name, "a_good");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("b_broken"));
    }

    #[test]
    fn test_load_examples_missing_directory() {
        let (examples, errors) = load_examples_from_directory(Path::new("does/not/exist"));
        assert!(examples.is_empty());
        assert!(errors.is_empty());
    }
}
