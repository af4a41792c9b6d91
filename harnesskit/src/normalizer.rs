//! Connection normalizer
//!
//! Rewrites the shorthand a harness author (or an editor dialog) writes in the
//! `connections` section into the flat-list form the diagram engine accepts.
//!
//! ```text
//! connections:                         connections:
//!   - X1.GND:                            - [{X1: GND}, W1, {X2: GND}]
//!       - X2.GND: W1          ==>        - [{X1: GND}, W2, {X3: GND}]
//!       - X3.GND: W2                     - [{X1: VCC}, {X2: VCC}]
//!   - X1.VCC: X2.VCC
//! ```
//!
//! # Pipeline
//!
//! 1. Move `cables.*.label` into `cables.*.notes`
//! 2. Collect the connector designators
//! 3. Classify each connection entry ([`ConnectionEntry`])
//! 4. Expand fan-outs and resolve `Designator.Pin` shorthand
//!
//! Normalization is total: every input produces an output, and shapes it does
//! not recognise are passed through for the engine to report.

use std::collections::HashSet;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::document::Document;

// ── Options & report ───────────────────────────────────────

/// Options for a normalization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Fold `label` on cables into `notes`. The engine rejects `label` there.
    pub relocate_cable_labels: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            relocate_cable_labels: true,
        }
    }
}

/// Counters describing what a normalization run rewrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub labels_relocated: usize,
    pub shorthand_resolved: usize,
    pub fan_outs_expanded: usize,
    pub branches_emitted: usize,
    pub direct_links: usize,
    pub chains: usize,
    pub empty_dropped: usize,
    pub passed_through: usize,
}

impl NormalizeReport {
    /// Number of source entries that were reshaped (fan-outs, links, drops).
    pub fn reshaped_entries(&self) -> usize {
        self.fan_outs_expanded + self.direct_links + self.empty_dropped
    }

    /// True if the run changed nothing beyond copying the document.
    pub fn is_noop(&self) -> bool {
        self.labels_relocated == 0 && self.shorthand_resolved == 0 && self.reshaped_entries() == 0
    }
}

// ── Known connectors ───────────────────────────────────────

/// Connector designators of one document, used to decide whether `"D.P"` is a
/// pin reference or just text containing a dot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownConnectors(HashSet<String>);

impl KnownConnectors {
    pub fn from_document(document: &Document) -> Self {
        let designators = document
            .get("connectors")
            .and_then(Value::as_mapping)
            .map(|connectors| {
                connectors
                    .keys()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self(designators)
    }

    pub fn contains(&self, designator: &str) -> bool {
        self.0.contains(designator)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for KnownConnectors {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Build the connector set for `document`. Empty when `connectors` is missing
/// or not a mapping.
pub fn known_connectors(document: &Document) -> KnownConnectors {
    KnownConnectors::from_document(document)
}

// ── Connection entries ─────────────────────────────────────

/// Shape of one raw entry of the `connections` list.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEntry {
    /// `{start: [branch, ...]}`: one endpoint fanning out to several.
    FanOut { start: Value, branches: Vec<Value> },
    /// `{start: end}`: a single two-node link.
    DirectLink { start: Value, end: Value },
    /// `[node, node, ...]`: already a chain.
    FlatChain(Vec<Value>),
    /// `{}`
    Empty,
    /// Anything else; left for the engine to judge.
    Other(Value),
}

impl ConnectionEntry {
    pub fn classify(entry: Value) -> Self {
        match entry {
            Value::Sequence(elements) => ConnectionEntry::FlatChain(elements),
            Value::Mapping(map) if map.len() > 1 => ConnectionEntry::Other(Value::Mapping(map)),
            Value::Mapping(map) => match map.into_iter().next() {
                None => ConnectionEntry::Empty,
                Some((start, Value::Sequence(branches))) => {
                    ConnectionEntry::FanOut { start, branches }
                }
                Some((start, end)) => ConnectionEntry::DirectLink { start, end },
            },
            other => ConnectionEntry::Other(other),
        }
    }
}

// ── Node resolution ────────────────────────────────────────

/// Resolve `"Designator.Pin"` into `{Designator: Pin}` when the designator is a
/// known connector. Any other node is returned as given.
///
/// The text must hold exactly one dot with something on both sides of it, so
/// wire labels such as `"s.somewire"` and auto-generated instances such as
/// `"F."` are never taken for pin references.
pub fn resolve(node: Value, known: &KnownConnectors) -> Value {
    match split_pin_shorthand(&node, known) {
        Some((designator, pin)) => pin_mapping(designator, pin),
        None => node,
    }
}

fn split_pin_shorthand<'a>(node: &'a Value, known: &KnownConnectors) -> Option<(&'a str, &'a str)> {
    let text = node.as_str()?;
    let (designator, pin) = text.split_once('.')?;
    if designator.is_empty() || pin.is_empty() || pin.contains('.') {
        return None;
    }
    known.contains(designator).then_some((designator, pin))
}

fn pin_mapping(designator: &str, pin: &str) -> Value {
    let mut map = Mapping::new();
    map.insert(
        Value::String(designator.to_string()),
        Value::String(pin.to_string()),
    );
    Value::Mapping(map)
}

// ── Cable labels ───────────────────────────────────────────

/// Move every cable's `label` into its `notes`, appending on a new line when
/// notes already exist. Returns how many cables were changed.
pub fn relocate_cable_labels(document: &mut Document) -> usize {
    let Some(cables) = document.get_mut("cables").and_then(Value::as_mapping_mut) else {
        return 0;
    };

    let mut relocated = 0;
    for (designator, cable) in cables.iter_mut() {
        let Some(attributes) = cable.as_mapping_mut() else {
            continue;
        };
        let Some(label) = attributes.shift_remove("label") else {
            continue;
        };

        let prior = attributes
            .get("notes")
            .filter(|notes| !notes.is_null())
            .map(value_text);
        let notes = match prior {
            Some(prior) => Value::String(format!("{}\n{}", prior, value_text(&label))),
            None => label,
        };
        attributes.insert(Value::String("notes".to_string()), notes);

        tracing::debug!("Moved label of cable {} into notes", value_text(designator));
        relocated += 1;
    }
    relocated
}

/// Text form of a value as it would be shown in a note.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

// ── Normalizer ─────────────────────────────────────────────

/// Flattens a `connections` list against one document's connector set.
pub struct ConnectionNormalizer<'a> {
    known: &'a KnownConnectors,
    report: NormalizeReport,
}

impl<'a> ConnectionNormalizer<'a> {
    pub fn new(known: &'a KnownConnectors) -> Self {
        Self {
            known,
            report: NormalizeReport::default(),
        }
    }

    /// Rewrite `entries` into flat chains, keeping their relative order.
    pub fn flatten(&mut self, entries: Vec<Value>) -> Vec<Value> {
        let mut out = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            self.expand(index, ConnectionEntry::classify(entry), &mut out);
        }
        out
    }

    pub fn report(&self) -> &NormalizeReport {
        &self.report
    }

    pub fn into_report(self) -> NormalizeReport {
        self.report
    }

    fn expand(&mut self, index: usize, entry: ConnectionEntry, out: &mut Vec<Value>) {
        match entry {
            ConnectionEntry::FanOut { start, branches } => {
                tracing::debug!("connections[{}]: fan-out into {} branches", index, branches.len());
                self.report.fan_outs_expanded += 1;
                for branch in branches {
                    let chain = self.branch_chain(start.clone(), branch);
                    out.push(Value::Sequence(chain));
                    self.report.branches_emitted += 1;
                }
            }
            ConnectionEntry::DirectLink { start, end } => {
                tracing::debug!("connections[{}]: direct link", index);
                self.report.direct_links += 1;
                let chain = vec![self.resolve(start), self.resolve(end)];
                out.push(Value::Sequence(chain));
            }
            ConnectionEntry::FlatChain(elements) => {
                self.report.chains += 1;
                let chain = elements.into_iter().map(|node| self.resolve(node)).collect();
                out.push(Value::Sequence(chain));
            }
            ConnectionEntry::Empty => {
                tracing::debug!("connections[{}]: dropping empty entry", index);
                self.report.empty_dropped += 1;
            }
            ConnectionEntry::Other(value) => {
                tracing::trace!("connections[{}]: passed through unchanged", index);
                self.report.passed_through += 1;
                out.push(value);
            }
        }
    }

    /// `start, via-value, via-designator` for `{via: value}` branches,
    /// `start, branch` otherwise.
    fn branch_chain(&mut self, start: Value, branch: Value) -> Vec<Value> {
        let mut chain = vec![self.resolve(start)];
        match branch {
            Value::Mapping(map) if !map.is_empty() => {
                if let Some((via, value)) = map.into_iter().next() {
                    chain.push(self.resolve(value));
                    chain.push(self.resolve(via));
                }
            }
            other => chain.push(self.resolve(other)),
        }
        chain
    }

    fn resolve(&mut self, node: Value) -> Value {
        match split_pin_shorthand(&node, self.known) {
            Some((designator, pin)) => {
                self.report.shorthand_resolved += 1;
                pin_mapping(designator, pin)
            }
            None => node,
        }
    }
}

// ── Public API ─────────────────────────────────────────────

/// Normalize a document into the form the diagram engine accepts.
///
/// Non-mapping documents are returned unchanged. A missing or non-list
/// `connections` section leaves connections alone; cable labels are still
/// relocated.
pub fn normalize(document: Document) -> Document {
    normalize_with(document, &NormalizeOptions::default()).0
}

/// [`normalize`], also returning what was rewritten.
pub fn normalize_with_report(document: Document) -> (Document, NormalizeReport) {
    normalize_with(document, &NormalizeOptions::default())
}

pub fn normalize_with(mut document: Document, options: &NormalizeOptions) -> (Document, NormalizeReport) {
    if !document.is_mapping() {
        return (document, NormalizeReport::default());
    }

    let labels_relocated = if options.relocate_cable_labels {
        relocate_cable_labels(&mut document)
    } else {
        0
    };

    let known = KnownConnectors::from_document(&document);
    let mut normalizer = ConnectionNormalizer::new(&known);
    if let Some(Value::Sequence(entries)) = document.get_mut("connections") {
        let source = std::mem::take(entries);
        *entries = normalizer.flatten(source);
    }

    let mut report = normalizer.into_report();
    report.labels_relocated = labels_relocated;
    tracing::debug!(
        "Normalized document: {} entries reshaped, {} pin references resolved",
        report.reshaped_entries(),
        report.shorthand_resolved
    );
    (document, report)
}
