//! Document fragments
//!
//! Builders for the pieces an editor adds to a harness one at a time: a
//! connector, a cable, a connection chain, or a mate. Each fragment validates
//! its own fields and knows which [`Section`] it belongs to, so it can be
//! merged with [`apply_fragment`].

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::document::{update_section, Document, DocumentError, Section};

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid mate arrow '{0}' (expected one of ==>, <==, <==>, ==, -->, <--, <-->, --)")]
    InvalidArrow(String),
    #[error("Invalid pin reference '{0}' (expected DESIGNATOR:PIN)")]
    InvalidPinRef(String),
    #[error("Failed to build fragment: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// A piece of a harness document that belongs to one section.
pub trait Fragment {
    /// Section the fragment is merged into.
    fn section(&self) -> Section;

    /// YAML value handed to [`update_section`].
    fn to_value(&self) -> Result<Value, FragmentError>;
}

/// Validate `fragment` and merge it into `document`.
pub fn apply_fragment(document: &mut Document, fragment: &dyn Fragment) -> Result<(), FragmentError> {
    let value = fragment.to_value()?;
    update_section(document, fragment.section(), value)?;
    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn require<'a>(value: &'a str, field: &'static str) -> Result<&'a str, FragmentError> {
    let value = value.trim();
    if value.is_empty() {
        Err(FragmentError::MissingField(field))
    } else {
        Ok(value)
    }
}

/// Pin or wire identifier: integers stay integers, anything else is text.
pub fn pin_value(pin: &str) -> Value {
    let pin = pin.trim();
    match pin.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(pin.to_string()),
    }
}

fn no_items(list: &&[String]) -> bool {
    list.is_empty()
}

fn keyed(designator: &str, value: Value) -> Value {
    let mut map = Mapping::new();
    map.insert(Value::String(designator.to_string()), value);
    Value::Mapping(map)
}

// ── Connector ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectorFragment {
    pub designator: String,
    pub connector_type: Option<String>,
    pub subtype: Option<String>,
    pub manufacturer: Option<String>,
    pub mpn: Option<String>,
    pub pn: Option<String>,
    pub category: Option<String>,
    pub pins: Vec<String>,
    pub pinlabels: Vec<String>,
}

#[derive(Serialize)]
struct ConnectorAttributes<'a> {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    connector_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subtype: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manufacturer: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mpn: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pn: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pincount: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pins: Vec<Value>,
    #[serde(skip_serializing_if = "no_items")]
    pinlabels: &'a [String],
}

impl ConnectorFragment {
    pub fn new(designator: impl Into<String>) -> Self {
        Self {
            designator: designator.into(),
            ..Default::default()
        }
    }

    /// Pins the connector will have: one per label, else one per pin number.
    pub fn pincount(&self) -> Option<usize> {
        [self.pinlabels.len(), self.pins.len()]
            .into_iter()
            .find(|&n| n > 0)
    }
}

impl Fragment for ConnectorFragment {
    fn section(&self) -> Section {
        Section::Connectors
    }

    fn to_value(&self) -> Result<Value, FragmentError> {
        let designator = require(&self.designator, "designator")?;
        let attributes = ConnectorAttributes {
            connector_type: non_blank(&self.connector_type),
            subtype: non_blank(&self.subtype),
            manufacturer: non_blank(&self.manufacturer),
            mpn: non_blank(&self.mpn),
            pn: non_blank(&self.pn),
            category: non_blank(&self.category),
            pincount: self.pincount(),
            pins: self.pins.iter().map(|p| pin_value(p)).collect(),
            pinlabels: &self.pinlabels,
        };
        Ok(keyed(designator, serde_yaml::to_value(attributes)?))
    }
}

// ── Cable ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CableFragment {
    pub designator: String,
    pub cable_type: Option<String>,
    pub manufacturer: Option<String>,
    pub mpn: Option<String>,
    pub pn: Option<String>,
    pub category: Option<String>,
    pub gauge: Option<f64>,
    pub gauge_unit: Option<String>,
    /// Length in metres.
    pub length: Option<f64>,
    pub colors: Vec<String>,
    pub wirecount: Option<usize>,
    pub shield: bool,
}

#[derive(Serialize)]
struct CableAttributes<'a> {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    cable_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manufacturer: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mpn: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pn: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gauge: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gauge_unit: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wirecount: Option<usize>,
    #[serde(skip_serializing_if = "no_items")]
    colors: &'a [String],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    shield: bool,
}

impl CableFragment {
    pub fn new(designator: impl Into<String>) -> Self {
        Self {
            designator: designator.into(),
            ..Default::default()
        }
    }

    /// Explicit wire count, or one wire per colour.
    pub fn wirecount(&self) -> Option<usize> {
        self.wirecount
            .or_else(|| (!self.colors.is_empty()).then_some(self.colors.len()))
    }
}

impl Fragment for CableFragment {
    fn section(&self) -> Section {
        Section::Cables
    }

    fn to_value(&self) -> Result<Value, FragmentError> {
        let designator = require(&self.designator, "designator")?;
        let gauge_unit = non_blank(&self.gauge_unit);
        if gauge_unit.is_some() && self.gauge.is_none() {
            return Err(FragmentError::MissingField("gauge"));
        }
        let attributes = CableAttributes {
            cable_type: non_blank(&self.cable_type),
            manufacturer: non_blank(&self.manufacturer),
            mpn: non_blank(&self.mpn),
            pn: non_blank(&self.pn),
            category: non_blank(&self.category),
            gauge: self.gauge,
            gauge_unit,
            length: self.length,
            wirecount: self.wirecount(),
            colors: &self.colors,
            shield: self.shield,
        };
        Ok(keyed(designator, serde_yaml::to_value(attributes)?))
    }
}

// ── Connection ─────────────────────────────────────────────

/// `designator:pin` as typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRef {
    pub designator: String,
    pub pin: String,
}

impl PinRef {
    pub fn new(designator: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            designator: designator.into(),
            pin: pin.into(),
        }
    }

    fn to_value(&self, field: &'static str) -> Result<Value, FragmentError> {
        let designator = require(&self.designator, field)?;
        let pin = require(&self.pin, field)?;
        Ok(keyed(designator, pin_value(pin)))
    }
}

impl FromStr for PinRef {
    type Err = FragmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((designator, pin)) if !designator.trim().is_empty() && !pin.trim().is_empty() => {
                Ok(PinRef::new(designator.trim(), pin.trim()))
            }
            _ => Err(FragmentError::InvalidPinRef(s.to_string())),
        }
    }
}

impl fmt::Display for PinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.designator, self.pin)
    }
}

/// One pin-to-pin connection, optionally through a cable wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionFragment {
    pub from: PinRef,
    pub via: Option<PinRef>,
    pub to: PinRef,
}

impl Fragment for ConnectionFragment {
    fn section(&self) -> Section {
        Section::Connections
    }

    fn to_value(&self) -> Result<Value, FragmentError> {
        let mut chain = vec![self.from.to_value("from")?];
        if let Some(ref via) = self.via {
            chain.push(via.to_value("via")?);
        }
        chain.push(self.to.to_value("to")?);
        Ok(Value::Sequence(chain))
    }
}

// ── Mate ───────────────────────────────────────────────────

/// Whole-connector (`==`) or pin-to-pin (`--`) mate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MateKind {
    Connector,
    Pin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowDirection {
    Forward,
    Backward,
    Both,
    Undirected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MateArrow {
    pub kind: MateKind,
    pub direction: ArrowDirection,
}

impl MateArrow {
    pub const fn new(kind: MateKind, direction: ArrowDirection) -> Self {
        Self { kind, direction }
    }

    /// The arrows offered for one kind of mate, default first.
    pub fn choices(kind: MateKind) -> [MateArrow; 4] {
        [
            ArrowDirection::Forward,
            ArrowDirection::Backward,
            ArrowDirection::Both,
            ArrowDirection::Undirected,
        ]
        .map(|direction| MateArrow::new(kind, direction))
    }

    pub fn as_str(&self) -> &'static str {
        match (self.kind, self.direction) {
            (MateKind::Connector, ArrowDirection::Forward) => "==>",
            (MateKind::Connector, ArrowDirection::Backward) => "<==",
            (MateKind::Connector, ArrowDirection::Both) => "<==>",
            (MateKind::Connector, ArrowDirection::Undirected) => "==",
            (MateKind::Pin, ArrowDirection::Forward) => "-->",
            (MateKind::Pin, ArrowDirection::Backward) => "<--",
            (MateKind::Pin, ArrowDirection::Both) => "<-->",
            (MateKind::Pin, ArrowDirection::Undirected) => "--",
        }
    }
}

impl Default for MateArrow {
    fn default() -> Self {
        MateArrow::new(MateKind::Connector, ArrowDirection::Forward)
    }
}

impl fmt::Display for MateArrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MateArrow {
    type Err = FragmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [MateKind::Connector, MateKind::Pin]
            .into_iter()
            .flat_map(MateArrow::choices)
            .find(|arrow| arrow.as_str() == s)
            .ok_or_else(|| FragmentError::InvalidArrow(s.to_string()))
    }
}

/// Two connectors mated directly, written as `[from, arrow, to]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MateFragment {
    pub from: String,
    pub arrow: MateArrow,
    pub to: String,
}

impl Fragment for MateFragment {
    fn section(&self) -> Section {
        Section::Mates
    }

    fn to_value(&self) -> Result<Value, FragmentError> {
        let from = require(&self.from, "from")?;
        let to = require(&self.to, "to")?;
        Ok(Value::Sequence(vec![
            Value::String(from.to_string()),
            Value::String(self.arrow.as_str().to_string()),
            Value::String(to.to_string()),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_connector_fragment() {
        let connector = ConnectorFragment {
            connector_type: Some("Molex".into()),
            manufacturer: Some("  ".into()),
            pins: vec!["1".into(), "2".into()],
            pinlabels: vec!["GND".into(), "VCC".into()],
            ..ConnectorFragment::new("X2")
        };
        assert_eq!(
            connector.to_value().unwrap(),
            yaml("X2: {type: Molex, pincount: 2, pins: [1, 2], pinlabels: [GND, VCC]}")
        );
    }

    #[test]
    fn test_connector_requires_designator() {
        let err = ConnectorFragment::new(" ").to_value().unwrap_err();
        assert!(matches!(err, FragmentError::MissingField("designator")));
    }

    #[test]
    fn test_cable_fragment() {
        let cable = CableFragment {
            gauge: Some(0.25),
            gauge_unit: Some("mm2".into()),
            colors: vec!["WH".into(), "BK".into()],
            ..CableFragment::new("W1")
        };
        let value = cable.to_value().unwrap();
        assert_eq!(value["W1"]["gauge"], Value::from(0.25));
        assert_eq!(value["W1"]["gauge_unit"], Value::from("mm2"));
        assert_eq!(value["W1"]["colors"], yaml("[WH, BK]"));
        assert_eq!(value["W1"]["wirecount"], Value::from(2));
        assert!(value["W1"].get("shield").is_none());
    }

    #[test]
    fn test_cable_unit_without_gauge() {
        let cable = CableFragment {
            gauge_unit: Some("awg".into()),
            ..CableFragment::new("W1")
        };
        assert!(matches!(
            cable.to_value(),
            Err(FragmentError::MissingField("gauge"))
        ));
    }

    #[test]
    fn test_connection_fragment() {
        let connection = ConnectionFragment {
            from: "X1:1".parse().unwrap(),
            via: Some("W1:1".parse().unwrap()),
            to: "X2:1".parse().unwrap(),
        };
        assert_eq!(
            connection.to_value().unwrap(),
            yaml("[{X1: 1}, {W1: 1}, {X2: 1}]")
        );
    }

    #[test]
    fn test_connection_fragment_text_pins() {
        let connection = ConnectionFragment {
            from: PinRef::new("X1", "GND"),
            via: None,
            to: PinRef::new("X2", "s"),
        };
        assert_eq!(connection.to_value().unwrap(), yaml("[{X1: GND}, {X2: s}]"));
    }

    #[test]
    fn test_pin_ref_parse_errors() {
        for text in ["X1", ":1", "X1:", ""] {
            assert!(text.parse::<PinRef>().is_err(), "{:?} should not parse", text);
        }
    }

    #[test]
    fn test_mate_arrows() {
        assert_eq!(MateArrow::default().as_str(), "==>");
        assert_eq!(
            "<-->".parse::<MateArrow>().unwrap(),
            MateArrow::new(MateKind::Pin, ArrowDirection::Both)
        );
        assert!(matches!(
            "=>".parse::<MateArrow>(),
            Err(FragmentError::InvalidArrow(_))
        ));
        let labels: Vec<_> = MateArrow::choices(MateKind::Connector)
            .iter()
            .map(MateArrow::as_str)
            .collect();
        assert_eq!(labels, vec!["==>", "<==", "<==>", "=="]);
    }

    #[test]
    fn test_mate_fragment() {
        let mate = MateFragment {
            from: "X1".into(),
            arrow: MateArrow::default(),
            to: "X2".into(),
        };
        assert_eq!(mate.to_value().unwrap(), yaml("[X1, '==>', X2]"));

        let missing = MateFragment { to: "".into(), ..mate };
        assert!(matches!(
            missing.to_value(),
            Err(FragmentError::MissingField("to"))
        ));
    }

    #[test]
    fn test_apply_fragments_build_document() {
        let mut doc = Value::Null;
        apply_fragment(&mut doc, &ConnectorFragment::new("X1")).unwrap();
        apply_fragment(&mut doc, &ConnectorFragment::new("X2")).unwrap();
        apply_fragment(
            &mut doc,
            &MateFragment {
                from: "X1".into(),
                arrow: MateArrow::default(),
                to: "X2".into(),
            },
        )
        .unwrap();
        assert_eq!(
            doc,
            yaml("connectors: {X1: {}, X2: {}}\nmates:\n  - [X1, '==>', X2]\n")
        );
    }
}
