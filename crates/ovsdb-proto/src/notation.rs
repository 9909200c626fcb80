//! RFC 7047 value notation.
//!
//! OVSDB column values are JSON atoms plus three tagged pair forms:
//! `["uuid", s]`, `["named-uuid", s]`, `["set", [..]]` and
//! `["map", [[k, v], ..]]`. [`Datum`] covers all of them with explicit
//! encode/decode; a [`Row`] is an ordered column name → datum map.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ProtoError;

/// A row identifier assigned by the remote device.
///
/// Serializes as a bare UUID string (the form used for monitor row keys
/// and JSON-RPC parameters); inside a [`Datum`] it takes the
/// `["uuid", s]` pair form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uuid(uuid::Uuid);

impl Uuid {
    /// Generates a fresh random identifier (test fixtures and
    /// client-side request tags; real row UUIDs come from the device).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parses from the canonical hyphenated form.
    pub fn parse(s: &str) -> Result<Self, ProtoError> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ProtoError::Datum(format!("bad uuid {s:?}: {e}")))
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Uuid {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One column value in OVSDB notation.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    /// A resolved row identifier.
    Uuid(Uuid),
    /// A transaction-scoped forward reference to a row inserted in the
    /// same transaction.
    NamedUuid(String),
    Set(Vec<Datum>),
    Map(Vec<(Datum, Datum)>),
}

impl Datum {
    /// A set containing a single resolved identifier.
    ///
    /// This is the operand shape used to detach one child from a
    /// parent's reference set with a `delete` mutator.
    pub fn uuid_singleton(uuid: Uuid) -> Self {
        Datum::Set(vec![Datum::Uuid(uuid)])
    }

    /// A set of resolved identifiers.
    pub fn uuid_set<I: IntoIterator<Item = Uuid>>(uuids: I) -> Self {
        Datum::Set(uuids.into_iter().map(Datum::Uuid).collect())
    }

    /// A set containing a single named (unresolved) identifier.
    pub fn named_singleton(name: impl Into<String>) -> Self {
        Datum::Set(vec![Datum::NamedUuid(name.into())])
    }

    /// Returns the string payload if this is a string atom.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the identifier if this is a uuid atom.
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Datum::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Collects the identifiers held by this datum: a uuid atom yields
    /// one, a set yields its uuid members, anything else yields none.
    pub fn uuids(&self) -> Vec<Uuid> {
        match self {
            Datum::Uuid(u) => vec![*u],
            Datum::Set(elems) => elems.iter().filter_map(Datum::as_uuid).collect(),
            _ => Vec::new(),
        }
    }

    /// Decodes a JSON value into a datum.
    pub fn from_value(value: Value) -> Result<Self, ProtoError> {
        match value {
            Value::String(s) => Ok(Datum::String(s)),
            Value::Bool(b) => Ok(Datum::Boolean(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Datum::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Datum::Real(f))
                } else {
                    Err(ProtoError::Datum(format!("unrepresentable number {n}")))
                }
            }
            Value::Array(arr) => Self::from_pair(arr),
            other => Err(ProtoError::Datum(format!("unexpected datum {other}"))),
        }
    }

    fn from_pair(arr: Vec<Value>) -> Result<Self, ProtoError> {
        if arr.len() != 2 {
            return Err(ProtoError::Datum(format!("expected 2-element pair, got {}", arr.len())));
        }
        let mut arr = arr.into_iter();
        let tag = arr.next().unwrap();
        let payload = arr.next().unwrap();
        let tag = tag
            .as_str()
            .ok_or_else(|| ProtoError::Datum(format!("non-string pair tag {tag}")))?
            .to_string();

        match tag.as_str() {
            "uuid" => {
                let s = payload
                    .as_str()
                    .ok_or_else(|| ProtoError::Datum("uuid payload is not a string".into()))?;
                Ok(Datum::Uuid(Uuid::parse(s)?))
            }
            "named-uuid" => {
                let s = payload
                    .as_str()
                    .ok_or_else(|| ProtoError::Datum("named-uuid payload is not a string".into()))?;
                Ok(Datum::NamedUuid(s.to_string()))
            }
            "set" => {
                let elems = payload
                    .as_array()
                    .ok_or_else(|| ProtoError::Datum("set payload is not an array".into()))?;
                elems
                    .iter()
                    .map(|v| Datum::from_value(v.clone()))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Datum::Set)
            }
            "map" => {
                let pairs = payload
                    .as_array()
                    .ok_or_else(|| ProtoError::Datum("map payload is not an array".into()))?;
                let mut out = Vec::with_capacity(pairs.len());
                for pair in pairs {
                    let kv = pair
                        .as_array()
                        .filter(|a| a.len() == 2)
                        .ok_or_else(|| ProtoError::Datum("map entry is not a [k, v] pair".into()))?;
                    out.push((
                        Datum::from_value(kv[0].clone())?,
                        Datum::from_value(kv[1].clone())?,
                    ));
                }
                Ok(Datum::Map(out))
            }
            other => Err(ProtoError::Datum(format!("unknown pair tag {other:?}"))),
        }
    }
}

impl Serialize for Datum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Datum::String(s) => serializer.serialize_str(s),
            Datum::Integer(i) => serializer.serialize_i64(*i),
            Datum::Real(f) => serializer.serialize_f64(*f),
            Datum::Boolean(b) => serializer.serialize_bool(*b),
            Datum::Uuid(u) => ("uuid", u.to_string()).serialize(serializer),
            Datum::NamedUuid(n) => ("named-uuid", n.as_str()).serialize(serializer),
            Datum::Set(elems) => ("set", elems).serialize(serializer),
            Datum::Map(pairs) => ("map", pairs).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Datum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Datum::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::String(s.to_string())
    }
}

impl From<String> for Datum {
    fn from(s: String) -> Self {
        Datum::String(s)
    }
}

impl From<i64> for Datum {
    fn from(i: i64) -> Self {
        Datum::Integer(i)
    }
}

impl From<bool> for Datum {
    fn from(b: bool) -> Self {
        Datum::Boolean(b)
    }
}

impl From<Uuid> for Datum {
    fn from(u: Uuid) -> Self {
        Datum::Uuid(u)
    }
}

/// An ordered column name → datum map.
pub type Row = BTreeMap<String, Datum>;

/// Builds a row from column/datum pairs.
pub fn row<I, S>(columns: I) -> Row
where
    I: IntoIterator<Item = (S, Datum)>,
    S: Into<String>,
{
    columns.into_iter().map(|(c, d)| (c.into(), d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn atoms_round_trip() {
        for (datum, expected) in [
            (Datum::String("br-test".into()), json!("br-test")),
            (Datum::Integer(4001), json!(4001)),
            (Datum::Boolean(true), json!(true)),
        ] {
            let encoded = serde_json::to_value(&datum).unwrap();
            assert_eq!(encoded, expected);
            assert_eq!(Datum::from_value(encoded).unwrap(), datum);
        }
    }

    #[test]
    fn uuid_pair_form() {
        let u = Uuid::parse("36bef046-7da7-43a5-905a-c17899216fcb").unwrap();
        let encoded = serde_json::to_value(Datum::Uuid(u)).unwrap();
        assert_eq!(encoded, json!(["uuid", "36bef046-7da7-43a5-905a-c17899216fcb"]));
        assert_eq!(Datum::from_value(encoded).unwrap(), Datum::Uuid(u));
    }

    #[test]
    fn named_uuid_pair_form() {
        let encoded = serde_json::to_value(Datum::NamedUuid("br_test".into())).unwrap();
        assert_eq!(encoded, json!(["named-uuid", "br_test"]));
    }

    #[test]
    fn set_of_integers() {
        let datum = Datum::Set(vec![100.into(), 101.into(), 4001.into()]);
        let encoded = serde_json::to_value(&datum).unwrap();
        assert_eq!(encoded, json!(["set", [100, 101, 4001]]));
        assert_eq!(Datum::from_value(encoded).unwrap(), datum);
    }

    #[test]
    fn uuid_singleton_is_one_element_set() {
        let u = Uuid::generate();
        let datum = Datum::uuid_singleton(u);
        assert_eq!(datum.uuids(), vec![u]);
        let encoded = serde_json::to_value(&datum).unwrap();
        let decoded = Datum::from_value(encoded).unwrap();
        assert_eq!(decoded, datum);
    }

    #[test]
    fn map_pairs_round_trip() {
        let datum = Datum::Map(vec![("stp-enable".into(), "false".into())]);
        let encoded = serde_json::to_value(&datum).unwrap();
        assert_eq!(encoded, json!(["map", [["stp-enable", "false"]]]));
        assert_eq!(Datum::from_value(encoded).unwrap(), datum);
    }

    #[test]
    fn malformed_pair_is_rejected() {
        assert!(Datum::from_value(json!(["uuid"])).is_err());
        assert!(Datum::from_value(json!(["frob", 1])).is_err());
        assert!(Datum::from_value(json!(["uuid", "not-a-uuid"])).is_err());
        assert!(Datum::from_value(json!(null)).is_err());
    }
}
