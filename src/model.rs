//! Identity and value types shared by the ledger and the reconciler.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Scalar attribute values, untyped as far as this crate is concerned.
///
/// Conflict detection only needs equality; validating values against a
/// schema's attribute types is a concern of the surrounding system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// Owned string.
    Str(String),
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => write!(f, "null"),
            PropValue::Bool(v) => write!(f, "{v}"),
            PropValue::Int(v) => write!(f, "{v}"),
            PropValue::Float(v) => write!(f, "{v}"),
            PropValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

/// Property name to value mapping for one node.
pub type PropMap = BTreeMap<String, PropValue>;

/// Resource identity: a type name plus an id unique within that type.
///
/// Used directly as a map key throughout the crate. Serializes as the
/// `ty:id` rendering so diffs keyed by `Ref` survive JSON transport.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref {
    /// Resource type name. May not contain `:`.
    pub ty: String,
    /// Identifier, unique within the type.
    pub id: String,
}

impl Ref {
    /// Creates a reference from a type name and an id.
    pub fn new(ty: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ty, self.id)
    }
}

impl Serialize for Ref {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ref {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RefVisitor;

        impl<'de> Visitor<'de> for RefVisitor {
            type Value = Ref;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a `type:id` resource reference")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Ref, E> {
                let Some((ty, id)) = value.split_once(':') else {
                    return Err(E::invalid_value(de::Unexpected::Str(value), &self));
                };
                Ok(Ref::new(ty, id))
            }
        }

        deserializer.deserialize_str(RefVisitor)
    }
}

/// A resource's scalar attributes, keyed by its reference. No relationships.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Identity of the resource this node describes.
    pub key: Ref,
    /// Scalar attribute values.
    pub props: PropMap,
}

impl Node {
    /// Creates a node with no properties.
    pub fn new(key: Ref) -> Self {
        Self {
            key,
            props: PropMap::new(),
        }
    }
}

/// A directed, labeled edge representing one relationship instance.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Arrow {
    /// Resource the relationship is declared on.
    pub source: Ref,
    /// Resource the relationship points at.
    pub target: Ref,
    /// Relationship name.
    pub label: String,
}

impl Arrow {
    /// Creates an arrow from `source` to `target` with the given label.
    pub fn new(source: Ref, target: Ref, label: impl Into<String>) -> Self {
        Self {
            source,
            target,
            label: label.into(),
        }
    }
}

impl fmt::Display for Arrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}--({})-->{}", self.source, self.label, self.target)
    }
}

/// A full resource as the reconciler sees it: scalar attributes plus
/// relationship target lists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Identity of the resource.
    pub key: Ref,
    /// Scalar attribute values.
    pub props: PropMap,
    /// Relationship name to target list. A to-one relationship is a list of
    /// zero or one targets.
    pub relationships: BTreeMap<String, Vec<Ref>>,
}

impl Resource {
    /// Creates a resource with no properties and no relationships.
    pub fn new(key: Ref) -> Self {
        Self {
            key,
            props: PropMap::new(),
            relationships: BTreeMap::new(),
        }
    }
}
