//! Convergent datatypes
//!
//! Values and operations for the node-side CRDTs. They are fetched and updated
//! through the dedicated DtFetch/DtUpdate message pair, never plain get/put.
//! Registers and flags only exist as map fields.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiakError};

/// Kind of a map field (map fields are keyed by name *and* kind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Counter,
    Set,
    Map,
    Register,
    Flag,
}

/// Key of an entry inside a map
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MapField {
    pub name: String,
    pub kind: FieldKind,
}

impl MapField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Current value of a datatype
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Datatype {
    Counter(i64),
    Set(BTreeSet<String>),
    Map(BTreeMap<MapField, Datatype>),
    Register(String),
    Flag(bool),
}

/// A single update against a datatype
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DtOp {
    Counter { increment: i64 },
    Set { adds: Vec<String>, removes: Vec<String> },
    Map { removes: Vec<MapField>, updates: Vec<(MapField, DtOp)> },
    Register { assign: String },
    Flag { enable: bool },
}

impl DtOp {
    pub fn increment(by: i64) -> Self {
        DtOp::Counter { increment: by }
    }

    pub fn add_to_set<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DtOp::Set {
            adds: members.into_iter().map(Into::into).collect(),
            removes: Vec::new(),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            DtOp::Counter { .. } => FieldKind::Counter,
            DtOp::Set { .. } => FieldKind::Set,
            DtOp::Map { .. } => FieldKind::Map,
            DtOp::Register { .. } => FieldKind::Register,
            DtOp::Flag { .. } => FieldKind::Flag,
        }
    }

    /// Only counters, sets and maps can be stored at the top level of a key
    pub fn is_top_level(&self) -> bool {
        matches!(self, DtOp::Counter { .. } | DtOp::Set { .. } | DtOp::Map { .. })
    }
}

impl Datatype {
    /// Empty value of the given kind
    pub fn empty(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Counter => Datatype::Counter(0),
            FieldKind::Set => Datatype::Set(BTreeSet::new()),
            FieldKind::Map => Datatype::Map(BTreeMap::new()),
            FieldKind::Register => Datatype::Register(String::new()),
            FieldKind::Flag => Datatype::Flag(false),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Datatype::Counter(_) => FieldKind::Counter,
            Datatype::Set(_) => FieldKind::Set,
            Datatype::Map(_) => FieldKind::Map,
            Datatype::Register(_) => FieldKind::Register,
            Datatype::Flag(_) => FieldKind::Flag,
        }
    }

    pub fn as_counter(&self) -> Option<i64> {
        match self {
            Datatype::Counter(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            Datatype::Set(members) => Some(members),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<MapField, Datatype>> {
        match self {
            Datatype::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Apply an operation in place.
    ///
    /// The op's kind must match the value's kind.
    pub fn apply(&mut self, op: &DtOp) -> Result<()> {
        match (self, op) {
            (Datatype::Counter(value), DtOp::Counter { increment }) => {
                *value = value.saturating_add(*increment);
            }
            (Datatype::Set(members), DtOp::Set { adds, removes }) => {
                for member in removes {
                    members.remove(member);
                }
                members.extend(adds.iter().cloned());
            }
            (Datatype::Map(fields), DtOp::Map { removes, updates }) => {
                for field in removes {
                    fields.remove(field);
                }
                for (field, nested) in updates {
                    if field.kind != nested.kind() {
                        return Err(RiakError::InvalidOperation(format!(
                            "field {} is a {:?} but the update is a {:?}",
                            field.name,
                            field.kind,
                            nested.kind()
                        )));
                    }
                    fields
                        .entry(field.clone())
                        .or_insert_with(|| Datatype::empty(field.kind))
                        .apply(nested)?;
                }
            }
            (Datatype::Register(value), DtOp::Register { assign }) => {
                *value = assign.clone();
            }
            (Datatype::Flag(value), DtOp::Flag { enable }) => {
                *value = *enable;
            }
            (value, op) => {
                return Err(RiakError::InvalidOperation(format!(
                    "cannot apply a {:?} update to a {:?}",
                    op.kind(),
                    value.kind()
                )));
            }
        }
        Ok(())
    }
}
