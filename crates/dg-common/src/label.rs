//! Digit labels and label-keyed tables.
//!
//! A [`Label`] can only hold 0-9, so anything keyed by it can use a fixed
//! ten-slot array instead of a map with existence checks.

use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, Result};

/// Number of digit classes.
pub const NUM_LABELS: usize = 10;

/// A validated digit class in `0..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Label(u8);

impl Label {
    /// Every label in ascending order.
    pub const ALL: [Label; NUM_LABELS] = [
        Label(0),
        Label(1),
        Label(2),
        Label(3),
        Label(4),
        Label(5),
        Label(6),
        Label(7),
        Label(8),
        Label(9),
    ];

    /// Range-check a raw label.
    pub fn new(value: i64) -> Result<Self> {
        if (0..NUM_LABELS as i64).contains(&value) {
            Ok(Label(value as u8))
        } else {
            Err(Error::LabelOutOfRange { label: value })
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Slot index in a [`LabelTable`].
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<i64> for Label {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Label::new(value)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Label::new(raw).map_err(D::Error::custom)
    }
}

impl JsonSchema for Label {
    fn schema_name() -> Cow<'static, str> {
        "Label".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "description": "Digit class",
            "type": "integer",
            "minimum": 0,
            "maximum": 9
        })
    }
}

/// One optional value per label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable<T> {
    slots: [Option<T>; NUM_LABELS],
}

impl<T> LabelTable<T> {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Store `value` under `label`, returning the previous value.
    pub fn insert(&mut self, label: Label, value: T) -> Option<T> {
        self.slots[label.index()].replace(value)
    }

    pub fn get(&self, label: Label) -> Option<&T> {
        self.slots[label.index()].as_ref()
    }

    pub fn contains(&self, label: Label) -> bool {
        self.slots[label.index()].is_some()
    }

    /// Occupied slots in ascending label order.
    pub fn iter(&self) -> impl Iterator<Item = (Label, &T)> + '_ {
        Label::ALL
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(label, slot)| slot.as_ref().map(|value| (*label, value)))
    }

    pub fn labels(&self) -> Vec<Label> {
        self.iter().map(|(label, _)| label).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transform every occupied slot, keeping the empty ones empty.
    pub fn map<U, F>(&self, mut f: F) -> LabelTable<U>
    where
        F: FnMut(Label, &T) -> U,
    {
        let mut out = LabelTable::new();
        for (label, value) in self.iter() {
            out.insert(label, f(label, value));
        }
        out
    }
}

impl<T> Default for LabelTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(Label, T)> for LabelTable<T> {
    fn from_iter<I: IntoIterator<Item = (Label, T)>>(iter: I) -> Self {
        let mut table = LabelTable::new();
        for (label, value) in iter {
            table.insert(label, value);
        }
        table
    }
}

/// Serialized as an object keyed by the label's decimal digit.
impl<T: Serialize> Serialize for LabelTable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (label, value) in self.iter() {
            map.serialize_entry(&label.to_string(), value)?;
        }
        map.end()
    }
}
