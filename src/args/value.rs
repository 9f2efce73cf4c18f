//! Resolved values: typed argument values and the table they land in.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::args::definition::{OnRepeat, ValueKind};
use crate::args::error::ResolveError;
use crate::args::registry::{CONSOLE_PARSER, ENVIRONMENT_PARSER};

/// A typed argument value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Str(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
}

impl ArgumentValue {
    /// Build a value of the given kind from raw text.
    pub fn parse(kind: ValueKind, tag: &str, text: &str) -> Result<Self, ResolveError> {
        let invalid = || ResolveError::InvalidValue {
            tag: tag.to_string(),
            value: text.to_string(),
            expected: kind.describe(),
        };
        match kind {
            ValueKind::String => Ok(Self::Str(text.to_string())),
            ValueKind::Integer => text.trim().parse().map(Self::Integer).map_err(|_| invalid()),
            ValueKind::Real => match text.trim().parse::<f64>() {
                Ok(real) if real.is_finite() => Ok(Self::Real(real)),
                _ => Err(invalid()),
            },
            ValueKind::Bool => match text.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(Self::Bool(true)),
                "0" | "false" | "no" | "off" => Ok(Self::Bool(false)),
                _ => Err(invalid()),
            },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{}", s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Total order over backend types used to settle conflicts between sources.
///
/// Earlier entries outrank later ones. Types not listed rank below every
/// listed type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precedence {
    order: Vec<String>,
}

impl Precedence {
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order: order.into_iter().map(Into::into).collect(),
        }
    }

    pub fn rank(&self, backend_type: &str) -> usize {
        self.order
            .iter()
            .position(|t| t == backend_type)
            .unwrap_or(self.order.len())
    }

    /// Whether `incoming` ranks strictly above `existing`.
    pub fn outranks(&self, incoming: &str, existing: &str) -> bool {
        self.rank(incoming) < self.rank(existing)
    }
}

impl Default for Precedence {
    fn default() -> Self {
        Self::new([CONSOLE_PARSER, ENVIRONMENT_PARSER])
    }
}

/// What [`ResolvedValues::record`] did with a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// First value for the tag.
    Inserted,
    /// Added to an existing stack.
    Appended,
    /// Replaced the previous value(s).
    Replaced,
    /// Kept the existing value; the incoming source ranks lower.
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    source: String,
    values: Vec<ArgumentValue>,
}

/// Canonical tag → one or more typed values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedValues {
    slots: BTreeMap<String, Slot>,
}

impl ResolvedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value supplied by a backend of type `source`.
    ///
    /// Values from the same source follow `on_repeat`. A value from a
    /// different source only displaces the slot under `replace` when
    /// `precedence` ranks it higher; otherwise the existing value stays.
    pub fn record(
        &mut self,
        tag: &str,
        value: ArgumentValue,
        source: &str,
        on_repeat: OnRepeat,
        precedence: &Precedence,
    ) -> Result<Recorded, ResolveError> {
        let Some(slot) = self.slots.get_mut(tag) else {
            self.slots.insert(
                tag.to_string(),
                Slot {
                    source: source.to_string(),
                    values: vec![value],
                },
            );
            return Ok(Recorded::Inserted);
        };

        if slot.source != source {
            if on_repeat == OnRepeat::Replace && precedence.outranks(source, &slot.source) {
                slot.source = source.to_string();
                slot.values = vec![value];
                return Ok(Recorded::Replaced);
            }
            return Ok(Recorded::Ignored);
        }

        match on_repeat {
            OnRepeat::Stack => {
                slot.values.push(value);
                Ok(Recorded::Appended)
            }
            OnRepeat::Replace => {
                slot.values = vec![value];
                Ok(Recorded::Replaced)
            }
            OnRepeat::Die => {
                self.slots.remove(tag);
                Err(ResolveError::RepeatedArgument {
                    tag: tag.to_string(),
                })
            }
        }
    }

    /// Most recent value for `tag`.
    pub fn get(&self, tag: &str) -> Option<&ArgumentValue> {
        self.slots.get(tag).and_then(|s| s.values.last())
    }

    /// Every value for `tag`, in encounter order.
    pub fn get_all(&self, tag: &str) -> &[ArgumentValue] {
        self.slots
            .get(tag)
            .map(|s| s.values.as_slice())
            .unwrap_or(&[])
    }

    /// Shorthand for string-valued tags.
    pub fn get_str(&self, tag: &str) -> Option<&str> {
        self.get(tag).and_then(ArgumentValue::as_str)
    }

    /// Backend type that supplied the value(s) for `tag`.
    pub fn source_of(&self, tag: &str) -> Option<&str> {
        self.slots.get(tag).map(|s| s.source.as_str())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.slots.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Tags with their values, sorted by tag.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ArgumentValue])> {
        self.slots
            .iter()
            .map(|(tag, slot)| (tag.as_str(), slot.values.as_slice()))
    }
}

impl Serialize for ResolvedValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.slots.len()))?;
        for (tag, slot) in &self.slots {
            match slot.values.as_slice() {
                [single] => map.serialize_entry(tag, single)?,
                many => map.serialize_entry(tag, many)?,
            }
        }
        map.end()
    }
}
