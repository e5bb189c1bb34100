//! Leaf value type for controller tags

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single leaf value held in a tag slot.
///
/// One variant per atomic encoding; structure and array values are tags of
/// their own and live in [`Slot`](crate::Slot) variants instead, so every
/// access is a checked, typed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    Bool(bool),
    Sint(i8),
    Int(i16),
    Dint(i32),
    Lint(i64),
    Real(f32),
    String(String),
}

impl TagValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TagValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_sint(&self) -> Option<i8> {
        match self {
            TagValue::Sint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i16> {
        match self {
            TagValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_dint(&self) -> Option<i32> {
        match self {
            TagValue::Dint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_lint(&self) -> Option<i64> {
        match self {
            TagValue::Lint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f32> {
        match self {
            TagValue::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Bool(v) => write!(f, "{v}"),
            TagValue::Sint(v) => write!(f, "{v}"),
            TagValue::Int(v) => write!(f, "{v}"),
            TagValue::Dint(v) => write!(f, "{v}"),
            TagValue::Lint(v) => write!(f, "{v}"),
            TagValue::Real(v) => write!(f, "{v}"),
            TagValue::String(v) => write!(f, "{v}"),
        }
    }
}
