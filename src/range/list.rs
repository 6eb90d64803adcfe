//! Ordered list of range expressions, one per output file.

use crate::error::{Error, Result};

/// The range expressions entered for one split.
///
/// There is always at least one slot. The first slot can be edited but not
/// removed; positions determine output numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeList {
    slots: Vec<String>,
}

impl RangeList {
    /// Create a list with a single empty slot.
    pub fn new() -> Self {
        Self {
            slots: vec![String::new()],
        }
    }

    /// Build a list from existing expressions. An empty iterator still yields one slot.
    pub fn from_expressions<I, S>(exprs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut slots: Vec<String> = exprs.into_iter().map(Into::into).collect();
        if slots.is_empty() {
            slots.push(String::new());
        }
        Self { slots }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Get the expression at a position.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(String::as_str)
    }

    /// Append an empty slot and return its position.
    pub fn push(&mut self) -> usize {
        self.slots.push(String::new());
        self.slots.len() - 1
    }

    /// Append a slot holding `expr` and return its position.
    pub fn push_expression(&mut self, expr: impl Into<String>) -> usize {
        self.slots.push(expr.into());
        self.slots.len() - 1
    }

    /// Replace the expression at a position.
    pub fn set(&mut self, index: usize, expr: impl Into<String>) -> Result<()> {
        let slot = self.slots.get_mut(index).ok_or(Error::NoSuchRange(index))?;
        *slot = expr.into();
        Ok(())
    }

    /// Remove a slot. The first slot cannot be removed.
    pub fn remove(&mut self, index: usize) -> Result<String> {
        if index == 0 {
            return Err(Error::FirstRangeRemoval);
        }
        if index >= self.slots.len() {
            return Err(Error::NoSuchRange(index));
        }
        Ok(self.slots.remove(index))
    }

    /// True when every slot is blank.
    pub fn all_blank(&self) -> bool {
        self.slots.iter().all(|s| s.trim().is_empty())
    }

    /// Iterate over expressions in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(String::as_str)
    }

    /// Expressions as a slice.
    pub fn as_slice(&self) -> &[String] {
        &self.slots
    }
}

impl Default for RangeList {
    fn default() -> Self {
        Self::new()
    }
}
