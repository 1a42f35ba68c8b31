//! Remote binding and per-field-group staleness.

use std::fmt;

use crate::{Error, Result};

/// Association of a local entity with its remote counterpart.
///
/// The reference is opaque (usually a URI such as
/// `http://localhost:7474/db/data/node/42`); the numeric ID is always the
/// trailing numeric segment of that reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    reference: String,
}

impl Binding {
    pub fn new(reference: impl Into<String>) -> Self {
        Self { reference: reference.into() }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// The remote numeric ID.
    pub fn id(&self) -> Result<u64> {
        let segment = self
            .reference
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        segment.parse().map_err(|_| {
            Error::BindingError(format!("reference {:?} has no numeric id", self.reference))
        })
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference)
    }
}

/// A group of fields whose freshness is tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    Labels,
    Properties,
    /// Relationship type.
    Type,
}

impl FieldGroup {
    const fn bit(self) -> u8 {
        match self {
            FieldGroup::Labels => 0b001,
            FieldGroup::Properties => 0b010,
            FieldGroup::Type => 0b100,
        }
    }
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldGroup::Labels => write!(f, "labels"),
            FieldGroup::Properties => write!(f, "properties"),
            FieldGroup::Type => write!(f, "type"),
        }
    }
}

/// The set of field groups whose last known value must be refreshed
/// before it can be trusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Staleness(u8);

impl Staleness {
    pub const FRESH: Staleness = Staleness(0);

    pub fn of(groups: &[FieldGroup]) -> Self {
        let mut s = Self::FRESH;
        for g in groups {
            s.mark(*g);
        }
        s
    }

    pub fn contains(self, group: FieldGroup) -> bool {
        self.0 & group.bit() != 0
    }

    pub fn mark(&mut self, group: FieldGroup) {
        self.0 |= group.bit();
    }

    pub fn clear(&mut self, group: FieldGroup) {
        self.0 &= !group.bit();
    }

    pub fn is_fresh(self) -> bool {
        self.0 == 0
    }
}
