//! Column metadata used to validate caller-supplied column names.
//!
//! A [`ColumnSet`] is the type-erased view of an entity's column registry. It
//! is also used for derived selections (group keys plus aggregate labels),
//! which is why it does not know about any concrete ORM column type.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ValidationError;

/// Logical scalar kind of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Number,
    Text,
    Boolean,
    Timestamp,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Number => write!(f, "number"),
            ColumnKind::Text => write!(f, "text"),
            ColumnKind::Boolean => write!(f, "boolean"),
            ColumnKind::Timestamp => write!(f, "timestamp"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, kind: ColumnKind, nullable: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable,
        }
    }
}

/// Name-ordered map of known columns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct ColumnSet {
    columns: BTreeMap<String, ColumnDescriptor>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, descriptor: ColumnDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    pub fn insert(&mut self, descriptor: ColumnDescriptor) {
        self.columns.insert(descriptor.name.clone(), descriptor);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Look up a caller-supplied name, rejecting unknown ones.
    ///
    /// `field` names the request parameter that carried the name
    /// (`filter_by`, `order_by`, `group_by`, ...), for the error message.
    ///
    /// # Errors
    /// Returns `ValidationError::UnknownColumn` listing the valid names.
    pub fn require(
        &self,
        field: &'static str,
        name: &str,
    ) -> Result<&ColumnDescriptor, ValidationError> {
        self.columns
            .get(name)
            .ok_or_else(|| ValidationError::UnknownColumn {
                field,
                column: name.to_owned(),
                valid: self.names(),
            })
    }

    /// Sorted column names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<ColumnDescriptor> for ColumnSet {
    fn from_iter<T: IntoIterator<Item = ColumnDescriptor>>(iter: T) -> Self {
        let mut set = ColumnSet::new();
        for descriptor in iter {
            set.insert(descriptor);
        }
        set
    }
}
