//! Change Describer: turns an old/new snapshot pair into human readable tags.

use crate::snapshot::{ClientSnapshot, IssueSnapshot, ProjectSnapshot, UserSnapshot};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Describable fields. Declaration order is the order tags are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Title,
    Description,
    Priority,
    Progress,
    Status,
    Assignment,
    StartDate,
    DueDate,
    Email,
    Role,
    Avatar,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Title,
        Field::Description,
        Field::Priority,
        Field::Progress,
        Field::Status,
        Field::Assignment,
        Field::StartDate,
        Field::DueDate,
        Field::Email,
        Field::Role,
        Field::Avatar,
    ];

    pub fn default_tag(self) -> &'static str {
        match self {
            Field::Title => "title updated",
            Field::Description => "description updated",
            Field::Priority => "priority updated",
            Field::Progress => "progress updated",
            Field::Status => "status updated",
            Field::Assignment => "assignment updated",
            Field::StartDate => "start date updated",
            Field::DueDate => "due date updated",
            Field::Email => "email updated",
            Field::Role => "role updated",
            Field::Avatar => "avatar updated",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(i64),
    Id(Uuid),
    Date(DateTime<Utc>),
}

/// Fields a mutation request explicitly set, whether or not the value changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchedFields(BTreeSet<Field>);

impl TouchedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self(Field::ALL.into_iter().collect())
    }

    pub fn with(mut self, field: Field) -> Self {
        self.0.insert(field);
        self
    }

    pub fn insert(&mut self, field: Field) {
        self.0.insert(field);
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Field> for TouchedFields {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A snapshot whose fields can be compared by the describer.
///
/// `None` means the entity has no such field, or the field is unset.
pub trait Describe {
    fn field_value(&self, field: Field) -> Option<FieldValue>;

    fn tag(field: Field) -> &'static str {
        field.default_tag()
    }
}

/// One tag per touched field whose value differs, in [`Field`] order.
///
/// Creation (`old == None`) has nothing to diff against and yields no tags.
pub fn describe_changes<T: Describe>(
    old: Option<&T>,
    new: &T,
    touched: &TouchedFields,
) -> Vec<String> {
    let Some(old) = old else {
        return Vec::new();
    };

    Field::ALL
        .iter()
        .copied()
        .filter(|field| touched.contains(*field))
        .filter(|field| old.field_value(*field) != new.field_value(*field))
        .map(|field| T::tag(field).to_string())
        .collect()
}

fn text(s: &str) -> Option<FieldValue> {
    Some(FieldValue::Text(s.to_string()))
}

impl Describe for IssueSnapshot {
    fn field_value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Title => text(&self.title),
            Field::Description => text(&self.description),
            Field::Priority => text(self.priority.as_str()),
            Field::Status => text(self.status.as_str()),
            Field::Assignment => self.assigned_to.map(FieldValue::Id),
            Field::StartDate => self.start_date.map(FieldValue::Date),
            Field::DueDate => self.due_date.map(FieldValue::Date),
            _ => None,
        }
    }
}

impl Describe for ProjectSnapshot {
    fn field_value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Title => text(&self.name),
            Field::Description => text(&self.description),
            Field::Progress => Some(FieldValue::Number(i64::from(self.progress))),
            Field::Status => text(&self.status),
            Field::StartDate => self.start_date.map(FieldValue::Date),
            Field::DueDate => self.deadline.map(FieldValue::Date),
            _ => None,
        }
    }

    fn tag(field: Field) -> &'static str {
        match field {
            Field::Title => "name updated",
            Field::DueDate => "deadline updated",
            other => other.default_tag(),
        }
    }
}

impl Describe for ClientSnapshot {
    fn field_value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Title => text(&self.name),
            _ => None,
        }
    }

    fn tag(field: Field) -> &'static str {
        match field {
            Field::Title => "name updated",
            other => other.default_tag(),
        }
    }
}

impl Describe for UserSnapshot {
    fn field_value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Title => text(&self.name),
            Field::Email => text(&self.email),
            Field::Role => text(self.role.as_str()),
            Field::Avatar => self.avatar.as_deref().and_then(text),
            _ => None,
        }
    }

    fn tag(field: Field) -> &'static str {
        match field {
            Field::Title => "name updated",
            other => other.default_tag(),
        }
    }
}
