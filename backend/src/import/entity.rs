//! Per-entity import rules: which columns a sheet must carry, how each field is normalised,
//! which field is the natural key and which table, if any, the entity references.

use common::model::department::Department;
use common::model::import::EntityKind;
use common::model::instructor::Instructor;
use common::model::subject::Subject;

/// A row that passed validation, in the shape the store writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Instructor(Instructor),
    Department(Department),
    Subject(Subject),
}

impl Record {
    pub fn natural_key(&self) -> &str {
        match self {
            Record::Instructor(instructor) => &instructor.id_number,
            Record::Department(department) => &department.dept_name,
            Record::Subject(subject) => &subject.subject_name,
        }
    }

    /// The foreign-key value this record points at, if its entity has one.
    pub fn reference(&self) -> Option<&str> {
        match self {
            Record::Instructor(instructor) => Some(&instructor.dept),
            Record::Department(_) | Record::Subject(_) => None,
        }
    }

    pub(crate) fn set_reference(&mut self, value: &str) {
        if let Record::Instructor(instructor) = self {
            instructor.dept = value.to_string();
        }
    }
}

pub struct FieldSpec {
    pub column: &'static str,
    pub normalize: fn(&str) -> String,
}

pub struct EntitySpec {
    pub kind: EntityKind,
    /// Required columns, in the order `build` receives their values.
    pub fields: &'static [FieldSpec],
    /// Column whose value identifies a record for duplicate detection and upserts.
    pub key: &'static str,
    /// Alternative header names, as `(alias, column)`.
    pub aliases: &'static [(&'static str, &'static str)],
    pub references: Option<EntityKind>,
    build: fn(Vec<String>) -> Record,
}

impl EntitySpec {
    pub fn for_kind(kind: EntityKind) -> &'static EntitySpec {
        match kind {
            EntityKind::Instructor => &INSTRUCTOR,
            EntityKind::Department => &DEPARTMENT,
            EntityKind::Subject => &SUBJECT,
        }
    }

    pub fn columns(&self) -> Vec<&'static str> {
        self.fields.iter().map(|field| field.column).collect()
    }

    pub fn key_index(&self) -> usize {
        self.fields
            .iter()
            .position(|field| field.column == self.key)
            .unwrap_or(0)
    }

    /// Builds a record from normalised values given in `fields` order.
    pub fn build(&self, values: Vec<String>) -> Record {
        (self.build)(values)
    }
}

fn trim(value: &str) -> String {
    value.trim().to_string()
}

static INSTRUCTOR: EntitySpec = EntitySpec {
    kind: EntityKind::Instructor,
    fields: &[
        FieldSpec {
            column: "id_number",
            normalize: trim,
        },
        FieldSpec {
            column: "instructor_name",
            normalize: trim,
        },
        FieldSpec {
            column: "dept",
            normalize: trim,
        },
    ],
    key: "id_number",
    aliases: &[("name", "instructor_name")],
    references: Some(EntityKind::Department),
    build: |values| {
        let mut values = values.into_iter();
        Record::Instructor(Instructor {
            id_number: values.next().unwrap_or_default(),
            name: values.next().unwrap_or_default(),
            dept: values.next().unwrap_or_default(),
        })
    },
};

static DEPARTMENT: EntitySpec = EntitySpec {
    kind: EntityKind::Department,
    fields: &[FieldSpec {
        column: "dept_name",
        normalize: trim,
    }],
    key: "dept_name",
    aliases: &[],
    references: None,
    build: |values| {
        Record::Department(Department {
            dept_name: values.into_iter().next().unwrap_or_default(),
        })
    },
};

static SUBJECT: EntitySpec = EntitySpec {
    kind: EntityKind::Subject,
    fields: &[FieldSpec {
        column: "subject_name",
        normalize: trim,
    }],
    key: "subject_name",
    aliases: &[],
    references: None,
    build: |values| {
        Record::Subject(Subject {
            subject_name: values.into_iter().next().unwrap_or_default(),
        })
    },
};
