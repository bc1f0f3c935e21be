//! Write operations for batch commits.
//!
//! Two shapes cover everything the coordinators do: field transforms
//! (array union/remove, numeric increment) that avoid read-modify-write
//! round trips, and masked document updates with optional preconditions
//! for the cases where a computed value must be written.

use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::firestore::value::{fields_to_wire, FirestoreValue};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldTransform {
    ArrayUnion {
        field_path: String,
        elements: Vec<FirestoreValue>,
    },
    ArrayRemove {
        field_path: String,
        elements: Vec<FirestoreValue>,
    },
    Increment {
        field_path: String,
        amount: i64,
    },
}

impl FieldTransform {
    pub fn array_union(field_path: impl Into<String>, elements: Vec<FirestoreValue>) -> Self {
        FieldTransform::ArrayUnion {
            field_path: field_path.into(),
            elements,
        }
    }

    pub fn array_remove(field_path: impl Into<String>, elements: Vec<FirestoreValue>) -> Self {
        FieldTransform::ArrayRemove {
            field_path: field_path.into(),
            elements,
        }
    }

    pub fn increment(field_path: impl Into<String>, amount: i64) -> Self {
        FieldTransform::Increment {
            field_path: field_path.into(),
            amount,
        }
    }

    fn to_wire(&self) -> Value {
        match self {
            FieldTransform::ArrayUnion {
                field_path,
                elements,
            } => json!({
                "fieldPath": field_path,
                "appendMissingElements": {
                    "values": elements.iter().map(FirestoreValue::to_wire).collect::<Vec<_>>()
                }
            }),
            FieldTransform::ArrayRemove {
                field_path,
                elements,
            } => json!({
                "fieldPath": field_path,
                "removeAllFromArray": {
                    "values": elements.iter().map(FirestoreValue::to_wire).collect::<Vec<_>>()
                }
            }),
            FieldTransform::Increment { field_path, amount } => json!({
                "fieldPath": field_path,
                "increment": FirestoreValue::Integer(*amount).to_wire()
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    /// Require the target document to exist (true) or not exist (false)
    Exists(bool),
}

impl Precondition {
    fn to_wire(&self) -> Value {
        match self {
            Precondition::Exists(exists) => json!({ "exists": exists }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Apply field transforms to a document without replacing its fields.
    Transform {
        document: String,
        transforms: Vec<FieldTransform>,
    },
    /// Set fields on a document, optionally limited to an update mask, with
    /// transforms applied after the update.
    Update {
        document: String,
        fields: BTreeMap<String, FirestoreValue>,
        update_mask: Option<Vec<String>>,
        update_transforms: Vec<FieldTransform>,
        precondition: Option<Precondition>,
    },
}

impl Write {
    pub fn transform(document: impl Into<String>, transforms: Vec<FieldTransform>) -> Self {
        Write::Transform {
            document: document.into(),
            transforms,
        }
    }

    pub fn update_masked(
        document: impl Into<String>,
        fields: BTreeMap<String, FirestoreValue>,
        update_mask: Vec<String>,
        update_transforms: Vec<FieldTransform>,
    ) -> Self {
        Write::Update {
            document: document.into(),
            fields,
            update_mask: Some(update_mask),
            update_transforms,
            precondition: None,
        }
    }

    pub fn create(document: impl Into<String>, fields: BTreeMap<String, FirestoreValue>) -> Self {
        Write::Update {
            document: document.into(),
            fields,
            update_mask: None,
            update_transforms: Vec::new(),
            // creating over an existing document must fail, not overwrite
            precondition: Some(Precondition::Exists(false)),
        }
    }

    /// Document path relative to the database root.
    pub fn document(&self) -> &str {
        match self {
            Write::Transform { document, .. } => document,
            Write::Update { document, .. } => document,
        }
    }

    /// Encode for `documents:commit`; `name_prefix` is the database's
    /// `projects/{p}/databases/(default)/documents` resource root.
    pub fn to_wire(&self, name_prefix: &str) -> Value {
        match self {
            Write::Transform {
                document,
                transforms,
            } => json!({
                "transform": {
                    "document": format!("{}/{}", name_prefix, document),
                    "fieldTransforms": transforms.iter().map(FieldTransform::to_wire).collect::<Vec<_>>()
                }
            }),
            Write::Update {
                document,
                fields,
                update_mask,
                update_transforms,
                precondition,
            } => {
                let mut write = json!({
                    "update": {
                        "name": format!("{}/{}", name_prefix, document),
                        "fields": fields_to_wire(fields)
                    }
                });
                if let Some(mask) = update_mask {
                    write["updateMask"] = json!({ "fieldPaths": mask });
                }
                if !update_transforms.is_empty() {
                    write["updateTransforms"] = Value::Array(
                        update_transforms
                            .iter()
                            .map(FieldTransform::to_wire)
                            .collect(),
                    );
                }
                if let Some(precondition) = precondition {
                    write["currentDocument"] = precondition.to_wire();
                }
                write
            }
        }
    }
}
