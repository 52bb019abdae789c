//! Schema tree types for the schema browser

use serde::{Deserialize, Serialize};

/// Hierarchical schema metadata: database, schema, object, column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaTree {
    pub databases: Vec<DatabaseNode>,
}

/// Database node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseNode {
    pub name: String,
    #[serde(default)]
    pub schemas: Vec<SchemaNode>,
}

/// Schema (namespace) node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ObjectNode>,
}

/// Kind of a queryable schema object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Table,
    View,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::View => "view",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table or view node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectNode {
    pub name: String,
    pub kind: ObjectKind,
    #[serde(default)]
    pub columns: Vec<ColumnNode>,
}

/// Column metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnNode {
    pub name: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub is_primary_key: bool,
}

impl ColumnNode {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            is_primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

impl SchemaTree {
    /// Find a table or view by schema and name across all databases
    pub fn find_object(&self, schema: &str, name: &str) -> Option<&ObjectNode> {
        self.databases
            .iter()
            .flat_map(|db| db.schemas.iter())
            .filter(|s| s.name == schema)
            .flat_map(|s| s.objects.iter())
            .find(|o| o.name == name)
    }

    /// Iterate every (schema name, object) pair
    pub fn objects(&self) -> impl Iterator<Item = (&str, &ObjectNode)> {
        self.databases
            .iter()
            .flat_map(|db| db.schemas.iter())
            .flat_map(|s| s.objects.iter().map(move |o| (s.name.as_str(), o)))
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }
}
