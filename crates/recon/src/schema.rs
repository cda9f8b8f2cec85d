use serde::Serialize;

use crate::model::{Record, ValueKind};

/// A column of a category table with its declared kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ValueKind,
}

/// Column set of one category list, derived once per list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Derive the schema from a record list.
    ///
    /// Column names are the keys of the first record, in its order. Each
    /// column's kind comes from the first non-null value in that column across
    /// the whole list, and is `Text` when every value is null or missing.
    /// Returns `None` for an empty list (no header row is rendered).
    pub fn infer(records: &[Record]) -> Option<Schema> {
        let first = records.first()?;
        let columns = first
            .keys()
            .map(|name| {
                let kind = records
                    .iter()
                    .filter_map(|r| r.get(name))
                    .find_map(|v| v.kind())
                    .unwrap_or(ValueKind::Text);
                Column { name: name.to_string(), kind }
            })
            .collect();
        Some(Schema { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Header label for a column: underscores become spaces, uppercased.
pub fn header_label(column: &str) -> String {
    column.replace('_', " ").to_uppercase()
}
