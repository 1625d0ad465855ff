use serde::{Deserialize, Serialize};

use crate::row::ColumnKind;

/// Column name and rendering kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

/// How many rows a table contributes to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableVolume {
    /// Dimension table with a fixed row count, materialized once.
    Fixed(u64),
    /// Fact table producing one row per scheduled event.
    PerEvent,
}

/// Size of the id space a foreign-key column draws from. Broken-reference
/// injection rewrites values to land strictly outside this space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdSpace {
    Fixed(u64),
    /// Resolved to the schedule's total event count at run time.
    EventCount,
}

/// A foreign-key column and the dimension it references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyTarget {
    pub column: usize,
    pub referenced_table: String,
    pub id_space: IdSpace,
}

/// A chronologically ordered pair of date columns; `later` must not precede
/// `earlier` in clean data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DatePair {
    pub earlier: usize,
    pub later: usize,
}

/// Per-table metadata consumed by the control plane: column layout, volume,
/// size estimation weight, and the targets each corruption rule operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub volume: TableVolume,
    /// Heuristic serialized size of one row, for the capacity estimate.
    pub avg_row_bytes: u64,
    /// Key column a duplicated row keeps verbatim.
    pub key_column: Option<usize>,
    /// Columns eligible for null injection.
    pub nullable: Vec<usize>,
    /// Text columns eligible for casing/whitespace/typo noise.
    pub text_noise: Vec<usize>,
    pub foreign_keys: Vec<ForeignKeyTarget>,
    pub date_pairs: Vec<DatePair>,
}

impl TableSpec {
    pub fn new(name: &str, columns: Vec<ColumnSpec>, volume: TableVolume, avg_row_bytes: u64) -> Self {
        Self {
            name: name.to_string(),
            columns,
            volume,
            avg_row_bytes,
            key_column: None,
            nullable: Vec::new(),
            text_noise: Vec::new(),
            foreign_keys: Vec::new(),
            date_pairs: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(|col| col.name.as_str()).collect()
    }

    pub fn is_dimension(&self) -> bool {
        matches!(self.volume, TableVolume::Fixed(_))
    }
}
