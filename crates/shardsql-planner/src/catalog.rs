//! Column and table descriptors consumed by the index-condition path.
//!
//! These are thin views onto the catalog: identity, declared type,
//! and the coercion entry point. Catalog updates happen only under
//! DDL quiescence, so the planner reads them lock-free.

use std::fmt;
use std::sync::Arc;

use shardsql_error::ShardResult;
use shardsql_types::{SqlValue, TypeId};

/// What kind of object a table descriptor refers to.
///
/// Only [`TableKind::Regular`] tables allow IN conditions to combine
/// with other bounds during index access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// A physical base table.
    Regular,
    /// A view over other tables.
    View,
    /// A table produced by a table function.
    FunctionTable,
    /// A system catalog table.
    SystemTable,
    /// A table living on a remote data node.
    External,
}

/// A table descriptor: name and kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    kind: TableKind,
}

impl Table {
    /// Create a table descriptor.
    pub fn new(name: impl Into<String>, kind: TableKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Table name as declared.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What kind of object this is.
    #[must_use]
    pub const fn kind(&self) -> TableKind {
        self.kind
    }
}

/// A column descriptor: owning table, ordinal position, name, and
/// declared type.
#[derive(Clone)]
pub struct Column {
    table: Arc<Table>,
    name: String,
    ordinal: usize,
    data_type: TypeId,
}

impl Column {
    /// Create a column descriptor.
    pub fn new(table: Arc<Table>, name: impl Into<String>, ordinal: usize, data_type: TypeId) -> Self {
        Self {
            table,
            name: name.into(),
            ordinal,
            data_type,
        }
    }

    /// The owning table.
    #[must_use]
    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    /// Column name as declared.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 0-based position within the owning table.
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Declared type of this column.
    #[must_use]
    pub const fn data_type(&self) -> TypeId {
        self.data_type
    }

    /// SQL text of the column reference, quoted when needed.
    #[must_use]
    pub fn sql(&self) -> String {
        if is_plain_identifier(&self.name) {
            self.name.clone()
        } else {
            format!("\"{}\"", self.name.replace('"', "\"\""))
        }
    }

    /// Coerce a value to this column's declared type.
    pub fn convert(&self, value: &SqlValue) -> ShardResult<SqlValue> {
        value.convert_to(self.data_type)
    }
}

/// A plain identifier needs no quoting in SQL text: a leading ASCII
/// letter or underscore followed by ASCII alphanumerics and
/// underscores. Everything else is rendered double-quoted.
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Column({}.{} #{} {})",
            self.table.name(),
            self.name,
            self.ordinal,
            self.data_type.sql_name()
        )
    }
}

impl PartialEq for Column {
    /// Identity is (owning table, ordinal): two descriptors naming
    /// the same position in the same table are the same column.
    fn eq(&self, other: &Self) -> bool {
        self.ordinal == other.ordinal && self.table.name() == other.table.name()
    }
}

impl Eq for Column {}
