use anyhow::Result;
use std::borrow::Cow;
use std::fmt;

use crate::error::MigrationError;

/// Column data type, rendered with the legacy type names the dump format carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    /// Integer row id assigned by the store when not given
    Identity,
    Float,
    Boolean,
    Varchar(u16),
    Char(u16),
    /// Unbounded text
    LongVarchar,
    Time,
    Date,
    Timestamp,
}

impl ColumnType {
    pub fn sql(&self) -> Cow<'static, str> {
        match self {
            ColumnType::Integer => "INTEGER".into(),
            ColumnType::Identity => "INTEGER PRIMARY KEY".into(),
            ColumnType::Float => "FLOAT".into(),
            ColumnType::Boolean => "BOOLEAN".into(),
            ColumnType::Varchar(n) => format!("VARCHAR({})", n).into(),
            ColumnType::Char(n) => format!("CHAR({})", n).into(),
            ColumnType::LongVarchar => "LONGVARCHAR".into(),
            ColumnType::Time => "TIME".into(),
            ColumnType::Date => "DATE".into(),
            ColumnType::Timestamp => "TIMESTAMP".into(),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql())
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: Cow<'static, str>,
    pub col_type: ColumnType,
    pub nullable: bool,
    /// SQL literal used as the column default
    pub default: Option<&'static str>,
}

impl Column {
    /// Create an optional (nullable) column
    pub const fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name: Cow::Borrowed(name),
            col_type,
            nullable: true,
            default: None,
        }
    }

    /// Create a required (non-nullable) column
    pub const fn required(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name: Cow::Borrowed(name),
            col_type,
            nullable: false,
            default: None,
        }
    }

    /// Column whose name is only known at runtime (goal columns)
    pub fn dynamic(name: String, col_type: ColumnType) -> Self {
        Self {
            name: Cow::Owned(name),
            col_type,
            nullable: true,
            default: None,
        }
    }

    /// Create a nullable column with a default
    pub const fn with_default(
        name: &'static str,
        col_type: ColumnType,
        literal: &'static str,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            col_type,
            nullable: true,
            default: Some(literal),
        }
    }

    /// Create a required column with a default
    pub const fn required_default(
        name: &'static str,
        col_type: ColumnType,
        literal: &'static str,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            col_type,
            nullable: false,
            default: Some(literal),
        }
    }

    /// Render the column definition as it appears inside CREATE TABLE or ADD COLUMN
    pub fn definition(&self) -> String {
        let mut def = format!("{} {}", self.name, self.col_type);
        if let Some(default) = self.default {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }
        if !self.nullable {
            def.push_str(" NOT NULL");
        }
        def
    }
}

/// Foreign key reference
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub columns: &'static [&'static str],
    pub references_table: &'static str,
    pub references_columns: &'static [&'static str],
}

impl ForeignKey {
    pub const fn new(
        columns: &'static [&'static str],
        references_table: &'static str,
        references_columns: &'static [&'static str],
    ) -> Self {
        Self {
            columns,
            references_table,
            references_columns,
        }
    }

    /// Reference to `Tournaments(tournament_id)`
    pub const fn tournament(column: &'static [&'static str]) -> Self {
        Self::new(column, "Tournaments", &["tournament_id"])
    }

    /// Reference to `Teams(TeamNumber)`
    pub const fn team(column: &'static [&'static str]) -> Self {
        Self::new(column, "Teams", &["TeamNumber"])
    }
}

/// Table schema definition
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema<'a> {
    pub name: &'a str,
    pub columns: &'a [Column],
    pub primary_key: &'a [&'a str],
    pub foreign_keys: &'a [ForeignKey],
    /// Columns that must be unique on their own
    pub unique: &'a [&'a str],
}

impl TableSchema<'_> {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_ref()).collect()
    }
}

/// A table whose column list is computed at runtime
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicTable {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
}

impl DynamicTable {
    pub fn schema(&self) -> TableSchema<'_> {
        TableSchema {
            name: &self.name,
            columns: &self.columns,
            primary_key: self.primary_key,
            foreign_keys: self.foreign_keys,
            unique: &[],
        }
    }
}

/// Return `name` if it can be spliced into SQL as a table or column name.
pub fn checked_identifier(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(name)
    } else {
        Err(MigrationError::InvalidIdentifier(name.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_definition() {
        let col = Column::required_default("Verified", ColumnType::Boolean, "FALSE");
        assert_eq!(col.definition(), "Verified BOOLEAN DEFAULT FALSE NOT NULL");
        assert_eq!(
            Column::new("SideA", ColumnType::Varchar(64)).definition(),
            "SideA VARCHAR(64)"
        );
    }

    #[test]
    fn test_checked_identifier() {
        assert!(checked_identifier("teamwork_2").is_ok());
        assert!(checked_identifier("_x").is_ok());
        assert!(checked_identifier("").is_err());
        assert!(checked_identifier("1abc").is_err());
        assert!(checked_identifier("a b").is_err());
        assert!(checked_identifier("a;--").is_err());
    }
}
