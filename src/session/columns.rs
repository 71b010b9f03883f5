//! Column selection for list output.

use std::fmt;
use std::str::FromStr;

use crate::error::{MboxError, Result};
use crate::model::mail::{HeaderName, MessageRecord};

/// Text shown in the date column when no date could be resolved.
pub const UNPARSED_DATE: &str = "(unparsed)";

/// A column that can be displayed for each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Index,
    Date,
    From,
    To,
    Cc,
    Subject,
}

impl Column {
    /// The whitelist, in canonical order.
    pub const ALL: [Column; 6] = [
        Column::Index,
        Column::Date,
        Column::From,
        Column::To,
        Column::Cc,
        Column::Subject,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Date => "date",
            Self::From => "from",
            Self::To => "to",
            Self::Cc => "cc",
            Self::Subject => "subject",
        }
    }

    /// Cell text for a record. `date_format` is a `strftime` pattern.
    pub fn value(self, record: &MessageRecord, date_format: &str) -> String {
        let header = |name| record.headers.get_or_empty(name).to_string();
        match self {
            Self::Index => record.index.to_string(),
            Self::Date => record
                .date
                .date()
                .map_or_else(|| UNPARSED_DATE.to_string(), |d| d.format(date_format)),
            Self::From => header(HeaderName::From),
            Self::To => header(HeaderName::To),
            Self::Cc => header(HeaderName::Cc),
            Self::Subject => header(HeaderName::Subject),
        }
    }
}

impl FromStr for Column {
    type Err = MboxError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| MboxError::UnknownColumn(s.trim().to_string()))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered, duplicate-free list of columns to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection(Vec<Column>);

impl Default for ColumnSelection {
    fn default() -> Self {
        Self(vec![Column::Date, Column::From, Column::Subject])
    }
}

impl ColumnSelection {
    /// Parse `"date,from subject"`: comma and/or whitespace separated,
    /// case-insensitive, duplicates dropped (first occurrence kept).
    pub fn parse(spec: &str) -> Result<Self> {
        Self::from_names(spec.split([',', ' ', '\t']).filter(|s| !s.is_empty()))
    }

    /// Build from individual names; fails on the first unknown name.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut columns = Vec::new();
        for name in names {
            let column: Column = name.as_ref().parse()?;
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        if columns.is_empty() {
            return Err(MboxError::InvalidArgument(
                "at least one column is required".to_string(),
            ));
        }
        Ok(Self(columns))
    }

    pub fn columns(&self) -> &[Column] {
        &self.0
    }
}

impl fmt::Display for ColumnSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|c| c.name()).collect();
        f.write_str(&names.join(","))
    }
}
