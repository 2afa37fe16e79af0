use crate::table::Table;
use crate::{CsvResult, CsvSearchError};

/// How a column name is compared against header values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderMatch {
    /// Byte-for-byte equality.
    #[default]
    Exact,
    /// Compare after Unicode lowercasing both sides.
    IgnoreCase,
}

impl HeaderMatch {
    fn matches(self, header: &str, name: &str) -> bool {
        match self {
            HeaderMatch::Exact => header == name,
            HeaderMatch::IgnoreCase => header.to_lowercase() == name.to_lowercase(),
        }
    }
}

/// A resolved column.
///
/// Numeric identifiers are kept verbatim, including negative and
/// out-of-range values; range is checked per row at search time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSelector {
    Index(i64),
    /// Position of a matching header.
    Header(usize),
}

impl ColumnSelector {
    pub fn index(self) -> i64 {
        match self {
            ColumnSelector::Index(i) => i,
            ColumnSelector::Header(pos) => pos as i64,
        }
    }
}

/// Resolve a user-supplied column identifier against `table`.
///
/// Returns `Ok(None)` when no identifier was given. Integer literals resolve
/// to [`ColumnSelector::Index`]; anything else is looked up in the header
/// row and fails with [`CsvSearchError::ColumnNotFound`] when absent, or with
/// [`CsvSearchError::InvalidColumnIdentifier`] when the table has no header.
pub fn resolve_column(
    table: &Table,
    identifier: Option<&str>,
    matching: HeaderMatch,
) -> CsvResult<Option<ColumnSelector>> {
    let ident = match identifier {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(None),
    };

    if let Ok(index) = ident.parse::<i64>() {
        return Ok(Some(ColumnSelector::Index(index)));
    }

    let headers = table
        .headers()
        .ok_or_else(|| CsvSearchError::InvalidColumnIdentifier(ident.to_string()))?;

    headers
        .iter()
        .position(|h| matching.matches(h, ident))
        .map(|pos| Some(ColumnSelector::Header(pos)))
        .ok_or_else(|| CsvSearchError::ColumnNotFound(ident.to_string()))
}
