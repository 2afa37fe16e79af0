/// One parsed line: fields in source order.
pub type Row = Vec<String>;

/// A data line whose width disagreed with the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRow {
    /// 1-based physical line number in the source.
    pub line: usize,
    pub fields: Row,
}

/// Parsed table: optional header row, data rows in source order, and the
/// rows that were set aside because their width did not match the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub(crate) headers: Option<Row>,
    pub(crate) rows: Vec<Row>,
    pub(crate) malformed: Vec<MalformedRow>,
}

impl Table {
    /// Header row, if the source declared one and had at least one line.
    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    /// Data rows; never includes the header row.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Rows excluded because their field count differed from the header's.
    pub fn malformed_rows(&self) -> &[MalformedRow] {
        &self.malformed
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the source had no lines at all.
    pub fn is_empty(&self) -> bool {
        self.headers.is_none() && self.rows.is_empty() && self.malformed.is_empty()
    }

    /// Expected row width: the header width when headers are declared.
    pub fn width(&self) -> Option<usize> {
        self.headers.as_ref().map(Vec::len)
    }

    /// Convert every data row into a structured record.
    ///
    /// Stops at the first row the conversion rejects.
    pub fn map_rows<T, E, F>(&self, mut f: F) -> Result<Vec<T>, E>
    where
        F: FnMut(&[String]) -> Result<T, E>,
    {
        self.rows.iter().map(|row| f(row.as_slice())).collect()
    }

    /// [`Table::map_rows`] driven by a type's [`FromRow`] impl.
    pub fn records<T: FromRow>(&self) -> Result<Vec<T>, T::Error> {
        self.map_rows(T::from_row)
    }

    /// Take ownership of the data rows, dropping header and malformed rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

/// Structured record built from one row of fields.
pub trait FromRow: Sized {
    type Error;

    fn from_row(fields: &[String]) -> Result<Self, Self::Error>;
}

impl FromRow for Row {
    type Error = std::convert::Infallible;

    fn from_row(fields: &[String]) -> Result<Self, Self::Error> {
        Ok(fields.to_vec())
    }
}
