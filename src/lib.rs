//! Quote-aware CSV parsing, column resolution and substring search, plus a
//! bounded TTL cache for slow lookups.
//!
//! - Parsing: line oriented, one record per physical line. Quoted fields may
//!   contain the delimiter; `""` inside quotes is a literal quote.
//! - Columns: an integer literal is an index (range checked per row during
//!   search), anything else is a header name.
//! - Search: case-sensitive substring match in one column or any column.
//! - Cache: expire-after-write, bounded size, oldest write evicted first.
//!
//! Data shape:
//! - `Table { headers, rows, malformed }`, rows as `Vec<String>`
//! - Rows whose width differs from the header are kept out of `rows` and
//!   reported through `Table::malformed_rows()`
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod cache;
mod codec;
mod column;
mod io;
mod lookup;
mod parser;
mod search;
mod session;
mod table;

pub use crate::cache::{
    BoundedCache, CacheConfig, CacheError, CacheKey, CacheStats, Clock, ManualClock, SystemClock,
};
pub use crate::column::{resolve_column, ColumnSelector, HeaderMatch};
pub use crate::io::{decode_source, open_path, Compression, SourceMeta};
pub use crate::lookup::{CachedLookup, Fetcher};
pub use crate::parser::{parse_reader, parse_str, parse_stream, split_line, ParseOptions, RowParser};
pub use crate::search::{search, search_rows, SearchRequest, SearchResults};
pub use crate::session::CsvSession;
pub use crate::table::{FromRow, MalformedRow, Row, Table};

use thiserror::Error;

/// Error type returned by the parsing and search side of this crate.
#[derive(Debug, Error)]
pub enum CsvSearchError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("column name not found: {0}")]
    ColumnNotFound(String),
    #[error("invalid column identifier {0:?}: table has no header row")]
    InvalidColumnIdentifier(String),
    #[error("column index {index} too large for row of {width} fields")]
    ColumnIndexTooLarge { index: i64, width: usize },
    #[error("column index {index} too small")]
    ColumnIndexTooSmall { index: i64 },
    #[error("no CSV file is currently loaded")]
    NoFileLoaded,
}

pub type CsvResult<T> = std::result::Result<T, CsvSearchError>;
