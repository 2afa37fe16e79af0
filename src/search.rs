use crate::column::{resolve_column, ColumnSelector, HeaderMatch};
use crate::table::{Row, Table};
use crate::{CsvResult, CsvSearchError};
use log::debug;

/// A complete query: term plus optional column identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub term: String,
    /// Numeric index or header name; `None` or empty searches every column.
    pub column: Option<String>,
    pub header_match: HeaderMatch,
}

impl SearchRequest {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn in_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_header_match(mut self, header_match: HeaderMatch) -> Self {
        self.header_match = header_match;
        self
    }
}

/// Rows that matched, plus the column they were matched in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults<'a> {
    pub column: Option<ColumnSelector>,
    pub rows: Vec<&'a Row>,
}

impl SearchResults<'_> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the search was narrowed to one column.
    pub fn column_specified(&self) -> bool {
        self.column.is_some()
    }

    /// Owned copy of the matching rows.
    pub fn to_rows(&self) -> Vec<Row> {
        self.rows.iter().map(|r| (*r).clone()).collect()
    }
}

/// Filter `table` to the rows containing `term`.
///
/// Without a column any field may contain the term. With one, the first row
/// the index does not fit aborts the whole search with
/// [`CsvSearchError::ColumnIndexTooLarge`] or
/// [`CsvSearchError::ColumnIndexTooSmall`]. Matching is case-sensitive
/// substring containment.
pub fn search_rows<'a>(
    table: &'a Table,
    column: Option<ColumnSelector>,
    term: &str,
) -> CsvResult<Vec<&'a Row>> {
    let mut matches = Vec::new();

    match column {
        None => {
            matches.extend(
                table
                    .rows()
                    .iter()
                    .filter(|row| row.iter().any(|field| field.contains(term))),
            );
        }
        Some(selector) => {
            let index = selector.index();
            for row in table.rows() {
                let field = field_at(row, index)?;
                if field.contains(term) {
                    matches.push(row);
                }
            }
        }
    }

    debug!(
        "search {:?} in {:?}: {} of {} rows",
        term,
        column,
        matches.len(),
        table.len()
    );
    Ok(matches)
}

fn field_at(row: &Row, index: i64) -> CsvResult<&str> {
    if index < 0 {
        return Err(CsvSearchError::ColumnIndexTooSmall { index });
    }
    usize::try_from(index)
        .ok()
        .and_then(|i| row.get(i))
        .map(String::as_str)
        .ok_or(CsvSearchError::ColumnIndexTooLarge {
            index,
            width: row.len(),
        })
}

/// Resolve the request's column against `table` and run the search.
pub fn search<'a>(table: &'a Table, request: &SearchRequest) -> CsvResult<SearchResults<'a>> {
    let column = resolve_column(table, request.column.as_deref(), request.header_match)?;
    let rows = search_rows(table, column, &request.term)?;
    Ok(SearchResults { column, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_str, ParseOptions};

    fn colors() -> Table {
        parse_str("RI,White\nMA,Black\nNY,Whitehall\n", ParseOptions::default().with_headers(false))
    }

    fn states() -> Table {
        parse_str(
            "State,Color\nRI,White\nMA,Black\nWI,Blue\n",
            ParseOptions::default(),
        )
    }

    #[test]
    fn any_column_substring_match() {
        let t = parse_str("RI,White\nMA,Black\n", ParseOptions::default().with_headers(false));
        let rows = search_rows(&t, None, "Whi").unwrap();
        assert_eq!(rows, vec![&t.rows()[0]]);
    }

    #[test]
    fn match_is_case_sensitive() {
        let t = colors();
        assert!(search_rows(&t, None, "white").unwrap().is_empty());
    }

    #[test]
    fn row_counted_once_when_several_fields_match() {
        let t = parse_str("ab,abc\n", ParseOptions::default().with_headers(false));
        assert_eq!(search_rows(&t, None, "ab").unwrap().len(), 1);
    }

    #[test]
    fn restricted_to_column() {
        let t = states();
        let rows = search_rows(&t, Some(ColumnSelector::Index(0)), "I").unwrap();
        assert_eq!(rows, vec![&t.rows()[0], &t.rows()[2]]);
        let rows = search_rows(&t, Some(ColumnSelector::Index(1)), "I").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn index_at_width_is_too_large() {
        let t = colors();
        let err = search_rows(&t, Some(ColumnSelector::Index(2)), "x").unwrap_err();
        assert!(matches!(
            err,
            CsvSearchError::ColumnIndexTooLarge { index: 2, width: 2 }
        ));
    }

    #[test]
    fn negative_index_is_too_small() {
        let t = colors();
        let err = search_rows(&t, Some(ColumnSelector::Index(-1)), "x").unwrap_err();
        assert!(matches!(err, CsvSearchError::ColumnIndexTooSmall { index: -1 }));
    }

    #[test]
    fn narrow_row_aborts_search() {
        let t = parse_str("a,b,c\nd,e\n", ParseOptions::default().with_headers(false));
        let err = search_rows(&t, Some(ColumnSelector::Index(2)), "c").unwrap_err();
        assert!(matches!(
            err,
            CsvSearchError::ColumnIndexTooLarge { index: 2, width: 2 }
        ));
    }

    #[test]
    fn empty_table_never_range_checks() {
        let t = parse_str("", ParseOptions::default());
        assert!(search_rows(&t, Some(ColumnSelector::Index(7)), "x")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn search_by_header_name() {
        let t = states();
        let results = search(&t, &SearchRequest::new("Bl").in_column("Color")).unwrap();
        assert!(results.column_specified());
        assert_eq!(results.column, Some(ColumnSelector::Header(1)));
        assert_eq!(
            results.to_rows(),
            vec![
                vec!["MA".to_string(), "Black".to_string()],
                vec!["WI".to_string(), "Blue".to_string()],
            ]
        );
    }

    #[test]
    fn search_unknown_header_fails() {
        let t = states();
        let err = search(&t, &SearchRequest::new("Bl").in_column("Hue")).unwrap_err();
        assert!(matches!(err, CsvSearchError::ColumnNotFound(_)));
    }

    #[test]
    fn search_without_matches_is_ok() {
        let t = states();
        let results = search(&t, &SearchRequest::new("Purple")).unwrap();
        assert!(results.is_empty());
        assert!(!results.column_specified());
    }
}
