use crate::table::{MalformedRow, Row, Table};
use crate::CsvResult;
use log::debug;
use memchr::memmem;
use std::io::BufRead;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// How a source should be tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Treat the first line as the header row.
    pub has_headers: bool,
    /// Field separator.
    pub delimiter: char,
    /// Opens and closes a quoted field.
    pub quote: char,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            has_headers: true,
            delimiter: ',',
            quote: '"',
        }
    }
}

impl ParseOptions {
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_quote(mut self, quote: char) -> Self {
        self.quote = quote;
        self
    }
}

#[derive(Clone, Copy)]
enum State {
    /// At the beginning of a field, nothing consumed yet.
    FieldStart,
    Unquoted,
    Quoted,
    /// Just saw a quote while inside a quoted span: either the span closes
    /// or the next char is a second quote (an escaped literal quote).
    QuoteInQuoted,
}

/// Split one physical line into fields.
///
/// A quote opens a quoted span only at the start of a field; inside the
/// span the delimiter is literal and `""` stands for one quote. An
/// unterminated span runs to the end of the line.
pub fn split_line(line: &str, delimiter: char, quote: char) -> Row {
    let mut quote_buf = [0u8; 4];
    let quote_bytes = quote.encode_utf8(&mut quote_buf).as_bytes();

    if memmem::find(line.as_bytes(), quote_bytes).is_none() {
        let mut delim_buf = [0u8; 4];
        let delim = delimiter.encode_utf8(&mut delim_buf);
        // matches cover whole UTF-8 sequences, so every cut is a char boundary
        let mut fields = Vec::new();
        let mut start = 0usize;
        for i in memmem::find_iter(line.as_bytes(), delim.as_bytes()) {
            fields.push(line[start..i].to_string());
            start = i + delim.len();
        }
        fields.push(line[start..].to_string());
        return fields;
    }

    let mut fields = Vec::new();
    let mut field = String::with_capacity(line.len());
    let mut state = State::FieldStart;

    for c in line.chars() {
        state = match state {
            State::FieldStart if c == quote => State::Quoted,
            State::FieldStart | State::Unquoted | State::QuoteInQuoted if c == delimiter => {
                fields.push(std::mem::take(&mut field));
                State::FieldStart
            }
            State::FieldStart | State::Unquoted => {
                field.push(c);
                State::Unquoted
            }
            State::Quoted if c == quote => State::QuoteInQuoted,
            State::Quoted => {
                field.push(c);
                State::Quoted
            }
            State::QuoteInQuoted if c == quote => {
                field.push(quote);
                State::Quoted
            }
            // text after a closing quote is kept as-is
            State::QuoteInQuoted => {
                field.push(c);
                State::Unquoted
            }
        };
    }
    fields.push(field);
    fields
}

/// Line-at-a-time table builder.
///
/// With headers declared, the first line pushed becomes the header row and
/// fixes the expected width; later lines of a different width are recorded
/// as malformed instead of being added to the data rows.
#[derive(Debug)]
pub struct RowParser {
    options: ParseOptions,
    line_no: usize,
    table: Table,
}

impl RowParser {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            line_no: 0,
            table: Table::default(),
        }
    }

    /// Feed one physical line. A trailing `\r` left over from CRLF input is dropped.
    pub fn push_line(&mut self, line: &str) {
        self.line_no += 1;
        let line = line.strip_suffix('\r').unwrap_or(line);
        let fields = split_line(line, self.options.delimiter, self.options.quote);

        if self.options.has_headers {
            match &self.table.headers {
                None => {
                    self.table.headers = Some(fields);
                    return;
                }
                Some(headers) if headers.len() != fields.len() => {
                    debug!(
                        "line {}: {} fields, header has {}; row excluded",
                        self.line_no,
                        fields.len(),
                        headers.len()
                    );
                    self.table.malformed.push(MalformedRow {
                        line: self.line_no,
                        fields,
                    });
                    return;
                }
                Some(_) => {}
            }
        }
        self.table.rows.push(fields);
    }

    pub fn finish(self) -> Table {
        debug!(
            "parsed {} lines: {} rows, {} malformed",
            self.line_no,
            self.table.rows.len(),
            self.table.malformed.len()
        );
        self.table
    }
}

/// Parse an async text stream line by line.
///
/// Quoted fields cannot span lines. I/O and invalid UTF-8 surface as
/// [`crate::CsvSearchError::Io`].
pub async fn parse_stream<R>(reader: R, options: ParseOptions) -> CsvResult<Table>
where
    R: AsyncRead + Unpin,
{
    // Larger buffer than the default keeps syscalls down on big files
    let mut lines = BufReader::with_capacity(1 << 16, reader).lines();
    let mut parser = RowParser::new(options);
    while let Some(line) = lines.next_line().await? {
        parser.push_line(&line);
    }
    Ok(parser.finish())
}

/// Blocking counterpart of [`parse_stream`].
pub fn parse_reader<R: BufRead>(reader: R, options: ParseOptions) -> CsvResult<Table> {
    let mut parser = RowParser::new(options);
    for line in reader.lines() {
        parser.push_line(&line?);
    }
    Ok(parser.finish())
}

/// Parse in-memory text.
pub fn parse_str(text: &str, options: ParseOptions) -> Table {
    let mut parser = RowParser::new(options);
    for line in text.lines() {
        parser.push_line(line);
    }
    parser.finish()
}
