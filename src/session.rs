use crate::io::open_path;
use crate::parser::{parse_stream, ParseOptions};
use crate::search::{search, SearchRequest, SearchResults};
use crate::table::Table;
use crate::{CsvResult, CsvSearchError};
use log::info;
use std::path::{Path, PathBuf};

#[derive(Debug)]
struct Loaded {
    path: PathBuf,
    options: ParseOptions,
    table: Table,
}

/// The file a caller is currently working with.
///
/// Owned by the caller and passed to whatever needs it; loading replaces
/// the previous file only once the new one has parsed successfully.
#[derive(Debug, Default)]
pub struct CsvSession {
    loaded: Option<Loaded>,
}

impl CsvSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&mut self, path: impl AsRef<Path>, options: ParseOptions) -> CsvResult<&Table> {
        let path = path.as_ref();
        let (reader, _meta) = open_path(path).await?;
        let table = parse_stream(reader, options).await?;
        info!(
            "loaded {}: {} rows, {} malformed",
            path.display(),
            table.len(),
            table.malformed_rows().len()
        );

        let loaded = self.loaded.insert(Loaded {
            path: path.to_path_buf(),
            options,
            table,
        });
        Ok(&loaded.table)
    }

    /// Forget the loaded file. Returns its path if one was loaded.
    pub fn unload(&mut self) -> Option<PathBuf> {
        self.loaded.take().map(|l| l.path)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.loaded.as_ref().map(|l| l.path.as_path())
    }

    pub fn options(&self) -> Option<ParseOptions> {
        self.loaded.as_ref().map(|l| l.options)
    }

    pub fn table(&self) -> CsvResult<&Table> {
        self.loaded
            .as_ref()
            .map(|l| &l.table)
            .ok_or(CsvSearchError::NoFileLoaded)
    }

    pub fn search(&self, request: &SearchRequest) -> CsvResult<SearchResults<'_>> {
        search(self.table()?, request)
    }
}
