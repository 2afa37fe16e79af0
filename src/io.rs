use crate::codec::Utf8Transcoder;
use crate::CsvResult;
use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use log::debug;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

/// What is known about a source before reading it.
#[derive(Debug, Clone)]
pub struct SourceMeta {
    /// Transfer encoding, e.g. "gzip", "zstd", "gzip, identity" or empty.
    pub content_encoding: String,
    /// File name or object key, used for extension fallback.
    pub name_hint: String,
    /// Character encoding of the text (defaults to UTF-8).
    pub charset: &'static encoding_rs::Encoding,
}

impl Default for SourceMeta {
    fn default() -> Self {
        Self {
            content_encoding: String::new(),
            name_hint: String::new(),
            charset: encoding_rs::UTF_8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

impl Compression {
    /// Encoding header wins; the file name suffix is the fallback.
    pub fn detect(meta: &SourceMeta) -> Self {
        let encoding = meta.content_encoding.to_ascii_lowercase();
        let declared = |name: &str| encoding.split(',').any(|s| s.trim() == name);
        let name = meta.name_hint.to_ascii_lowercase();

        if declared("gzip") || name.ends_with(".gz") {
            Compression::Gzip
        } else if declared("zstd") || name.ends_with(".zst") {
            Compression::Zstd
        } else {
            Compression::None
        }
    }
}

/// Wrap a raw byte stream with decompression and UTF-8 transcoding as
/// `meta` requires. The result is ready for [`crate::parse_stream`].
pub fn decode_source<R>(raw: R, meta: &SourceMeta) -> Box<dyn AsyncRead + Unpin + Send>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = BufReader::with_capacity(1 << 16, raw);
    let decompressed: Box<dyn AsyncRead + Unpin + Send> = match Compression::detect(meta) {
        Compression::Gzip => Box::new(GzipDecoder::new(buf)),
        Compression::Zstd => Box::new(ZstdDecoder::new(buf)),
        Compression::None => Box::new(buf),
    };

    if meta.charset == encoding_rs::UTF_8 {
        return decompressed;
    }
    let framed = FramedRead::new(decompressed, Utf8Transcoder::new(meta.charset));
    Box::new(StreamReader::new(framed))
}

/// Open a local file, inferring compression from its extension.
pub async fn open_path(path: &Path) -> CsvResult<(Box<dyn AsyncRead + Unpin + Send>, SourceMeta)> {
    let file = File::open(path).await?;
    let meta = SourceMeta {
        name_hint: path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string(),
        ..Default::default()
    };
    debug!(
        "opened {} ({:?})",
        path.display(),
        Compression::detect(&meta)
    );
    Ok((decode_source(file, &meta), meta))
}
