//! Source readers: turn vendor feed files into [`RawRow`]s.
//!
//! Both adapters read lazily, one row per `next()`, so a row's catalog
//! writes finish before the next row is parsed.

pub mod delimited;
pub mod markup;
pub mod text;

use std::path::Path;

use drivercore_recon::config::{DelimitedLayout, MarkupConfig};
use drivercore_recon::model::RawRow;
use drivercore_recon::IngestError;

pub use delimited::DelimitedSource;
pub use markup::MarkupSource;

/// A lazy sequence of raw rows from one feed file.
pub trait RowSource: Iterator<Item = Result<RawRow, IngestError>> {
    /// Short label for logs and the run report.
    fn describe(&self) -> String;
}

/// Which adapter to use for a file.
#[derive(Debug, Clone)]
pub enum SourceKind {
    Delimited(DelimitedLayout),
    Markup(MarkupConfig),
}

/// Open `path` with the adapter for `kind`.
///
/// Fails only when the file cannot be read; content problems surface as
/// items of the returned iterator.
pub fn open_source(path: &Path, kind: &SourceKind) -> Result<Box<dyn RowSource>, IngestError> {
    let source: Box<dyn RowSource> = match kind {
        SourceKind::Delimited(layout) => Box::new(DelimitedSource::open(path, *layout)?),
        SourceKind::Markup(config) => Box::new(MarkupSource::open(path, config.clone())?),
    };
    log::debug!("opened {}", source.describe());
    Ok(source)
}
