use std::io::Cursor;
use std::path::Path;

use drivercore_recon::config::DelimitedLayout;
use drivercore_recon::model::{RawRow, ReleaseSource};
use drivercore_recon::{IngestError, Release};

use crate::text::read_file_as_utf8;
use crate::RowSource;

/// First-column value marking a header row. Skipped wherever it appears.
pub const SENTINEL: &str = "Make";

/// Fewest columns any layout accepts.
const MIN_COLUMNS: usize = 3;

/// Content width at which `Auto` picks the release-flag layout.
const FLAG_COLUMNS: usize = 7;

/// Comma-separated feed, one [`RawRow`] per data record.
pub struct DelimitedSource {
    records: csv::StringRecordsIntoIter<Cursor<Vec<u8>>>,
    layout: DelimitedLayout,
    label: String,
    position: u64,
    done: bool,
}

impl DelimitedSource {
    pub fn open(path: &Path, layout: DelimitedLayout) -> Result<Self, IngestError> {
        let content = read_file_as_utf8(path)?;
        Ok(Self::from_string(content, layout, path.display().to_string()))
    }

    pub fn from_string(content: String, layout: DelimitedLayout, label: String) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(Cursor::new(content.into_bytes()))
            .into_records();
        Self {
            records,
            layout,
            label,
            position: 0,
            done: false,
        }
    }

    /// The layout in use; `Auto` until a record of at least three
    /// non-empty columns has been read.
    pub fn layout(&self) -> DelimitedLayout {
        self.layout
    }

    fn to_row(&self, record: &csv::StringRecord) -> Result<RawRow, IngestError> {
        let expected = self.layout.required_columns().unwrap_or(0);
        if record.len() < expected {
            return Err(IngestError::MalformedRow {
                position: self.position,
                expected,
                found: record.len(),
            });
        }

        let col = |i: usize| record.get(i).unwrap_or("").trim().to_string();

        Ok(match self.layout {
            DelimitedLayout::Dated => RawRow {
                position: self.position,
                oem: None,
                family: col(0),
                model: col(1),
                releases: ReleaseSource::Inferred,
                updated: Some(col(2)),
            },
            _ => RawRow {
                position: self.position,
                oem: Some(col(0)),
                family: col(1),
                model: col(2),
                releases: ReleaseSource::Flags(
                    Release::ALL
                        .into_iter()
                        .enumerate()
                        .map(|(i, release)| (release, col(3 + i)))
                        .collect(),
                ),
                updated: None,
            },
        })
    }
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

/// Columns up to and including the last non-empty cell, so trailing
/// padding from spreadsheet exports does not count.
fn content_width(record: &csv::StringRecord) -> usize {
    (0..record.len())
        .rposition(|i| !record[i].trim().is_empty())
        .map_or(0, |i| i + 1)
}

impl Iterator for DelimitedSource {
    type Item = Result<RawRow, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => {
                    self.done = true;
                    return Some(Err(IngestError::Source(format!("{}: {e}", self.label))));
                }
            };
            self.position += 1;

            if is_blank(&record) {
                continue;
            }

            let sentinel = record.get(0).map(str::trim) == Some(SENTINEL);

            // Auto commits on the first record wide enough for some layout.
            if self.layout == DelimitedLayout::Auto {
                let width = content_width(&record);
                if width >= MIN_COLUMNS {
                    self.layout = if width >= FLAG_COLUMNS {
                        DelimitedLayout::ReleaseFlags
                    } else {
                        DelimitedLayout::Dated
                    };
                    log::debug!("{}: {width} columns, using {} layout", self.label, self.layout);
                } else if !sentinel {
                    return Some(Err(IngestError::MalformedRow {
                        position: self.position,
                        expected: MIN_COLUMNS,
                        found: width,
                    }));
                }
            }

            if sentinel {
                continue;
            }

            return Some(self.to_row(&record));
        }
        None
    }
}

impl RowSource for DelimitedSource {
    fn describe(&self) -> String {
        format!("delimited feed {} ({} layout)", self.label, self.layout)
    }
}
