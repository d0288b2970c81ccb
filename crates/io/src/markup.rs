use std::io::Cursor;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use drivercore_recon::config::MarkupConfig;
use drivercore_recon::model::{RawRow, ReleaseSource};
use drivercore_recon::IngestError;

use crate::text::read_file_as_utf8;
use crate::RowSource;

/// Attribute-tagged XML feed: each configured element is one model.
///
/// ```xml
/// <Models>
///   <Model DisplayName="Surface Laptop 4" SupportedBuilds="10.0.19044,10.0.22000"/>
/// </Models>
/// ```
pub struct MarkupSource {
    reader: Reader<Cursor<Vec<u8>>>,
    buf: Vec<u8>,
    config: MarkupConfig,
    label: String,
    position: u64,
    done: bool,
}

impl MarkupSource {
    pub fn open(path: &Path, config: MarkupConfig) -> Result<Self, IngestError> {
        let content = read_file_as_utf8(path)?;
        Ok(Self::from_string(content, config, path.display().to_string()))
    }

    pub fn from_string(content: String, config: MarkupConfig, label: String) -> Self {
        let mut reader = Reader::from_reader(Cursor::new(content.into_bytes()));
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            config,
            label,
            position: 0,
            done: false,
        }
    }
}

fn to_row(config: &MarkupConfig, position: u64, e: &BytesStart<'_>) -> Result<RawRow, IngestError> {
    let mut name = None;
    let mut builds = Vec::new();

    for attr in e.attributes().flatten() {
        let key = attr.key.as_ref();
        if key == config.name_attr.as_bytes() {
            name = Some(attr_text(&attr.value));
        } else if key == config.builds_attr.as_bytes() {
            builds = split_builds(&attr_text(&attr.value));
        }
    }

    let model = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| IngestError::MissingAttribute {
            position,
            attribute: config.name_attr.clone(),
        })?;

    Ok(RawRow {
        position,
        oem: None,
        family: config.family.clone(),
        model,
        releases: ReleaseSource::Builds(builds),
        updated: None,
    })
}

fn attr_text(value: &[u8]) -> String {
    let raw = String::from_utf8_lossy(value).into_owned();
    let unescaped = quick_xml::escape::unescape(&raw).map(|v| v.into_owned()).ok();
    unescaped.unwrap_or(raw)
}

/// Build lists are separated by `,` or `;`.
fn split_builds(value: &str) -> Vec<String> {
    value
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Iterator for MarkupSource {
    type Item = Result<RawRow, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            let item = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if e.name().as_ref() == self.config.element.as_bytes() =>
                {
                    self.position += 1;
                    Some(to_row(&self.config, self.position, e))
                }
                Ok(Event::Eof) => {
                    self.done = true;
                    None
                }
                Err(e) => {
                    self.done = true;
                    Some(Err(IngestError::Source(format!(
                        "{}: malformed XML at byte {}: {e}",
                        self.label,
                        self.reader.buffer_position()
                    ))))
                }
                _ => None,
            };
            if item.is_some() {
                return item;
            }
        }
        None
    }
}

impl RowSource for MarkupSource {
    fn describe(&self) -> String {
        format!("markup feed {} (<{}> elements)", self.label, self.config.element)
    }
}
