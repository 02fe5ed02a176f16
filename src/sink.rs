//! Persisting accumulated records as CSV, JSON or XML.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use tracing::info;

use crate::error::SinkError;
use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
    Xml,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Xml => "xml",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "xml" => Ok(OutputFormat::Xml),
            _ => Err(SinkError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Destination for a run's records.
pub trait ResultSink {
    /// Write `records` to `destination` (extension replaced by the format's).
    /// Returns the written path, or `None` when there was nothing to write.
    fn write(
        &mut self,
        records: &[Record],
        destination: &Path,
        format: OutputFormat,
    ) -> Result<Option<PathBuf>, SinkError>;
}

/// Writes one file per call, creating parent directories as needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSink;

impl ResultSink for FileSink {
    fn write(
        &mut self,
        records: &[Record],
        destination: &Path,
        format: OutputFormat,
    ) -> Result<Option<PathBuf>, SinkError> {
        if records.is_empty() {
            info!("No data to save");
            return Ok(None);
        }

        let path = destination.with_extension(format.extension());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SinkError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        match format {
            OutputFormat::Csv => write_csv(records, &path)?,
            OutputFormat::Json => write_json(records, &path)?,
            OutputFormat::Xml => write_xml(records, &path)?,
        }

        info!("Saved {} records to {}", records.len(), path.display());
        Ok(Some(path))
    }
}

fn write_csv(records: &[Record], path: &Path) -> Result<(), SinkError> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush().map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json(records: &[Record], path: &Path) -> Result<(), SinkError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut serializer)?;
    write_file(path, &buf)
}

/// `<items><item><Job_Title>..</Job_Title>..</item></items>`
fn write_xml(records: &[Record], path: &Path) -> Result<(), SinkError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("items")))
        .map_err(xml_err)?;
    for record in records {
        writer
            .write_event(Event::Start(BytesStart::new("item")))
            .map_err(xml_err)?;
        for (header, value) in record.columns() {
            let tag = header.replace(' ', "_");
            writer
                .write_event(Event::Start(BytesStart::new(tag.as_str())))
                .map_err(xml_err)?;
            writer
                .write_event(Event::Text(BytesText::new(&value)))
                .map_err(xml_err)?;
            writer
                .write_event(Event::End(BytesEnd::new(tag.as_str())))
                .map_err(xml_err)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("item")))
            .map_err(xml_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("items")))
        .map_err(xml_err)?;

    write_file(path, &writer.into_inner())
}

fn xml_err(e: impl fmt::Display) -> SinkError {
    SinkError::Xml(e.to_string())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), SinkError> {
    fs::write(path, contents).map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })
}
