//! Row type and the table writers (CSV, Parquet, XLSX).

use crate::errors::{Error, ErrorKind, Result};
use crate::page::Card;
use log::debug;
use parquet::data_type::{ByteArray, ByteArrayType};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

pub const COLUMNS: [&str; 4] = ["USERNAME", "DESCRIPTION", "VIDEO_URL", "TOPIC"];

const PARQUET_SCHEMA: &str = "
    message walk_row {
        REQUIRED BYTE_ARRAY USERNAME (UTF8);
        REQUIRED BYTE_ARRAY DESCRIPTION (UTF8);
        REQUIRED BYTE_ARRAY VIDEO_URL (UTF8);
        REQUIRED BYTE_ARRAY TOPIC (UTF8);
    }
";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Row {
    pub username: String,
    pub description: String,
    pub video_url: String,
    pub topic: String,
}

impl Row {
    pub fn from_card(card: Card, topic: &str) -> Self {
        Row {
            username: card.username,
            description: card.description,
            video_url: card.video_url,
            topic: topic.to_string(),
        }
    }

    /// Field values in `COLUMNS` order.
    fn values(&self) -> [&str; 4] {
        [&self.username, &self.description, &self.video_url, &self.topic]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Parquet,
    Xlsx,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
            OutputFormat::Xlsx => "xlsx",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            "xlsx" => Ok(OutputFormat::Xlsx),
            _ => Err(ErrorKind::UnknownFormat(s.to_string()).into()),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Where the final table goes and how it is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    path: PathBuf,
    format: OutputFormat,
}

impl OutputTarget {
    pub fn new(path: impl Into<PathBuf>, format: OutputFormat) -> Self {
        OutputTarget {
            path: path.into(),
            format,
        }
    }

    /// Picks the format from the file extension (case-sensitive, so
    /// `out.CSV` is not recognized). Anything unrecognized is written as
    /// CSV to `<path>.csv`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some("csv") => Some(OutputFormat::Csv),
            Some("parquet") => Some(OutputFormat::Parquet),
            Some("xlsx") => Some(OutputFormat::Xlsx),
            _ => None,
        };

        match format {
            Some(format) => OutputTarget { path, format },
            None => {
                let mut name = path.into_os_string();
                name.push(".csv");
                OutputTarget {
                    path: PathBuf::from(name),
                    format: OutputFormat::Csv,
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn write(&self, rows: &[Row]) -> Result<()> {
        debug!("Writing {} rows to {} as {}", rows.len(), self.path.display(), self.format);
        match self.format {
            OutputFormat::Csv => write_csv(&self.path, rows),
            OutputFormat::Parquet => write_parquet(&self.path, rows),
            OutputFormat::Xlsx => write_xlsx(&self.path, rows),
        }
    }
}

pub fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    // Header is written by hand so an empty table still has one.
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_csv(path: &Path) -> Result<Vec<Row>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<Row>, csv::Error>>()?;
    Ok(rows)
}

fn write_parquet(path: &Path, rows: &[Row]) -> Result<()> {
    let schema = Arc::new(parse_message_type(PARQUET_SCHEMA)?);
    let properties = Arc::new(WriterProperties::builder().build());
    let mut writer = SerializedFileWriter::new(File::create(path)?, schema, properties)?;

    if !rows.is_empty() {
        let mut row_group = writer.next_row_group()?;
        let mut index = 0;
        while let Some(mut column) = row_group.next_column()? {
            let values: Vec<ByteArray> = rows
                .iter()
                .map(|row| ByteArray::from(row.values()[index]))
                .collect();
            column.typed::<ByteArrayType>().write_batch(&values, None, None)?;
            column.close()?;
            index += 1;
        }
        row_group.close()?;
    }

    writer.close()?;
    Ok(())
}

fn write_xlsx(path: &Path, rows: &[Row]) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in (0u16..).zip(COLUMNS) {
        worksheet.write_string(0, col, name)?;
    }
    for (index, row) in rows.iter().enumerate() {
        let line = u32::try_from(index + 1).map_err(|_| "too many rows for a worksheet")?;
        for (col, value) in (0u16..).zip(row.values()) {
            worksheet.write_string(line, col, value)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}
