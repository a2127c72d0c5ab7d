//! File transport writing newline-delimited JSON

use super::rotation::{RotatingWriter, RotationPolicy};
use crate::core::{LogEntry, LoggerConfig, Result, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// One line of the file output
#[derive(Serialize)]
struct FileRecord<'a> {
    timestamp: String,
    level: &'a str,
    message: &'a str,
    data: Value,
}

impl<'a> FileRecord<'a> {
    fn from_entry(entry: &'a LogEntry) -> Result<Self> {
        let mut data = match entry.context().to_json_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Some(error) = entry.error() {
            data.insert("error".to_string(), serde_json::to_value(error)?);
        }
        if let Some(duration) = entry.duration() {
            data.insert("duration".to_string(), serde_json::to_value(duration)?);
        }
        if let Some(labels) = entry.labels() {
            data.insert("labels".to_string(), serde_json::to_value(labels)?);
        }

        Ok(Self {
            timestamp: entry.timestamp_iso(),
            level: entry.level().as_wire_str(),
            message: entry.message(),
            data: Value::Object(data),
        })
    }
}

/// Appends `{timestamp, level, message, data}` JSON lines to a rotating file
///
/// # Example
///
/// ```no_run
/// use structured_logger::transports::{FileTransport, RotationPolicy};
///
/// let transport = FileTransport::new("logs/app.log", RotationPolicy::new().with_max_backups(7)).unwrap();
/// ```
pub struct FileTransport {
    path: PathBuf,
    writer: Mutex<RotatingWriter>,
}

impl FileTransport {
    pub fn new<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = RotatingWriter::open(&path, policy)?;
        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    /// File transport using `filePath` and the rotation options of `config`
    pub fn from_config(config: &LoggerConfig) -> Result<Self> {
        Self::new(&config.file_path, RotationPolicy::from_config(config)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flush(&self) -> Result<()> {
        self.writer.lock().flush()
    }
}

#[async_trait]
impl Transport for FileTransport {
    fn log(&self, entry: &LogEntry) -> Result<()> {
        let line = serde_json::to_string(&FileRecord::from_entry(entry)?)?;
        let mut writer = self.writer.lock();
        writer.write_line(&line)?;
        writer.flush()
    }

    async fn cleanup(&self) -> Result<()> {
        self.flush()
    }

    fn name(&self) -> &str {
        "file"
    }
}
