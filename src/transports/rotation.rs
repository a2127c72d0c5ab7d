//! Size and period based rotating file writer
//!
//! The active file always lives at the configured path. On rotation it is
//! renamed to `<path>.1` (shifting older backups up by one, dropping the
//! oldest beyond `max_backups`) and optionally gzip-compressed to
//! `<path>.1.gz`.

use crate::core::{LoggerConfig, LoggerError, Result};
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Calendar period after which the active file is rotated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPeriod {
    Hourly,
    Daily,
    Never,
}

impl RotationPeriod {
    /// Interpret a date pattern such as `YYYY-MM-DD` or `YYYY-MM-DD-HH`
    ///
    /// # Example
    ///
    /// ```
    /// use structured_logger::transports::RotationPeriod;
    ///
    /// assert_eq!(RotationPeriod::from_date_pattern("YYYY-MM-DD").unwrap(), RotationPeriod::Daily);
    /// assert_eq!(RotationPeriod::from_date_pattern("YYYY-MM-DD-HH").unwrap(), RotationPeriod::Hourly);
    /// assert!(RotationPeriod::from_date_pattern("weekly").is_err());
    /// ```
    pub fn from_date_pattern(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Ok(RotationPeriod::Never);
        }
        if pattern.contains("HH") {
            Ok(RotationPeriod::Hourly)
        } else if pattern.contains("DD") {
            Ok(RotationPeriod::Daily)
        } else {
            Err(LoggerError::config(
                "FileTransport",
                format!("unsupported datePattern '{}'", pattern),
            ))
        }
    }

    /// Key identifying the period `at` falls in; a change means rotate
    fn key(&self, at: &DateTime<Local>) -> Option<String> {
        match self {
            RotationPeriod::Hourly => Some(at.format("%Y-%m-%d-%H").to_string()),
            RotationPeriod::Daily => Some(at.format("%Y-%m-%d").to_string()),
            RotationPeriod::Never => None,
        }
    }
}

/// When and how to rotate
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    /// Rotate once the active file reaches this many bytes
    pub max_bytes: Option<u64>,
    pub period: RotationPeriod,
    /// Maximum number of rotated files to keep
    pub max_backups: usize,
    /// Gzip rotated files
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: Some(20 * 1024 * 1024),
            period: RotationPeriod::Daily,
            max_backups: 14,
            compress: true,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy from `maxSize`, `maxFiles`, `datePattern` and `zippedArchive`
    pub fn from_config(config: &LoggerConfig) -> Result<Self> {
        Ok(Self {
            max_bytes: Some(config.max_size_bytes()?),
            period: RotationPeriod::from_date_pattern(&config.date_pattern)?,
            max_backups: config.max_files,
            compress: config.zipped_archive,
        })
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, size: u64) -> Self {
        self.max_bytes = Some(size);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_period(mut self, period: RotationPeriod) -> Self {
        self.period = period;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }
}

/// Append-only writer that rotates its file by size and calendar period
pub struct RotatingWriter {
    base_path: PathBuf,
    policy: RotationPolicy,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    /// Period key of the active file
    period_key: Option<String>,
}

impl RotatingWriter {
    /// Open (or create) the active file, creating parent directories
    pub fn open<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        if let Some(parent) = base_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let (file, current_size, modified) = Self::open_active(&base_path)?;
        let period_key = policy.period.key(&modified);

        Ok(Self {
            base_path,
            policy,
            writer: Some(BufWriter::new(file)),
            current_size,
            period_key,
        })
    }

    fn open_active(path: &Path) -> Result<(File, u64, DateTime<Local>)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::file_transport(path.display().to_string(), format!("Failed to open: {}", e))
            })?;

        let metadata = file.metadata().map_err(|e| {
            LoggerError::file_transport(
                path.display().to_string(),
                format!("Cannot access file metadata: {}", e),
            )
        })?;
        let modified = metadata
            .modified()
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| Local::now());

        Ok((file, metadata.len(), modified))
    }

    /// Append one line (a trailing newline is added)
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.write_line_at(line, Local::now())
    }

    pub(crate) fn write_line_at(&mut self, line: &str, now: DateTime<Local>) -> Result<()> {
        if self.current_size == 0 {
            // nothing to archive yet
            self.period_key = self.policy.period.key(&now);
        } else if self.should_rotate(&now) {
            if let Err(e) = self.rotate(&now) {
                eprintln!("[LOGGER WARNING] Log rotation failed: {}. Continuing with current file.", e);

                if self.writer.is_none() {
                    let (file, size, _) = Self::open_active(&self.base_path)?;
                    self.writer = Some(BufWriter::new(file));
                    self.current_size = size;
                }
                // Let the file grow past the limit rather than retry on every line
                self.current_size = 0;
                self.period_key = self.policy.period.key(&now);
            }
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("Writer not initialized"))?;

        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|e| {
                LoggerError::file_transport(
                    self.base_path.display().to_string(),
                    format!("Failed to write log entry: {}", e),
                )
            })?;
        self.current_size += line.len() as u64 + 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush().map_err(|e| {
                LoggerError::file_transport(
                    self.base_path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn should_rotate(&self, now: &DateTime<Local>) -> bool {
        let size_exceeded = self
            .policy
            .max_bytes
            .is_some_and(|max| self.current_size >= max);
        let period_changed = match (&self.period_key, self.policy.period.key(now)) {
            (Some(active), Some(current)) => *active != current,
            _ => false,
        };
        size_exceeded || period_changed
    }

    fn rotate(&mut self, now: &DateTime<Local>) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        // Drop the oldest backup, then shift the rest up by one
        let oldest = self.backup_path(self.policy.max_backups);
        for path in [gz_path(&oldest), oldest] {
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    eprintln!(
                        "[LOGGER WARNING] Failed to remove oldest backup {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }

        for i in (1..self.policy.max_backups).rev() {
            let from = self.backup_path(i);
            let to = self.backup_path(i + 1);
            for (from, to) in [(gz_path(&from), gz_path(&to)), (from, to)] {
                if from.exists() {
                    fs::rename(&from, &to).map_err(|e| {
                        LoggerError::file_rotation(
                            from.display().to_string(),
                            format!("Failed to rotate backup files: {}", e),
                        )
                    })?;
                }
            }
        }

        let first_backup = self.backup_path(1);
        if self.base_path.exists() && self.policy.max_backups > 0 {
            fs::rename(&self.base_path, &first_backup).map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to rotate current log file: {}", e),
                )
            })?;

            if self.policy.compress {
                compress_file(&first_backup)?;
            }
        } else if self.base_path.exists() {
            fs::remove_file(&self.base_path)?;
        }

        let (file, _, _) = Self::open_active(&self.base_path)?;
        self.writer = Some(BufWriter::new(file));
        self.current_size = 0;
        self.period_key = self.policy.period.key(now);

        Ok(())
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut path = self.base_path.clone();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.log");
        path.set_file_name(format!("{}.{}", filename, index));
        path
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }
}

impl Drop for RotatingWriter {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}

fn gz_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".gz");
    PathBuf::from(os)
}

/// Gzip `path` into `path.gz`, removing the original only after success
fn compress_file(path: &Path) -> Result<()> {
    use std::io::{BufReader, Read};

    let target = gz_path(path);
    let mut temp = target.clone().into_os_string();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    let compress = || -> std::io::Result<()> {
        let mut reader = BufReader::with_capacity(64 * 1024, File::open(path)?);
        let output = BufWriter::with_capacity(64 * 1024, File::create(&temp)?);
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());

        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            encoder.write_all(&buffer[..read])?;
        }
        encoder.finish()?.flush()?;
        fs::rename(&temp, &target)
    };

    if let Err(e) = compress() {
        let _ = fs::remove_file(&temp);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress '{}'", path.display()),
            e,
        ));
    }

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compressed {} but failed to remove the original: {}",
            path.display(),
            e
        );
    }
    Ok(())
}
