//! File appender with time- and size-based roll-over

use crate::core::appender::Appender;
use crate::core::error::{LoggerError, Result};
use crate::core::event::LogEvent;
use crate::formatters::{Formatter, PatternFormatter};
use chrono::{DateTime, Datelike, Local, Timelike};
use parking_lot::{Mutex, RwLock};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::SystemTime;

use rand::Rng;

/// Default size limit for [`RollPolicy::Size`] when none is configured.
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// When the current log file is closed and renamed aside.
///
/// Time policies compare the period of the current instant (local time)
/// against the period of the last open or roll; the size policy rolls once
/// the file reaches `max_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollPolicy {
    #[default]
    Never,
    Minutely,
    Hourly,
    Daily,
    Monthly,
    Yearly,
    Size {
        max_bytes: u64,
    },
}

impl RollPolicy {
    fn is_timed(&self) -> bool {
        !matches!(self, RollPolicy::Never | RollPolicy::Size { .. })
    }

    /// Period marker of `when`. Two instants with equal markers belong to
    /// the same roll period. Size and never policies have no periods.
    fn marker(&self, when: &DateTime<Local>) -> i64 {
        let date = i64::from(when.year()) * 10_000
            + i64::from(when.month()) * 100
            + i64::from(when.day());
        match self {
            RollPolicy::Yearly => i64::from(when.year()),
            RollPolicy::Monthly => i64::from(when.year()) * 100 + i64::from(when.month()),
            RollPolicy::Daily => date,
            RollPolicy::Hourly => date * 100 + i64::from(when.hour()),
            RollPolicy::Minutely => {
                (date * 100 + i64::from(when.hour())) * 100 + i64::from(when.minute())
            }
            RollPolicy::Never | RollPolicy::Size { .. } => 0,
        }
    }

    /// Timestamp fragment inserted into a rolled file's name.
    fn stamp(&self, when: &DateTime<Local>) -> String {
        match self {
            RollPolicy::Yearly => when.format("%Y").to_string(),
            RollPolicy::Monthly => when.format("%Y%m").to_string(),
            RollPolicy::Daily => when.format("%Y%m%d").to_string(),
            RollPolicy::Hourly => when.format("%Y%m%d%H").to_string(),
            RollPolicy::Minutely => when.format("%Y%m%d%H%M").to_string(),
            // Two size rolls can land in the same second; the random
            // suffix keeps the names from colliding.
            RollPolicy::Size { .. } => format!(
                "{}_{:04}",
                when.format("%Y%m%d_%H%M%S"),
                rand::thread_rng().gen_range(0..10_000)
            ),
            RollPolicy::Never => String::new(),
        }
    }
}

impl FromStr for RollPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "never" | "none" => Ok(RollPolicy::Never),
            "minutely" => Ok(RollPolicy::Minutely),
            "hourly" => Ok(RollPolicy::Hourly),
            "daily" => Ok(RollPolicy::Daily),
            "monthly" => Ok(RollPolicy::Monthly),
            "yearly" => Ok(RollPolicy::Yearly),
            "size" => Ok(RollPolicy::Size {
                max_bytes: DEFAULT_MAX_BYTES,
            }),
            other => Err(format!("unknown roll policy: {other}")),
        }
    }
}

struct FileState {
    writer: Option<BufWriter<File>>,
    current_size: u64,
    /// Period marker at last open or roll; compared by `should_roll`.
    marker: i64,
}

/// Appender writing formatted events to a file through a [`BufWriter`].
///
/// Opens in append mode and creates missing parent directories. With a
/// roll policy, the file is renamed to `<stem>.<stamp>.<ext>` when its
/// period ends or its size limit is crossed, then reopened fresh. A file
/// left over from an earlier period is rolled at open, stamped with its own
/// modification time. Roll failures degrade to continuing on the current
/// file; the live stream is never dropped over roll bookkeeping.
pub struct FileAppender {
    name: String,
    path: PathBuf,
    policy: RollPolicy,
    compress_rolled: bool,
    formatter: RwLock<Arc<dyn Formatter>>,
    state: Mutex<FileState>,
}

impl FileAppender {
    /// Open `path` for appending, never rolling.
    ///
    /// # Errors
    ///
    /// Fails when the file or a parent directory cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_policy(path, RollPolicy::Never)
    }

    /// Open `path` for appending under `policy`.
    ///
    /// # Errors
    ///
    /// Fails when the file or a parent directory cannot be created.
    pub fn with_policy(path: impl AsRef<Path>, policy: RollPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let appender = Self {
            name: format!("file({})", path.display()),
            path,
            policy,
            compress_rolled: false,
            formatter: RwLock::new(Arc::new(PatternFormatter::default()) as Arc<dyn Formatter>),
            state: Mutex::new(FileState {
                writer: None,
                current_size: 0,
                marker: 0,
            }),
        };
        {
            let mut state = appender.state.lock();
            appender.open_locked(&mut state)?;
        }
        Ok(appender)
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_formatter(self, formatter: Arc<dyn Formatter>) -> Self {
        *self.formatter.write() = formatter;
        self
    }

    /// Gzip files as they are rolled aside.
    #[cfg(feature = "file")]
    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress_rolled = enabled;
        self
    }

    pub fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        *self.formatter.write() = formatter;
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn policy(&self) -> RollPolicy {
        self.policy
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.state.lock().current_size
    }

    fn should_roll(&self, state: &FileState) -> bool {
        match self.policy {
            RollPolicy::Never => false,
            RollPolicy::Size { max_bytes } => state.current_size >= max_bytes,
            _ => self.policy.marker(&Local::now()) != state.marker,
        }
    }

    fn roll_file(&self, state: &mut FileState) -> Result<()> {
        let now = Local::now();
        // Advance the marker before attempting the roll so a failed roll is
        // not retried on every subsequent write.
        state.marker = self.policy.marker(&now);

        if let Some(mut writer) = state.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_roll(
                    self.path.display().to_string(),
                    format!("flush before roll failed: {e}"),
                )
            })?;
        }

        if self.path.exists() {
            let rolled = self.rolled_path(&now);
            fs::rename(&self.path, &rolled).map_err(|e| {
                LoggerError::file_roll(
                    self.path.display().to_string(),
                    format!("rename to {} failed: {e}", rolled.display()),
                )
            })?;

            #[cfg(feature = "file")]
            if self.compress_rolled {
                self.compress_file(&rolled)?;
            }
        }

        self.open_locked(state)
    }

    fn rolled_path(&self, when: &DateTime<Local>) -> PathBuf {
        let stamp = self.policy.stamp(when);
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("log");
        let name = match self.path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{stem}.{stamp}.{ext}"),
            None => format!("{stem}.{stamp}"),
        };
        self.path.with_file_name(name)
    }

    fn open_locked(&self, state: &mut FileState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::io_operation(
                        "create log directory",
                        format!("cannot create '{}'", parent.display()),
                        e,
                    )
                })?;
            }
        }

        // A file from a previous period is rolled aside before we append
        // to it, stamped with its own modification time. Best effort.
        if self.policy.is_timed() {
            if let Ok(metadata) = fs::metadata(&self.path) {
                let modified: DateTime<Local> = metadata
                    .modified()
                    .unwrap_or_else(|_| SystemTime::now())
                    .into();
                if self.policy.marker(&modified) != self.policy.marker(&Local::now()) {
                    let rolled = self.rolled_path(&modified);
                    match fs::rename(&self.path, &rolled) {
                        Ok(()) => {
                            #[cfg(feature = "file")]
                            if self.compress_rolled {
                                if let Err(err) = self.compress_file(&rolled) {
                                    eprintln!(
                                        "[WARN] Failed to compress rolled log {}: {}",
                                        rolled.display(),
                                        err
                                    );
                                }
                            }
                        }
                        Err(err) => eprintln!(
                            "[WARN] Failed to roll stale log {}: {}",
                            self.path.display(),
                            err
                        ),
                    }
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                LoggerError::file_appender(
                    self.path.display().to_string(),
                    format!("cannot open: {e}"),
                )
            })?;
        let metadata = file.metadata().map_err(|e| {
            LoggerError::file_appender(
                self.path.display().to_string(),
                format!("cannot read metadata: {e}"),
            )
        })?;

        state.current_size = metadata.len();
        state.marker = self.policy.marker(&Local::now());
        state.writer = Some(BufWriter::new(file));
        Ok(())
    }

    /// Gzip `path` next to itself and remove the original. The temporary
    /// `.gz.tmp` file guards against a half-written archive replacing data.
    #[cfg(feature = "file")]
    fn compress_file(&self, path: &Path) -> Result<()> {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::{self, BufReader};

        let gz_path = append_extension(path, "gz");
        let tmp_path = append_extension(path, "gz.tmp");

        let outcome = (|| -> io::Result<()> {
            let mut reader = BufReader::new(File::open(path)?);
            let mut encoder = GzEncoder::new(
                BufWriter::new(File::create(&tmp_path)?),
                Compression::default(),
            );
            io::copy(&mut reader, &mut encoder)?;
            encoder.finish()?.flush()?;
            fs::rename(&tmp_path, &gz_path)?;
            fs::remove_file(path)?;
            Ok(())
        })();

        if let Err(err) = outcome {
            let _ = fs::remove_file(&tmp_path);
            return Err(LoggerError::io_operation(
                "compress rolled log",
                path.display().to_string(),
                err,
            ));
        }
        Ok(())
    }
}

#[cfg(feature = "file")]
fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

impl Appender for FileAppender {
    fn append(&self, event: &Arc<LogEvent>) -> Result<()> {
        // Formatting happens outside the writer lock.
        let formatted = self.formatter.read().format(event);
        let mut state = self.state.lock();

        if self.should_roll(&state) {
            if let Err(err) = self.roll_file(&mut state) {
                eprintln!(
                    "[WARN] Log roll failed: {}. Continuing with current file.",
                    err
                );
                if state.writer.is_none() {
                    self.open_locked(&mut state)?;
                }
                // Let the file grow past its limit instead of retrying the
                // roll on every write.
                state.current_size = 0;
            }
        }

        match state.writer.as_mut() {
            Some(writer) => {
                writer.write_all(formatted.as_bytes()).map_err(|e| {
                    LoggerError::file_appender(
                        self.path.display().to_string(),
                        format!("write failed: {e}"),
                    )
                })?;
                state.current_size += formatted.len() as u64;
                Ok(())
            }
            None => Err(LoggerError::file_appender(
                self.path.display().to_string(),
                "writer not open",
            )),
        }
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(writer) = state.writer.as_mut() {
            writer.flush().map_err(|e| {
                LoggerError::file_appender(
                    self.path.display().to_string(),
                    format!("flush failed: {e}"),
                )
            })?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for FileAppender {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if let Some(mut writer) = state.writer.take() {
            let _ = writer.flush();
        }
    }
}
