//! Tracing initialization shared by the server binary and e2e tests.
//!
//! Builds a registry with a reloadable level filter (so the admin
//! logging-config endpoint can change the level at runtime) and an optional
//! file sink with size-based rotation. Feature `tracing-init`.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

use crate::LoggingConfig;

#[derive(Error, Debug)]
pub enum InitError {
    #[error("invalid log level: {0} (use debug, info, warning, error, or critical)")]
    InvalidLevel(String),
    #[error("log file: {0}")]
    Io(#[from] io::Error),
    #[error("init tracing subscriber: {0}")]
    Init(String),
    #[error("reload level filter: {0}")]
    Reload(String),
}

/// Handle over the live tracing configuration: reload the level filter and
/// read back the current logging settings.
pub struct LogHandle {
    reload: reload::Handle<EnvFilter, Registry>,
    current: Mutex<LoggingConfig>,
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl LogHandle {
    /// Swaps the level filter; records the new level for readback.
    pub fn set_level(&self, level: &str, enable_tracing: bool) -> Result<(), InitError> {
        let filter = build_filter(level, enable_tracing)?;
        self.reload
            .reload(filter)
            .map_err(|e| InitError::Reload(e.to_string()))?;
        if let Ok(mut current) = self.current.lock() {
            current.level = level.to_lowercase();
            current.enable_tracing = enable_tracing;
        }
        Ok(())
    }

    pub fn current(&self) -> LoggingConfig {
        self.current
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

/// Installs the global subscriber per `config` and returns the handle.
///
/// The file sink (when configured) goes through a non-blocking worker so
/// slow disk writes never stall request handling.
pub fn init(config: &LoggingConfig) -> Result<LogHandle, InitError> {
    let filter = build_filter(&config.level, config.enable_tracing)?;
    let (filter_layer, reload_handle) = reload::Layer::new(filter);

    let (file_layer, file_guard) = match &config.file {
        Some(path) => {
            let writer = RotatingWriter::create(path.clone(), config.max_bytes, config.backup_count)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(writer);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| InitError::Init(e.to_string()))?;

    Ok(LogHandle {
        reload: reload_handle,
        current: Mutex::new(config.clone()),
        _file_guard: file_guard,
    })
}

/// Maps the five configured levels onto tracing levels. `critical` has no
/// tracing counterpart and shares `error`.
fn tracing_level(level: &str) -> Option<&'static str> {
    match level.to_lowercase().as_str() {
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warning" => Some("warn"),
        "error" => Some("error"),
        "critical" => Some("error"),
        _ => None,
    }
}

/// Builds the filter for a configured level. With `enable_tracing` the
/// SmartRecover crates are raised to `trace` so function entry/exit spans
/// are emitted.
pub fn build_filter(level: &str, enable_tracing: bool) -> Result<EnvFilter, InitError> {
    let base = tracing_level(level).ok_or_else(|| InitError::InvalidLevel(level.to_string()))?;
    let directives = if enable_tracing {
        format!("{base},smartrecover=trace,serve=trace")
    } else {
        base.to_string()
    };
    Ok(EnvFilter::new(directives))
}

/// Size-rotating log file: once the file would grow past `max_bytes`, it is
/// renamed to `<path>.1` (shifting older backups up to `backup_count`) and a
/// fresh file is started.
pub struct RotatingWriter {
    inner: Mutex<RotateState>,
}

struct RotateState {
    path: PathBuf,
    max_bytes: u64,
    backups: u32,
    file: File,
    written: u64,
}

impl RotatingWriter {
    pub fn create(path: PathBuf, max_bytes: u64, backups: u32) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            inner: Mutex::new(RotateState {
                path,
                max_bytes,
                backups,
                file,
                written,
            }),
        })
    }
}

fn backup_path(path: &PathBuf, index: u32) -> PathBuf {
    let mut os = path.clone().into_os_string();
    os.push(format!(".{index}"));
    PathBuf::from(os)
}

fn rotate(state: &mut RotateState) -> io::Result<()> {
    state.file.flush()?;
    if state.backups == 0 {
        state.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&state.path)?;
        state.written = 0;
        return Ok(());
    }
    for index in (1..state.backups).rev() {
        let from = backup_path(&state.path, index);
        if from.exists() {
            std::fs::rename(&from, backup_path(&state.path, index + 1))?;
        }
    }
    std::fs::rename(&state.path, backup_path(&state.path, 1))?;
    state.file = OpenOptions::new().create(true).append(true).open(&state.path)?;
    state.written = 0;
    Ok(())
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "rotating writer lock poisoned"))?;
        if state.written + buf.len() as u64 > state.max_bytes && state.written > 0 {
            rotate(&mut state)?;
        }
        let n = state.file.write(buf)?;
        state.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "rotating writer lock poisoned"))?;
        state.file.flush()
    }
}
