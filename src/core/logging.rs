//! Logging initialisation
//!
//! Call sites use the `log` facade. Records are bridged into a `tracing`
//! registry that writes JSON to a daily rolling file. Rolled files from
//! earlier days are gzipped on a background thread.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

const LOG_FILE_NAME: &str = "case-graph.log";

/// Resolved output for the file layer.
struct FileSink {
    dir: PathBuf,
    writer: NonBlocking,
    guard: WorkerGuard,
}

fn open_file_sink(config: &LoggingConfig, data_dir: &Path) -> FileSink {
    let dir = resolve_log_dir(config, data_dir);
    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(&dir) {
            eprintln!("Failed to create logs directory {}: {}", dir.display(), e);
        }
    }

    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    FileSink { dir, writer, guard }
}

/// `RUST_LOG` wins over the configured level.
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Logs directory: the configured one, else `<data_dir>/logs`.
pub fn resolve_log_dir(config: &LoggingConfig, data_dir: &Path) -> PathBuf {
    config
        .log_dir
        .clone()
        .unwrap_or_else(|| data_dir.join("logs"))
}

/// Initialise logging while a TUI owns the terminal: file output only.
///
/// `data_dir` is the application data directory; logs go under
/// `<data_dir>/logs` unless the config names a directory. Keep the returned
/// guard alive until exit so buffered records are flushed.
pub fn init_tui(config: &LoggingConfig, data_dir: &Path) -> WorkerGuard {
    let FileSink { dir, writer, guard } = open_file_sink(config, data_dir);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_filter(env_filter(config));

    let subscriber = tracing_subscriber::registry().with(file_layer);
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {e}");
    }
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to initialize LogTracer: {e}");
    }

    log::info!("Logging to {} (daily rolling)", dir.join(LOG_FILE_NAME).display());

    if config.compress_old_logs {
        std::thread::spawn(move || compress_old_logs(&dir));
    }
    guard
}

/// Whether `name` is a rolled log from a day other than `today` (`YYYY-MM-DD`).
fn is_stale_log(name: &str, today: &str) -> bool {
    match name.strip_prefix(LOG_FILE_NAME).and_then(|rest| rest.strip_prefix('.')) {
        Some(suffix) => !suffix.is_empty() && suffix != today && !suffix.ends_with(".gz"),
        None => false,
    }
}

fn compress_old_logs(log_dir: &Path) {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();

    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };
    for path in entries.flatten().map(|e| e.path()) {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_stale_log(name, &today) {
            continue;
        }
        match compress_file(&path) {
            Ok(()) => log::info!("Compressed old log: {}", path.display()),
            Err(e) => log::warn!("Failed to compress old log {}: {}", path.display(), e),
        }
    }
}

/// Gzip `path` to `path.gz` and remove the original. An existing `.gz` is
/// left alone.
fn compress_file(path: &Path) -> io::Result<()> {
    let mut gz_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no file name"))?
        .to_os_string();
    gz_name.push(".gz");
    let gz_path = path.with_file_name(gz_name);
    if gz_path.exists() {
        return Ok(());
    }

    let mut reader = io::BufReader::new(fs::File::open(path)?);
    let mut encoder = GzEncoder::new(fs::File::create(&gz_path)?, Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)
}
