use std::{
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use tracing::Level;
use tracing_subscriber::fmt;

use crate::config::AppConfig;

pub const LOG_LEVEL_ID: &str = "logLevelId";
pub const LOG_FILE_ID: &str = "logFileId";
pub const LOG_FILE_LEVEL_ID: &str = "logFileLevelId";
pub const LOG_FILE_MAX_SIZE_ID: &str = "logFileMaxSizeId";

const DEFAULT_MAX_SIZE_MB: u64 = 100;

/// Console and file logging knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub console_level: String,
    /// JSON log file; `None` disables file logging.
    pub file: Option<PathBuf>,
    pub file_level: String,
    pub max_size_mb: u64,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            console_level: "info".to_string(),
            file: None,
            file_level: "debug".to_string(),
            max_size_mb: DEFAULT_MAX_SIZE_MB,
        }
    }
}

impl LoggingSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let d = Self::default();
        Self {
            console_level: cfg.value_of_with_default(LOG_LEVEL_ID, &d.console_level).to_string(),
            file: cfg
                .assigned_value(LOG_FILE_ID)
                .then(|| PathBuf::from(cfg.value_of(LOG_FILE_ID))),
            file_level: cfg.value_of_with_default(LOG_FILE_LEVEL_ID, &d.file_level).to_string(),
            max_size_mb: cfg.parsed_or(LOG_FILE_MAX_SIZE_ID, d.max_size_mb),
        }
    }

    /// Raise the console level by `-v` count (1: debug, 2+: trace).
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        match verbose {
            0 => {}
            1 => self.console_level = "debug".to_string(),
            _ => self.console_level = "trace".to_string(),
        }
        self
    }
}

// -------- level helpers --------
fn parse_tracing_level(s: &str) -> Option<tracing::Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// Console filter: `RUST_LOG` when it holds valid directives, otherwise the
/// configured level.
fn console_filter(level: &str, rust_log: Option<&str>) -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return filter;
        }
    }
    let directive = parse_tracing_level(level)
        .map(|l| l.to_string().to_ascii_lowercase())
        .unwrap_or_else(|| "off".to_string());
    EnvFilter::new(directive)
}

/// Size limit for the rotating file in bytes, at least one megabyte.
fn max_file_bytes(max_size_mb: u64) -> usize {
    let bytes = max_size_mb.max(1).saturating_mul(1024 * 1024);
    usize::try_from(bytes).unwrap_or(usize::MAX)
}

// -------- rotating writer for files --------
#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl<'a> fmt::MakeWriter<'a> for RotWriter {
    type Writer = RotWriterHandle;
    fn make_writer(&'a self) -> Self::Writer {
        RotWriterHandle(self.0.clone())
    }
}

struct RotWriterHandle(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log writer lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log writer lock poisoned"))?
            .flush()
    }
}

/// Absolute paths are kept; relative ones are joined with `base_dir`.
fn resolve_log_path(file: &Path, base_dir: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        base_dir.join(file)
    }
}

/// Create a rotating writer, making sure the parent directory exists.
fn create_rotating_writer_at_path(
    log_path: &Path,
    max_bytes: usize,
) -> Result<RotWriter, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(FileLimit::Age(chrono::Duration::days(1))),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

// -------- public init --------

/// Install the global subscriber. Relative log files are resolved against
/// the current working directory. Calling this twice is a no-op.
pub fn init_logging(settings: &LoggingSettings) {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::{layer::SubscriberExt, prelude::*, Registry};

    // Bridge `log` → `tracing` before installing the subscriber
    let _ = tracing_log::LogTracer::init();

    let rust_log = std::env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV).ok();
    let console_filter = console_filter(&settings.console_level, rust_log.as_deref());

    let console_layer = fmt::layer()
        .with_ansi(std::io::stdout().is_terminal())
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_filter);

    let file_writer = settings.file.as_ref().and_then(|file| {
        let base = std::env::current_dir().unwrap_or_default();
        let path = resolve_log_path(file, &base);
        match create_rotating_writer_at_path(&path, max_file_bytes(settings.max_size_mb)) {
            Ok(w) => Some(w),
            Err(e) => {
                eprintln!("Failed to initialize log file '{}': {}", path.display(), e);
                None
            }
        }
    });

    let Some(writer) = file_writer else {
        let _ = Registry::default().with(console_layer).try_init();
        return;
    };

    let file_filter = parse_tracing_level(&settings.file_level)
        .map(LevelFilter::from_level)
        .unwrap_or(LevelFilter::OFF);

    let file_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(writer)
        .with_filter(file_filter);

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSources, ParserConfig};
    use tempfile::tempdir;

    #[test]
    fn test_console_filter_prefers_rust_log() {
        use tracing::level_filters::LevelFilter;

        assert_eq!(console_filter("debug", None).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(console_filter("off", None).max_level_hint(), Some(LevelFilter::OFF));
        assert_eq!(
            console_filter("debug", Some("warn")).max_level_hint(),
            Some(LevelFilter::WARN)
        );
        assert_eq!(
            console_filter("info", Some("  ")).max_level_hint(),
            Some(LevelFilter::INFO)
        );
    }

    #[test]
    fn test_max_file_bytes_saturates() {
        assert_eq!(max_file_bytes(0), 1024 * 1024);
        assert_eq!(max_file_bytes(100), 100 * 1024 * 1024);
        assert_eq!(max_file_bytes(u64::MAX), usize::MAX);
    }

    #[test]
    fn test_logging_level_parsing() {
        assert_eq!(parse_tracing_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level(" Info "), Some(Level::INFO));
        assert_eq!(parse_tracing_level("warn"), Some(Level::WARN));
        assert_eq!(parse_tracing_level("ERROR"), Some(Level::ERROR));
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("none"), None);
        assert_eq!(parse_tracing_level("invalid"), Some(Level::INFO));
    }

    #[test]
    fn test_relative_log_path_joined_with_base() {
        let tmp = tempdir().unwrap();
        let resolved = resolve_log_path(Path::new("logs/userdb.log"), tmp.path());
        assert!(resolved.starts_with(tmp.path()));
        assert!(resolved.ends_with("logs/userdb.log"));

        let abs = tmp.path().join("abs.log");
        assert_eq!(resolve_log_path(&abs, Path::new("/elsewhere")), abs);
    }

    #[test]
    fn test_create_rotating_writer_at_path_creates_parent() {
        let tmp = tempdir().unwrap();
        let p = tmp.path().join("nested/dir/app.log");

        let res = create_rotating_writer_at_path(&p, 128 * 1024);
        assert!(res.is_ok(), "writer should be created");
        assert!(p.parent().unwrap().exists(), "parent dir must be created");
    }

    #[test]
    fn test_rot_writer_handle_writes() {
        let tmp = tempdir().unwrap();
        let p = tmp.path().join("w.log");
        let writer = create_rotating_writer_at_path(&p, 1024 * 1024).unwrap();
        let mut handle = fmt::MakeWriter::make_writer(&writer);
        handle.write_all(b"hello\n").unwrap();
        handle.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&p).unwrap(), "hello\n");
    }

    #[test]
    fn test_settings_from_config() {
        let parser = ParserConfig::from_json_str(
            r#"{"parameters":[
                {"optionId":"logLevelId","cliArgument":"logLevel","defaultVal":"warn"},
                {"optionId":"logFileId","cliArgument":"logFile","defaultVal":"userMustProvide"},
                {"optionId":"logFileMaxSizeId","cliArgument":"logMax","defaultVal":"5"}
            ]}"#,
        )
        .unwrap();

        let cfg = AppConfig::resolve_with(&parser, &ConfigSources::default());
        let s = LoggingSettings::from_config(&cfg);
        assert_eq!(s.console_level, "warn");
        assert_eq!(s.file, None);
        assert_eq!(s.file_level, "debug");
        assert_eq!(s.max_size_mb, 5);

        let cfg = AppConfig::resolve_with(
            &parser,
            &ConfigSources {
                args: vec!["--logFile".into(), "logs/u.log".into()],
                ..Default::default()
            },
        );
        let s = LoggingSettings::from_config(&cfg).with_verbosity(2);
        assert_eq!(s.file, Some(PathBuf::from("logs/u.log")));
        assert_eq!(s.console_level, "trace");
    }
}
