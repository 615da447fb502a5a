//! Structured logging setup.
//!
//! [`setup_logger`] turns a level name, a set of fixed fields and a
//! formatting choice into a [`Logger`]. The logger owns its own `tracing`
//! dispatcher, so building one has no process-wide effect until
//! [`Logger::install`] is called.

use crate::severity::{ParseSeverityError, Severity};
use std::collections::BTreeMap;
use std::fmt;
use std::io::IsTerminal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::dispatcher::{self, Dispatch, SetGlobalDefaultError};
use tracing::Level;
use tracing_subscriber::fmt::time::{ChronoLocal, Uptime};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry};

macro_rules! record {
    ($level:ident, $fields:expr, $message:expr) => {
        if $fields.is_empty() {
            tracing::event!(Level::$level, "{}", $message)
        } else {
            tracing::event!(Level::$level, context = %FieldList($fields), "{}", $message)
        }
    };
}

/// Timestamp layout of the [`LogFormat::Timestamped`] format.
pub const TIMESTAMP_FORMAT: &str = "%m-%d-%Y %H:%M:%S";

/// Structured fields attached to every record of a logger.
pub type Fields = BTreeMap<String, String>;

/// Error type for logger setup.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log level: {level:?}")]
    InvalidLogLevel {
        level: String,
        #[source]
        source: ParseSeverityError,
    },
    #[error("invalid log format: {0:?} (expected native, timestamped, uptime or json)")]
    InvalidFormat(String),
    #[error("a global logger is already installed")]
    AlreadyInstalled(#[from] SetGlobalDefaultError),
}

/// Output layout of log records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// The `tracing-subscriber` default layout.
    Native,
    /// Human-readable text with full `MM-DD-YYYY HH:MM:SS` local-time timestamps.
    #[default]
    Timestamped,
    /// Human-readable text stamped with the time since the logger was built.
    Uptime,
    /// One JSON object per record.
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Native => "native",
            LogFormat::Timestamped => "timestamped",
            LogFormat::Uptime => "uptime",
            LogFormat::Json => "json",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" => Ok(LogFormat::Native),
            "timestamped" => Ok(LogFormat::Timestamped),
            "uptime" => Ok(LogFormat::Uptime),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Parse a level name into a [`Severity`].
///
/// # Errors
/// Returns [`LoggingError::InvalidLogLevel`] for an unknown name.
pub fn parse_level(level: &str) -> Result<Severity, LoggingError> {
    level.parse().map_err(|source| LoggingError::InvalidLogLevel {
        level: level.to_string(),
        source,
    })
}

/// Build a logger at the named level carrying `fields`.
///
/// With `use_default_formatter` the logger writes timestamped text
/// ([`LogFormat::Timestamped`]); otherwise it keeps the native layout.
/// Records go to stderr. One informational record announcing the level is
/// emitted, visible only if the level lets info records through.
///
/// # Arguments
/// * `level` - Severity name, case-insensitive (e.g. "info", "DEBUG", "warning")
/// * `use_default_formatter` - Use the timestamped text layout
/// * `fields` - Fields attached to every record
///
/// # Errors
/// Returns [`LoggingError::InvalidLogLevel`] if `level` names no known
/// severity. Whether that ends the program is up to the caller.
pub fn setup_logger(level: &str, use_default_formatter: bool, fields: Fields) -> Result<Logger, LoggingError> {
    let format = if use_default_formatter {
        LogFormat::Timestamped
    } else {
        LogFormat::Native
    };

    Ok(LoggerConfig::new(parse_level(level)?)
        .fields(fields)
        .format(format)
        .build())
}

/// Configuration for building a [`Logger`].
pub struct LoggerConfig {
    level: Severity,
    fields: Fields,
    format: LogFormat,
    timestamps: bool,
    ansi: bool,
    writer: BoxMakeWriter,
}

impl LoggerConfig {
    /// Configuration writing native-format records at `level` to stderr.
    pub fn new(level: Severity) -> Self {
        Self {
            level,
            fields: Fields::new(),
            format: LogFormat::Native,
            timestamps: true,
            ansi: std::io::stderr().is_terminal(),
            writer: BoxMakeWriter::new(std::io::stderr),
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.fields.insert(key.into(), value.to_string());
        self
    }

    pub fn fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Leave timestamps out of every record, whatever the format.
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    pub fn ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Send records to `writer` instead of stderr. Disables ANSI colours.
    pub fn writer<W>(mut self, writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        self.writer = BoxMakeWriter::new(writer);
        self.ansi = false;
        self
    }

    /// Build the logger and announce its level.
    pub fn build(self) -> Logger {
        let layer = fmt_layer(self.format, self.timestamps, self.ansi, self.writer);
        let subscriber = tracing_subscriber::registry()
            .with(layer)
            .with(self.level.level_filter());

        let logger = Logger {
            dispatch: Dispatch::new(subscriber),
            level: self.level,
            fields: Arc::new(self.fields),
        };
        logger.info(format_args!("Setting the log level to {}", logger.level));
        logger
    }
}

fn fmt_layer(
    format: LogFormat,
    timestamps: bool,
    ansi: bool,
    writer: BoxMakeWriter,
) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);

    match (format, timestamps) {
        (LogFormat::Json, true) => layer.json().boxed(),
        (LogFormat::Json, false) => layer.json().without_time().boxed(),
        (_, false) => layer.without_time().boxed(),
        (LogFormat::Native, true) => layer.boxed(),
        (LogFormat::Timestamped, true) => layer
            .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
            .boxed(),
        (LogFormat::Uptime, true) => layer.with_timer(Uptime::default()).boxed(),
    }
}

/// Leveled logger carrying a fixed set of structured fields.
///
/// Cloning is cheap; clones share the same output.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
    level: Severity,
    fields: Arc<Fields>,
}

impl Logger {
    pub fn level(&self) -> Severity {
        self.level
    }

    /// Whether records of `severity` are written.
    pub fn enabled(&self, severity: Severity) -> bool {
        self.level.allows(severity)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// A logger writing to the same output with one more field.
    pub fn with_field(&self, key: impl Into<String>, value: impl ToString) -> Self {
        self.with_fields([(key.into(), value.to_string())])
    }

    /// A logger writing to the same output with extra fields.
    ///
    /// Keys already present are overridden.
    pub fn with_fields<I, K, V>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let mut merged = (*self.fields).clone();
        merged.extend(fields.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        Self {
            dispatch: self.dispatch.clone(),
            level: self.level,
            fields: Arc::new(merged),
        }
    }

    /// Write a record at `severity`.
    ///
    /// Panic and fatal records are written at `tracing`'s error level. They
    /// never end the process.
    pub fn log(&self, severity: Severity, message: impl fmt::Display) {
        if !self.enabled(severity) {
            return;
        }
        let fields: &Fields = &self.fields;
        dispatcher::with_default(&self.dispatch, || match severity {
            Severity::Panic | Severity::Fatal | Severity::Error => {
                record!(ERROR, fields, message)
            }
            Severity::Warn => record!(WARN, fields, message),
            Severity::Info => record!(INFO, fields, message),
            Severity::Debug => record!(DEBUG, fields, message),
            Severity::Trace => record!(TRACE, fields, message),
        });
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Severity::Error, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Severity::Warn, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Severity::Info, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Severity::Debug, message);
    }

    pub fn trace(&self, message: impl fmt::Display) {
        self.log(Severity::Trace, message);
    }

    /// The dispatcher records are written through.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Make this logger the process-wide default for `tracing` macros.
    ///
    /// # Errors
    /// Returns [`LoggingError::AlreadyInstalled`] if a global default exists.
    pub fn install(&self) -> Result<(), LoggingError> {
        dispatcher::set_global_default(self.dispatch.clone())?;
        Ok(())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Renders fields as `key=value` pairs separated by spaces.
struct FieldList<'a>(&'a Fields);

impl fmt::Display for FieldList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if value.is_empty() || value.contains(char::is_whitespace) {
                write!(f, "{}={:?}", key, value)?;
            } else {
                write!(f, "{}={}", key, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }

        fn lines(&self) -> Vec<String> {
            self.contents().lines().map(str::to_string).collect()
        }
    }

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn logger(level: Severity, format: LogFormat) -> (Logger, Capture) {
        let capture = Capture::default();
        let logger = LoggerConfig::new(level)
            .field("app", "deploy")
            .format(format)
            .writer(capture.clone())
            .build();
        (logger, capture)
    }

    #[test]
    fn test_setup_logger_debug() {
        let logger = setup_logger("debug", true, Fields::new()).unwrap();
        assert_eq!(logger.level(), Severity::Debug);
        assert!(logger.enabled(Severity::Debug));
        assert!(!logger.enabled(Severity::Trace));
    }

    #[test]
    fn test_setup_logger_invalid_level() {
        let err = setup_logger("verbose", true, Fields::new()).unwrap_err();
        match err {
            LoggingError::InvalidLogLevel { level, .. } => assert_eq!(level, "verbose"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_startup_record() {
        let (_, capture) = logger(Severity::Debug, LogFormat::Native);
        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("INFO"));
        assert!(lines[0].contains("Setting the log level to debug"));
        assert!(lines[0].contains("context=app=deploy"));
    }

    #[test]
    fn test_startup_record_hidden_above_info() {
        let (logger, capture) = logger(Severity::Warn, LogFormat::Native);
        assert!(capture.contents().is_empty());

        logger.info("not shown");
        logger.warn("shown");
        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("shown"));
        assert!(lines[0].contains("WARN"));
    }

    #[test]
    fn test_timestamped_layout() {
        let (_, capture) = logger(Severity::Info, LogFormat::Timestamped);
        let line = capture.lines().remove(0);
        let stamp = &line[..19];
        let parsed = chrono::NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .unwrap_or_else(|e| panic!("unexpected timestamp in {line:?}: {e}"));

        let drift = chrono::Local::now().naive_local() - parsed;
        assert!(drift.num_seconds().abs() < 60, "{stamp} is not local time");
    }

    #[test]
    fn test_without_timestamps() {
        let capture = Capture::default();
        LoggerConfig::new(Severity::Info)
            .format(LogFormat::Timestamped)
            .without_timestamps()
            .writer(capture.clone())
            .build();
        let line = capture.lines().remove(0);
        assert!(line.trim_start().starts_with("INFO"), "unexpected line {line:?}");
    }

    #[test]
    fn test_json_layout() {
        let (logger, capture) = logger(Severity::Info, LogFormat::Json);
        logger.with_field("component", "binder").error("boom");

        let lines = capture.lines();
        assert_eq!(lines.len(), 2);
        let record: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(record["level"], "ERROR");
        assert_eq!(record["fields"]["message"], "boom");
        assert_eq!(record["fields"]["context"], "app=deploy component=binder");
    }

    #[test]
    fn test_with_fields_overrides() {
        let (logger, _) = logger(Severity::Info, LogFormat::Native);
        let child = logger.with_fields([("app", "operator"), ("pod", "a b")]);

        assert_eq!(logger.fields().get("app").map(String::as_str), Some("deploy"));
        assert_eq!(child.fields().get("app").map(String::as_str), Some("operator"));
        assert_eq!(FieldList(child.fields()).to_string(), "app=operator pod=\"a b\"");
    }

    #[test]
    fn test_fatal_does_not_exit() {
        let (logger, capture) = logger(Severity::Error, LogFormat::Native);
        logger.log(Severity::Fatal, "fatal record");
        logger.log(Severity::Warn, "filtered");
        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("ERROR"));
    }

    #[test]
    fn test_log_format_names() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::Uptime.to_string(), "uptime");
        assert!(matches!(
            "pretty".parse::<LogFormat>(),
            Err(LoggingError::InvalidFormat(_))
        ));
    }
}
