use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub max_files: usize,
    pub log_directory: PathBuf,
    pub include_spans: bool,
    pub include_targets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false,
            console_enabled: true,
            max_files: 5,
            log_directory: default_log_directory(),
            include_spans: false,
            include_targets: true,
        }
    }
}

fn default_log_directory() -> PathBuf {
    directories::ProjectDirs::from("com", "scrapeflow", "scrapeflow")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Initialize logging system
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let span_events = if config.include_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();

    // Console output goes to stderr so compiled contracts can be piped from stdout
    if config.console_enabled {
        let console_layer = fmt::layer()
            .with_target(config.include_targets)
            .with_span_events(span_events.clone())
            .with_writer(std::io::stderr)
            .boxed();

        layers.push(console_layer);
    }

    if config.file_enabled {
        std::fs::create_dir_all(&config.log_directory)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("scrapeflow")
            .filename_suffix("log")
            .max_log_files(config.max_files)
            .build(&config.log_directory)?;

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_target(config.include_targets)
            .with_span_events(span_events)
            .with_writer(file_appender)
            .boxed();

        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_enabled {
        info!("Log directory: {}", config.log_directory.display());
    }

    Ok(())
}

/// Structured logging context
#[derive(Debug, Clone, Serialize)]
pub struct LogContext {
    pub component: String,
    pub operation: String,
    pub workflow: Option<String>,
    pub phase: Option<String>,
    pub duration_ms: Option<u64>,
    pub status: Option<String>,
    pub error_category: Option<String>,
    pub additional_fields: HashMap<String, serde_json::Value>,
}

impl LogContext {
    pub fn new(component: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            operation: operation.into(),
            workflow: None,
            phase: None,
            duration_ms: None,
            status: None,
            error_category: None,
            additional_fields: HashMap::new(),
        }
    }

    pub fn with_workflow(mut self, workflow: impl Into<String>) -> Self {
        self.workflow = Some(workflow.into());
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_duration(mut self, duration: std::time::Duration) -> Self {
        self.duration_ms = Some(duration.as_millis() as u64);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_error_category(mut self, category: impl Into<String>) -> Self {
        self.error_category = Some(category.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.additional_fields.insert(key.into(), value);
        self
    }

    pub fn with_string_field(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_field(key, serde_json::Value::String(value.into()))
    }

    pub fn with_number_field(self, key: impl Into<String>, value: impl Into<i64>) -> Self {
        self.with_field(key, serde_json::Value::Number(serde_json::Number::from(value.into())))
    }

    pub fn with_bool_field(self, key: impl Into<String>, value: bool) -> Self {
        self.with_field(key, serde_json::Value::Bool(value))
    }
}

/// Emit an event at `$level` carrying every field of a [`LogContext`]
#[doc(hidden)]
#[macro_export]
macro_rules! __log_with_context {
    ($level:expr, $context:expr, $($arg:tt)+) => {{
        let ctx: &$crate::logging::LogContext = &$context;
        tracing::event!(
            $level,
            component = %ctx.component,
            operation = %ctx.operation,
            workflow = ctx.workflow.as_deref(),
            phase = ctx.phase.as_deref(),
            duration_ms = ctx.duration_ms,
            status = ctx.status.as_deref(),
            error_category = ctx.error_category.as_deref(),
            fields = ?ctx.additional_fields,
            $($arg)+
        )
    }};
}

#[macro_export]
macro_rules! log_info {
    ($context:expr, $($arg:tt)+) => {
        $crate::__log_with_context!(tracing::Level::INFO, $context, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($context:expr, $($arg:tt)+) => {
        $crate::__log_with_context!(tracing::Level::DEBUG, $context, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($context:expr, $($arg:tt)+) => {
        $crate::__log_with_context!(tracing::Level::WARN, $context, $($arg)+)
    };
}

/// Log at error level with the error text attached as a field
#[macro_export]
macro_rules! log_error {
    ($context:expr, $error:expr, $($arg:tt)+) => {{
        let ctx = $context.clone().with_string_field("error", $error.to_string());
        $crate::__log_with_context!(tracing::Level::ERROR, ctx, $($arg)+)
    }};
}

/// Times an operation and logs the outcome with its context
pub struct PerformanceLogger {
    context: LogContext,
    start_time: std::time::Instant,
}

impl PerformanceLogger {
    pub fn new(context: LogContext) -> Self {
        Self {
            context,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn finish(self, message: &str) {
        let context = self.context.with_duration(self.start_time.elapsed()).with_status("ok");
        crate::log_debug!(context, "{}", message);
    }

    pub fn finish_with_error(self, message: &str, error: &crate::error::WorkflowError) {
        let context = self
            .context
            .with_duration(self.start_time.elapsed())
            .with_status("error")
            .with_error_category(error.category());
        crate::log_error!(context, error, "{}", message);
    }
}
