use serde::{Deserialize, Serialize};
use std::env;
use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    /// Human-readable format (default for development)
    Pretty,
    /// Compact text format
    Compact,
    /// JSON format for log aggregation systems
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Pretty
    }
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            _ => Self::default(),
        }
    }

    /// Parse log format from the `LOG_FORMAT` environment variable
    pub fn from_env() -> Self {
        Self::parse(&env::var("LOG_FORMAT").unwrap_or_default())
    }
}

/// Configuration for structured logging
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Service name, also used as the target raised to `debug` in verbose mode
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    /// Raise the service's own target to `debug` regardless of `RUST_LOG`
    pub verbose: bool,
    pub enable_span_events: bool,
    pub log_to_file: bool,
    pub log_dir: Option<String>,
}

impl LogConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            format: LogFormat::from_env(),
            service_name: service_name.into(),
            service_version: env::var("SERVICE_VERSION").unwrap_or_else(|_| "0.1.0".to_string()),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            verbose: false,
            enable_span_events: env::var("LOG_SPAN_EVENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_to_file: env::var("LOG_TO_FILE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: env::var("LOG_DIR").ok(),
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_span_events(mut self, enable: bool) -> Self {
        self.enable_span_events = enable;
        self
    }

    pub fn with_file_logging(mut self, log_dir: impl Into<String>) -> Self {
        self.log_to_file = true;
        self.log_dir = Some(log_dir.into());
        self
    }

    /// Crate target used for the verbose directive (`verkada-sync` -> `verkada_sync`)
    fn target(&self) -> String {
        self.service_name.replace('-', "_")
    }

    fn filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        for directive in ["hyper=warn", "reqwest=warn", "tokio=warn"] {
            if let Ok(d) = directive.parse::<Directive>() {
                filter = filter.add_directive(d);
            }
        }
        if self.verbose {
            if let Ok(d) = format!("{}=debug", self.target()).parse::<Directive>() {
                filter = filter.add_directive(d);
            }
        }
        filter
    }

    fn span_events(&self) -> FmtSpan {
        if self.enable_span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Keeps the background file writer alive; drop it only at process exit.
#[must_use]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize structured logging with the given configuration
pub fn init_structured_logging(config: LogConfig) -> LogGuard {
    let registry = tracing_subscriber::registry().with(config.filter());
    let span_events = config.span_events();
    let mut file_guard = None;

    let initialized = match config.format {
        LogFormat::Json => {
            let json_layer = fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true)
                .with_writer(io::stderr);

            match config.log_dir.as_deref().filter(|_| config.log_to_file) {
                Some(log_dir) => {
                    let file_appender =
                        tracing_appender::rolling::daily(log_dir, format!("{}.log", config.target()));
                    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                    file_guard = Some(guard);
                    let file_layer = fmt::layer()
                        .json()
                        .with_span_events(config.span_events())
                        .with_writer(non_blocking);
                    registry.with(json_layer).with(file_layer).try_init()
                }
                None => registry.with(json_layer).try_init(),
            }
        }
        LogFormat::Compact => {
            let compact_layer = fmt::layer()
                .compact()
                .with_span_events(span_events)
                .with_target(true)
                .with_writer(io::stderr);

            registry.with(compact_layer).try_init()
        }
        LogFormat::Pretty => {
            let pretty_layer = fmt::layer()
                .pretty()
                .with_span_events(span_events)
                .with_target(true)
                .with_line_number(true)
                .with_writer(io::stderr);

            registry.with(pretty_layer).try_init()
        }
    };

    if initialized.is_ok() {
        tracing::info!(
            service.name = %config.service_name,
            service.version = %config.service_version,
            environment = %config.environment,
            format = ?config.format,
            verbose = config.verbose,
            "structured logging initialized"
        );
    }

    LogGuard { _file: file_guard }
}
