// Mon Oct 19 2026 - Alex

use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};

pub struct LoggingUtils;

impl LoggingUtils {
    /// `RUST_LOG` hands filtering to env_logger; otherwise the colored logger runs at `level`.
    pub fn init(level: LevelFilter, use_color: bool) {
        match std::env::var("RUST_LOG") {
            Ok(filters) if !filters.trim().is_empty() => Self::init_from_env(level),
            _ => Self::init_logger(level, use_color),
        }
    }

    /// Install the colored stderr logger. A logger that is already installed is kept.
    pub fn init_logger(level: LevelFilter, use_color: bool) {
        let use_color = use_color && colored::control::SHOULD_COLORIZE.should_colorize();
        if log::set_boxed_logger(Box::new(ColoredLogger::new(level, use_color))).is_ok() {
            log::set_max_level(level);
        }
    }

    /// `RUST_LOG` wins when set; otherwise `default` applies to this crate only.
    pub fn init_from_env(default: LevelFilter) {
        let mut builder = env_logger::Builder::new();
        builder.filter_module(env!("CARGO_CRATE_NAME"), default);
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }
        builder.format_timestamp(None).try_init().ok();
    }

    pub fn level_from_str(s: &str) -> Option<LevelFilter> {
        match s.to_lowercase().as_str() {
            "error" => Some(LevelFilter::Error),
            "warn" | "warning" => Some(LevelFilter::Warn),
            "info" => Some(LevelFilter::Info),
            "debug" => Some(LevelFilter::Debug),
            "trace" => Some(LevelFilter::Trace),
            "off" => Some(LevelFilter::Off),
            _ => None,
        }
    }

    pub fn level_from_verbosity(verbosity: usize) -> LevelFilter {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

struct ColoredLogger {
    level: LevelFilter,
    use_color: bool,
}

impl ColoredLogger {
    fn new(level: LevelFilter, use_color: bool) -> Self {
        Self { level, use_color }
    }

    fn format_level(&self, level: Level) -> ColoredString {
        match level {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow().bold(),
            Level::Info => "INFO ".green().bold(),
            Level::Debug => "DEBUG".blue().bold(),
            Level::Trace => "TRACE".magenta().bold(),
        }
    }

    fn format(&self, record: &Record) -> String {
        let level = if self.use_color {
            self.format_level(record.level()).to_string()
        } else {
            format!("{:5}", record.level())
        };
        let target = format!("[{}]", record.target());
        let target = if self.use_color { target.dimmed().to_string() } else { target };
        format!("{} {} {}", level, target, record.args())
    }
}

impl Log for ColoredLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", self.format(record));
        }
    }

    fn flush(&self) {}
}
