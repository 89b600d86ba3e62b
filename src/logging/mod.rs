use std::fmt;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

struct NoTime;

impl FormatTime for NoTime {
    fn format_time(&self, _: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        Ok(())
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Filter for this crate at `level`, unless `RUST_LOG` says otherwise.
fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = Level::from(level).to_string().to_lowercase();
        EnvFilter::new(format!("warn,nftmarket={level},nftmarket_cli={level}"))
    })
}

pub fn init(log_level: LogLevel) {
    tracing_subscriber::fmt()
        .with_timer(NoTime)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_level(true)
        .with_ansi(true)
        .with_env_filter(env_filter(log_level))
        .init();
}
