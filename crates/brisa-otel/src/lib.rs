use once_cell::sync::OnceCell;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

/// Target used by the HTTP access-log middleware.
pub const ACCESS_TARGET: &str = "http.access";

static ACCESS_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    Minutely,
    Hourly,
    Daily,
}

impl Rotation {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hourly" => Rotation::Hourly,
            "minutely" => Rotation::Minutely,
            _ => Rotation::Daily,
        }
    }
}

/// Rolling file sink for `http.access` events, enabled with
/// `BRISA_ACCESS_LOG_ROLL=1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessLogFile {
    pub dir: String,
    pub prefix: String,
    pub rotation: Rotation,
}

impl AccessLogFile {
    pub fn from_env() -> Option<Self> {
        if std::env::var("BRISA_ACCESS_LOG_ROLL").ok().as_deref() != Some("1") {
            return None;
        }
        let dir = std::env::var("BRISA_ACCESS_LOG_DIR")
            .ok()
            .or_else(|| std::env::var("BRISA_LOGS_DIR").ok())
            .unwrap_or_else(|| "logs".to_string());
        let prefix =
            std::env::var("BRISA_ACCESS_LOG_PREFIX").unwrap_or_else(|_| "http-access".into());
        let rotation = std::env::var("BRISA_ACCESS_LOG_ROTATION")
            .map(|raw| Rotation::parse(&raw))
            .unwrap_or(Rotation::Daily);
        Some(Self {
            dir,
            prefix,
            rotation,
        })
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
/// Calling it twice is harmless; the second call keeps the first subscriber.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    install_console(filter, AccessLogFile::from_env());
}

fn install_console(filter: EnvFilter, access: Option<AccessLogFile>) {
    let fmt_layer = fmt::layer();
    let registry = tracing_subscriber::registry().with(fmt_layer.with_filter(filter));
    if let Some(access) = access {
        if std::fs::create_dir_all(&access.dir).is_err() {
            eprintln!("failed to create access log directory {}", access.dir);
        }
        let writer = match access.rotation {
            Rotation::Hourly => tracing_appender::rolling::hourly(&access.dir, &access.prefix),
            Rotation::Minutely => tracing_appender::rolling::minutely(&access.dir, &access.prefix),
            Rotation::Daily => tracing_appender::rolling::daily(&access.dir, &access.prefix),
        };
        let (nb, guard) = tracing_appender::non_blocking(writer);
        let _ = ACCESS_GUARD.set(guard);
        let targets = Targets::new().with_target(ACCESS_TARGET, tracing::Level::INFO);
        let access_layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(nb)
            .with_filter(targets);
        let _ = registry.with(access_layer).try_init();
    } else {
        let _ = registry.try_init();
    }
}
