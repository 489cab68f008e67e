use std::panic;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

// The non-blocking writer stops flushing once its guard drops, so the guard
// for the process-wide subscriber lives for the whole process.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Logging options for one process. Resolved once at startup; nothing in the
/// engine consults the environment after this.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// Directory for daily-rotated log files. Stdout when absent.
    pub dir: Option<PathBuf>,
    /// Chain into the default panic hook (stderr, backtrace) after the
    /// structured panic record.
    pub panic_backtrace: bool,
}

impl LogConfig {
    /// `ATS_LOG_DIR` selects file output; `ATS_LOG_INCLUDE_BACKTRACE`
    /// (1/true/yes) re-raises panics through the default hook.
    pub fn from_env() -> Self {
        Self {
            dir: std::env::var_os("ATS_LOG_DIR").map(PathBuf::from),
            panic_backtrace: std::env::var("ATS_LOG_INCLUDE_BACKTRACE")
                .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

/// Set up the process-wide tracing subscriber and panic hook in one step.
/// `RUST_LOG` filters as usual, defaulting to `info`. Idempotent: later
/// calls leave the first subscriber and hook in place.
pub fn init(app_name: &'static str, config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match daily_log_writer(app_name, config.dir.as_deref()) {
        Some(writer) => {
            let _ = builder.with_writer(writer).try_init();
        }
        None => {
            let _ = builder.try_init();
        }
    }

    install_panic_hook(app_name, config.panic_backtrace);
}

fn daily_log_writer(app_name: &'static str, dir: Option<&std::path::Path>) -> Option<BoxMakeWriter> {
    let dir = dir?;
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("{app_name}: cannot create log dir {}: {err}; logging to stdout", dir.display());
        return None;
    }

    let appender = tracing_appender::rolling::daily(dir, format!("{app_name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(BoxMakeWriter::new(non_blocking))
}

fn panic_payload(info: &panic::PanicHookInfo<'_>) -> String {
    info.payload()
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic payload not string".into())
}

fn install_panic_hook(app_name: &'static str, backtrace: bool) {
    static INSTALLED: OnceLock<()> = OnceLock::new();

    INSTALLED.get_or_init(|| {
        let default_hook = panic::take_hook();

        panic::set_hook(Box::new(move |info| {
            let thread = std::thread::current();
            let location = info
                .location()
                .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()));

            tracing::error!(
                application = app_name,
                thread_name = thread.name().unwrap_or("unknown"),
                location = location.as_deref().unwrap_or("unknown"),
                panic_message = %panic_payload(info),
                "panic captured"
            );

            if backtrace {
                default_hook(info);
            }
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn with_env(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
        static ENV_GUARD: Mutex<()> = Mutex::new(());
        let _guard = ENV_GUARD.lock().unwrap();

        let prev: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(key, value)| {
                let previous = std::env::var(key).ok();
                match value {
                    Some(v) => std::env::set_var(key, v),
                    None => std::env::remove_var(key),
                }
                (key.to_string(), previous)
            })
            .collect();

        f();

        for (key, previous) in prev {
            if let Some(v) = previous {
                std::env::set_var(&key, v);
            } else {
                std::env::remove_var(&key);
            }
        }
    }

    #[test]
    fn env_selects_log_dir_and_backtrace() {
        with_env(
            &[
                ("ATS_LOG_DIR", Some("/tmp/ats-logs")),
                ("ATS_LOG_INCLUDE_BACKTRACE", Some("true")),
            ],
            || {
                let config = LogConfig::from_env();
                assert_eq!(config.dir, Some(PathBuf::from("/tmp/ats-logs")));
                assert!(config.panic_backtrace);
            },
        );
    }

    #[test]
    fn defaults_are_stdout_without_backtrace() {
        with_env(
            &[
                ("ATS_LOG_DIR", None),
                ("ATS_LOG_INCLUDE_BACKTRACE", None),
            ],
            || {
                assert_eq!(LogConfig::from_env(), LogConfig::default());
            },
        );
    }

    #[test]
    fn backtrace_flag_rejects_unknown_values() {
        with_env(&[("ATS_LOG_INCLUDE_BACKTRACE", Some("maybe"))], || {
            assert!(!LogConfig::from_env().panic_backtrace);
        });
    }
}
