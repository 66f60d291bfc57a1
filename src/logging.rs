//! Logging setup.
//!
//! Everything in the crate logs through `tracing`. On Android the events are
//! written to logcat; elsewhere they go to stderr. `RUST_LOG` overrides the
//! default `skanni_core=info` filter.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_FILTER: &str = "skanni_core=info";

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    #[cfg(target_os = "android")]
    let layer = fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_target(true)
        .with_writer(logcat::Logcat);

    #[cfg(not(target_os = "android"))]
    let layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init();
}

#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(target_os = "android")]
mod logcat {
    use android_log_sys::LogPriority;
    use std::ffi::CString;
    use std::io;
    use tracing::{Level, Metadata};
    use tracing_subscriber::fmt::MakeWriter;

    const TAG: &[u8] = b"skanni\0";

    pub struct Logcat;

    pub struct LogcatWriter {
        priority: i32,
    }

    impl<'a> MakeWriter<'a> for Logcat {
        type Writer = LogcatWriter;

        fn make_writer(&'a self) -> Self::Writer {
            LogcatWriter {
                priority: LogPriority::INFO as i32,
            }
        }

        fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
            let priority = match *meta.level() {
                Level::ERROR => LogPriority::ERROR,
                Level::WARN => LogPriority::WARN,
                Level::INFO => LogPriority::INFO,
                Level::DEBUG => LogPriority::DEBUG,
                _ => LogPriority::VERBOSE,
            };
            LogcatWriter {
                priority: priority as i32,
            }
        }
    }

    impl io::Write for LogcatWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let text = String::from_utf8_lossy(buf);
            let line = text.trim_end_matches('\n');
            let msg = CString::new(line.replace('\0', "\u{fffd}"))
                .unwrap_or_else(|_| CString::default());
            unsafe {
                android_log_sys::__android_log_write(
                    self.priority,
                    TAG.as_ptr() as *const _,
                    msg.as_ptr(),
                );
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
