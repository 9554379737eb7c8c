//! Tracing setup: a console layer on stderr plus an optional rolling JSON file.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const VERBOSE_FILTER: &str = "mcprobe=debug,mcprobe_mcp=debug,mcprobe_config=debug,info";
const QUIET_FILTER: &str = "mcprobe=warn,mcprobe_mcp=warn,mcprobe_config=warn,warn";
const FILE_FILTER: &str = "mcprobe=trace,mcprobe_mcp=trace,mcprobe_config=trace,info";

/// Console filter: `RUST_LOG` if set, otherwise by verbosity.
fn console_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { VERBOSE_FILTER } else { QUIET_FILTER })
    })
}

/// Install the global subscriber.
///
/// The returned guard flushes the file layer on drop and must be held for
/// the life of the process.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(console_filter(verbose));

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mcprobe.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new(FILE_FILTER));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
    guard
}
