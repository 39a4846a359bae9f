use crate::cli::{LogColor, Options};
use std::io::IsTerminal;
use tracing::Level;
use tracing_subscriber::{EnvFilter, filter::Directive, fmt, prelude::*};

/// Installs the global subscriber. `RUST_LOG` directives are layered over `--log.level`.
pub fn init_tracing(opts: &Options) {
    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(opts.log_level))
        .from_env_lossy();

    let use_color = match opts.log_color {
        LogColor::Always => true,
        LogColor::Never => false,
        LogColor::Auto => std::io::stderr().is_terminal(),
    };

    let include_target = matches!(opts.log_level, Level::DEBUG | Level::TRACE);

    // Results go to stdout, logs to stderr.
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(include_target)
        .with_ansi(use_color);

    tracing_subscriber::registry()
        .with(log_filter)
        .with(fmt_layer)
        .init();
}
