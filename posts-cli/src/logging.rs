use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const QUIET_DIRECTIVES: &str = "warn";
const VERBOSE_DIRECTIVES: &str = "info,posts_sync=debug,posts_cli=debug";

/// Filter used when `RUST_LOG` is unset. Plain runs keep stderr to warnings
/// so command output stays readable.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_DIRECTIVES
    } else {
        QUIET_DIRECTIVES
    }
}

pub fn init_logging(verbose: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(verbose)
        .with_line_number(verbose);

    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    tracing::debug!("Logging initialized");
}
