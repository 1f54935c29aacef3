use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use figgy_core::config::LoggingConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` wins; otherwise the level comes from `--verbose`, then
/// `logging.level`, then `info`, with `logging.filters` appended.
/// Returns the filter directives that failed to parse.
pub fn init_logging(verbose: bool, config: Option<&LoggingConfig>) -> anyhow::Result<Vec<String>> {
    let mut rejected = Vec::new();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let level = if verbose {
                "debug"
            } else {
                config
                    .and_then(|c| c.level.as_deref())
                    .unwrap_or("info")
            };
            let mut filter = EnvFilter::new(level);
            for directive in config.map(|c| c.filters.as_slice()).unwrap_or_default() {
                match directive.parse() {
                    Ok(d) => filter = filter.add_directive(d),
                    Err(_) => rejected.push(directive.clone()),
                }
            }
            filter
        }
    };

    let writer = match config.map(|c| c.output.as_str()) {
        Some("stdout") => BoxMakeWriter::new(std::io::stdout),
        _ => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    let installed = match config.map(|c| c.format.as_str()) {
        Some("json") => builder.json().try_init(),
        _ => builder.try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))?;

    Ok(rejected)
}
