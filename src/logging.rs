use crate::Error;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. Logs go to stderr so stdout stays
/// clean for query output.
pub fn init(level: &str, json: bool) -> Result<(), Error> {
    let filter = EnvFilter::try_new(level)
        .map_err(|e| Error::Logging(format!("invalid log level: {e}")))?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|_| Error::Logging("logging already initialized".into()))
}
