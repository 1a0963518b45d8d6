pub mod analyze;
pub mod coordinator;
pub mod popup;

use std::io::Read;
use std::sync::Arc;

use guardian_core::config::Config;
use guardian_core::coordinator::Coordinator;
use guardian_core::store::{FileStore, VerdictStore};
use guardian_core::surface::LogSurface;
use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. `GUARDIAN_LOG` takes an `EnvFilter`
/// directive; the default is `warn`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("GUARDIAN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Read a page from a file, or stdin for "-".
pub fn read_html(file: &str) -> Result<String, String> {
    if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        return Ok(buf);
    }
    let bytes = std::fs::read(file).map_err(|e| format!("failed to read {file}: {e}"))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// The on-disk verdict store the config points at.
pub fn open_store(config: &Config) -> Result<VerdictStore, String> {
    let path = config
        .store_file()
        .ok_or_else(|| "cannot determine data directory".to_string())?;
    Ok(VerdictStore::new(Arc::new(FileStore::new(path))))
}

/// Coordinator over the on-disk store, reporting through the log.
pub fn open_coordinator(config: &Config) -> Result<Coordinator, String> {
    let store = open_store(config)?;
    Ok(Coordinator::from_config(
        config,
        store,
        Arc::new(LogSurface),
        Arc::new(LogSurface),
    ))
}
