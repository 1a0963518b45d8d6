use std::io::{self, BufReader};

use guardian_core::config::Config;

/// Serve the coordinator protocol over stdio until EOF.
pub fn run(config: &Config) -> i32 {
    let coordinator = match super::open_coordinator(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("guardian: {e}");
            return 1;
        }
    };
    tracing::debug!(
        profile = %coordinator.profile().kind,
        remote = coordinator.has_backend(),
        "coordinator ready"
    );
    let stdin = BufReader::new(io::stdin());
    let stdout = io::stdout();
    guardian_core::server::run(&coordinator, stdin, stdout)
}
