// SPDX-License-Identifier: PMPL-1.0-or-later

//! Diagnostic logging setup
//!
//! Library code only emits `tracing` events. The binary installs a subscriber
//! that writes to stderr so stdout stays clean for serialized reports.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives
pub const LOG_ENV: &str = "CONSENSUS_SCAN_LOG";

const DEFAULT_FILTER: &str = "consensus_scan=warn";

static INIT: Once = Once::new();

/// Install the fmt subscriber. Later calls are no-ops.
///
/// Respects `CONSENSUS_SCAN_LOG`; falls back to `consensus_scan=warn`, or to
/// `consensus_scan=debug` when `verbose` is set.
pub fn init_tracing(verbose: bool) {
    INIT.call_once(|| {
        let fallback = if verbose {
            "consensus_scan=debug"
        } else {
            DEFAULT_FILTER
        };
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

        // Another subscriber may already be installed by an embedding application.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
