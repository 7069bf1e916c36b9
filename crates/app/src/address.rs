//! Address normalisation and prefix resolution.
//!
//! Operators often know only the first bytes of a scale's MAC address.
//! Backends report addresses with either `:` or `-` separators and in either
//! case, so comparisons go through [`normalize`].

use std::time::Duration;

use crate::ports::{ScanResult, Scanner, TransportError};

/// Errors raised while resolving an address prefix.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The scan itself failed.
    #[error("scan failed")]
    Scan(#[from] TransportError),

    /// No scanned peripheral matched the prefix.
    #[error("no device with address prefix {prefix} found")]
    NoMatch {
        /// The prefix that was searched for.
        prefix: String,
    },
}

/// Uppercase an address and use `:` as separator (e.g. `"80:F4:AD:DD:37:9A"`).
#[must_use]
pub fn normalize(address: &str) -> String {
    address.trim().replace('-', ":").to_ascii_uppercase()
}

/// First scanned peripheral whose normalised address starts with `prefix`.
#[must_use]
pub fn resolve_prefix<'a>(results: &'a [ScanResult], prefix: &str) -> Option<&'a ScanResult> {
    let prefix = normalize(prefix);
    results
        .iter()
        .find(|result| normalize(&result.address).starts_with(&prefix))
}

/// Scan for `timeout` and return the address of the first peripheral
/// matching `prefix`.
///
/// # Errors
///
/// Returns [`ResolveError::Scan`] if scanning fails, or
/// [`ResolveError::NoMatch`] if nothing matched.
#[tracing::instrument(skip(scanner))]
pub async fn resolve<S: Scanner>(
    scanner: &S,
    prefix: &str,
    timeout: Duration,
) -> Result<String, ResolveError> {
    let results = scanner.discover(timeout).await?;
    tracing::debug!(count = results.len(), "scan finished");

    let found = resolve_prefix(&results, prefix).ok_or_else(|| ResolveError::NoMatch {
        prefix: prefix.to_string(),
    })?;

    let address = normalize(&found.address);
    tracing::info!(%address, name = ?found.name, "resolved address prefix");
    Ok(address)
}
