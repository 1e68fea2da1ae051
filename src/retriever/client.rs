//! HTTP client, DNS resolver, and TLS provider initialization.

use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use reqwest::ClientBuilder;
use rustls::crypto::{ring::default_provider, CryptoProvider};

use crate::config::{Config, DNS_TIMEOUT_SECS, SCANNER_USER_AGENT};

/// Initializes the probe client.
///
/// Redirects are disabled so the retriever can walk the chain manually,
/// capturing `Set-Cookie` headers and the scheme of every hop. Cookies and
/// credentials are never sent.
pub fn init_client(config: &Config) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(config.probe_timeout)
        .user_agent(SCANNER_USER_AGENT)
        .build()
}

/// Installs the global rustls crypto provider.
///
/// Must run before the first TLS connection; reinstalling is harmless.
pub fn init_crypto_provider() {
    let _ = CryptoProvider::install_default(default_provider());
}

/// Initializes the DNS resolver used for the resolution pre-flight.
///
/// Short timeouts and two attempts so unresolvable hosts fail fast, and
/// `ndots = 0` to prevent search-domain appending.
pub fn init_resolver() -> Arc<TokioAsyncResolver> {
    use hickory_resolver::config::{ResolverConfig, ResolverOpts};

    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_secs(DNS_TIMEOUT_SECS);
    opts.attempts = 2;
    opts.ndots = 0;

    Arc::new(TokioAsyncResolver::tokio(ResolverConfig::default(), opts))
}
