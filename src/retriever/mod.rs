//! The retriever: turns a [`Site`] into an immutable [`Requests`] bundle.
//!
//! This is the only layer that performs I/O. One scan issues a fixed set of
//! probes: the HTTPS GET with manual redirect following, the plain HTTP GET
//! (redirects disabled), best-effort GETs of robots.txt and the Flash /
//! Silverlight policy files, and an HSTS preload lookup for the registrable
//! domain. Everything downstream evaluates the snapshot, never the network.

mod client;
pub mod cookies;
pub mod preload;

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use log::{debug, warn};
use publicsuffix::{List, Psl};
use reqwest::Url;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, MAX_WELL_KNOWN_BODY_SIZE};
use crate::error_handling::{RetrievalError, ScanError, ValidationError};
use crate::site::Site;

pub use client::init_crypto_provider;
pub use cookies::ObservedCookie;
pub use preload::{PreloadList, PreloadVerdict, PRELOAD_LIST};

/// Scheme of a probe hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Plain-text HTTP.
    Http,
    /// HTTPS.
    Https,
}

impl Scheme {
    /// URL scheme string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    fn from_url(url: &Url) -> Scheme {
        if url.scheme() == "https" {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }
}

/// Response headers with lower-cased names and multi-value semantics
/// preserved. Backed by a BTreeMap so serialization order is deterministic.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Headers(BTreeMap<String, Vec<String>>);

impl Headers {
    /// Builds the map from a reqwest header map, lower-casing names and
    /// keeping every value of repeated headers.
    pub fn from_reqwest(headers: &reqwest::header::HeaderMap) -> Self {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in headers.iter() {
            if let Ok(value) = value.to_str() {
                map.entry(name.as_str().to_ascii_lowercase())
                    .or_default()
                    .push(value.to_string());
            }
        }
        Headers(map)
    }

    /// Builds the map from `(name, value)` pairs. Used by test harnesses.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in pairs {
            map.entry(name.to_ascii_lowercase())
                .or_default()
                .push(value.to_string());
        }
        Headers(map)
    }

    /// First value of the named header, if present.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value of the named header.
    pub fn all(&self, name: &str) -> &[String] {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether the named header is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    /// Iterates over all `(name, values)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

/// Result of the plain HTTP probe: status and `Location` only, no redirect
/// following, body discarded. `None` at the `Requests` level means the HTTP
/// endpoint refused the connection entirely.
#[derive(Debug, Clone, Serialize)]
pub struct HttpProbe {
    /// Response status code.
    pub status: u16,
    /// `Location` header, if any.
    pub location: Option<String>,
}

/// Snapshot of all observations collected by the retriever for one scan.
///
/// Produced once per scan and read-only thereafter; the test battery borrows
/// facts from it and never touches the network.
#[derive(Debug, Clone)]
pub struct Requests {
    /// The canonical site under scan.
    pub site: Site,
    /// Final URL after redirects. The scheme is `https` iff a usable HTTPS
    /// endpoint exists.
    pub final_url: Url,
    /// Status code of the final response.
    pub status_code: u16,
    /// Response headers of the final response.
    pub headers: Headers,
    /// Decoded response body, truncated to the configured cap.
    pub body: String,
    /// Every cookie observed along the redirect chain.
    pub cookies: Vec<ObservedCookie>,
    /// HSTS preload verdict for the registrable domain of the final host.
    pub hsts_preload: PreloadVerdict,
    /// robots.txt body, if the fetch succeeded.
    pub robots_txt: Option<String>,
    /// crossdomain.xml body, if the fetch succeeded.
    pub crossdomain_xml: Option<String>,
    /// clientaccesspolicy.xml body, if the fetch succeeded.
    pub clientaccesspolicy_xml: Option<String>,
    /// Plain HTTP probe result; `None` when the connection failed.
    pub http_probe: Option<HttpProbe>,
}

impl Requests {
    /// Whether the final response was delivered over HTTPS.
    pub fn is_https(&self) -> bool {
        self.final_url.scheme() == "https"
    }

    /// Whether the final response declared an HTML content type. A missing
    /// Content-Type is treated as HTML so header-less static servers still
    /// get their markup inspected.
    pub fn is_html(&self) -> bool {
        match self.headers.first("content-type") {
            Some(ct) => ct.to_ascii_lowercase().contains("text/html"),
            None => true,
        }
    }
}

/// The retrieval seam.
///
/// The production implementation is [`Retriever`]; tests substitute
/// harnesses that return canned [`Requests`] bundles or count calls.
#[async_trait]
pub trait Retrieve: Send + Sync {
    /// Runs all probes for one scan.
    async fn retrieve(
        &self,
        site: &Site,
        cancel: CancellationToken,
    ) -> Result<Requests, ScanError>;
}

/// Production retriever backed by reqwest and hickory.
pub struct Retriever {
    client: reqwest::Client,
    resolver: Arc<TokioAsyncResolver>,
    extractor: Arc<List>,
    config: Config,
}

impl Retriever {
    /// Builds the retriever, installing the TLS provider and constructing
    /// the probe client and resolver.
    pub fn new(config: Config) -> anyhow::Result<Retriever> {
        client::init_crypto_provider();
        let client = client::init_client(&config)?;
        let resolver = client::init_resolver();
        Ok(Retriever {
            client,
            resolver,
            extractor: Arc::new(List::new()),
            config,
        })
    }

    /// DNS pre-flight: the host must resolve to at least one public address.
    ///
    /// Loopback and private answers are rejected unless `allow_private` is
    /// configured; a host that resolves to nothing else is as unscannable as
    /// one that does not resolve at all.
    async fn check_resolution(&self, host: &str) -> Result<(), ValidationError> {
        let lookup = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|_| ValidationError::InvalidHostnameLookup(host.to_string()))?;

        let mut any = false;
        let mut any_public = false;
        for ip in lookup.iter() {
            any = true;
            if !is_private_ip(&ip) {
                any_public = true;
            }
        }

        if !any || (!any_public && !self.config.allow_private) {
            return Err(ValidationError::InvalidHostnameLookup(host.to_string()));
        }
        Ok(())
    }

    /// Walks the redirect chain from `start`, capturing cookies at every
    /// hop, and returns the final URL with its response.
    async fn walk_chain(
        &self,
        start: &str,
        cookies: &mut Vec<ObservedCookie>,
    ) -> Result<(Url, reqwest::Response), RetrievalError> {
        let mut current =
            Url::parse(start).map_err(|e| RetrievalError::ScanFailed(e.to_string()))?;

        for _ in 0..=self.config.max_redirects {
            debug!("Probing {current}");
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(classify_reqwest_error)?;

            let hop_scheme = Scheme::from_url(&current);
            let hop_host = current.host_str().unwrap_or_default().to_string();
            for value in response.headers().get_all(reqwest::header::SET_COOKIE) {
                if let Ok(raw) = value.to_str() {
                    if let Some(cookie) = cookies::parse_set_cookie(raw, hop_scheme, &hop_host) {
                        cookies.push(cookie);
                    }
                }
            }

            if response.status().is_redirection() {
                if let Some(location) = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                {
                    let next = Url::parse(location)
                        .or_else(|_| current.join(location))
                        .map_err(|e| RetrievalError::ScanFailed(e.to_string()))?;
                    current = next;
                    continue;
                }
            }

            return Ok((current, response));
        }

        Err(RetrievalError::RedirectionLoop(self.config.max_redirects))
    }

    /// Issues the plain HTTP probe, retaining status and Location only.
    async fn http_probe(&self, site: &Site) -> Option<HttpProbe> {
        match self.client.get(site.url("http")).send().await {
            Ok(response) => {
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Some(HttpProbe {
                    status: response.status().as_u16(),
                    location,
                })
            }
            Err(e) => {
                debug!("HTTP probe failed for {}: {e}", site.site_key());
                None
            }
        }
    }

    /// Best-effort bounded fetch of a well-known resource on the final
    /// origin. Any failure yields `None`, never a scan failure.
    async fn fetch_well_known(&self, origin: &Url, path: &str) -> Option<String> {
        let url = origin.join(path).ok()?;
        let response = self.client.get(url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let text = response.text().await.ok()?;
        Some(truncate_to_boundary(text, MAX_WELL_KNOWN_BODY_SIZE))
    }

    async fn retrieve_inner(&self, site: &Site) -> Result<Requests, ScanError> {
        self.check_resolution(site.host()).await?;

        let mut observed_cookies = Vec::new();

        // HTTPS first; an unusable HTTPS endpoint falls back to plain HTTP
        // so http-only sites still produce a scan (and fail the relevant
        // tests) instead of a connection error.
        let https_attempt = self.walk_chain(&site.url("https"), &mut observed_cookies).await;
        let (final_url, response) = match https_attempt {
            Ok(done) => done,
            Err(e @ (RetrievalError::ConnectionError(_) | RetrievalError::TlsError(_))) => {
                warn!("HTTPS probe failed for {}: {e}", site.site_key());
                observed_cookies.clear();
                match self.walk_chain(&site.url("http"), &mut observed_cookies).await {
                    Ok(done) => done,
                    Err(_) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        let status_code = response.status().as_u16();
        let headers = Headers::from_reqwest(response.headers());
        let body = match response.text().await {
            Ok(text) => truncate_to_boundary(text, self.config.max_body_size),
            Err(e) => {
                warn!("Failed to read body for {}: {e}", site.site_key());
                String::new()
            }
        };

        let origin = {
            let mut origin = final_url.clone();
            origin.set_path("/");
            origin.set_query(None);
            origin.set_fragment(None);
            origin
        };

        let (http_probe, robots_txt, crossdomain_xml, clientaccesspolicy_xml) = tokio::join!(
            self.http_probe(site),
            self.fetch_well_known(&origin, "robots.txt"),
            self.fetch_well_known(&origin, "crossdomain.xml"),
            self.fetch_well_known(&origin, "clientaccesspolicy.xml"),
        );

        let final_host = final_url.host_str().unwrap_or(site.host());
        let registrable = registrable_domain(&self.extractor, final_host);
        let hsts_preload = PRELOAD_LIST.lookup(&registrable);

        Ok(Requests {
            site: site.clone(),
            final_url,
            status_code,
            headers,
            body,
            cookies: observed_cookies,
            hsts_preload,
            robots_txt,
            crossdomain_xml,
            clientaccesspolicy_xml,
            http_probe,
        })
    }
}

#[async_trait]
impl Retrieve for Retriever {
    async fn retrieve(
        &self,
        site: &Site,
        cancel: CancellationToken,
    ) -> Result<Requests, ScanError> {
        let capped = tokio::time::timeout(self.config.scan_timeout, self.retrieve_inner(site));
        tokio::select! {
            _ = cancel.cancelled() => Err(RetrievalError::ScanCancelled.into()),
            result = capped => match result {
                Ok(result) => result,
                Err(_) => {
                    Err(RetrievalError::ScanTimeout(self.config.scan_timeout.as_secs()).into())
                }
            },
        }
    }
}

/// Extracts the registrable domain via the Public Suffix List, falling back
/// to the raw host for names the list does not cover (e.g. `localhost`).
pub fn registrable_domain(list: &List, host: &str) -> String {
    list.domain(host.as_bytes())
        .map(|d| String::from_utf8_lossy(d.as_bytes()).to_string())
        .unwrap_or_else(|| host.to_string())
}

fn classify_reqwest_error(e: reqwest::Error) -> RetrievalError {
    let text = format!("{e:?}");
    let tls = text.contains("Tls") || text.contains("certificate") || text.contains("Ssl");
    if tls {
        RetrievalError::TlsError(e.to_string())
    } else if e.is_connect() || e.is_timeout() || e.is_request() {
        RetrievalError::ConnectionError(e.to_string())
    } else {
        RetrievalError::ScanFailed(e.to_string())
    }
}

/// Truncates to at most `cap` bytes without splitting a UTF-8 code point.
fn truncate_to_boundary(mut text: String, cap: usize) -> String {
    if text.len() <= cap {
        return text;
    }
    let mut cut = cap;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            let segments = v6.segments();
            v6.is_loopback()
                || v6.is_unspecified()
                || (segments[0] & 0xfe00) == 0xfc00
                || (segments[0] & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_lowercase_and_multivalue() {
        let headers = Headers::from_pairs([
            ("Set-Cookie", "a=1"),
            ("Set-Cookie", "b=2"),
            ("X-Frame-Options", "DENY"),
        ]);
        assert_eq!(headers.all("set-cookie").len(), 2);
        assert_eq!(headers.first("x-frame-options"), Some("DENY"));
        assert!(headers.contains("SET-COOKIE"));
        assert!(!headers.contains("content-security-policy"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "héllo wörld".to_string();
        let cut = truncate_to_boundary(text, 2);
        assert_eq!(cut, "h");

        let text = "ascii only".to_string();
        assert_eq!(truncate_to_boundary(text, 5), "ascii");
    }

    #[test]
    fn test_private_ip_detection() {
        assert!(is_private_ip(&"127.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"10.1.2.3".parse().unwrap()));
        assert!(is_private_ip(&"192.168.0.1".parse().unwrap()));
        assert!(is_private_ip(&"169.254.0.1".parse().unwrap()));
        assert!(is_private_ip(&"::1".parse().unwrap()));
        assert!(is_private_ip(&"fe80::1".parse().unwrap()));
        assert!(is_private_ip(&"fd00::1".parse().unwrap()));
        assert!(!is_private_ip(&"93.184.215.14".parse().unwrap()));
        assert!(!is_private_ip(&"2606:2800:21f::1".parse().unwrap()));
    }

    #[test]
    fn test_is_html_defaults_to_true_without_content_type() {
        let headers = Headers::default();
        assert!(headers.first("content-type").is_none());
    }
}
