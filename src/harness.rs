//! Retriever harnesses: canned [`Requests`] bundles for tests and offline
//! evaluation.
//!
//! The test battery is a pure function over a `Requests` snapshot, so a
//! harness that fabricates snapshots can exercise every evaluator and the
//! grader without touching the network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use crate::error_handling::ScanError;
use crate::retriever::{
    HttpProbe, Headers, ObservedCookie, PreloadVerdict, Requests, Retrieve, Scheme,
};
use crate::site::Site;

/// Builds a [`Requests`] bundle field by field.
///
/// Defaults describe a plain HTTPS site: status 200, empty body, no cookies,
/// no preload membership, and an HTTP probe that redirects to the HTTPS URL.
#[derive(Debug, Clone)]
pub struct RequestsBuilder {
    site: Site,
    final_url: Url,
    status_code: u16,
    headers: Headers,
    body: String,
    cookies: Vec<ObservedCookie>,
    hsts_preload: PreloadVerdict,
    http_probe: Option<HttpProbe>,
    robots_txt: Option<String>,
    crossdomain_xml: Option<String>,
    clientaccesspolicy_xml: Option<String>,
}

impl RequestsBuilder {
    /// Starts a builder for the given host.
    pub fn new(host: &str) -> RequestsBuilder {
        let site = Site::from_input(host).expect("harness host must canonicalize");
        let final_url =
            Url::parse(&site.url("https")).expect("canonical site must form a URL");
        let location = final_url.to_string();
        RequestsBuilder {
            site,
            final_url,
            status_code: 200,
            headers: Headers::default(),
            body: String::new(),
            cookies: Vec::new(),
            hsts_preload: PreloadVerdict::default(),
            http_probe: Some(HttpProbe {
                status: 301,
                location: Some(location),
            }),
            robots_txt: None,
            crossdomain_xml: None,
            clientaccesspolicy_xml: None,
        }
    }

    /// Sets the final URL after redirects.
    pub fn final_url(mut self, url: &str) -> Self {
        self.final_url = Url::parse(url).expect("harness final URL must parse");
        self
    }

    /// Sets the final response status.
    pub fn status(mut self, status: u16) -> Self {
        self.status_code = status;
        self
    }

    /// Replaces the response headers.
    pub fn headers(mut self, pairs: &[(&str, &str)]) -> Self {
        self.headers = Headers::from_pairs(pairs.iter().copied());
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// Adds one observed cookie.
    pub fn cookie(mut self, raw: &str, scheme: Scheme) -> Self {
        let host = self.final_url.host_str().unwrap_or_default().to_string();
        let cookie = crate::retriever::cookies::parse_set_cookie(raw, scheme, &host)
            .expect("harness cookie must parse");
        self.cookies.push(cookie);
        self
    }

    /// Marks the registrable domain as preloaded.
    pub fn preloaded(mut self, entry: &str) -> Self {
        self.hsts_preload = PreloadVerdict {
            preloaded: true,
            entry: Some(entry.to_string()),
        };
        self
    }

    /// Sets the HTTP probe result; `None` models a refused connection.
    pub fn http_probe(mut self, probe: Option<HttpProbe>) -> Self {
        self.http_probe = probe;
        self
    }

    /// Sets the crossdomain.xml body.
    pub fn crossdomain_xml(mut self, body: &str) -> Self {
        self.crossdomain_xml = Some(body.to_string());
        self
    }

    /// Sets the clientaccesspolicy.xml body.
    pub fn clientaccesspolicy_xml(mut self, body: &str) -> Self {
        self.clientaccesspolicy_xml = Some(body.to_string());
        self
    }

    /// Sets the robots.txt body.
    pub fn robots_txt(mut self, body: &str) -> Self {
        self.robots_txt = Some(body.to_string());
        self
    }

    /// Finishes the bundle.
    pub fn build(self) -> Requests {
        Requests {
            site: self.site,
            final_url: self.final_url,
            status_code: self.status_code,
            headers: self.headers,
            body: self.body,
            cookies: self.cookies,
            hsts_preload: self.hsts_preload,
            robots_txt: self.robots_txt,
            crossdomain_xml: self.crossdomain_xml,
            clientaccesspolicy_xml: self.clientaccesspolicy_xml,
            http_probe: self.http_probe,
        }
    }
}

/// Shorthand: a default HTTPS bundle for `example.test` with the given
/// response headers.
pub fn requests_with_headers(pairs: &[(&str, &str)]) -> Requests {
    RequestsBuilder::new("example.test").headers(pairs).build()
}

/// A [`Retrieve`] implementation that returns clones of a canned outcome and
/// counts how many retrievals were issued.
///
/// Used to verify the cooldown, single-flight, and batch-dedup disciplines:
/// the counter tells the test exactly how many times the network would have
/// been touched.
pub struct StaticRetriever {
    outcome: Box<dyn Fn(&Site) -> Result<Requests, ScanError> + Send + Sync>,
    calls: AtomicUsize,
    delay: Option<std::time::Duration>,
}

impl StaticRetriever {
    /// A retriever that always answers with the given bundle.
    pub fn with_requests(requests: Requests) -> Arc<StaticRetriever> {
        Arc::new(StaticRetriever {
            outcome: Box::new(move |_| Ok(requests.clone())),
            calls: AtomicUsize::new(0),
            delay: None,
        })
    }

    /// A retriever that computes the bundle from the requested site.
    pub fn with_fn<F>(f: F) -> Arc<StaticRetriever>
    where
        F: Fn(&Site) -> Result<Requests, ScanError> + Send + Sync + 'static,
    {
        Arc::new(StaticRetriever {
            outcome: Box::new(f),
            calls: AtomicUsize::new(0),
            delay: None,
        })
    }

    /// A retriever that always fails with the given error.
    pub fn with_error(error: ScanError) -> Arc<StaticRetriever> {
        Arc::new(StaticRetriever {
            outcome: Box::new(move |_| Err(error.clone())),
            calls: AtomicUsize::new(0),
            delay: None,
        })
    }

    /// Adds an artificial delay before answering, so concurrent callers
    /// genuinely overlap in single-flight tests.
    pub fn delayed(requests: Requests, delay: std::time::Duration) -> Arc<StaticRetriever> {
        Arc::new(StaticRetriever {
            outcome: Box::new(move |_| Ok(requests.clone())),
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        })
    }

    /// Number of retrievals issued so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retrieve for StaticRetriever {
    async fn retrieve(
        &self,
        site: &Site,
        _cancel: CancellationToken,
    ) -> Result<Requests, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.outcome)(site)
    }
}
