//! Embedded snapshot of the HSTS preload list.
//!
//! Queries are by registrable domain, not hostname. An entry flagged with
//! `include_subdomains` also covers every registrable domain beneath it,
//! which is how preloaded public suffixes (`dev`, `app`, ...) match.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

static SNAPSHOT: &str = include_str!("../../data/hsts_preload.txt");

/// The preload snapshot parsed once at first use.
pub static PRELOAD_LIST: Lazy<PreloadList> = Lazy::new(|| PreloadList::parse(SNAPSHOT));

/// Result of a preload lookup.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadVerdict {
    /// Whether the registrable domain is committed to HSTS.
    pub preloaded: bool,
    /// The matched list entry, when one matched.
    pub entry: Option<String>,
}

/// Parsed preload list keyed by domain.
#[derive(Debug, Default)]
pub struct PreloadList {
    entries: HashMap<String, bool>,
}

impl PreloadList {
    /// Parses the snapshot format: one `<domain> <include_subdomains: 0|1>`
    /// entry per line, `#` comments ignored.
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let Some(domain) = fields.next() else {
                continue;
            };
            let include_subdomains = fields.next() == Some("1");
            entries.insert(domain.to_ascii_lowercase(), include_subdomains);
        }
        PreloadList { entries }
    }

    /// Builds a list from explicit entries. Used by tests and harnesses.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, bool)>,
    {
        PreloadList {
            entries: entries
                .into_iter()
                .map(|(d, s)| (d.to_ascii_lowercase(), s))
                .collect(),
        }
    }

    /// Looks up a registrable domain.
    ///
    /// Checks the exact domain first, then each parent suffix whose entry is
    /// flagged `include_subdomains`.
    pub fn lookup(&self, registrable_domain: &str) -> PreloadVerdict {
        let domain = registrable_domain.to_ascii_lowercase();

        if self.entries.contains_key(domain.as_str()) {
            return PreloadVerdict {
                preloaded: true,
                entry: Some(domain),
            };
        }

        let mut rest = domain.as_str();
        while let Some(idx) = rest.find('.') {
            rest = &rest[idx + 1..];
            if self.entries.get(rest) == Some(&true) {
                return PreloadVerdict {
                    preloaded: true,
                    entry: Some(rest.to_string()),
                };
            }
        }

        PreloadVerdict::default()
    }

    /// Number of entries in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
