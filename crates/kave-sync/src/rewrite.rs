//! Pointing references in the root document at the local mirror.
//!
//! Scanning is split from rewriting: a [`ReferenceScanner`] only reports where
//! reference values sit in the text. [`AttributeScanner`] reads markup
//! attributes; [`InlineScriptScanner`] is a best-effort pass over inline
//! script bodies and will miss URLs that are assembled at runtime.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::path;

/// Byte span of a reference value inside the scanned document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub start: usize,
    pub end:   usize,
}

impl Reference {
    pub fn value<'a>(&self, document: &'a str) -> &'a str {
        &document[self.start..self.end]
    }
}

pub trait ReferenceScanner: Send + Sync {
    fn scan(&self, document: &str) -> Vec<Reference>;
}

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|\s)(?:href|src|poster|action|data)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .expect("attribute pattern")
});

static SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>").expect("script pattern"));

static QUOTED_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(https?://[^"\s]+)"|'(https?://[^'\s]+)'|`(https?://[^`\s$]+)`"#)
        .expect("quoted url pattern")
});

/// `href`, `src` and friends, quoted or bare.
///
/// The attribute name must follow whitespace, so `data-src=` and friends are
/// not mistaken for `src=` or `data=`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeScanner;

impl ReferenceScanner for AttributeScanner {
    fn scan(&self, document: &str) -> Vec<Reference> {
        ATTRIBUTE
            .captures_iter(document)
            .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
            .map(|m| Reference {
                start: m.start(),
                end:   m.end(),
            })
            .collect()
    }
}

/// Quoted absolute `http(s)` URLs inside `<script>` bodies.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineScriptScanner;

impl ReferenceScanner for InlineScriptScanner {
    fn scan(&self, document: &str) -> Vec<Reference> {
        let mut found = Vec::new();
        for script in SCRIPT.captures_iter(document) {
            let Some(body) = script.get(1) else { continue };
            for c in QUOTED_URL.captures_iter(body.as_str()) {
                if let Some(m) = c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)) {
                    found.push(Reference {
                        start: body.start() + m.start(),
                        end:   body.start() + m.end(),
                    });
                }
            }
        }
        found
    }
}

/// Outcome of rewriting one document.
#[derive(Debug, Clone, Default)]
pub struct Rewritten {
    pub text:      String,
    /// Number of references replaced.
    pub rewritten: usize,
    /// Same-origin targets inside the mirror, without query or fragment, in
    /// document order and deduplicated.
    pub targets:   Vec<Url>,
}

/// Rewrites same-origin references relative to the document's own directory.
pub struct LinkRewriter {
    document_url: Url,
    base:         Url,
    scanners:     Vec<Box<dyn ReferenceScanner>>,
}

impl LinkRewriter {
    /// Rewriter for the document at `document_url`, mirroring everything below `base`.
    pub fn new(document_url: Url, base: Url) -> Self {
        Self {
            document_url,
            base,
            scanners: vec![Box::new(AttributeScanner)],
        }
    }

    pub fn with_scanner(mut self, scanner: impl ReferenceScanner + 'static) -> Self {
        self.scanners.push(Box::new(scanner));
        self
    }

    pub fn rewrite(&self, document: &str) -> Rewritten {
        let mut references: Vec<Reference> =
            self.scanners.iter().flat_map(|s| s.scan(document)).collect();
        references.sort_by_key(|r| (r.start, std::cmp::Reverse(r.end)));

        let mut out = Rewritten {
            text: String::with_capacity(document.len()),
            ..Rewritten::default()
        };
        let mut cursor = 0;

        for reference in references {
            // Overlaps happen when both scanners hit the same script text.
            if reference.start < cursor {
                continue;
            }
            let raw = reference.value(document);
            let Some((local, target)) = self.localize(raw) else {
                continue;
            };

            out.text.push_str(&document[cursor..reference.start]);
            out.text.push_str(&local);
            cursor = reference.end;
            out.rewritten += 1;
            tracing::debug!(from = raw, to = %local, "rewrote reference");

            if let Some(target) = target
                && !out.targets.contains(&target)
            {
                out.targets.push(target);
            }
        }
        out.text.push_str(&document[cursor..]);
        out
    }

    /// Local replacement for `raw`, plus the URL to fetch when it names a
    /// file inside the mirror. `None` leaves the reference as it is, which is
    /// what happens to other origins and to paths outside the mirror base.
    pub fn localize(&self, raw: &str) -> Option<(String, Option<Url>)> {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            return None;
        }
        let resolved = self.document_url.join(raw).ok()?;
        if resolved.origin() != self.document_url.origin() {
            return None;
        }

        let target_path = path::normalize(resolved.path());
        if !self.inside_base(&target_path) {
            return None;
        }

        let doc_dir = path::parent(&path::normalize(self.document_url.path())).to_string();
        let mut local = path::relative_to(&doc_dir, &target_path);
        if resolved.path().ends_with('/') && !local.ends_with('/') {
            local.push('/');
        }
        if let Some(fragment) = resolved.fragment() {
            local.push('#');
            local.push_str(fragment);
        }

        Some((local, self.fetchable(&resolved)))
    }

    /// Whether normalized `target` is the mirror base or lies below it.
    fn inside_base(&self, target: &str) -> bool {
        let base = path::normalize(self.base.path());
        base.is_empty() || target == base || target.starts_with(&format!("{base}/"))
    }

    fn fetchable(&self, resolved: &Url) -> Option<Url> {
        if resolved.path().ends_with('/') {
            return None;
        }
        let target = path::normalize(resolved.path());
        let base = path::normalize(self.base.path());
        if target.is_empty() || target == base || path::escapes_root(&target) {
            return None;
        }
        let mut url = resolved.clone();
        url.set_query(None);
        url.set_fragment(None);
        Some(url)
    }
}
