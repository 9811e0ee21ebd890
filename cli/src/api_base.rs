//! Where the contact API lives, as announced by the site's pages.
//!
//! A page names its API base in `<meta name="api-base" content="...">`.
//! Without the tag the base is `/api`.

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;

pub const DEFAULT_API_BASE: &str = "/api";

lazy_static! {
    static ref META_TAG: Regex = Regex::new(r"(?is)<meta\b[^>]*>").unwrap();
    static ref API_BASE_NAME: Regex =
        Regex::new(r#"(?i)\bname\s*=\s*(?:"api-base"|'api-base'|api-base\b)"#).unwrap();
    static ref CONTENT_ATTR: Regex =
        Regex::new(r#"(?i)\bcontent\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase {
    base: String,
}

impl Default for ApiBase {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ApiBase {
    /// Normalize a raw base: blank or absent means `/api`, trailing slashes go.
    pub fn new(raw: Option<&str>) -> Self {
        let raw = raw.map(str::trim).filter(|value| !value.is_empty());
        let base = raw.unwrap_or(DEFAULT_API_BASE).trim_end_matches('/');
        Self {
            base: base.to_string(),
        }
    }

    /// Read the base from the first `api-base` meta tag of an HTML page
    pub fn from_page(html: &str) -> Self {
        Self::new(meta_content(html).as_deref())
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// Join an API path onto the base with exactly one `/`
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if self.base.is_empty() {
            format!("/{path}")
        } else {
            format!("{}/{path}", self.base)
        }
    }

    /// Resolve an API path against the site the page was served from.
    /// An absolute base replaces the site entirely.
    pub fn resolve(&self, site: &Url, path: &str) -> Result<Url, String> {
        site.join(&self.url(path)).map_err(|e| e.to_string())
    }
}

fn meta_content(html: &str) -> Option<String> {
    META_TAG
        .find_iter(html)
        .map(|tag| tag.as_str())
        .find(|tag| API_BASE_NAME.is_match(tag))
        .and_then(|tag| CONTENT_ATTR.captures(tag))
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|value| value.as_str().to_string())
}
