//! Link resolution for extracted items.
//!
//! Relative links are joined onto the page URL, and the click-tracking
//! wrappers search engines put around result links are peeled off so the
//! candidate carries the article's own address.

use url::Url;

const SKIPPED_PREFIXES: [&str; 4] = ["javascript:", "mailto:", "tel:", "data:"];

/// Resolve `href` against `base`, returning an absolute http(s) URL.
///
/// Returns `None` for fragments, script/mail/phone links, and anything that
/// does not end up http or https.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_lowercase();
    if SKIPPED_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return None;
    }

    let joined = base.join(href).ok()?;
    let mut resolved = unwrap_redirect(&joined).unwrap_or(joined);
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// Peel a known search-engine redirect wrapper, if `url` is one.
pub fn unwrap_redirect(url: &Url) -> Option<Url> {
    let host = url.host_str()?.to_lowercase();

    // DuckDuckGo: //duckduckgo.com/l/?uddg=<encoded>&rut=...
    if host.ends_with("duckduckgo.com") && url.path().starts_with("/l/") {
        return query_param(url, "uddg").and_then(|target| Url::parse(&target).ok());
    }

    // Google: /url?q=<encoded> or /url?url=<encoded>
    if host.contains("google.") && url.path() == "/url" {
        return query_param(url, "q")
            .or_else(|| query_param(url, "url"))
            .and_then(|target| Url::parse(&target).ok());
    }

    // Yahoo: r.search.yahoo.com/.../RU=<encoded>/RK=.../RS=...
    if host == "r.search.yahoo.com" {
        let path = url.path();
        let start = path.find("RU=")? + 3;
        let rest = &path[start..];
        let end = rest.find("/RK=").unwrap_or(rest.len());
        let decoded = urlencoding::decode(&rest[..end]).ok()?;
        return Url::parse(&decoded).ok();
    }

    None
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://bhaagoindia.com/events/?city=bengaluru-4").unwrap()
    }

    #[test]
    fn test_relative_links_are_joined() {
        assert_eq!(
            resolve_link(&base(), "/events/tcs-world-10k/").as_deref(),
            Some("https://bhaagoindia.com/events/tcs-world-10k/")
        );
    }

    #[test]
    fn test_non_navigational_links_are_skipped() {
        for href in ["#", "#top", "javascript:void(0)", "mailto:x@y.z", "tel:100", "  "] {
            assert_eq!(resolve_link(&base(), href), None, "{href}");
        }
    }

    #[test]
    fn test_fragments_are_dropped() {
        assert_eq!(
            resolve_link(&base(), "https://example.com/a#comments").as_deref(),
            Some("https://example.com/a")
        );
    }

    #[test]
    fn test_duckduckgo_redirect_unwrapped() {
        let ddg = Url::parse("https://duckduckgo.com/html/?q=x").unwrap();
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.thehindu.com%2Fnews%2Fcities%2Fbangalore%2Fpower-cut.ece&rut=abc";
        assert_eq!(
            resolve_link(&ddg, href).as_deref(),
            Some("https://www.thehindu.com/news/cities/bangalore/power-cut.ece")
        );
    }

    #[test]
    fn test_yahoo_redirect_unwrapped() {
        let yahoo = Url::parse("https://search.yahoo.com/search?p=x").unwrap();
        let href = "https://r.search.yahoo.com/_ylt=A0/RV=2/RE=1/RO=10/RU=https%3a%2f%2fwww.deccanherald.com%2fcity%2fbandh.html/RK=2/RS=xyz-";
        assert_eq!(
            resolve_link(&yahoo, href).as_deref(),
            Some("https://www.deccanherald.com/city/bandh.html")
        );
    }

    #[test]
    fn test_plain_links_pass_through() {
        let u = Url::parse("https://indianexpress.com/article/cities/bangalore/x/").unwrap();
        assert_eq!(unwrap_redirect(&u), None);
    }
}
