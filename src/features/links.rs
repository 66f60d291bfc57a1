use url::Url;

/// True when `input` is an absolute URL with an `http` or `https` scheme.
///
/// Parsing follows the WHATWG URL rules, so surrounding whitespace is
/// trimmed and `http:example.com` is accepted the same way a browser
/// accepts it. Both screens decide between "Open link" and "View" with this.
pub fn is_web_url(input: &str) -> bool {
    match Url::parse(input) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}
