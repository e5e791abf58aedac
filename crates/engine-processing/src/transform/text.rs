use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HTML_TAG_RE: Regex = Regex::new(r"<[^>]*>").expect("valid regex");
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").expect("valid regex");
}

/// URL/handle slug: lowercase alphanumerics joined by single hyphens.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_was_hyphen = true;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("item");
    }
    slug
}

/// Strips markup and collapses whitespace in a legacy description.
pub fn sanitize_description(raw: &str) -> Option<String> {
    let without_tags = HTML_TAG_RE.replace_all(raw, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    let collapsed = WHITESPACE_RE.replace_all(decoded.trim(), " ").to_string();
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Filename safe for an object-store key: last path segment of the URL,
/// query stripped, anything outside [a-z0-9._-] replaced.
pub fn safe_filename(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let segment = without_query
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("image");

    let mut name = String::with_capacity(segment.len());
    for ch in segment.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            name.push(ch.to_ascii_lowercase());
        } else {
            name.push('-');
        }
    }
    if name.trim_matches(['-', '.']).is_empty() {
        return "image".to_string();
    }
    name
}

/// Short base36 suffix derived from a unix timestamp, used to uniquify
/// handles on re-runs.
pub fn base36_suffix(unix_ts: i64) -> String {
    let mut n = unix_ts.unsigned_abs();
    if n == 0 {
        return "0".to_string();
    }
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ascii")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_collapse_and_trim() {
        assert_eq!(slugify("Über  Kettle 2.0 (Steel)!"), "ber-kettle-2-0-steel");
        assert_eq!(slugify("---"), "item");
    }

    #[test]
    fn descriptions_lose_markup() {
        assert_eq!(
            sanitize_description("<p>Fast &amp; <b>strong</b></p>\n\n kettle"),
            Some("Fast & strong kettle".to_string())
        );
        assert_eq!(sanitize_description("<br/> "), None);
    }

    #[test]
    fn filenames_come_from_the_last_segment() {
        assert_eq!(
            safe_filename("https://cdn.example.com/p/a/Front View.JPG?v=3"),
            "front-view.jpg"
        );
        assert_eq!(safe_filename("https://cdn.example.com/"), "image");
    }

    #[test]
    fn base36_is_compact_and_stable() {
        assert_eq!(base36_suffix(0), "0");
        assert_eq!(base36_suffix(36), "10");
        assert_eq!(base36_suffix(1_700_000_000), base36_suffix(1_700_000_000));
    }
}
