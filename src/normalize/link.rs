use percent_encoding::percent_decode_str;

/// Canonical form of an article URL, used as the article's identity.
///
/// Drops the fragment and every query parameter whose key starts with `utm_` (ignoring case).
/// The remaining parameters keep their order and their original spelling, so the function is
/// idempotent.
pub fn canonicalize_link(url: &str) -> String {
    let s = url.trim();
    let s = s.split_once('#').map_or(s, |(base, _frag)| base);

    let Some((base, query)) = s.split_once('?') else {
        return s.to_string();
    };

    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| !is_tracking_param(pair))
        .collect();

    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, kept.join("&"))
    }
}

fn is_tracking_param(pair: &str) -> bool {
    let key = pair.split_once('=').map_or(pair, |(k, _v)| k);
    // Keys may arrive percent-encoded, e.g. `utm%5Fsource`.
    let key = percent_decode_str(key).decode_utf8_lossy();
    key.to_ascii_lowercase().starts_with("utm_")
}
