//! The four article sources and the pieces of extraction they share.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use url::Url;

use crate::{
    config::{Config, NatureMode},
    feed::RawEntry,
    http::HttpClient,
    normalize::{canonicalize_link, normalize_date},
    paper::{Paper, Source},
};

pub mod aps_prl;
pub mod arxiv;
pub mod nature;
pub mod nature_journal;

pub use aps_prl::ApsPrlFetcher;
pub use arxiv::ArxivFetcher;
pub use nature::NatureFetcher;
pub use nature_journal::NatureJournalFetcher;

/// A source of candidate papers.
///
/// Every paper returned has matched at least one keyword. Fetching never fails: transport errors
/// are logged and the source simply contributes nothing to the run.
pub trait Fetcher {
    fn source(&self) -> Source;

    /// Where this source reads from.
    fn url(&self) -> &str;

    fn fetch(&self) -> Vec<Paper>;
}

/// Build the enabled fetchers in reporting order. Sources with an empty URL are left out.
pub fn from_config(config: &Config, http: &HttpClient) -> Vec<Box<dyn Fetcher>> {
    let keywords = config.keywords.as_slice();
    let max = config.rss_max_entries;

    let all: Vec<Box<dyn Fetcher>> = vec![
        Box::new(ArxivFetcher::new(http.clone(), &config.arxiv_url, keywords)),
        Box::new(match config.nature_mode {
            NatureMode::Html => NatureFetcher::html(http.clone(), &config.nature_url, keywords),
            NatureMode::Rss => NatureFetcher::rss(http.clone(), &config.nature_url, keywords, max),
        }),
        Box::new(ApsPrlFetcher::new(
            http.clone(),
            &config.aps_prl_rss_url,
            keywords,
            &config.aps_prl_section_filter,
            max,
        )),
        Box::new(NatureJournalFetcher::new(
            http.clone(),
            &config.nature_journal_rss_url,
            keywords,
            config.nature_journal_category_allowlist.as_slice(),
            max,
        )),
    ];

    all.into_iter()
        .filter(|f| {
            let enabled = !f.url().trim().is_empty();
            if !enabled {
                tracing::debug!(source = %f.source(), "source disabled, no URL configured");
            }
            enabled
        })
        .collect()
}

/// Log a failed fetch; the source then reports no papers.
pub(crate) fn log_failure(source: Source, url: &str, err: &anyhow::Error) {
    let chain = format!("{err:#}");
    tracing::error!(source = %source, url, error = %chain, "failed to fetch source");
}

/// Authors from Dublin Core or a flat author field, every value split on `and` and commas.
pub(crate) fn fallback_authors(raw: &RawEntry) -> Vec<String> {
    ["dc:creator", "author"]
        .iter()
        .map(|key| raw.get_all(key).flat_map(split_creators).collect::<Vec<_>>())
        .find(|authors| !authors.is_empty())
        .unwrap_or_default()
}

/// Publication date from Dublin Core or PRISM fields, normalised.
pub(crate) fn fallback_published(raw: &RawEntry) -> String {
    ["dc:date", "prism:publicationDate"]
        .iter()
        .filter_map(|key| raw.get(key))
        .map(normalize_date)
        .find(|d| !d.is_empty())
        .unwrap_or_default()
}

fn split_creators(s: &str) -> Vec<String> {
    static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+and\s+|,").unwrap());
    SEPARATOR
        .split(s)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Visible text of an HTML snippet, text nodes joined by single spaces.
pub(crate) fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    join_text(fragment.root_element())
}

/// Text of an element with its text nodes trimmed and joined by single spaces.
pub(crate) fn join_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve `href` against the page it was found on and canonicalise it.
pub(crate) fn absolutise(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let url = match Url::parse(href) {
        Ok(u) => u,
        Err(_) => base?.join(href).ok()?,
    };
    Some(canonicalize_link(url.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_authors_split_on_and_and_commas() {
        let raw = RawEntry::from_pairs(&[("dc:creator", "Dana and Evan, Frank")]);
        assert_eq!(fallback_authors(&raw), ["Dana", "Evan", "Frank"]);

        let raw = RawEntry::from_pairs(&[
            ("dc:creator", "Dana and Evan"),
            ("dc:creator", "Frank, Grace"),
        ]);
        assert_eq!(fallback_authors(&raw), ["Dana", "Evan", "Frank", "Grace"]);

        let raw = RawEntry::from_pairs(&[("dc:creator", " , "), ("author", "Grace Hopper")]);
        assert_eq!(fallback_authors(&raw), ["Grace Hopper"]);

        assert!(fallback_authors(&RawEntry::default()).is_empty());
    }

    #[test]
    fn fallback_published_normalises_the_first_usable_date() {
        let raw = RawEntry::from_pairs(&[("prism:publicationDate", "2024-01-18")]);
        assert_eq!(fallback_published(&raw), "2024-01-18");

        let raw = RawEntry::from_pairs(&[
            ("dc:date", "2024-01-17T09:00:00Z"),
            ("prism:publicationDate", "2024-01-18"),
        ]);
        assert_eq!(fallback_published(&raw), "2024-01-17");
    }

    #[test]
    fn strip_html_keeps_visible_text() {
        assert_eq!(
            strip_html("<p>Spin-orbit torque in <b>MRAM</b> devices.</p>"),
            "Spin-orbit torque in MRAM devices."
        );
        assert_eq!(strip_html("plain text"), "plain text");
    }

    #[test]
    fn absolutise_resolves_relative_links() {
        let base = Url::parse("https://www.nature.com/subjects/physical-sciences/ncomms").ok();
        assert_eq!(
            absolutise(base.as_ref(), "/articles/s41467-024-1?utm_source=x").as_deref(),
            Some("https://www.nature.com/articles/s41467-024-1")
        );
        assert_eq!(
            absolutise(base.as_ref(), "https://arxiv.org/abs/2401.00001").as_deref(),
            Some("https://arxiv.org/abs/2401.00001")
        );
        assert_eq!(absolutise(None, "/abs/1"), None);
        assert_eq!(absolutise(base.as_ref(), "  "), None);
    }
}
