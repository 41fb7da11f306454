use crate::{
    feed::{self, FeedEntry},
    fetcher::{Fetcher, fallback_authors, fallback_published, log_failure},
    http::HttpClient,
    normalize::match_keywords,
    paper::{Paper, Source},
};

/// Physical Review Letters recent-articles feed (RDF with Dublin Core and PRISM fields).
pub struct ApsPrlFetcher {
    http: HttpClient,
    url: String,
    keywords: Vec<String>,
    section_filter: String,
    max_entries: usize,
}

impl ApsPrlFetcher {
    pub fn new(
        http: HttpClient,
        url: &str,
        keywords: &[String],
        section_filter: &str,
        max_entries: usize,
    ) -> Self {
        Self {
            http,
            url: url.to_string(),
            keywords: keywords.to_vec(),
            section_filter: section_filter.trim().to_lowercase(),
            max_entries,
        }
    }
}

impl Fetcher for ApsPrlFetcher {
    fn source(&self) -> Source {
        Source::ApsPrl
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Vec<Paper> {
        match feed::fetch_entries(&self.http, &self.url, self.max_entries) {
            Ok(entries) => select_entries(entries, &self.section_filter, &self.keywords),
            Err(e) => {
                log_failure(self.source(), &self.url, &e);
                Vec::new()
            }
        }
    }
}

/// Entries in the wanted section that mention a keyword.
///
/// `section_filter` is expected lowercased; an empty filter keeps every section.
pub fn select_entries(
    entries: Vec<FeedEntry>,
    section_filter: &str,
    keywords: &[String],
) -> Vec<Paper> {
    entries
        .into_iter()
        .filter(|entry| in_section(entry, section_filter))
        .filter_map(|entry| {
            let matched = match_keywords(&format!("{} {}", entry.title, entry.summary), keywords);
            if matched.is_empty() {
                return None;
            }

            let published = if entry.published.is_empty() {
                fallback_published(&entry.raw)
            } else {
                entry.published
            };
            let authors = if entry.authors.is_empty() {
                fallback_authors(&entry.raw)
            } else {
                entry.authors
            };

            Some(Paper::new(
                entry.title,
                authors,
                &entry.link,
                published,
                Source::ApsPrl,
                matched,
            ))
        })
        .collect()
}

fn in_section(entry: &FeedEntry, section_filter: &str) -> bool {
    if section_filter.is_empty() {
        return true;
    }
    let raw = ["dc:subject", "prism:section"]
        .into_iter()
        .flat_map(|key| entry.raw.get_all(key));

    entry
        .categories
        .iter()
        .map(String::as_str)
        .chain(raw)
        .any(|hay| hay.to_lowercase().contains(section_filter))
}
