use std::collections::HashSet;

use crate::{
    feed::{self, FeedEntry},
    fetcher::{Fetcher, fallback_authors, log_failure},
    http::HttpClient,
    normalize::match_keywords,
    paper::{Paper, Source},
};

/// The Nature journal RSS feed, optionally restricted to some categories.
pub struct NatureJournalFetcher {
    http: HttpClient,
    url: String,
    keywords: Vec<String>,
    allowlist: HashSet<String>,
    max_entries: usize,
}

impl NatureJournalFetcher {
    pub fn new(
        http: HttpClient,
        url: &str,
        keywords: &[String],
        category_allowlist: &[String],
        max_entries: usize,
    ) -> Self {
        Self {
            http,
            url: url.to_string(),
            keywords: keywords.to_vec(),
            allowlist: normalize_categories(category_allowlist.iter()),
            max_entries,
        }
    }
}

impl Fetcher for NatureJournalFetcher {
    fn source(&self) -> Source {
        Source::NatureJournal
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Vec<Paper> {
        match feed::fetch_entries(&self.http, &self.url, self.max_entries) {
            Ok(entries) => select_entries(entries, &self.allowlist, &self.keywords),
            Err(e) => {
                log_failure(self.source(), &self.url, &e);
                Vec::new()
            }
        }
    }
}

fn normalize_categories<'a>(categories: impl Iterator<Item = &'a String>) -> HashSet<String> {
    categories
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Entries in an allowed category that mention a keyword. An empty allowlist allows everything.
pub fn select_entries(
    entries: Vec<FeedEntry>,
    allowlist: &HashSet<String>,
    keywords: &[String],
) -> Vec<Paper> {
    entries
        .into_iter()
        .filter(|entry| {
            allowlist.is_empty()
                || normalize_categories(entry.categories.iter())
                    .iter()
                    .any(|c| allowlist.contains(c))
        })
        .filter_map(|entry| {
            let matched = match_keywords(&format!("{} {}", entry.title, entry.summary), keywords);
            if matched.is_empty() {
                return None;
            }

            let authors = if entry.authors.is_empty() {
                fallback_authors(&entry.raw)
            } else {
                entry.authors
            };

            Some(Paper::new(
                entry.title,
                authors,
                &entry.link,
                entry.published,
                Source::NatureJournal,
                matched,
            ))
        })
        .collect()
}
