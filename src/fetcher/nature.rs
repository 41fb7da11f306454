use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{
    config::NatureMode,
    feed::{self, FeedEntry},
    fetcher::{Fetcher, absolutise, join_text, log_failure, strip_html},
    http::HttpClient,
    normalize::{match_keywords, normalize_date},
    paper::{Paper, Source},
};

static CARD: Lazy<Selector> = Lazy::new(|| Selector::parse("article.c-article-item").unwrap());
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("h3 a").unwrap());
static DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p.c-article-item__description").unwrap());
static AUTHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ul.c-article-item__authors li").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());

/// Nature Communications, read either from a subject listing page or from an RSS feed.
///
/// The mode is fixed at construction; the URL is never inspected to guess it.
pub struct NatureFetcher {
    http: HttpClient,
    url: String,
    keywords: Vec<String>,
    mode: NatureMode,
    max_entries: usize,
}

impl NatureFetcher {
    pub fn html(http: HttpClient, url: &str, keywords: &[String]) -> Self {
        Self {
            http,
            url: url.to_string(),
            keywords: keywords.to_vec(),
            mode: NatureMode::Html,
            max_entries: 0,
        }
    }

    pub fn rss(http: HttpClient, url: &str, keywords: &[String], max_entries: usize) -> Self {
        Self {
            http,
            url: url.to_string(),
            keywords: keywords.to_vec(),
            mode: NatureMode::Rss,
            max_entries,
        }
    }
}

impl Fetcher for NatureFetcher {
    fn source(&self) -> Source {
        Source::Nature
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Vec<Paper> {
        let result = match self.mode {
            NatureMode::Html => self
                .http
                .get_text(&self.url)
                .map(|html| parse_listing(&html, &self.url, &self.keywords)),
            NatureMode::Rss => feed::fetch_entries(&self.http, &self.url, self.max_entries)
                .map(|entries| select_entries(entries, &self.keywords)),
        };
        result.unwrap_or_else(|e| {
            log_failure(self.source(), &self.url, &e);
            Vec::new()
        })
    }
}

/// Article cards on a listing page that match at least one keyword.
pub fn parse_listing(html: &str, page_url: &str, keywords: &[String]) -> Vec<Paper> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    document
        .select(&CARD)
        .filter_map(|card| parse_card(card, base.as_ref(), keywords))
        .collect()
}

fn parse_card(card: ElementRef<'_>, base: Option<&Url>, keywords: &[String]) -> Option<Paper> {
    let anchor = card.select(&TITLE_LINK).next()?;
    let link = absolutise(base, anchor.value().attr("href")?)?;
    let title = join_text(anchor);
    if title.is_empty() {
        return None;
    }

    let summary = card
        .select(&DESCRIPTION)
        .next()
        .map(join_text)
        .unwrap_or_default();

    let matched = match_keywords(&format!("{title} {summary}"), keywords);
    if matched.is_empty() {
        return None;
    }

    let authors = card
        .select(&AUTHOR)
        .map(join_text)
        .filter(|a| !a.is_empty())
        .collect();

    // Prefer the machine readable attribute over the display text.
    let published = card
        .select(&TIME)
        .next()
        .map(|t| {
            let text = t
                .value()
                .attr("datetime")
                .map(str::to_string)
                .unwrap_or_else(|| join_text(t));
            normalize_date(text.trim())
        })
        .unwrap_or_default();

    Some(Paper::new(
        title,
        authors,
        &link,
        published,
        Source::Nature,
        matched,
    ))
}

/// Feed entries whose title or plain-text summary mention a keyword.
pub fn select_entries(entries: Vec<FeedEntry>, keywords: &[String]) -> Vec<Paper> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let summary = strip_html(&entry.summary);
            let matched = match_keywords(&format!("{} {}", entry.title, summary), keywords);
            if matched.is_empty() {
                return None;
            }
            Some(Paper::new(
                entry.title,
                entry.authors,
                &entry.link,
                entry.published,
                Source::Nature,
                matched,
            ))
        })
        .collect()
}
