use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{
    fetcher::{Fetcher, absolutise, join_text, log_failure},
    http::HttpClient,
    normalize::{match_keywords, normalize_date},
    paper::{Paper, Source},
};

static DT: Lazy<Selector> = Lazy::new(|| Selector::parse("dl dt").unwrap());
static DD: Lazy<Selector> = Lazy::new(|| Selector::parse("dl dd").unwrap());
static ABS_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href*='/abs/']").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse(".list-title").unwrap());
static ABSTRACT: Lazy<Selector> = Lazy::new(|| Selector::parse(".list-abstract").unwrap());
static MATHJAX_P: Lazy<Selector> = Lazy::new(|| Selector::parse("p.mathjax").unwrap());
static AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse(".list-authors a").unwrap());
static DATE: Lazy<Selector> = Lazy::new(|| Selector::parse(".list-date").unwrap());
static DATELINE: Lazy<Selector> = Lazy::new(|| Selector::parse(".dateline").unwrap());

/// Scrapes an arXiv "new submissions" listing page.
///
/// The listing is a `<dl>` where each `<dt>` carries the abstract link and the following `<dd>`
/// carries title, authors, abstract and date.
pub struct ArxivFetcher {
    http: HttpClient,
    url: String,
    keywords: Vec<String>,
}

impl ArxivFetcher {
    pub fn new(http: HttpClient, url: &str, keywords: &[String]) -> Self {
        Self {
            http,
            url: url.to_string(),
            keywords: keywords.to_vec(),
        }
    }
}

impl Fetcher for ArxivFetcher {
    fn source(&self) -> Source {
        Source::Arxiv
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Vec<Paper> {
        match self.http.get_text(&self.url) {
            Ok(html) => parse_listing(&html, &self.url, &self.keywords),
            Err(e) => {
                log_failure(self.source(), &self.url, &e);
                Vec::new()
            }
        }
    }
}

/// Papers on a listing page that match at least one keyword.
pub fn parse_listing(html: &str, page_url: &str, keywords: &[String]) -> Vec<Paper> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    document
        .select(&DT)
        .zip(document.select(&DD))
        .filter_map(|(dt, dd)| {
            let href = dt.select(&ABS_LINK).next()?.value().attr("href")?;
            let link = absolutise(base.as_ref(), href)?;
            parse_item(dd, &link, keywords)
        })
        .collect()
}

fn parse_item(dd: ElementRef<'_>, link: &str, keywords: &[String]) -> Option<Paper> {
    let title = dd
        .select(&TITLE)
        .next()
        .map(|el| strip_label(&join_text(el), "Title:"))
        .unwrap_or_default();
    if title.is_empty() {
        return None;
    }

    let abstract_ = dd
        .select(&ABSTRACT)
        .next()
        .or_else(|| dd.select(&MATHJAX_P).next())
        .map(|el| strip_label(&join_text(el), "Abstract:"))
        .unwrap_or_default();

    let matched = match_keywords(&format!("{title} {abstract_}"), keywords);
    if matched.is_empty() {
        return None;
    }

    let authors = dd
        .select(&AUTHOR)
        .map(join_text)
        .filter(|a| !a.is_empty())
        .collect();

    let published = dd
        .select(&DATE)
        .next()
        .or_else(|| dd.select(&DATELINE).next())
        .map(|el| normalize_date(&join_text(el)))
        .unwrap_or_default();

    Some(Paper::new(
        title,
        authors,
        link,
        published,
        Source::Arxiv,
        matched,
    ))
}

fn strip_label(text: &str, label: &str) -> String {
    text.replace(label, "").trim().to_string()
}
