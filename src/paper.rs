use std::{
    fmt,
    hash::{Hash, Hasher},
};

use serde::Serialize;

/// Where an article was discovered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Arxiv,
    Nature,
    ApsPrl,
    NatureJournal,
}

impl Source {
    /// Every source, in the order they are fetched and reported.
    pub const ALL: [Source; 4] = [
        Source::Arxiv,
        Source::Nature,
        Source::ApsPrl,
        Source::NatureJournal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Arxiv => "arxiv",
            Source::Nature => "nature",
            Source::ApsPrl => "aps-prl",
            Source::NatureJournal => "nature-journal",
        }
    }

    /// Human readable name used in digests and summaries.
    pub fn label(self) -> &'static str {
        match self {
            Source::Arxiv => "arXiv (cond-mat/new)",
            Source::Nature => "Nature Communications",
            Source::ApsPrl => "Physical Review Letters",
            Source::NatureJournal => "Nature (journal)",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One discovered article.
///
/// Identity is the link alone: two papers with the same link are equal and hash the same no
/// matter what the other fields say, so a `HashSet<Paper>` is keyed by link.
#[derive(Clone, Debug, Serialize)]
pub struct Paper {
    title: String,
    authors: Vec<String>,
    link: String,
    published_date: String,
    source: Source,
    keywords_matched: Vec<String>,
}

impl Paper {
    pub fn new(
        title: impl Into<String>,
        authors: Vec<String>,
        link: &str,
        published_date: impl Into<String>,
        source: Source,
        keywords_matched: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            authors,
            link: link.trim().to_string(),
            published_date: published_date.into(),
            source,
            keywords_matched,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn published_date(&self) -> &str {
        &self.published_date
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn keywords_matched(&self) -> &[String] {
        &self.keywords_matched
    }
}

impl PartialEq for Paper {
    fn eq(&self, other: &Self) -> bool {
        self.link == other.link
    }
}

impl Eq for Paper {}

impl Hash for Paper {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.link.hash(state);
    }
}
