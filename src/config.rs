use std::{convert::Infallible, fmt, path::PathBuf, str::FromStr};

use clap::{Args, ValueEnum};

/// Runtime configuration, read from flags or the environment (after `.env` is loaded).
///
/// Built once in `main` and passed down by reference. Components only ever receive the fields
/// they need. A source whose URL is set to the empty string is disabled.
#[derive(Args, Debug, Clone)]
pub struct Config {
    #[arg(long, env = "SMTP_HOST", default_value = "")]
    pub smtp_host: String,

    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    #[arg(long, env = "SMTP_USER", default_value = "")]
    pub smtp_user: String,

    #[arg(long, env = "SMTP_PASSWORD", default_value = "", hide_env_values = true, hide_default_value = true)]
    pub smtp_password: Secret,

    #[arg(long, env = "EMAIL_FROM", default_value = "")]
    pub email_from: String,

    #[arg(long, env = "EMAIL_TO", default_value = "")]
    pub email_to: String,

    #[arg(long, env = "ARXIV_URL", default_value = "https://arxiv.org/list/cond-mat/new")]
    pub arxiv_url: String,

    #[arg(
        long,
        env = "NATURE_URL",
        default_value = "https://www.nature.com/subjects/physical-sciences/ncomms"
    )]
    pub nature_url: String,

    /// Whether NATURE_URL points at an HTML listing or an RSS feed
    #[arg(long, env = "NATURE_MODE", value_enum, default_value_t = NatureMode::Html)]
    pub nature_mode: NatureMode,

    #[arg(long, env = "APS_PRL_RSS_URL", default_value = "https://feeds.aps.org/rss/recent/prl.xml")]
    pub aps_prl_rss_url: String,

    /// Only keep PRL entries whose section or subject contains this text (empty keeps all)
    #[arg(long, env = "APS_PRL_SECTION_FILTER", default_value = "Condensed Matter and Materials")]
    pub aps_prl_section_filter: String,

    #[arg(long, env = "NATURE_JOURNAL_RSS_URL", default_value = "https://www.nature.com/nature.rss")]
    pub nature_journal_rss_url: String,

    /// Comma-separated categories to keep from the Nature journal feed (empty keeps all)
    #[arg(long, env = "NATURE_JOURNAL_CATEGORY_ALLOWLIST", default_value = "")]
    pub nature_journal_category_allowlist: CommaList,

    /// Maximum number of valid entries read from each feed
    #[arg(long, env = "RSS_MAX_ENTRIES", default_value_t = 200)]
    pub rss_max_entries: usize,

    #[arg(long, env = "USER_AGENT", default_value = "Mozilla/5.0 (compatible; PaperDigest/1.0)")]
    pub user_agent: String,

    /// Comma-separated keywords; an article must mention at least one
    #[arg(long, env = "KEYWORDS", default_value = "")]
    pub keywords: CommaList,

    /// JSON file holding the links that were already sent
    #[arg(long, env = "STATE_FILE", default_value = "state/seen_papers.json")]
    pub state_file: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NatureMode {
    /// Scrape the article cards of a subject listing page
    Html,
    /// Read an RSS/Atom feed
    Rss,
}

impl fmt::Display for NatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NatureMode::Html => "html",
            NatureMode::Rss => "rss",
        })
    }
}

/// A comma-separated list, trimmed and lowercased, with empty items dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommaList(pub Vec<String>);

impl FromStr for CommaList {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CommaList(
            s.split(',')
                .map(|item| item.trim().to_lowercase())
                .filter(|item| !item.is_empty())
                .collect(),
        ))
    }
}

impl CommaList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A string that never shows up in `Debug` output.
#[derive(Clone, Default)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl FromStr for Secret {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Secret(s.to_string()))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"<redacted>\"")
    }
}
