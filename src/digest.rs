use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::paper::{Paper, Source};

const HEADING: &str = "Daily Paper Digest";

/// One composed digest message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub plain: String,
    pub html: String,
}

impl Digest {
    /// Compose the digest for `papers`; `None` when there is nothing to report.
    pub fn compose(papers: &[Paper]) -> Option<Digest> {
        if papers.is_empty() {
            return None;
        }
        let keywords = matched_keywords(papers);
        Some(Digest {
            subject: format!("Paper Digest ({}): {}", papers.len(), keywords.join(", ")),
            plain: plain_body(papers, &keywords),
            html: html_body(papers, &keywords),
        })
    }
}

/// Union of the keywords matched by `papers`, in first-seen order.
pub fn matched_keywords(papers: &[Paper]) -> Vec<String> {
    let mut ordered: Vec<String> = Vec::new();
    for keyword in papers.iter().flat_map(|p| p.keywords_matched()) {
        if !ordered.contains(keyword) {
            ordered.push(keyword.clone());
        }
    }
    ordered
}

/// Number of papers per source, zero included, in [`Source::ALL`] order.
pub fn source_counts(papers: &[Paper]) -> [(Source, usize); 4] {
    Source::ALL.map(|s| (s, papers.iter().filter(|p| p.source() == s).count()))
}

fn sources_checked() -> String {
    Source::ALL.map(Source::label).join(", ")
}

fn authors_of(paper: &Paper) -> String {
    if paper.authors().is_empty() {
        "N/A".to_string()
    } else {
        paper.authors().join(", ")
    }
}

fn plain_body(papers: &[Paper], keywords: &[String]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{HEADING}\n");
    let _ = writeln!(out, "Sources checked: {}", sources_checked());
    let _ = writeln!(out, "Related papers found: {}\n", papers.len());
    for (source, count) in source_counts(papers) {
        let _ = writeln!(out, "{}: {count}", source.label());
    }
    out.push('\n');

    for paper in papers {
        let _ = writeln!(out, "Title: {}", paper.title());
        let _ = writeln!(out, "Authors: {}", authors_of(paper));
        let _ = writeln!(out, "Link: {}", paper.link());
        let _ = writeln!(out, "Date: {}", paper.published_date());
        let _ = writeln!(out, "Keywords: {}\n", paper.keywords_matched().join(", "));
    }

    let _ = write!(out, "Matched keywords: {}", keywords.join(", "));
    out
}

fn html_body(papers: &[Paper], keywords: &[String]) -> String {
    let mut out = String::from("<html><body>");
    let _ = write!(out, "<h2>{HEADING}</h2>");
    let _ = write!(
        out,
        "<p><strong>Sources checked:</strong> {}</p>",
        encode_text(&sources_checked())
    );
    let _ = write!(
        out,
        "<p><strong>Related papers found:</strong> {}</p>",
        papers.len()
    );

    out.push_str("<ul>");
    for (source, count) in source_counts(papers) {
        let _ = write!(out, "<li>{}: {count}</li>", encode_text(source.label()));
    }
    out.push_str("</ul>");

    let _ = write!(
        out,
        "<p>Matched keywords: {}</p>",
        encode_text(&keywords.join(", "))
    );

    out.push_str("<ul>");
    for paper in papers {
        let _ = write!(
            out,
            "<li><strong>{title}</strong><br/>\
             Authors: {authors}<br/>\
             Link: <a href=\"{href}\">{link}</a><br/>\
             Date: {date}<br/>\
             Keywords: {keywords}</li>",
            title = encode_text(paper.title()),
            authors = encode_text(&authors_of(paper)),
            href = encode_double_quoted_attribute(paper.link()),
            link = encode_text(paper.link()),
            date = encode_text(paper.published_date()),
            keywords = encode_text(&paper.keywords_matched().join(", ")),
        );
    }
    out.push_str("</ul></body></html>");
    out
}
