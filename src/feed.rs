//! RSS 2.0, Atom and RDF/RSS 1.0 parsing into one entry shape.
//!
//! The parser does not know any particular dialect. Every element below an `<item>`/`<entry>` is
//! recorded in a [`RawEntry`] under its path (`title`, `author/name`, `dc:creator`, ...), and
//! [`FeedEntry`] is derived from that with a fixed list of fallbacks. Sources that need fields the
//! common shape does not carry look them up in [`FeedEntry::raw`].

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};

use crate::http::HttpClient;
use crate::normalize::{canonicalize_link, normalize_date};

/// A feed entry in the shape every source agrees on.
#[derive(Clone, Debug, Default)]
pub struct FeedEntry {
    pub title: String,
    /// Canonical link (see [`canonicalize_link`]).
    pub link: String,
    /// `YYYY-MM-DD` when the date could be parsed, the raw text otherwise, or empty.
    pub published: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub raw: RawEntry,
}

/// Loosely typed view of one entry, for source specific fallbacks.
///
/// Keys are element paths relative to the entry, lowercased (`dc:creator`, `author/name`).
/// Lookups also accept `_` in place of `:` (`dc_creator`).
///
/// Well-known namespaces are keyed by a fixed prefix whatever the document declared: Dublin Core
/// elements and terms as `dc`, PRISM as `prism`, RDF as `rdf`, the content module as `content`.
/// Atom and RSS 1.0 elements have no prefix. Any other namespace keeps the prefix as written.
#[derive(Clone, Debug, Default)]
pub struct RawEntry {
    root_attrs: Vec<(String, String)>,
    fields: Vec<RawField>,
}

#[derive(Clone, Debug)]
pub struct RawField {
    path: String,
    text: String,
    attrs: Vec<(String, String)>,
}

impl RawField {
    /// Text content including that of nested elements, trimmed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        lookup_attr(&self.attrs, name)
    }
}

impl RawEntry {
    /// Every element recorded under `key`, in document order.
    pub fn fields<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a RawField> + use<'a> {
        let key = normalize_key(key);
        self.fields.iter().filter(move |f| f.path == key)
    }

    /// First non-empty text recorded under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).next()
    }

    /// All non-empty texts recorded under `key`.
    pub fn get_all<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.fields(key).map(RawField::text).filter(|t| !t.is_empty())
    }

    /// First non-empty text among `keys`, tried in order.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Attribute of the `<item>`/`<entry>` element itself (e.g. `rdf:about`).
    pub fn root_attr(&self, name: &str) -> Option<&str> {
        lookup_attr(&self.root_attrs, name)
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        RawEntry {
            root_attrs: Vec::new(),
            fields: pairs
                .iter()
                .map(|(k, v)| RawField {
                    path: normalize_key(k),
                    text: v.to_string(),
                    attrs: Vec::new(),
                })
                .collect(),
        }
    }
}

fn normalize_key(key: &str) -> String {
    key.to_lowercase().replace('_', ":")
}

fn lookup_attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    let name = normalize_key(name);
    attrs
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.as_str())
}

/// Fetch a feed and parse up to `max` valid entries.
pub fn fetch_entries(http: &HttpClient, url: &str, max: usize) -> anyhow::Result<Vec<FeedEntry>> {
    let body = http.get_text(url)?;
    Ok(parse_entries(&body, max))
}

/// Parse up to `max` valid entries from a feed document, in document order.
///
/// Entries without a title or a link are skipped and do not count towards `max`. Parsing stops
/// at the first XML error with a warning; whatever was read until then is returned.
pub fn parse_entries(xml: &str, max: usize) -> Vec<FeedEntry> {
    let mut entries = Vec::new();
    if max == 0 {
        return entries;
    }

    let mut reader = NsReader::from_str(xml);
    let config = reader.config_mut();
    config.check_end_names = false;
    // Bare `&` in unescaped links stays literal text.
    config.allow_dangling_amp = true;

    let mut current: Option<RawEntry> = None;
    // Names of the open elements inside the current entry, and the field each one writes to.
    let mut path: Vec<String> = Vec::new();
    let mut open: Vec<usize> = Vec::new();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => match current.as_mut() {
                None if is_entry(&e) => {
                    current = Some(RawEntry {
                        root_attrs: attrs_of(&reader, &e),
                        fields: Vec::new(),
                    });
                }
                None => {}
                Some(raw) => {
                    let name = name_of(&reader, &e);
                    raw.fields.push(RawField {
                        path: join_path(&path, &name),
                        text: String::new(),
                        attrs: attrs_of(&reader, &e),
                    });
                    open.push(raw.fields.len() - 1);
                    path.push(name);
                }
            },
            Ok(Event::Empty(e)) => {
                if let Some(raw) = current.as_mut() {
                    raw.fields.push(RawField {
                        path: join_path(&path, &name_of(&reader, &e)),
                        text: String::new(),
                        attrs: attrs_of(&reader, &e),
                    });
                }
            }
            Ok(Event::End(_)) if current.is_some() => {
                if path.pop().is_some() {
                    open.pop();
                } else if let Some(raw) = current.take()
                    && let Some(entry) = to_entry(raw)
                {
                    entries.push(entry);
                    if entries.len() >= max {
                        break;
                    }
                }
            }
            Ok(Event::Text(t)) => {
                push_text(&mut current, &open, &String::from_utf8_lossy(t.as_ref()));
            }
            Ok(Event::CData(t)) => {
                push_text(&mut current, &open, &String::from_utf8_lossy(t.as_ref()));
            }
            Ok(Event::GeneralRef(r)) => {
                let resolved = match r.resolve_char_ref() {
                    Ok(Some(ch)) => ch.to_string(),
                    _ => {
                        let name = String::from_utf8_lossy(r.as_ref()).to_string();
                        quick_xml::escape::resolve_predefined_entity(&name)
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("&{name};"))
                    }
                };
                push_text(&mut current, &open, &resolved);
            }
            Err(e) => {
                tracing::warn!(
                    position = reader.buffer_position(),
                    error = %e,
                    "feed is not well-formed, keeping entries parsed so far"
                );
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    entries
}

fn push_text(current: &mut Option<RawEntry>, open: &[usize], text: &str) {
    if let Some(raw) = current.as_mut() {
        for &i in open {
            raw.fields[i].text.push_str(text);
        }
    }
}

fn is_entry(e: &BytesStart<'_>) -> bool {
    let local = e.local_name();
    let local = local.as_ref();
    local.eq_ignore_ascii_case(b"item") || local.eq_ignore_ascii_case(b"entry")
}

fn name_of<R>(reader: &NsReader<R>, e: &BytesStart<'_>) -> String {
    let (ns, local) = reader.resolve_element(e.name());
    resolved_key(ns, local.as_ref(), e.name().as_ref())
}

/// Fixed key prefix for a namespace URI; `Some("")` keys by local name alone.
fn known_prefix(uri: &[u8]) -> Option<&'static str> {
    match uri {
        b"http://www.w3.org/2005/Atom" | b"http://purl.org/rss/1.0/" => Some(""),
        b"http://purl.org/dc/elements/1.1/" | b"http://purl.org/dc/terms/" => Some("dc"),
        b"http://www.w3.org/1999/02/22-rdf-syntax-ns#" => Some("rdf"),
        b"http://purl.org/rss/1.0/modules/content/" => Some("content"),
        _ if uri.starts_with(b"http://prismstandard.org/namespaces/") => Some("prism"),
        _ => None,
    }
}

fn resolved_key(ns: ResolveResult<'_>, local: &[u8], written: &[u8]) -> String {
    let prefix = match ns {
        ResolveResult::Bound(Namespace(uri)) => known_prefix(uri),
        _ => None,
    };
    match prefix {
        Some("") => normalize_key(&String::from_utf8_lossy(local)),
        Some(p) => format!("{p}:{}", normalize_key(&String::from_utf8_lossy(local))),
        None => normalize_key(&String::from_utf8_lossy(written)),
    }
}

fn join_path(parents: &[String], name: &str) -> String {
    if parents.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parents.join("/"), name)
    }
}

fn attrs_of<R>(reader: &NsReader<R>, e: &BytesStart<'_>) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .map(|a| {
            let (ns, local) = reader.resolve_attribute(a.key);
            let key = resolved_key(ns, local.as_ref(), a.key.as_ref());
            let value = String::from_utf8_lossy(a.value.as_ref());
            let value = quick_xml::escape::unescape(&value)
                .map(|v| v.to_string())
                .unwrap_or_else(|_| value.to_string());
            (key, value)
        })
        .collect()
}

fn to_entry(raw: RawEntry) -> Option<FeedEntry> {
    let title = normalize_ws(raw.get("title").unwrap_or_default());
    let link = canonicalize_link(&entry_link(&raw).unwrap_or_default());
    if title.is_empty() || link.is_empty() {
        return None;
    }

    let published = raw
        .first_of(&["published", "updated", "pubDate", "dc:date"])
        .map(normalize_date)
        .unwrap_or_default();

    let summary = raw
        .first_of(&["summary", "description", "content:encoded", "content"])
        .unwrap_or_default()
        .to_string();

    let mut authors: Vec<String> = raw.get_all("author/name").map(str::to_string).collect();
    if authors.is_empty() {
        authors = raw.get_all("dc:creator").map(str::to_string).collect();
    }
    if authors.is_empty()
        && let Some(flat) = raw.get("author")
    {
        authors.push(flat.to_string());
    }

    let mut categories: Vec<String> = raw
        .fields("category")
        .filter_map(|f| {
            let value = f.attr("term").map(str::trim).unwrap_or_else(|| f.text());
            (!value.is_empty()).then(|| value.to_string())
        })
        .collect();
    if categories.is_empty() {
        categories = raw.get_all("dc:subject").map(str::to_string).collect();
    }

    Some(FeedEntry {
        title,
        link,
        published,
        summary,
        authors,
        categories,
        raw,
    })
}

/// `<link>text</link>`, then an Atom `<link href>`, then `rdf:about`, then a permalink `<guid>`.
fn entry_link(raw: &RawEntry) -> Option<String> {
    if let Some(text) = raw.get("link") {
        return Some(text.to_string());
    }

    let atom = raw
        .fields("link")
        .filter(|f| matches!(f.attr("rel"), None | Some("alternate")))
        .chain(raw.fields("link"))
        .find_map(|f| f.attr("href").map(str::trim).filter(|h| !h.is_empty()));
    if let Some(href) = atom {
        return Some(href.to_string());
    }

    if let Some(about) = raw.root_attr("rdf:about").map(str::trim)
        && !about.is_empty()
    {
        return Some(about.to_string());
    }

    raw.fields("guid")
        .filter(|f| f.attr("isPermaLink").is_none_or(|p| !p.eq_ignore_ascii_case("false")))
        .map(RawField::text)
        .find(|g| g.starts_with("http://") || g.starts_with("https://"))
        .map(str::to_string)
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
