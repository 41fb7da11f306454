use std::collections::HashSet;

/// Configured keywords found in `text`, compared case-insensitively.
///
/// The result follows the order of `keywords`, keeps each keyword's configured spelling and lists
/// a keyword at most once even if it is configured several times with different casing. An empty
/// result means the text is not relevant.
pub fn match_keywords(text: &str, keywords: &[String]) -> Vec<String> {
    let content = text.to_lowercase();
    let mut seen: HashSet<String> = HashSet::new();
    let mut matched = Vec::new();

    for keyword in keywords {
        let lower = keyword.to_lowercase();
        if seen.contains(&lower) {
            continue;
        }
        if content.contains(&lower) {
            matched.push(keyword.clone());
            seen.insert(lower);
        }
    }

    matched
}
