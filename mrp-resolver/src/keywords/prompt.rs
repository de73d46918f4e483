//! Prompt construction and response cleanup for keyword generation

use std::sync::atomic::{AtomicUsize, Ordering};

/// Scene themes cycled through on first-time generation
pub const THEMES: &[&str] = &[
    "everyday life",
    "holiday",
    "work",
    "romantic",
    "outdoor",
    "family",
    "sports",
    "food and drink",
    "travel",
    "night time",
];

/// Round-robin over [`THEMES`]
#[derive(Debug, Default)]
pub struct ThemeRotation {
    next: AtomicUsize,
}

impl ThemeRotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_theme(&self) -> &'static str {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        THEMES[index % THEMES.len()]
    }
}

/// Build the provider prompt
pub fn build_prompt(
    description: &str,
    word: Option<&str>,
    avoid: Option<&str>,
    theme: &str,
) -> String {
    let subject = word
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .unwrap_or(description.trim());

    let mut prompt = format!(
        "Write a short stock-media search query (2 to 5 words) for a picture that illustrates \
         the word \"{subject}\".\n\
         Context: {description}\n\
         Set the scene in a {theme} situation.\n",
        subject = subject,
        description = description.trim(),
        theme = theme,
    );

    if let Some(avoid) = avoid.map(str::trim).filter(|a| !a.is_empty()) {
        prompt.push_str(&format!(
            "Do not repeat the previous query \"{}\" or its scene; choose a different theme \
             than before.\n",
            avoid
        ));
    }

    prompt.push_str("Reply with the query only, no quotes and no explanation.");
    prompt
}

const QUOTE_CHARS: &[char] = &['"', '\'', '`', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Cleaned provider output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedKeywords {
    pub phrase: String,
    pub keywords: Vec<String>,
}

impl CleanedKeywords {
    /// Tokens rejoined with single spaces
    pub fn search_query(&self) -> String {
        self.keywords.join(" ")
    }
}

/// Strip quotes and split into whitespace/comma-delimited tokens
///
/// Uses the first non-blank line of the response. Returns `None` when no
/// token survives.
pub fn clean_response(raw: &str) -> Option<CleanedKeywords> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let phrase: String = line.chars().filter(|c| !QUOTE_CHARS.contains(c)).collect();
    let phrase = phrase.trim().trim_end_matches('.').trim().to_string();

    let keywords: Vec<String> = phrase
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if keywords.is_empty() {
        return None;
    }

    Some(CleanedKeywords { phrase, keywords })
}
