//! Phrase derivation
//!
//! Decides the effective search phrase for an entry:
//! 1. AI-assisted: reuse the stored keyword string if non-empty, otherwise ask
//!    the keyword optimizer; on failure use the subject word, then `"nature"`.
//!    The global per-media-kind prefix is applied to every AI-assisted phrase.
//! 2. Manual: `"<word> isolated background"` when the isolated-background flag
//!    is set, else the keyword string, else the subject word. No prefix.
//! 3. An empty result becomes `"nature"`.
//!
//! Everything here is pure; the optimizer round trip is driven by the resolver
//! between [`plan`] and [`finish_optimized`].

use crate::types::{KeywordMode, MediaEntry};

/// Phrase used when nothing else yields text
pub const FALLBACK_PHRASE: &str = "nature";

const ISOLATED_BACKGROUND: &str = "isolated background";
const ISOLATED_REWRITE: &str = "white background";

/// First stage of derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhrasePlan {
    /// Phrase is final
    Ready(String),
    /// Optimizer output is needed; finish with [`finish_optimized`]
    Optimize {
        description: String,
        word: String,
        prefix: String,
    },
}

/// Derive the phrase, or the optimizer request needed to derive it
pub fn plan(entry: &MediaEntry, prefix: &str) -> PhrasePlan {
    let word = entry.word.trim();
    let keywords = entry.keywords.trim();

    match entry.mode {
        KeywordMode::Ai => {
            if !keywords.is_empty() {
                return PhrasePlan::Ready(safety_net(&with_prefix(prefix, keywords)));
            }

            let description = entry.description.trim();
            if description.is_empty() && word.is_empty() {
                return PhrasePlan::Ready(safety_net(&with_prefix(prefix, FALLBACK_PHRASE)));
            }

            PhrasePlan::Optimize {
                description: if description.is_empty() {
                    word.to_string()
                } else {
                    description.to_string()
                },
                word: word.to_string(),
                prefix: prefix.trim().to_string(),
            }
        }
        KeywordMode::Manual => {
            let phrase = if entry.isolated_background {
                format!("{} {}", word, ISOLATED_BACKGROUND)
            } else if !keywords.is_empty() {
                keywords.to_string()
            } else {
                word.to_string()
            };
            PhrasePlan::Ready(safety_net(&phrase))
        }
    }
}

/// Complete an AI-assisted derivation with the optimizer's answer
pub fn finish_optimized(optimized: Option<&str>, word: &str, prefix: &str) -> String {
    let base = optimized
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| Some(word.trim()).filter(|w| !w.is_empty()))
        .unwrap_or(FALLBACK_PHRASE);
    safety_net(&with_prefix(prefix, base))
}

/// Prepend the global prefix when it is non-empty
pub fn with_prefix(prefix: &str, phrase: &str) -> String {
    let prefix = prefix.trim();
    let phrase = phrase.trim();
    match (prefix.is_empty(), phrase.is_empty()) {
        (true, _) => phrase.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{} {}", prefix, phrase),
    }
}

/// Substitute the fallback phrase for blank text
pub fn safety_net(phrase: &str) -> String {
    let trimmed = phrase.trim();
    if trimmed.is_empty() {
        FALLBACK_PHRASE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Rewrite a bare `isolated` token to `white background` before dispatch
///
/// Phrases that already read `isolated background` are left alone.
pub fn normalize_for_dispatch(phrase: &str) -> String {
    if phrase.to_lowercase().contains(ISOLATED_BACKGROUND) {
        return phrase.trim().to_string();
    }

    phrase
        .split_whitespace()
        .map(|token| {
            if token.eq_ignore_ascii_case("isolated") {
                ISOLATED_REWRITE
            } else {
                token
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
