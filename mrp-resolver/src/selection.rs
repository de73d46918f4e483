//! Candidate selection helpers
//!
//! Single-candidate selection is a priority sort over unused URLs first. Placeholders are the
//! last resort when no source produced anything: a templated URL keyed by
//! phrase and seed, never empty.

use crate::sources::SourceHit;
use crate::types::{Candidate, PLACEHOLDER_SOURCE_ID};
use rand::Rng;
use std::collections::HashSet;

/// Pick the hit from the best-ranked source, preferring unused URLs
///
/// Ties on rank are broken by source id so the choice does not depend on
/// which source answered first. A hit whose URL is in `used` is chosen only
/// when every hit is a repeat.
pub fn select_by_priority(hits: Vec<SourceHit>, used: &HashSet<String>) -> Option<Candidate> {
    rank_hits(hits, used).into_iter().next().map(|h| h.candidate)
}

/// Order hits unused-first, then by rank, dropping later hits that repeat a URL
pub fn rank_hits(mut hits: Vec<SourceHit>, used: &HashSet<String>) -> Vec<SourceHit> {
    hits.sort_by(|a, b| {
        used.contains(&a.candidate.url)
            .cmp(&used.contains(&b.candidate.url))
            .then_with(|| a.priority.cmp(&b.priority))
            .then_with(|| a.source_id.cmp(b.source_id))
    });
    let mut seen = HashSet::new();
    hits.retain(|h| seen.insert(h.candidate.url.clone()));
    hits
}

/// Render the placeholder template for `phrase` and `seed`
pub fn placeholder(template: &str, phrase: &str, seed: u32) -> Candidate {
    let url = template
        .replace("{phrase}", &urlencoding::encode(phrase))
        .replace("{seed}", &seed.to_string());
    Candidate::new(url, PLACEHOLDER_SOURCE_ID)
}

/// `count` placeholders with distinct consecutive seeds from a random base
pub fn placeholders(template: &str, phrase: &str, count: usize) -> Vec<Candidate> {
    let base: u32 = rand::thread_rng().gen_range(0..1_000_000);
    (0..count)
        .map(|i| placeholder(template, phrase, base.wrapping_add(i as u32)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "https://gen.example/prompt/{phrase}?seed={seed}";

    fn hit(source_id: &'static str, priority: u32, url: &str) -> SourceHit {
        SourceHit {
            source_id,
            priority,
            candidate: Candidate::new(url, source_id),
            page: 1,
        }
    }

    fn none() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_priority_wins_regardless_of_arrival_order() {
        let forward = vec![hit("pixabay", 3, "p"), hit("pexels", 1, "x")];
        let backward = vec![hit("pexels", 1, "x"), hit("pixabay", 3, "p")];

        assert_eq!(select_by_priority(forward, &none()).unwrap().url, "x");
        assert_eq!(select_by_priority(backward, &none()).unwrap().url, "x");
    }

    #[test]
    fn test_equal_rank_breaks_tie_by_id() {
        let hits = vec![hit("zeta", 1, "z"), hit("alpha", 1, "a")];
        assert_eq!(select_by_priority(hits, &none()).unwrap().source_id, "alpha");
    }

    #[test]
    fn test_no_hits_selects_nothing() {
        assert!(select_by_priority(Vec::new(), &none()).is_none());
    }

    #[test]
    fn test_unused_hit_beats_higher_ranked_repeat() {
        let used: HashSet<String> = ["p1".to_string()].into_iter().collect();
        let hits = vec![hit("pexels", 1, "p1"), hit("pixabay", 3, "x1")];
        assert_eq!(select_by_priority(hits, &used).unwrap().url, "x1");
    }

    #[test]
    fn test_repeat_chosen_when_nothing_else() {
        let used: HashSet<String> = ["p1".to_string(), "x1".to_string()].into_iter().collect();
        let hits = vec![hit("pixabay", 3, "x1"), hit("pexels", 1, "p1")];
        assert_eq!(select_by_priority(hits, &used).unwrap().url, "p1");
    }

    #[test]
    fn test_rank_hits_orders_repeats_last() {
        let used: HashSet<String> = ["a1".to_string()].into_iter().collect();
        let ranked = rank_hits(vec![hit("a", 1, "a1"), hit("c", 3, "c1"), hit("b", 2, "b1")], &used);
        let urls: Vec<_> = ranked.iter().map(|h| h.candidate.url.as_str()).collect();
        assert_eq!(urls, vec!["b1", "c1", "a1"]);
    }

    #[test]
    fn test_rank_hits_drops_duplicate_urls() {
        let ranked = rank_hits(
            vec![hit("b", 2, "same"), hit("a", 1, "same"), hit("c", 3, "other")],
            &none(),
        );
        let ids: Vec<_> = ranked.iter().map(|h| h.source_id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_placeholder_is_templated_and_encoded() {
        let candidate = placeholder(TEMPLATE, "red apple", 7);
        assert_eq!(candidate.url, "https://gen.example/prompt/red%20apple?seed=7");
        assert!(candidate.is_placeholder());
    }

    #[test]
    fn test_placeholders_are_distinct() {
        let list = placeholders(TEMPLATE, "cat", 4);
        assert_eq!(list.len(), 4);
        let unique: std::collections::HashSet<_> = list.iter().map(|c| &c.url).collect();
        assert_eq!(unique.len(), 4);
    }
}
