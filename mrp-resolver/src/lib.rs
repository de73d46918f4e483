//! mrp-resolver - media resolution pipeline
//!
//! Finds a fitting stock image or video clip for each media entry:
//! derives a search phrase (optionally through an LLM keyword optimizer),
//! queries every enabled stock-media source concurrently, picks the
//! highest-ranked unused candidate and records it on the entry.
//!
//! Entry points live on [`Resolver`].

pub mod error;
pub mod keywords;
pub mod phrase;
pub mod resolver;
pub mod selection;
pub mod sources;
pub mod types;

pub use crate::error::{ResolveError, ResolveResult};
pub use crate::keywords::{KeywordOptimizer, KeywordStore, OptimizedKeywords, ProviderSlot, TextProvider};
pub use crate::resolver::Resolver;
pub use crate::sources::{MediaSource, RegisteredSource, SourceSet};
pub use crate::types::{
    Candidate, HistoryItem, KeywordMode, MediaEntry, MediaKind, ResolutionResult,
    ResolutionStatus, ResolutionState, ResolveOverrides, SharedEntry,
};
