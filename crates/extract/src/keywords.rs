//! Expiration-context scoring around a date match.
//!
//! A candidate gains a hint when expiration vocabulary appears within a
//! fixed window around it. The hint is tracked and logged but never gates
//! acceptance: the first valid future date wins with or without nearby
//! keywords. Matching is plain substring containment, so short words like
//! `by` also fire inside longer words. Known-weak heuristic, kept as is.

/// Words that mark a date as expiration-related when nearby.
const EXPIRY_KEYWORDS: &[&str] = &["exp", "best", "use", "sell", "by"];

/// Half-width of the context window, in bytes before boundary snapping.
pub const CONTEXT_RADIUS: usize = 20;

pub fn has_expiration_context(window: &str) -> bool {
    EXPIRY_KEYWORDS.iter().any(|k| window.contains(k))
}

/// Slice the window around a match start, snapped to character boundaries
/// so multibyte text cannot split a character.
pub fn context_window(text: &str, pos: usize) -> &str {
    let pos = pos.min(text.len());
    let start = snap_left(text, pos.saturating_sub(CONTEXT_RADIUS));
    let end = snap_right(text, (pos + CONTEXT_RADIUS).min(text.len()));
    &text[start..end]
}

fn snap_left(text: &str, mut i: usize) -> usize {
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn snap_right(text: &str, mut i: usize) -> usize {
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}
