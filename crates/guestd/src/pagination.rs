//! Marker-based pagination over externally ordered listings.
//!
//! Listings come from engine commands whose ordering is only meaningful
//! within a single invocation, so a marker is resolved by scanning forward
//! from the start of the sequence rather than by index. A marker that never
//! appears consumes the whole sequence and yields an empty page.

use serde::Serialize;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Entries on this page, in listing order.
    pub items: Vec<T>,
    /// Marker resuming the listing after this page, when more entries remain.
    pub next_marker: Option<String>,
}

impl<T> Page<T> {
    /// An empty final page.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_marker: None,
        }
    }
}

/// Takes up to `limit` entries following `marker` from `entries`.
///
/// Entries up to and including the first one whose key equals `marker` are
/// discarded. `next_marker` is the key of the last returned entry when the
/// limit stopped the page early, and `None` once the listing is exhausted.
pub fn paginate<T, I, K>(entries: I, limit: Option<usize>, marker: Option<&str>, key: K) -> Page<T>
where
    I: IntoIterator<Item = T>,
    K: Fn(&T) -> &str,
{
    let mut cursor = entries.into_iter().peekable();
    if let Some(marker) = marker {
        // Exhausts the cursor when the marker is absent.
        let _ = cursor.by_ref().find(|entry| key(entry) == marker);
    }

    let mut items = Vec::new();
    while limit.is_none_or(|limit| items.len() < limit) {
        match cursor.next() {
            Some(entry) => items.push(entry),
            None => break,
        }
    }

    let more_remaining = cursor.peek().is_some();
    let next_marker = match items.last() {
        Some(last) if more_remaining => Some(key(last).to_owned()),
        _ => None,
    };
    Page { items, next_marker }
}
