//! Multi-criterion entry sorting.
//!
//! [`sort_entries`] is the single ordering used by the book list, the
//! reconciler's insertion logic and the order helper. It never mutates its
//! input and is stable: entries that compare equal keep their input order.
//!
//! # Direction Handling
//!
//! The criteria handle descending order in two different ways:
//!
//! - [`SortCriterion::Alphabetical`] and [`SortCriterion::Prompt`] sort
//!   ascending and reverse the finished list.
//! - [`SortCriterion::Order`] and [`SortCriterion::Uid`] invert only the numeric
//!   comparison. Entries without a value stay at the end in both directions.

use crate::domain::entry::Entry;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Primary sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortCriterion {
    /// Case-insensitive title.
    Alphabetical,
    /// Prompt injection order: position, depth, order, title.
    Prompt,
    /// Numeric `order` field.
    Order,
    /// Numeric uid.
    Uid,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    /// Applies the direction to an ascending comparison.
    #[must_use]
    pub const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// A criterion/direction pair as offered by the sort selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortPreset {
    /// Primary key.
    pub criterion: SortCriterion,
    /// Direction.
    pub direction: SortDirection,
}

impl Default for SortPreset {
    fn default() -> Self {
        Self {
            criterion: SortCriterion::Alphabetical,
            direction: SortDirection::Ascending,
        }
    }
}

impl SortPreset {
    /// The eight presets in selector order.
    pub const ALL: [Self; 8] = [
        Self::new(SortCriterion::Alphabetical, SortDirection::Ascending),
        Self::new(SortCriterion::Alphabetical, SortDirection::Descending),
        Self::new(SortCriterion::Prompt, SortDirection::Ascending),
        Self::new(SortCriterion::Prompt, SortDirection::Descending),
        Self::new(SortCriterion::Order, SortDirection::Ascending),
        Self::new(SortCriterion::Order, SortDirection::Descending),
        Self::new(SortCriterion::Uid, SortDirection::Ascending),
        Self::new(SortCriterion::Uid, SortDirection::Descending),
    ];

    /// Creates a preset.
    #[must_use]
    pub const fn new(criterion: SortCriterion, direction: SortDirection) -> Self {
        Self { criterion, direction }
    }

    /// Selector label, e.g. `Order ↘`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match (self.criterion, self.direction) {
            (SortCriterion::Alphabetical, SortDirection::Ascending) => "Title ↗",
            (SortCriterion::Alphabetical, SortDirection::Descending) => "Title ↘",
            (SortCriterion::Prompt, SortDirection::Ascending) => "Prompt ↗",
            (SortCriterion::Prompt, SortDirection::Descending) => "Prompt ↘",
            (SortCriterion::Order, SortDirection::Ascending) => "Order ↗",
            (SortCriterion::Order, SortDirection::Descending) => "Order ↘",
            (SortCriterion::Uid, SortDirection::Ascending) => "UID ↗",
            (SortCriterion::Uid, SortDirection::Descending) => "UID ↘",
        }
    }

    /// Parses a short name such as `order-desc` or `title`.
    ///
    /// The direction defaults to ascending when omitted.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (criterion, direction) = value
            .split_once('-')
            .map_or((value, "asc"), |(c, d)| (c, d));
        let criterion = match criterion.trim().to_lowercase().as_str() {
            "title" | "alphabetical" => SortCriterion::Alphabetical,
            "prompt" => SortCriterion::Prompt,
            "order" => SortCriterion::Order,
            "uid" => SortCriterion::Uid,
            _ => return None,
        };
        let direction = match direction.trim().to_lowercase().as_str() {
            "asc" | "ascending" => SortDirection::Ascending,
            "desc" | "descending" => SortDirection::Descending,
            _ => return None,
        };
        Some(Self::new(criterion, direction))
    }

    /// Sorts entries with this preset. See [`sort_entries`].
    #[must_use]
    pub fn sort<'a>(self, entries: impl IntoIterator<Item = &'a Entry>) -> Vec<&'a Entry> {
        sort_entries(entries, self.criterion, self.direction)
    }
}

/// Case- and accent-insensitive sort key for an entry's title.
///
/// Accented Latin letters fold onto their base letter so "Éclair" sorts
/// among the "e" titles. Other scripts compare by code point.
#[must_use]
pub fn title_key(entry: &Entry) -> String {
    entry.title().to_lowercase().chars().map(fold_accent).collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'à'..='å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è'..='ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ì'..='ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò'..='ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'ţ' | 'ť' | 'ŧ' => 't',
        'ù'..='ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ý' | 'ÿ' | 'ŷ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}

/// Compares two optional numbers, keeping missing values last.
///
/// Only the comparison between two present values honors `direction`.
#[must_use]
pub fn missing_last(a: Option<u64>, b: Option<u64>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => direction.apply(a.cmp(&b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn alphabetical(a: &Entry, b: &Entry) -> Ordering {
    title_key(a)
        .cmp(&title_key(b))
        .then_with(|| a.title().to_lowercase().cmp(&b.title().to_lowercase()))
}

fn prompt(a: &Entry, b: &Entry) -> Ordering {
    a.position
        .cmp(&b.position)
        .then_with(|| a.depth.unwrap_or(u32::MAX).cmp(&b.depth.unwrap_or(u32::MAX)))
        .then_with(|| a.order.unwrap_or(u32::MAX).cmp(&b.order.unwrap_or(u32::MAX)))
        .then_with(|| alphabetical(a, b))
}

/// Returns the entries in display order for `criterion` and `direction`.
///
/// # Parameters
///
/// * `entries` - Entries to order (left untouched)
/// * `criterion` - Primary key
/// * `direction` - Ascending or descending
///
/// # Returns
///
/// A new vector of references in display order.
///
/// # Example
///
/// ```rust
/// use lorebook_drawer::domain::{sort_entries, Entry, SortCriterion, SortDirection, Uid};
///
/// let mut a = Entry::new(Uid::from(1));
/// a.order = Some(10);
/// let mut b = Entry::new(Uid::from(2));
/// b.order = None;
///
/// let sorted = sort_entries([&b, &a], SortCriterion::Order, SortDirection::Descending);
/// assert_eq!(sorted[0].uid, Uid::from(1));
/// ```
#[must_use]
pub fn sort_entries<'a>(
    entries: impl IntoIterator<Item = &'a Entry>,
    criterion: SortCriterion,
    direction: SortDirection,
) -> Vec<&'a Entry> {
    let mut sorted: Vec<&Entry> = entries.into_iter().collect();

    match criterion {
        SortCriterion::Alphabetical => {
            sorted.sort_by(|a, b| alphabetical(a, b));
            if direction == SortDirection::Descending {
                sorted.reverse();
            }
        }
        SortCriterion::Prompt => {
            sorted.sort_by(|a, b| prompt(a, b));
            if direction == SortDirection::Descending {
                sorted.reverse();
            }
        }
        SortCriterion::Order => sorted.sort_by(|a, b| {
            missing_last(a.order.map(u64::from), b.order.map(u64::from), direction)
                .then_with(|| alphabetical(a, b))
        }),
        SortCriterion::Uid => sorted.sort_by(|a, b| {
            missing_last(a.uid.as_number(), b.uid.as_number(), direction)
                .then_with(|| alphabetical(a, b))
        }),
    }

    sorted
}

/// Identity scan: whether `current` differs from `sorted` at any position.
///
/// Used with view node handles so a container is only re-appended when its
/// children are actually out of order.
#[must_use]
pub fn sort_needed<T: PartialEq>(current: &[T], sorted: &[T]) -> bool {
    current.len() != sorted.len() || current.iter().zip(sorted).any(|(a, b)| a != b)
}
