//! Hierarchical object identifiers.
//!
//! # Responsibility
//! - Classify UIDs by shape (tablet, span dimension, sign token).
//! - Extract positional segments (tablet, line, parent) without store access.
//! - Provide a numeric-aware total order for token UIDs.
//!
//! # Invariants
//! - Shape inspection never implies containment; membership comes from facts.
//! - Span dimension precedence is fixed: first segment, entry, text, numeral.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Segment separator inside UIDs.
pub const SEPARATOR: char = ':';
/// Marker segment for sign tokens (`P000001:3:sgn:0`).
pub const TOKEN_MARKER: &str = ":sgn:";
/// Number of segments of a plain token UID; deeper UIDs are grapheme parts.
const TOKEN_SEGMENTS: usize = 4;

/// Structural dimension of a span, in classification precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanDimension {
    FirstSegment,
    Entry,
    TextSpan,
    Numeral,
}

impl SpanDimension {
    /// All dimensions in precedence order.
    pub const ALL: [SpanDimension; 4] = [
        SpanDimension::FirstSegment,
        SpanDimension::Entry,
        SpanDimension::TextSpan,
        SpanDimension::Numeral,
    ];

    /// UID fragment identifying spans of this dimension.
    pub fn marker(self) -> &'static str {
        match self {
            Self::FirstSegment => ":1sg",
            Self::Entry => ":ent",
            Self::TextSpan => ":txt",
            Self::Numeral => ":num",
        }
    }

    /// Column header label for this dimension.
    pub fn label(self) -> &'static str {
        match self {
            Self::FirstSegment => "SEGMENT",
            Self::Entry => "ENTRY",
            Self::TextSpan => "TEXT",
            Self::Numeral => "NUMERAL",
        }
    }

    /// Classifies a span UID; the first matching dimension in precedence
    /// order wins.
    pub fn classify(uid: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|dimension| uid.contains(dimension.marker()))
    }
}

/// Object kind derived from UID shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Tablet,
    FirstSegment,
    Entry,
    TextSpan,
    Numeral,
    Sign,
    Unknown,
}

impl ObjectKind {
    /// Classifies a UID by its suffix.
    pub fn of(uid: &str) -> Self {
        if !uid.contains(SEPARATOR) {
            Self::Tablet
        } else if uid.ends_with(SpanDimension::FirstSegment.marker()) {
            Self::FirstSegment
        } else if uid.ends_with(SpanDimension::Entry.marker()) {
            Self::Entry
        } else if uid.ends_with(SpanDimension::TextSpan.marker()) {
            Self::TextSpan
        } else if uid.ends_with(SpanDimension::Numeral.marker()) {
            Self::Numeral
        } else if uid.contains(TOKEN_MARKER) {
            Self::Sign
        } else {
            Self::Unknown
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Tablet => "tablet",
            Self::FirstSegment => "first segment",
            Self::Entry => "entry",
            Self::TextSpan => "text span",
            Self::Numeral => "numeral",
            Self::Sign => "sign",
            Self::Unknown => "unknown",
        }
    }
}

/// Returns the tablet id owning `uid` (its first segment).
pub fn tablet_of(uid: &str) -> &str {
    uid.split(SEPARATOR).next().unwrap_or(uid)
}

/// Returns `uid` without its tablet id, e.g. `:3:ent` for `P000001:3:ent`.
pub fn without_tablet(uid: &str) -> &str {
    &uid[tablet_of(uid).len()..]
}

/// Returns the tablet and line segments joined, e.g. `P000001:3`.
pub fn line_scope(uid: &str) -> String {
    uid.split(SEPARATOR).take(2).collect::<Vec<_>>().join(":")
}

/// Parses the physical line number (second segment).
pub fn line_number(uid: &str) -> Option<u32> {
    uid.split(SEPARATOR).nth(1)?.parse().ok()
}

/// Returns the identifier one level up, if any.
pub fn parent_of(uid: &str) -> Option<&str> {
    uid.rsplit_once(SEPARATOR).map(|(parent, _)| parent)
}

pub fn segment_count(uid: &str) -> usize {
    uid.split(SEPARATOR).count()
}

/// Whether `uid` names a sign token or one of its grapheme parts.
pub fn is_token(uid: &str) -> bool {
    uid.contains(TOKEN_MARKER)
}

/// Whether `uid` is a component of a complex grapheme (one level deeper
/// than a plain token).
pub fn is_grapheme_component(uid: &str) -> bool {
    is_token(uid) && segment_count(uid) > TOKEN_SEGMENTS
}

/// Whether `uid` equals `scope` or lies under it.
pub fn is_within(uid: &str, scope: &str) -> bool {
    uid == scope
        || uid
            .strip_prefix(scope)
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
}

/// Orders UIDs segment by segment, comparing numeric segments numerically.
///
/// `P000001:2:sgn:10` sorts after `P000001:2:sgn:9`; a UID sorts before its
/// own descendants.
pub fn compare(left: &str, right: &str) -> Ordering {
    let mut left_parts = left.split(SEPARATOR);
    let mut right_parts = right.split(SEPARATOR);
    loop {
        match (left_parts.next(), right_parts.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(ln), Ok(rn)) => ln.cmp(&rn).then_with(|| l.cmp(r)),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => l.cmp(r),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}
