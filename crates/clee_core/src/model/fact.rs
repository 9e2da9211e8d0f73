//! Attribute-value facts over object identifiers.
//!
//! Multiple facts may share `(uid, attribute)`; no ordering is significant
//! among them.

use serde::{Deserialize, Serialize};

/// Reserved attribute names read by the core.
pub mod attr {
    /// Membership edge: owner is the container, value is the contained UID.
    pub const CHILD: &str = "child";
    /// Raw sign name as recorded in the transliteration.
    pub const RAW_SIGN_NAME: &str = "DahlName";
    /// Catalog key of the sign (`-1` when no catalog row matched).
    pub const SIGN_ID: &str = "SignID";
    /// Repetition count for counted signs, rendered as `q(name)`.
    pub const QUANTITY: &str = "quantity";
    /// Prefix of numeral value attributes, followed by the system name.
    pub const VALUE_PREFIX: &str = "val_";
    /// Span type marker; `HEADER` flags header spans.
    pub const SPAN_TYPE: &str = "span_type";
    /// Publication citation of a tablet.
    pub const PUBLICATION: &str = "publication";

    /// `span_type` value marking a header span.
    pub const HEADER_SPAN: &str = "HEADER";

    /// Structural attributes hidden from attribute listings.
    pub const STRUCTURAL: &[&str] = &[
        CHILD,
        "digit",
        "class",
        "injected_span",
        "language",
        PUBLICATION,
        "followed_by",
        "preceded_by",
        "sign",
        "component",
        "content",
        "numeral",
    ];
}

/// One `(uid, attribute, value)` triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fact {
    pub uid: String,
    pub attribute: String,
    pub value: String,
}

impl Fact {
    pub fn new(
        uid: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Returns the numeral system name when this is a `val_<system>` fact.
    pub fn value_system(&self) -> Option<&str> {
        self.attribute.strip_prefix(attr::VALUE_PREFIX)
    }
}

/// Membership edge between a container and a contained identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MembershipEdge {
    pub container: String,
    pub member: String,
}
