//! Entity reference extraction and interactive confirmation.
//!
//! # Responsibility
//! - Find object ids, publication citations and sign names in free text.
//! - Match candidates against the store, exactly or approximately.
//! - Ask the operator to confirm each candidate before it becomes a link.
//!
//! # Invariants
//! - Unresolved sign names are reported and never offered for linking.
//! - A citation matches approximately only when its score is strictly
//!   greater than [`FUZZY_THRESHOLD`].
//! - Returned lists are ordered by first occurrence and deduplicated.
//! - An empty final link set requires an explicit override; declining
//!   aborts with [`ResolveError::Aborted`].

use crate::model::sign::{canonicalize_sign_reference, SignId};
use crate::repo::fact_repo::{Citation, FactRepository, RepoError};
use crate::repo::sign_repo::SignRepository;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Scores at or below this value never match approximately.
pub const FUZZY_THRESHOLD: u8 = 95;

static DISALLOWED_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^ :0-9A-Za-z~+@]").expect("valid normalization regex"));
static SPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r" +").expect("valid space regex"));
static OBJECT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"P[0-9]+[^ ]*").expect("valid object id regex"));
static CITATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z]+ [0-9]+[A-Z]?( [0-9]+)?").expect("valid citation regex")
});
static SIGN_REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"M[0-9X]{1,3}[-~a-zA-Z0-9+|]*").expect("valid sign reference regex")
});

/// Operator confirmation channel.
pub trait Confirmer {
    /// Asks a yes/no question and blocks until answered.
    fn confirm(&mut self, question: &str) -> bool;
    /// Shows an informational message that needs no answer.
    fn notify(&mut self, message: &str);
}

#[derive(Debug)]
pub enum ResolveError {
    Repo(RepoError),
    /// An explicitly supplied object identifier does not exist.
    ObjectNotFound(String),
    /// An explicitly supplied sign name has no catalog row.
    SignNotFound(String),
    /// The operator declined a required confirmation.
    Aborted,
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::ObjectNotFound(uid) => write!(f, "object not found: {uid}"),
            Self::SignNotFound(name) => write!(f, "sign not found: {name}"),
            Self::Aborted => write!(f, "aborted by operator"),
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ResolveError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Object reference found in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectCandidate {
    /// Literal identifier that exists in the store.
    Identifier(String),
    /// Object reached through its publication citation.
    Citation { uid: String, publication: String },
}

impl ObjectCandidate {
    pub fn uid(&self) -> &str {
        match self {
            Self::Identifier(uid) => uid,
            Self::Citation { uid, .. } => uid,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Identifier(uid) => uid.clone(),
            Self::Citation { uid, publication } => format!("{publication} (= {uid})"),
        }
    }
}

/// Canonical sign reference and its catalog key, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignCandidate {
    pub name: String,
    pub sign_id: Option<SignId>,
}

/// Candidates extracted from one text, before confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub objects: Vec<ObjectCandidate>,
    pub signs: Vec<SignCandidate>,
}

/// Confirmed link lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedLinks {
    pub object_uids: Vec<String>,
    pub sign_ids: Vec<SignId>,
}

impl ResolvedLinks {
    pub fn is_empty(&self) -> bool {
        self.object_uids.is_empty() && self.sign_ids.is_empty()
    }
}

/// Text plus explicitly supplied links.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveRequest<'a> {
    pub text: &'a str,
    pub explicit_objects: &'a [String],
    pub explicit_signs: &'a [String],
}

/// Replaces every character outside `[ :0-9A-Za-z~+@]` with a space and
/// collapses space runs.
pub fn normalize_text(text: &str) -> String {
    let spaced = DISALLOWED_CHARS_RE.replace_all(text, " ");
    SPACE_RUN_RE.replace_all(spaced.trim(), " ").into_owned()
}

/// Similarity score in `0..=100` (normalized Levenshtein, case-insensitive).
pub fn similarity(left: &str, right: &str) -> u8 {
    let score = strsim::normalized_levenshtein(&left.to_lowercase(), &right.to_lowercase());
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

pub fn passes_fuzzy_threshold(score: u8) -> bool {
    score > FUZZY_THRESHOLD
}

/// Citation key used for comparison: uppercased, commas removed.
pub fn citation_key(publication: &str) -> String {
    publication.to_uppercase().replace(',', "")
}

/// Objects matched by one citation candidate: the best approximate match
/// above the threshold, then every citation containing the candidate
/// verbatim (case-insensitive, commas kept).
pub fn match_citation(candidate: &str, citations: &[Citation]) -> Vec<ObjectCandidate> {
    let wanted = candidate.to_uppercase();
    let keyed: Vec<(String, &Citation)> = citations
        .iter()
        .map(|citation| (citation_key(&citation.publication), citation))
        .collect();

    let mut matches = Vec::new();
    let mut best: Option<(u8, &Citation)> = None;
    for (key, citation) in &keyed {
        let score = similarity(&wanted, key);
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, citation));
        }
    }
    if let Some((score, citation)) = best {
        debug!(
            "event=citation_match module=resolver status=ok best_score={} accepted={}",
            score,
            passes_fuzzy_threshold(score)
        );
        if passes_fuzzy_threshold(score) {
            matches.push(citation_candidate(citation));
        }
    }

    matches.extend(
        citations
            .iter()
            .filter(|citation| citation.publication.to_uppercase().contains(&wanted))
            .map(citation_candidate),
    );
    matches
}

fn citation_candidate(citation: &Citation) -> ObjectCandidate {
    ObjectCandidate::Citation {
        uid: citation.uid.clone(),
        publication: citation.publication.to_uppercase(),
    }
}

/// Extracts, confirms and validates entity references.
pub struct EntityResolver<F: FactRepository, S: SignRepository> {
    facts: F,
    signs: S,
}

impl<F: FactRepository, S: SignRepository> EntityResolver<F, S> {
    pub fn new(facts: F, signs: S) -> Self {
        Self { facts, signs }
    }

    /// Extracts deduplicated candidates from `text` without asking anything.
    pub fn extract(&self, text: &str) -> Result<Extraction, ResolveError> {
        let normalized = normalize_text(text);
        let mut extraction = Extraction::default();

        for found in OBJECT_ID_RE.find_iter(&normalized) {
            if self.facts.object_exists(found.as_str())? {
                extraction
                    .objects
                    .push(ObjectCandidate::Identifier(found.as_str().to_string()));
            }
        }

        let mut citations: Option<Vec<Citation>> = None;
        for found in CITATION_RE.find_iter(&normalized) {
            if citations.is_none() {
                citations = Some(self.facts.citations()?);
            }
            if let Some(known) = citations.as_deref() {
                extraction
                    .objects
                    .extend(match_citation(found.as_str(), known));
            }
        }

        for found in SIGN_REFERENCE_RE.find_iter(&normalized) {
            let name = canonicalize_sign_reference(found.as_str());
            let entries = self.signs.find_by_name(&name)?;
            if entries.is_empty() {
                extraction.signs.push(SignCandidate {
                    name,
                    sign_id: None,
                });
            } else {
                extraction
                    .signs
                    .extend(entries.into_iter().map(|entry| SignCandidate {
                        name: name.clone(),
                        sign_id: Some(entry.sign_id),
                    }));
            }
        }

        dedup_by_key(&mut extraction.objects, |candidate| {
            candidate.uid().to_string()
        });
        dedup_by_key(&mut extraction.signs, |candidate| {
            (candidate.name.clone(), candidate.sign_id)
        });
        Ok(extraction)
    }

    /// Resolves text plus explicit links into confirmed link lists.
    ///
    /// Explicit identifiers are validated before any question is asked.
    pub fn resolve(
        &self,
        request: ResolveRequest<'_>,
        confirmer: &mut dyn Confirmer,
    ) -> Result<ResolvedLinks, ResolveError> {
        let explicit = self.validate_explicit(request)?;
        let extraction = self.extract(request.text)?;
        let mut links = confirm_candidates(&extraction, confirmer);

        links.object_uids.extend(explicit.object_uids);
        links.sign_ids.extend(explicit.sign_ids);
        dedup_by_key(&mut links.object_uids, Clone::clone);
        dedup_by_key(&mut links.sign_ids, |sign_id| *sign_id);

        if links.is_empty()
            && !confirmer
                .confirm("This comment does not refer to any objects or signs. Add it anyways?")
        {
            info!("event=resolve module=resolver status=aborted reason=no_links");
            return Err(ResolveError::Aborted);
        }

        info!(
            "event=resolve module=resolver status=ok object_candidates={} sign_candidates={} objects={} signs={}",
            extraction.objects.len(),
            extraction.signs.len(),
            links.object_uids.len(),
            links.sign_ids.len()
        );
        Ok(links)
    }

    fn validate_explicit(&self, request: ResolveRequest<'_>) -> Result<ResolvedLinks, ResolveError> {
        let mut links = ResolvedLinks::default();
        for raw in request.explicit_objects {
            let uid = self
                .facts
                .canonical_uid(raw)?
                .ok_or_else(|| ResolveError::ObjectNotFound(raw.trim().to_uppercase()))?;
            links.object_uids.push(uid);
        }
        for raw in request.explicit_signs {
            let name = raw.trim().to_uppercase();
            let entries = self.signs.find_by_name(&name)?;
            if entries.is_empty() {
                return Err(ResolveError::SignNotFound(name));
            }
            links
                .sign_ids
                .extend(entries.into_iter().map(|entry| entry.sign_id));
        }
        Ok(links)
    }
}

/// Asks about every candidate in order and keeps the confirmed ones.
pub fn confirm_candidates(extraction: &Extraction, confirmer: &mut dyn Confirmer) -> ResolvedLinks {
    let mut links = ResolvedLinks::default();
    for candidate in &extraction.objects {
        if confirmer.confirm(&format!(
            "Does this comment refer to {}?",
            candidate.describe()
        )) {
            links.object_uids.push(candidate.uid().to_string());
        }
    }
    for candidate in &extraction.signs {
        match candidate.sign_id {
            None => confirmer.notify(&format!(
                "This comment appears to refer to {}, but no such sign exists.",
                candidate.name
            )),
            Some(sign_id) => {
                if confirmer.confirm(&format!("Does this comment refer to {}?", candidate.name)) {
                    links.sign_ids.push(sign_id);
                }
            }
        }
    }
    links
}

fn dedup_by_key<T, K: Ord>(items: &mut Vec<T>, key: impl Fn(&T) -> K) {
    let mut seen = BTreeSet::new();
    items.retain(|item| seen.insert(key(item)));
}
