//! Transitive membership closure across overlapping hierarchies.
//!
//! # Responsibility
//! - Derive, for every contained identifier in a scope, the full set of
//!   containers reachable through one or more `child` edges.
//!
//! # Invariants
//! - The membership graph is assumed acyclic. Cycles are neither detected
//!   nor repaired; on cyclic input the ancestor sets are unspecified
//!   (iteration still terminates because sets only grow within a finite
//!   universe).
//! - Output is deterministic: ordered maps and sets only.
//! - Recomputing over the same edges yields the same map.

use crate::model::fact::MembershipEdge;
use crate::repo::fact_repo::{FactRepository, RepoResult};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Contained identifier -> every transitive container.
pub type AncestorMap = BTreeMap<String, BTreeSet<String>>;

/// Ancestor closure for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    ancestors: AncestorMap,
}

impl Closure {
    /// Builds the closure from direct membership edges.
    pub fn from_edges(edges: &[MembershipEdge]) -> Self {
        Self {
            ancestors: compute_closure(edges),
        }
    }

    /// Transitive containers of `uid`; empty when it has none.
    pub fn ancestors_of(&self, uid: &str) -> impl Iterator<Item = &str> {
        self.ancestors
            .get(uid)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn is_contained_in(&self, uid: &str, container: &str) -> bool {
        self.ancestors
            .get(uid)
            .is_some_and(|set| set.contains(container))
    }

    /// Identifiers that have at least one container.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.ancestors.keys().map(String::as_str)
    }
}

/// Fixed-point set-union closure over the direct-parent relation.
///
/// Each round replaces `ancestors(x)` with `ancestors(x) ∪ ancestors(p)`
/// for every known `p` in `ancestors(x)`; iteration stops once no set grows.
pub fn compute_closure(edges: &[MembershipEdge]) -> AncestorMap {
    let mut ancestors: AncestorMap = BTreeMap::new();
    for edge in edges {
        ancestors
            .entry(edge.member.clone())
            .or_default()
            .insert(edge.container.clone());
    }

    let members: Vec<String> = ancestors.keys().cloned().collect();
    let mut rounds = 0usize;
    loop {
        rounds += 1;
        let mut grew = false;
        for member in &members {
            let inherited: BTreeSet<String> = ancestors[member]
                .iter()
                .filter_map(|parent| ancestors.get(parent))
                .flat_map(|set| set.iter().cloned())
                .collect();
            if let Some(own) = ancestors.get_mut(member) {
                let before = own.len();
                own.extend(inherited);
                grew |= own.len() > before;
            }
        }
        if !grew {
            break;
        }
    }

    debug!(
        "event=closure_compute module=closure status=ok edges={} members={} rounds={}",
        edges.len(),
        ancestors.len(),
        rounds
    );
    ancestors
}

/// Closure engine over a fact repository.
pub struct ClosureEngine<R: FactRepository> {
    repo: R,
}

impl<R: FactRepository> ClosureEngine<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Computes the closure for `scope` (an identifier or identifier prefix).
    pub fn closure_for(&self, scope: &str) -> RepoResult<Closure> {
        let edges = self.repo.membership_edges_under(scope)?;
        Ok(Closure::from_edges(&edges))
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_closure, Closure};
    use crate::model::fact::MembershipEdge;

    fn edge(container: &str, member: &str) -> MembershipEdge {
        MembershipEdge {
            container: container.to_string(),
            member: member.to_string(),
        }
    }

    #[test]
    fn closure_is_transitive() {
        let closure = Closure::from_edges(&[edge("B", "A"), edge("C", "B"), edge("D", "C")]);
        let ancestors: Vec<&str> = closure.ancestors_of("A").collect();
        assert_eq!(ancestors, vec!["B", "C", "D"]);
        assert!(closure.is_contained_in("B", "D"));
        assert!(!closure.is_contained_in("D", "A"));
    }

    #[test]
    fn closure_merges_overlapping_dimensions() {
        let closure = Closure::from_edges(&[
            edge("T:1:ent", "T:1:sgn:0"),
            edge("T:1:num", "T:1:sgn:0"),
            edge("T", "T:1:ent"),
            edge("T", "T:1:num"),
        ]);
        let ancestors: Vec<&str> = closure.ancestors_of("T:1:sgn:0").collect();
        assert_eq!(ancestors, vec!["T", "T:1:ent", "T:1:num"]);
    }

    #[test]
    fn closure_is_idempotent() {
        let edges = vec![edge("B", "A"), edge("C", "B"), edge("C", "A")];
        let first = compute_closure(&edges);
        let flattened: Vec<_> = first
            .iter()
            .flat_map(|(member, set)| set.iter().map(move |c| edge(c, member)))
            .collect();
        assert_eq!(compute_closure(&flattened), first);
        assert_eq!(compute_closure(&edges), first);
    }

    #[test]
    fn cyclic_edges_still_terminate() {
        let closure = Closure::from_edges(&[edge("B", "A"), edge("A", "B")]);
        assert!(closure.members().count() <= 2);
    }

    #[test]
    fn unknown_identifier_has_no_ancestors() {
        let closure = Closure::from_edges(&[edge("B", "A")]);
        assert_eq!(closure.ancestors_of("Z").count(), 0);
    }
}
