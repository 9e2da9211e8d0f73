//! Fact repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide pattern lookups over `object_attributes` triples.
//! - Serve membership edges, token rows, citations and attestation counts.
//!
//! # Invariants
//! - Scope lookups match `scope` itself or identifiers under `scope:`;
//!   a bare textual prefix (`P00000` vs `P000001`) never matches.
//! - Read paths never mutate facts. `insert_*` helpers exist for loading
//!   fixtures and are not used by the engine.

use crate::db::DbError;
use crate::model::fact::{attr, Fact, MembershipEdge};
use crate::model::sign::{SignId, UNRESOLVED_SIGN_ID};
use crate::model::uid;
use rusqlite::{params, Connection};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by fact, sign and comment persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// A name that must identify one catalog row matched several.
    AmbiguousSign { name: String, sign_ids: Vec<SignId> },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidArgument(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::AmbiguousSign { name, sign_ids } => write!(
                f,
                "found more than one sign matching the name '{name}': sign ids {sign_ids:?}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Display-relevant facts of one sign token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenFacts {
    pub uid: String,
    /// Raw recorded `DahlName`.
    pub raw_name: Option<String>,
    /// Parsed `SignID`; `Some(-1)` when the raw name has no catalog row.
    pub sign_id: Option<SignId>,
    /// Catalog name for `sign_id`, when a row exists.
    pub catalog_name: Option<String>,
    pub quantity: Option<String>,
}

/// One distinct `publication` fact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Citation {
    pub uid: String,
    pub publication: String,
}

/// Number of matching tokens on one tablet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    pub tablet: String,
    pub count: usize,
}

/// Raw sign name recorded without a catalog match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedSign {
    pub name: String,
    /// Tokens carrying the name, in identifier order.
    pub token_uids: Vec<String>,
}

/// Repository interface for read-only triple lookups.
pub trait FactRepository {
    /// Returns the stored casing of `input`, matched case-insensitively.
    fn canonical_uid(&self, input: &str) -> RepoResult<Option<String>>;
    fn object_exists(&self, uid: &str) -> RepoResult<bool>;
    /// All facts owned by exactly `uid`.
    fn facts_for(&self, uid: &str) -> RepoResult<Vec<Fact>>;
    /// Objects strictly under `scope` by identifier shape, in identifier order.
    fn objects_under(&self, scope: &str) -> RepoResult<Vec<String>>;
    /// Membership edges whose member is `scope` or lies under it.
    fn membership_edges_under(&self, scope: &str) -> RepoResult<Vec<MembershipEdge>>;
    /// Token rows (`:sgn:` objects) within `scope`.
    fn tokens_under(&self, scope: &str) -> RepoResult<Vec<TokenFacts>>;
    /// `val_<system>` facts owned by objects within `scope`.
    fn value_facts_under(&self, scope: &str) -> RepoResult<Vec<Fact>>;
    /// Objects within `scope` carrying `span_type = HEADER`.
    fn header_spans_under(&self, scope: &str) -> RepoResult<BTreeSet<String>>;
    /// Distinct `publication` facts.
    fn citations(&self) -> RepoResult<Vec<Citation>>;
    /// Tablets with tokens (or grapheme parts) whose `SignID` is `sign_id`.
    fn attestations_by_sign(&self, sign_id: SignId) -> RepoResult<Vec<Attestation>>;
    /// Tablets with complex graphemes built from exactly `components`
    /// (two or three catalog keys, in position order).
    fn attestations_by_grapheme(&self, components: &[SignId]) -> RepoResult<Vec<Attestation>>;
    /// Raw names of tokens whose `SignID` is unresolved, grouped by name.
    fn unresolved_signs(&self) -> RepoResult<Vec<UnresolvedSign>>;
}

impl<R: FactRepository + ?Sized> FactRepository for &R {
    fn canonical_uid(&self, input: &str) -> RepoResult<Option<String>> {
        (**self).canonical_uid(input)
    }
    fn object_exists(&self, uid: &str) -> RepoResult<bool> {
        (**self).object_exists(uid)
    }
    fn facts_for(&self, uid: &str) -> RepoResult<Vec<Fact>> {
        (**self).facts_for(uid)
    }
    fn objects_under(&self, scope: &str) -> RepoResult<Vec<String>> {
        (**self).objects_under(scope)
    }
    fn membership_edges_under(&self, scope: &str) -> RepoResult<Vec<MembershipEdge>> {
        (**self).membership_edges_under(scope)
    }
    fn tokens_under(&self, scope: &str) -> RepoResult<Vec<TokenFacts>> {
        (**self).tokens_under(scope)
    }
    fn value_facts_under(&self, scope: &str) -> RepoResult<Vec<Fact>> {
        (**self).value_facts_under(scope)
    }
    fn header_spans_under(&self, scope: &str) -> RepoResult<BTreeSet<String>> {
        (**self).header_spans_under(scope)
    }
    fn citations(&self) -> RepoResult<Vec<Citation>> {
        (**self).citations()
    }
    fn attestations_by_sign(&self, sign_id: SignId) -> RepoResult<Vec<Attestation>> {
        (**self).attestations_by_sign(sign_id)
    }
    fn attestations_by_grapheme(&self, components: &[SignId]) -> RepoResult<Vec<Attestation>> {
        (**self).attestations_by_grapheme(components)
    }
    fn unresolved_signs(&self) -> RepoResult<Vec<UnresolvedSign>> {
        (**self).unresolved_signs()
    }
}

/// SQLite-backed fact repository.
pub struct SqliteFactRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFactRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Inserts an object row if missing.
    pub fn insert_object(&self, uid: &str) -> RepoResult<()> {
        self.conn
            .execute("INSERT OR IGNORE INTO objects (uid) VALUES (?1);", [uid])?;
        Ok(())
    }

    /// Inserts one fact, creating its owner object when needed.
    pub fn insert_fact(&self, fact: &Fact) -> RepoResult<()> {
        self.insert_object(&fact.uid)?;
        self.conn.execute(
            "INSERT INTO object_attributes (uid, attribute, value) VALUES (?1, ?2, ?3);",
            params![fact.uid, fact.attribute, fact.value],
        )?;
        Ok(())
    }

    /// Inserts a membership edge; both ends become objects.
    pub fn insert_edge(&self, container: &str, member: &str) -> RepoResult<()> {
        self.insert_object(member)?;
        self.insert_fact(&Fact::new(container, attr::CHILD, member))
    }

    fn query_uids(&self, sql: &str, scope: &str) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([scope])?;
        let mut uids: Vec<String> = Vec::new();
        while let Some(row) = rows.next()? {
            uids.push(row.get(0)?);
        }
        uids.sort_by(|left, right| uid::compare(left, right));
        Ok(uids)
    }
}

impl FactRepository for SqliteFactRepository<'_> {
    fn canonical_uid(&self, input: &str) -> RepoResult<Option<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT uid
             FROM objects
             WHERE uid = ?1 COLLATE NOCASE
             ORDER BY uid = ?1 DESC, uid ASC
             LIMIT 1;",
        )?;
        let mut rows = stmt.query([input.trim()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn object_exists(&self, uid: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM objects WHERE uid = ?1);",
            [uid],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn facts_for(&self, uid: &str) -> RepoResult<Vec<Fact>> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, attribute, value
             FROM object_attributes
             WHERE uid = ?1
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([uid])?;
        let mut facts = Vec::new();
        while let Some(row) = rows.next()? {
            facts.push(Fact {
                uid: row.get("uid")?,
                attribute: row.get("attribute")?,
                value: row.get("value")?,
            });
        }
        Ok(facts)
    }

    fn objects_under(&self, scope: &str) -> RepoResult<Vec<String>> {
        self.query_uids(
            "SELECT uid
             FROM objects
             WHERE substr(uid, 1, length(?1) + 1) = ?1 || ':';",
            scope,
        )
    }

    fn membership_edges_under(&self, scope: &str) -> RepoResult<Vec<MembershipEdge>> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, value
             FROM object_attributes
             WHERE attribute = 'child'
               AND (value = ?1 OR substr(value, 1, length(?1) + 1) = ?1 || ':');",
        )?;
        let mut rows = stmt.query([scope])?;
        let mut edges = Vec::new();
        while let Some(row) = rows.next()? {
            edges.push(MembershipEdge {
                container: row.get(0)?,
                member: row.get(1)?,
            });
        }
        Ok(edges)
    }

    fn tokens_under(&self, scope: &str) -> RepoResult<Vec<TokenFacts>> {
        let mut stmt = self.conn.prepare(
            "WITH tokens AS (
                SELECT uid
                FROM objects
                WHERE (uid = ?1 OR substr(uid, 1, length(?1) + 1) = ?1 || ':')
                  AND instr(uid, ':sgn:') > 0
             ), named AS (
                SELECT
                    t.uid AS uid,
                    (SELECT a.value FROM object_attributes a
                     WHERE a.uid = t.uid AND a.attribute = 'DahlName'
                     ORDER BY a.rowid LIMIT 1) AS raw_name,
                    (SELECT a.value FROM object_attributes a
                     WHERE a.uid = t.uid AND a.attribute = 'SignID'
                     ORDER BY a.rowid LIMIT 1) AS sign_id,
                    (SELECT a.value FROM object_attributes a
                     WHERE a.uid = t.uid AND a.attribute = 'quantity'
                     ORDER BY a.rowid LIMIT 1) AS quantity
                FROM tokens t
             )
             SELECT
                n.uid,
                n.raw_name,
                n.sign_id,
                (SELECT s.name FROM signs s
                 WHERE s.sign_id = CAST(n.sign_id AS INTEGER)
                 LIMIT 1) AS catalog_name,
                n.quantity
             FROM named n;",
        )?;
        let mut rows = stmt.query([scope])?;
        let mut tokens = Vec::new();
        while let Some(row) = rows.next()? {
            let sign_id: Option<String> = row.get("sign_id")?;
            tokens.push(TokenFacts {
                uid: row.get("uid")?,
                raw_name: row.get("raw_name")?,
                sign_id: sign_id.and_then(|value| value.trim().parse().ok()),
                catalog_name: row.get("catalog_name")?,
                quantity: row.get("quantity")?,
            });
        }
        tokens.sort_by(|left, right| uid::compare(&left.uid, &right.uid));
        Ok(tokens)
    }

    fn value_facts_under(&self, scope: &str) -> RepoResult<Vec<Fact>> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, attribute, value
             FROM object_attributes
             WHERE (uid = ?1 OR substr(uid, 1, length(?1) + 1) = ?1 || ':')
               AND substr(attribute, 1, 4) = 'val_'
             ORDER BY uid ASC, attribute ASC;",
        )?;
        let mut rows = stmt.query([scope])?;
        let mut facts = Vec::new();
        while let Some(row) = rows.next()? {
            facts.push(Fact {
                uid: row.get(0)?,
                attribute: row.get(1)?,
                value: row.get(2)?,
            });
        }
        Ok(facts)
    }

    fn header_spans_under(&self, scope: &str) -> RepoResult<BTreeSet<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT uid
             FROM object_attributes
             WHERE (uid = ?1 OR substr(uid, 1, length(?1) + 1) = ?1 || ':')
               AND attribute = 'span_type'
               AND value = 'HEADER';",
        )?;
        let mut rows = stmt.query([scope])?;
        let mut spans: BTreeSet<String> = BTreeSet::new();
        while let Some(row) = rows.next()? {
            spans.insert(row.get(0)?);
        }
        Ok(spans)
    }

    fn citations(&self) -> RepoResult<Vec<Citation>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT uid, value
             FROM object_attributes
             WHERE attribute = 'publication'
             ORDER BY uid ASC, value ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut citations = Vec::new();
        while let Some(row) = rows.next()? {
            citations.push(Citation {
                uid: row.get(0)?,
                publication: row.get(1)?,
            });
        }
        Ok(citations)
    }

    fn attestations_by_sign(&self, sign_id: SignId) -> RepoResult<Vec<Attestation>> {
        let mut stmt = self.conn.prepare(
            "SELECT substr(uid, 1, instr(uid || ':', ':') - 1) AS tablet, COUNT(*) AS hits
             FROM object_attributes
             WHERE attribute = 'SignID'
               AND value = ?1
             GROUP BY tablet
             ORDER BY tablet ASC;",
        )?;
        let mut rows = stmt.query([sign_id.to_string()])?;
        let mut attestations = Vec::new();
        while let Some(row) = rows.next()? {
            let hits: i64 = row.get("hits")?;
            attestations.push(Attestation {
                tablet: row.get("tablet")?,
                count: usize::try_from(hits).unwrap_or_default(),
            });
        }
        Ok(attestations)
    }

    fn attestations_by_grapheme(&self, components: &[SignId]) -> RepoResult<Vec<Attestation>> {
        if !(2..=3).contains(&components.len()) {
            return Err(RepoError::InvalidArgument(format!(
                "complex graphemes have 2 or 3 components, got {}",
                components.len()
            )));
        }

        let mut stmt = self.conn.prepare(
            "SELECT uid, value
             FROM object_attributes
             WHERE attribute = 'SignID'
               AND uid LIKE '%:sgn:%:%';",
        )?;
        let mut rows = stmt.query([])?;
        let mut parts: BTreeMap<String, BTreeMap<String, SignId>> = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let part_uid: String = row.get(0)?;
            let value: String = row.get(1)?;
            if !uid::is_grapheme_component(&part_uid) {
                continue;
            }
            let (Some((parent, position)), Ok(sign_id)) =
                (part_uid.rsplit_once(uid::SEPARATOR), value.trim().parse::<SignId>())
            else {
                continue;
            };
            parts
                .entry(parent.to_string())
                .or_default()
                .insert(position.to_string(), sign_id);
        }

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for (parent, positions) in &parts {
            let matches = components
                .iter()
                .enumerate()
                .all(|(index, wanted)| positions.get(&index.to_string()) == Some(wanted));
            if !matches {
                continue;
            }
            let extra_part = format!("{parent}:{}", components.len());
            if positions.contains_key(&components.len().to_string())
                || self.object_exists(&extra_part)?
            {
                continue;
            }
            *counts
                .entry(uid::tablet_of(parent).to_string())
                .or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(tablet, count)| Attestation { tablet, count })
            .collect())
    }

    fn unresolved_signs(&self) -> RepoResult<Vec<UnresolvedSign>> {
        let mut stmt = self.conn.prepare(
            "SELECT n.value, n.uid
             FROM object_attributes n
             WHERE n.attribute = 'DahlName'
               AND EXISTS (
                    SELECT 1
                    FROM object_attributes s
                    WHERE s.uid = n.uid
                      AND s.attribute = 'SignID'
                      AND s.value = ?1
               )
             ORDER BY n.value ASC;",
        )?;
        let mut rows = stmt.query([UNRESOLVED_SIGN_ID.to_string()])?;
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let token: String = row.get(1)?;
            grouped.entry(name).or_default().push(token);
        }

        Ok(grouped
            .into_iter()
            .map(|(name, mut token_uids)| {
                token_uids.sort_by(|left, right| uid::compare(left, right));
                UnresolvedSign { name, token_uids }
            })
            .collect())
    }
}
