//! Sign catalog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Look up catalog rows by name, key and base name.
//! - Enforce uniqueness where a name must resolve to one row.
//!
//! # Invariants
//! - Name lookups are exact; callers canonicalize before asking.

use crate::model::sign::{SignEntry, SignId};
use crate::repo::fact_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const SIGN_SELECT_SQL: &str = "SELECT sign_id, name, base_name FROM signs";

/// Repository interface for catalog lookups.
pub trait SignRepository {
    /// All catalog rows named exactly `name`, ordered by key.
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<SignEntry>>;
    fn get_by_id(&self, sign_id: SignId) -> RepoResult<Option<SignEntry>>;
    /// Rows sharing `base_name`, excluding `except_name`.
    fn variants_of(&self, base_name: &str, except_name: &str) -> RepoResult<Vec<SignEntry>>;

    /// Resolves `name` to at most one row.
    ///
    /// Returns `RepoError::AmbiguousSign` when several rows share the name.
    fn find_unique_by_name(&self, name: &str) -> RepoResult<Option<SignEntry>> {
        let mut rows = self.find_by_name(name)?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            _ => Err(RepoError::AmbiguousSign {
                name: name.to_string(),
                sign_ids: rows.iter().map(|entry| entry.sign_id).collect(),
            }),
        }
    }
}

/// SQLite-backed sign catalog repository.
pub struct SqliteSignRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSignRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Inserts one catalog row. Used when loading fixtures.
    pub fn insert_sign(&self, entry: &SignEntry) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO signs (sign_id, name, base_name) VALUES (?1, ?2, ?3);",
            params![entry.sign_id, entry.name, entry.base_name],
        )?;
        Ok(())
    }

    fn query_entries(
        &self,
        sql: &str,
        bind: impl rusqlite::Params,
    ) -> RepoResult<Vec<SignEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_sign_row(row)?);
        }
        Ok(entries)
    }
}

impl SignRepository for SqliteSignRepository<'_> {
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<SignEntry>> {
        self.query_entries(
            &format!("{SIGN_SELECT_SQL} WHERE name = ?1 ORDER BY sign_id ASC;"),
            [name],
        )
    }

    fn get_by_id(&self, sign_id: SignId) -> RepoResult<Option<SignEntry>> {
        let mut entries = self.query_entries(
            &format!("{SIGN_SELECT_SQL} WHERE sign_id = ?1;"),
            [sign_id],
        )?;
        Ok(entries.pop())
    }

    fn variants_of(&self, base_name: &str, except_name: &str) -> RepoResult<Vec<SignEntry>> {
        self.query_entries(
            &format!("{SIGN_SELECT_SQL} WHERE base_name = ?1 AND name != ?2 ORDER BY name ASC;"),
            params![base_name, except_name],
        )
    }
}

fn parse_sign_row(row: &Row<'_>) -> Result<SignEntry, RepoError> {
    Ok(SignEntry {
        sign_id: row.get("sign_id")?,
        name: row.get("name")?,
        base_name: row.get("base_name")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{SignRepository, SqliteSignRepository};
    use crate::db::open_db_in_memory;
    use crate::model::sign::SignEntry;
    use crate::repo::fact_repo::RepoError;

    fn entry(sign_id: i64, name: &str, base_name: &str) -> SignEntry {
        SignEntry {
            sign_id,
            name: name.to_string(),
            base_name: base_name.to_string(),
        }
    }

    #[test]
    fn unique_lookup_rejects_duplicates() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteSignRepository::new(&conn);
        repo.insert_sign(&entry(1, "M157", "M157")).unwrap();
        repo.insert_sign(&entry(2, "M288", "M288")).unwrap();
        repo.insert_sign(&entry(3, "M288", "M288")).unwrap();

        assert_eq!(
            repo.find_unique_by_name("M157").unwrap().map(|e| e.sign_id),
            Some(1)
        );
        assert!(repo.find_unique_by_name("M999").unwrap().is_none());
        assert!(matches!(
            repo.find_unique_by_name("M288"),
            Err(RepoError::AmbiguousSign { .. })
        ));
    }

    #[test]
    fn variants_share_base_name() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteSignRepository::new(&conn);
        repo.insert_sign(&entry(1, "M004", "M004")).unwrap();
        repo.insert_sign(&entry(2, "M004~B", "M004")).unwrap();
        repo.insert_sign(&entry(3, "M004~A", "M004")).unwrap();

        let names: Vec<String> = repo
            .variants_of("M004", "M004")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["M004~A", "M004~B"]);
    }
}
