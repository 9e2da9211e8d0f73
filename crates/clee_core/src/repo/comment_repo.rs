//! Comment repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist a comment with all of its object/sign links atomically.
//! - Read comments back by linked object (exact or scope) or catalog key.
//!
//! # Invariants
//! - `insert_comment` writes the comment row and every link in one
//!   immediate transaction; on any failure nothing is persisted.
//! - Links are written in request order; duplicates are ignored.

use crate::model::comment::{CommentId, CommentRecord, NewComment};
use crate::model::sign::SignId;
use crate::repo::fact_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

/// How a linked object identifier is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectMatch {
    /// Link uid equals the requested uid.
    Exact,
    /// Link uid equals the requested uid or lies under it.
    Scope,
}

/// Repository interface for comments and their links.
pub trait CommentRepository {
    /// Writes the comment row and all links in one immediate transaction.
    fn insert_comment(&self, comment: &NewComment) -> RepoResult<CommentId>;
    fn comments_for_object(&self, uid: &str, mode: ObjectMatch) -> RepoResult<Vec<CommentRecord>>;
    fn comments_for_sign(&self, sign_id: SignId) -> RepoResult<Vec<CommentRecord>>;
}

/// SQLite-backed comment repository.
pub struct SqliteCommentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCommentRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_comment_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_records(&self, sql: &str, bind: impl rusqlite::Params) -> RepoResult<Vec<CommentRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let comment_id: CommentId = row.get("comment_id")?;
            records.push(CommentRecord {
                comment_id,
                body: row.get("body")?,
                object_uids: load_object_links(self.conn, comment_id)?,
                sign_names: load_sign_links(self.conn, comment_id)?,
            });
        }
        Ok(records)
    }
}

impl CommentRepository for SqliteCommentRepository<'_> {
    fn insert_comment(&self, comment: &NewComment) -> RepoResult<CommentId> {
        if comment.body.trim().is_empty() {
            return Err(RepoError::InvalidArgument("empty comment".to_string()));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO comments (body) VALUES (?1);",
            [comment.body.as_str()],
        )?;
        let comment_id = tx.last_insert_rowid();

        for uid in &comment.object_uids {
            tx.execute(
                "INSERT OR IGNORE INTO comment_objects (comment_id, uid) VALUES (?1, ?2);",
                params![comment_id, uid],
            )?;
        }
        for sign_id in &comment.sign_ids {
            tx.execute(
                "INSERT OR IGNORE INTO comment_signs (comment_id, sign_id) VALUES (?1, ?2);",
                params![comment_id, sign_id],
            )?;
        }

        tx.commit()?;
        Ok(comment_id)
    }

    fn comments_for_object(&self, uid: &str, mode: ObjectMatch) -> RepoResult<Vec<CommentRecord>> {
        let sql = match mode {
            ObjectMatch::Exact => {
                "SELECT c.comment_id, c.body
                 FROM comments c
                 WHERE EXISTS (
                    SELECT 1 FROM comment_objects l
                    WHERE l.comment_id = c.comment_id AND l.uid = ?1
                 )
                 ORDER BY c.comment_id ASC;"
            }
            ObjectMatch::Scope => {
                "SELECT c.comment_id, c.body
                 FROM comments c
                 WHERE EXISTS (
                    SELECT 1 FROM comment_objects l
                    WHERE l.comment_id = c.comment_id
                      AND (l.uid = ?1 OR substr(l.uid, 1, length(?1) + 1) = ?1 || ':')
                 )
                 ORDER BY c.comment_id ASC;"
            }
        };
        self.load_records(sql, [uid])
    }

    fn comments_for_sign(&self, sign_id: SignId) -> RepoResult<Vec<CommentRecord>> {
        self.load_records(
            "SELECT c.comment_id, c.body
             FROM comments c
             WHERE EXISTS (
                SELECT 1 FROM comment_signs l
                WHERE l.comment_id = c.comment_id AND l.sign_id = ?1
             )
             ORDER BY c.comment_id ASC;",
            [sign_id],
        )
    }
}

fn load_object_links(conn: &Connection, comment_id: CommentId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT uid FROM comment_objects WHERE comment_id = ?1 ORDER BY rowid ASC;",
    )?;
    let mut rows = stmt.query([comment_id])?;
    let mut uids = Vec::new();
    while let Some(row) = rows.next()? {
        uids.push(row.get(0)?);
    }
    Ok(uids)
}

fn load_sign_links(conn: &Connection, comment_id: CommentId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT s.name
         FROM comment_signs l
         INNER JOIN signs s ON s.sign_id = l.sign_id
         WHERE l.comment_id = ?1
         ORDER BY l.rowid ASC;",
    )?;
    let mut rows = stmt.query([comment_id])?;
    let mut names = Vec::new();
    while let Some(row) = rows.next()? {
        names.push(row.get(0)?);
    }
    Ok(names)
}

fn ensure_comment_connection_ready(conn: &Connection) -> RepoResult<()> {
    for table in ["comments", "comment_objects", "comment_signs"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    for (table, column) in [
        ("comments", "body"),
        ("comment_objects", "uid"),
        ("comment_signs", "sign_id"),
    ] {
        if !table_has_column(conn, table, column)? {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
