use clee_core::db::open_db_in_memory;
use clee_core::{
    CommentRequest, CommentService, CommentServiceError, Confirmer, Fact, ResolveError,
    SignEntry, SqliteCommentRepository, SqliteFactRepository, SqliteSignRepository,
};
use rusqlite::Connection;

const NO_LINKS_QUESTION: &str =
    "This comment does not refer to any objects or signs. Add it anyways?";

/// Confirmer that replays scripted answers and records every prompt.
#[derive(Default)]
struct Scripted {
    answers: Vec<bool>,
    questions: Vec<String>,
    notices: Vec<String>,
}

impl Scripted {
    fn answering(answers: &[bool]) -> Self {
        Self {
            answers: answers.to_vec(),
            ..Self::default()
        }
    }
}

impl Confirmer for Scripted {
    fn confirm(&mut self, question: &str) -> bool {
        self.questions.push(question.to_string());
        if self.answers.is_empty() {
            false
        } else {
            self.answers.remove(0)
        }
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

fn seed(conn: &Connection) {
    let signs = SqliteSignRepository::new(conn);
    for (sign_id, name) in [(1, "M001"), (2, "N39B")] {
        signs
            .insert_sign(&SignEntry {
                sign_id,
                name: name.to_string(),
                base_name: name.to_string(),
            })
            .unwrap();
    }

    let facts = SqliteFactRepository::new(conn);
    facts
        .insert_fact(&Fact::new("P000001", "publication", "MDP 6, 4"))
        .unwrap();
    facts.insert_edge("P000001", "P000001:7:num").unwrap();
    facts
        .insert_fact(&Fact::new(
            "P000010",
            "publication",
            "ABCDEFGHIJKLMN 12 35",
        ))
        .unwrap();
    facts
        .insert_fact(&Fact::new(
            "P000011",
            "publication",
            "ABCDEFGHIJKLMNOPQ 12 35",
        ))
        .unwrap();
}

fn service(conn: &Connection) -> CommentService<
    SqliteFactRepository<'_>,
    SqliteSignRepository<'_>,
    SqliteCommentRepository<'_>,
> {
    CommentService::new(
        SqliteFactRepository::new(conn),
        SqliteSignRepository::new(conn),
        SqliteCommentRepository::try_new(conn).unwrap(),
    )
}

fn request(body: &str) -> CommentRequest {
    CommentRequest {
        body: body.to_string(),
        ..CommentRequest::default()
    }
}

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn missing_sign_reference_is_reported_never_offered() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let mut confirmer = Scripted::answering(&[false]);

    let err = service(&conn)
        .add_comment(&request("M56 occurs"), &mut confirmer)
        .unwrap_err();

    assert!(err.is_abort());
    assert_eq!(
        confirmer.notices,
        vec!["This comment appears to refer to M056, but no such sign exists."]
    );
    assert_eq!(confirmer.questions, vec![NO_LINKS_QUESTION]);
}

#[test]
fn declined_override_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let mut confirmer = Scripted::answering(&[false]);

    let err = service(&conn)
        .add_comment(&request("nothing to link here"), &mut confirmer)
        .unwrap_err();

    assert!(matches!(
        err,
        CommentServiceError::Resolve(ResolveError::Aborted)
    ));
    assert_eq!(count_rows(&conn, "comments"), 0);
    assert_eq!(count_rows(&conn, "comment_objects"), 0);
    assert_eq!(count_rows(&conn, "comment_signs"), 0);
}

#[test]
fn accepted_override_stores_unlinked_comment() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let mut confirmer = Scripted::answering(&[true]);

    let outcome = service(&conn)
        .add_comment(&request("  general remark  "), &mut confirmer)
        .unwrap();

    assert!(outcome.links.is_empty());
    let body: String = conn
        .query_row(
            "SELECT body FROM comments WHERE comment_id = ?1;",
            [outcome.comment_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(body, "general remark");
}

#[test]
fn empty_comment_is_rejected_before_any_prompt() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let mut confirmer = Scripted::default();

    let err = service(&conn)
        .add_comment(&request("   "), &mut confirmer)
        .unwrap_err();

    assert!(matches!(err, CommentServiceError::EmptyComment));
    assert!(confirmer.questions.is_empty());
}

#[test]
fn unknown_explicit_links_abort_before_prompting() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let mut confirmer = Scripted::answering(&[true, true]);
    let err = service(&conn)
        .add_comment(
            &CommentRequest {
                body: "See P000001".to_string(),
                explicit_objects: vec!["p999999".to_string()],
                ..CommentRequest::default()
            },
            &mut confirmer,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        CommentServiceError::Resolve(ResolveError::ObjectNotFound(ref uid)) if uid == "P999999"
    ));
    assert!(confirmer.questions.is_empty());

    let err = service(&conn)
        .add_comment(
            &CommentRequest {
                body: "See P000001".to_string(),
                explicit_signs: vec!["n99".to_string()],
                ..CommentRequest::default()
            },
            &mut confirmer,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        CommentServiceError::Resolve(ResolveError::SignNotFound(ref name)) if name == "N99"
    ));
    assert_eq!(count_rows(&conn, "comments"), 0);
}

#[test]
fn citation_match_requires_score_above_ninety_five() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let mut confirmer = Scripted::answering(&[false]);
    let _ = service(&conn).add_comment(&request("ABCDEFGHIJKLMN 12 34"), &mut confirmer);
    assert_eq!(confirmer.questions, vec![NO_LINKS_QUESTION]);

    let mut confirmer = Scripted::answering(&[true]);
    let outcome = service(&conn)
        .add_comment(&request("ABCDEFGHIJKLMNOPQ 12 34"), &mut confirmer)
        .unwrap();
    assert_eq!(
        confirmer.questions,
        vec!["Does this comment refer to ABCDEFGHIJKLMNOPQ 12 35 (= P000011)?"]
    );
    assert_eq!(outcome.links.object_uids, vec!["P000011"]);
}

#[test]
fn confirmed_links_are_deduplicated_and_read_back() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = service(&conn);
    let mut confirmer = Scripted::answering(&[true, true]);

    let outcome = service
        .add_comment(
            &CommentRequest {
                body: "See P000001 (MDP 6, 4) for M1.".to_string(),
                explicit_objects: vec!["p000001".to_string(), "P000001:7:num".to_string()],
                explicit_signs: vec!["n39b".to_string()],
            },
            &mut confirmer,
        )
        .unwrap();

    assert_eq!(
        confirmer.questions,
        vec![
            "Does this comment refer to P000001?",
            "Does this comment refer to M001?",
        ]
    );
    assert_eq!(outcome.links.object_uids, vec!["P000001", "P000001:7:num"]);
    assert_eq!(outcome.links.sign_ids, vec![1, 2]);

    let exact = service.comments_for_object("P000001:7:num").unwrap();
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].body, "See P000001 (MDP 6, 4) for M1.");
    assert_eq!(exact[0].sign_names, vec!["M001", "N39B"]);

    assert_eq!(service.comments_in_scope("P000001").unwrap().len(), 1);
    assert!(service.comments_in_scope("P00000").unwrap().is_empty());
    assert_eq!(service.comments_for_sign(2).unwrap(), exact);

    let json = serde_json::to_value(&exact[0]).unwrap();
    assert_eq!(json["object_uids"][1], "P000001:7:num");
}
