use clee_core::db::open_db_in_memory;
use clee_core::{
    CommentRepository, DescribeError, DescribeService, DescribeTarget, Fact, NewComment,
    RenderOptions, SignEntry, SqliteCommentRepository, SqliteFactRepository,
    SqliteSignRepository,
};
use rusqlite::Connection;

type Service<'conn> = DescribeService<
    SqliteFactRepository<'conn>,
    SqliteSignRepository<'conn>,
    SqliteCommentRepository<'conn>,
>;

fn service(conn: &Connection) -> Service<'_> {
    DescribeService::new(
        SqliteFactRepository::new(conn),
        SqliteSignRepository::new(conn),
        SqliteCommentRepository::try_new(conn).unwrap(),
    )
}

fn plain(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| console::strip_ansi_codes(line).into_owned())
        .collect()
}

fn has_line(lines: &[String], expected: &str) -> bool {
    lines.iter().any(|line| line == expected)
}

fn sign(sign_id: i64, name: &str, base_name: &str) -> SignEntry {
    SignEntry {
        sign_id,
        name: name.to_string(),
        base_name: base_name.to_string(),
    }
}

fn token(facts: &SqliteFactRepository<'_>, uid: &str, name: &str, sign_id: &str) {
    facts.insert_fact(&Fact::new(uid, "DahlName", name)).unwrap();
    facts.insert_fact(&Fact::new(uid, "SignID", sign_id)).unwrap();
}

/// P000001 has two lines in one entry; line 2 holds a complex grapheme.
/// P000002 holds one unresolved name used on six tokens.
fn seed(conn: &Connection) {
    let signs = SqliteSignRepository::new(conn);
    signs.insert_sign(&sign(1, "M001", "M001")).unwrap();
    signs.insert_sign(&sign(2, "M001~A", "M001")).unwrap();
    signs.insert_sign(&sign(3, "M288", "M288")).unwrap();
    signs
        .insert_sign(&sign(4, "M001+M288", "M001+M288"))
        .unwrap();

    let facts = SqliteFactRepository::new(conn);
    facts
        .insert_fact(&Fact::new("P000001", "publication", "MDP 6, 4"))
        .unwrap();
    facts
        .insert_fact(&Fact::new("P000001", "collection", "Louvre"))
        .unwrap();
    facts
        .insert_fact(&Fact::new("P000001", "language", "proto-elamite"))
        .unwrap();

    token(&facts, "P000001:1:sgn:0", "M001", "1");
    token(&facts, "P000001:1:sgn:1", "M001~A", "2");
    token(&facts, "P000001:2:sgn:0:0", "M001", "1");
    token(&facts, "P000001:2:sgn:0:1", "M288", "3");
    facts.insert_object("P000001:2:sgn:0").unwrap();
    facts.insert_edge("P000001", "P000001:1:ent").unwrap();
    facts.insert_edge("P000001:1:ent", "P000001:1:sgn:0").unwrap();
    facts.insert_edge("P000001:1:ent", "P000001:1:sgn:1").unwrap();
    facts.insert_edge("P000001:1:ent", "P000001:2:sgn:0").unwrap();

    for index in 0..6 {
        token(&facts, &format!("P000002:1:sgn:{index}"), "M999", "-1");
    }
    token(&facts, "P000002:2:sgn:0", "X", "-1");
}

#[test]
fn input_resolves_to_identifier_before_sign_name() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = service(&conn);

    assert_eq!(
        service.resolve_target("p000001").unwrap(),
        DescribeTarget::Object("P000001".to_string())
    );
    assert_eq!(
        service.resolve_target("|m001~a|").unwrap(),
        DescribeTarget::Sign("M001~A".to_string())
    );

    let err = service.resolve_target("hello").unwrap_err();
    assert!(matches!(err, DescribeError::UnknownIdentifier(_)));
    assert_eq!(err.to_string(), "Unknown identifier: 'hello'");
}

#[test]
fn tablet_report_lists_publication_table_comments_and_attributes() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    SqliteCommentRepository::try_new(&conn)
        .unwrap()
        .insert_comment(&NewComment {
            body: "Entry opens with a variant.".to_string(),
            object_uids: vec!["P000001:1:ent".to_string()],
            sign_ids: vec![2],
        })
        .unwrap();

    let lines = plain(
        &service(&conn)
            .describe("P000001", &RenderOptions::default())
            .unwrap(),
    );

    assert!(lines[1].contains("║      P000001       ║"));
    assert!(has_line(&lines, "P000001 is the UID for MDP 6, 4"));
    assert!(lines.iter().any(|line| line.starts_with("│ :1   │")));
    assert!(lines
        .iter()
        .any(|line| line.contains("M001 M001~A ")));
    assert!(lines.iter().any(|line| line.contains("M001+M288 ")));
    assert!(has_line(&lines, "• Entry opens with a variant."));
    assert!(has_line(&lines, "  ↳ see also P000001:1:ent"));
    assert!(has_line(&lines, "  ↳ see also M001~A"));
    assert!(has_line(&lines, "collection: Louvre"));
    assert!(!lines.iter().any(|line| line.starts_with("language:")));
}

#[test]
fn token_reports_cover_instances_and_complex_graphemes() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = service(&conn);
    let options = RenderOptions::default();

    let lines = plain(&service.describe("P000001:1:sgn:1", &options).unwrap());
    assert!(has_line(
        &lines,
        "P000001:1:sgn:1 is an instance of M001~A (sign id 2)"
    ));

    let lines = plain(&service.describe("P000001:2:sgn:0", &options).unwrap());
    assert!(has_line(
        &lines,
        "P000001:2:sgn:0 is a complex grapheme with parts M001 (sign id 1) and M288 (sign id 3)"
    ));

    let lines = plain(&service.describe("P000002:1:sgn:0", &options).unwrap());
    assert!(has_line(
        &lines,
        "P000002:1:sgn:0 is an instance of M999, which does not exist in the signlist."
    ));
}

#[test]
fn sign_report_lists_variants_and_attestations() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = service(&conn);
    let options = RenderOptions::default();

    let lines = plain(&service.describe("M001", &options).unwrap());
    assert!(has_line(&lines, "M001 (sign id 1) has variants M001~A"));
    assert!(has_line(&lines, "M001 is attested 2 times in 1 texts:"));
    assert!(has_line(&lines, "  P000001 (x2)"));

    let lines = plain(&service.describe("M001~A", &options).unwrap());
    assert!(has_line(&lines, "M001~A (sign id 2) is a variant of M001"));

    let lines = plain(&service.describe("M001+M288", &options).unwrap());
    assert!(has_line(&lines, "The component M001 has sign id 1"));
    assert!(has_line(&lines, "The component M288 has sign id 3"));
    assert!(has_line(&lines, "M001+M288 is attested 1 times in 1 texts:"));

    let lines = plain(&service.describe("M288+M001", &options).unwrap());
    assert!(has_line(&lines, "The component M288 has sign id 3"));
    assert!(!lines.iter().any(|line| line.contains("attested")));

    let lines = plain(&service.describe("M777", &options).unwrap());
    assert!(has_line(
        &lines,
        "M777 looks like a sign name, but it's not in the signlist."
    ));
    assert!(!lines.iter().any(|line| line.contains("attested")));
}

#[test]
fn decorator_marks_prose_and_table_once() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let mark = |line: &str| line.replace("M288", "<M288>");
    let options = RenderOptions {
        decorator: Some(&mark),
        ..RenderOptions::default()
    };

    let lines = plain(&service(&conn).describe("P000001:2:sgn:0", &options).unwrap());
    assert!(lines.iter().any(|line| line.contains("and <M288> (sign id 3)")));
    assert!(lines.iter().any(|line| line.contains("M001+<M288>")));
    assert!(!lines.iter().any(|line| line.contains("<<M288>>")));
}

#[test]
fn errors_report_groups_unresolved_names() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let lines = service(&conn).errors_report().unwrap();
    assert_eq!(
        lines,
        vec![
            "Sign 'M999' does not exist in the signlist. Used on 6 tokens: \
             P000002:1:sgn:0, P000002:1:sgn:1, P000002:1:sgn:2, P000002:1:sgn:3, \
             P000002:1:sgn:4, ..."
                .to_string()
        ]
    );
}

#[test]
fn grep_attestations_follow_the_catalog() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = service(&conn);

    let texts = service.sign_attestations("M288").unwrap().unwrap();
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].tablet, "P000001");
    assert!(service.sign_attestations("M777").unwrap().is_none());
    assert!(service.sign_attestations("M001+M777").unwrap().is_none());
}
