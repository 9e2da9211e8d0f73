use clee_core::db::open_db_in_memory;
use clee_core::service::line_assembler::RowKind;
use clee_core::{
    render_table, ClosureEngine, Fact, LineAssembler, RenderOptions, SignEntry,
    SqliteFactRepository, SqliteSignRepository,
};
use rusqlite::Connection;

fn plain(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| console::strip_ansi_codes(line).into_owned())
        .collect()
}

fn sign(sign_id: i64, name: &str) -> SignEntry {
    SignEntry {
        sign_id,
        name: name.to_string(),
        base_name: name.to_string(),
    }
}

fn token(facts: &SqliteFactRepository<'_>, uid: &str, name: &str, sign_id: &str) {
    facts.insert_fact(&Fact::new(uid, "DahlName", name)).unwrap();
    facts.insert_fact(&Fact::new(uid, "SignID", sign_id)).unwrap();
}

/// Line 1 of P000001: `M001` as running text, `2(N01)` as a numeral with
/// values in two systems.
fn seed_numeral_line(conn: &Connection) {
    let signs = SqliteSignRepository::new(conn);
    signs.insert_sign(&sign(1, "M001")).unwrap();
    signs.insert_sign(&sign(2, "N01")).unwrap();

    let facts = SqliteFactRepository::new(conn);
    token(&facts, "P000001:1:sgn:0", "M001", "1");
    token(&facts, "P000001:1:sgn:1", "N01", "2");
    facts
        .insert_fact(&Fact::new("P000001:1:sgn:1", "quantity", "2"))
        .unwrap();

    facts.insert_edge("P000001", "P000001:1:ent").unwrap();
    facts.insert_edge("P000001:1:ent", "P000001:1:txt").unwrap();
    facts.insert_edge("P000001:1:ent", "P000001:1:num").unwrap();
    facts.insert_edge("P000001:1:txt", "P000001:1:sgn:0").unwrap();
    facts.insert_edge("P000001:1:num", "P000001:1:sgn:1").unwrap();

    facts
        .insert_fact(&Fact::new("P000001:1:num", "val_sys-B", "0.5"))
        .unwrap();
    facts
        .insert_fact(&Fact::new("P000001:1:num", "val_sys-A", "2"))
        .unwrap();
}

#[test]
fn closure_follows_stored_membership_transitively() {
    let conn = open_db_in_memory().unwrap();
    seed_numeral_line(&conn);
    let facts = SqliteFactRepository::new(&conn);

    let closure = ClosureEngine::new(&facts).closure_for("P000001").unwrap();
    let ancestors: Vec<&str> = closure.ancestors_of("P000001:1:sgn:1").collect();
    assert_eq!(
        ancestors,
        vec!["P000001", "P000001:1:ent", "P000001:1:num"]
    );
    assert!(closure.is_contained_in("P000001:1:sgn:0", "P000001"));
    assert!(!closure.is_contained_in("P000001:1:sgn:0", "P000001:1:num"));
}

#[test]
fn closure_scope_stops_at_segment_boundary() {
    let conn = open_db_in_memory().unwrap();
    seed_numeral_line(&conn);
    let facts = SqliteFactRepository::new(&conn);
    facts.insert_edge("P0000012", "P0000012:1:ent").unwrap();

    let closure = ClosureEngine::new(&facts).closure_for("P000001").unwrap();
    assert_eq!(closure.ancestors_of("P0000012:1:ent").count(), 0);
}

#[test]
fn numeral_values_stack_one_row_per_system() {
    let conn = open_db_in_memory().unwrap();
    seed_numeral_line(&conn);
    let facts = SqliteFactRepository::new(&conn);

    let records = LineAssembler::new(&facts).assemble("P000001").unwrap();
    assert_eq!(records.len(), 2);

    let line = &records[0];
    assert_eq!(line.kind, RowKind::Line);
    assert_eq!(line.line_number, 1);
    assert_eq!(line.text, "M001 ");
    assert_eq!(line.numeral, "2(N01) ");
    assert_eq!(line.value, "=   2    xN01 (sys-A),");
    assert_eq!(
        line.label_cell(),
        "         :1:ent   :1:txt   :1:num   "
    );
    assert!(!line.is_header);

    let continuation = &records[1];
    assert_eq!(continuation.kind, RowKind::ValueContinuation);
    assert_eq!(continuation.value, "    0.50 xN01 (sys-B) ");
    assert_eq!(continuation.label_cell(), "");
    assert!(continuation.text.is_empty());

    let lines = plain(&render_table(&records, &RenderOptions::default()));
    assert_eq!(lines.len(), 6);
    assert!(lines[1].starts_with("│ LINE │"));
    assert!(lines[3].starts_with("│ :1   │"));
    assert!(lines[3].contains("  2   "));
    assert!(lines[4].starts_with("│      │"));
    assert!(lines[4].contains("  0.50"));
}

#[test]
fn header_span_flags_its_line() {
    let conn = open_db_in_memory().unwrap();
    seed_numeral_line(&conn);
    let facts = SqliteFactRepository::new(&conn);
    facts
        .insert_fact(&Fact::new("P000001:1:ent", "span_type", "HEADER"))
        .unwrap();

    let records = LineAssembler::new(&facts).assemble("P000001").unwrap();
    assert!(records[0].is_header);
    assert_eq!(records[0].flag_cell(), "H ");
    assert!(!records[1].is_header);
}

#[test]
fn unresolved_and_placeholder_names_render_distinctly() {
    let conn = open_db_in_memory().unwrap();
    let facts = SqliteFactRepository::new(&conn);
    token(&facts, "P000003:1:sgn:0", "M999", "-1");
    token(&facts, "P000003:1:sgn:1", "X", "-1");
    token(&facts, "P000003:2:sgn:0:0", "M001", "-1");
    token(&facts, "P000003:2:sgn:0:1", "M002", "-1");

    let records = LineAssembler::new(&facts).assemble("P000003").unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].text, "M999(!) X ");
    assert_eq!(records[1].text, "M001(!)+M002(!) ");
}

#[test]
fn tokens_outside_any_span_show_in_both_columns() {
    let conn = open_db_in_memory().unwrap();
    let facts = SqliteFactRepository::new(&conn);
    token(&facts, "P000003:1:sgn:0", "M999", "-1");
    token(&facts, "P000003:1:sgn:1", "X", "-1");

    let records = LineAssembler::new(&facts).assemble("P000003").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text, "M999(!) X ");
    assert_eq!(records[0].numeral, "M999(!) X ");
}

/// One token of `raw_len` characters inside a text span, so the text column
/// is `raw_len + 4` wide and the numeral column keeps its header width.
fn seed_wide_line(conn: &Connection, tablet: &str, raw_len: usize) {
    let facts = SqliteFactRepository::new(conn);
    let uid = format!("{tablet}:1:sgn:0");
    facts
        .insert_fact(&Fact::new(uid.as_str(), "DahlName", "M".repeat(raw_len)))
        .unwrap();
    facts
        .insert_edge(&format!("{tablet}:1:txt"), &uid)
        .unwrap();
}

#[test]
fn label_column_collapses_only_past_seventy() {
    let conn = open_db_in_memory().unwrap();
    seed_wide_line(&conn, "P000004", 20);
    seed_wide_line(&conn, "P000005", 21);
    let facts = SqliteFactRepository::new(&conn);
    let options = RenderOptions {
        hide_identifier_detail: false,
        ..RenderOptions::default()
    };

    // 36 + 2 + 24 + 8 = 70
    let at_limit = LineAssembler::new(&facts).assemble("P000004").unwrap();
    let lines = plain(&render_table(&at_limit, &options));
    assert!(lines[1].contains("SEGMENT  ENTRY    TEXT     NUMERAL"));
    assert!(lines[3].contains(":1:txt"));

    // 36 + 2 + 25 + 8 = 71
    let past_limit = LineAssembler::new(&facts).assemble("P000005").unwrap();
    let lines = plain(&render_table(&past_limit, &options));
    assert!(lines[1].starts_with("│ LINE │"));
    assert!(!lines[1].contains("SEGMENT"));
    assert!(lines[3].starts_with("│ :1   │"));
}

#[test]
fn unknown_scope_assembles_nothing() {
    let conn = open_db_in_memory().unwrap();
    seed_numeral_line(&conn);
    let facts = SqliteFactRepository::new(&conn);

    let records = LineAssembler::new(&facts).assemble("P999999").unwrap();
    assert!(records.is_empty());
    assert!(render_table(&records, &RenderOptions::default()).is_empty());
}
