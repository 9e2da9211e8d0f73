//! Re-linearization of a tablet into physical-line records.
//!
//! # Responsibility
//! - Group sign tokens by physical line in identifier order.
//! - Partition each line's touching spans into the four span dimensions
//!   and derive per-line labels, header flag, text, numeral and values.
//!
//! # Invariants
//! - A token outside every numeral span is running text; a token outside
//!   every text span is numeral text; a token in neither shows in both.
//! - Value rows of one numeral are sorted by system name; only the first
//!   row carries labels.
//! - Records are recomputed on every call; nothing is cached.

use crate::model::fact::Fact;
use crate::model::sign::is_placeholder;
use crate::model::uid::{self, SpanDimension};
use crate::repo::fact_repo::{FactRepository, RepoResult, TokenFacts};
use crate::service::closure::{Closure, ClosureEngine};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Width of one dimension label inside the label cell.
pub const LABEL_WIDTH: usize = 9;
/// Marker appended to raw names that have no catalog row.
pub const UNRESOLVED_MARKER: &str = "(!)";

/// Whether a record opens a physical line or continues its value list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Line,
    ValueContinuation,
}

/// One output row of the assembled transliteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    pub line_number: u32,
    pub kind: RowKind,
    /// First touching span per dimension, as full identifiers.
    pub labels: BTreeMap<SpanDimension, String>,
    pub is_header: bool,
    /// Running text, each token followed by ` ` or `+`.
    pub text: String,
    pub numeral: String,
    /// One formatted value row (`= <value> xN01 (<system>),`), or empty.
    pub value: String,
}

impl LineRecord {
    /// Label cell text: each dimension label without its tablet prefix,
    /// padded to nine columns. Empty for value continuation rows.
    pub fn label_cell(&self) -> String {
        if self.kind == RowKind::ValueContinuation {
            return String::new();
        }
        SpanDimension::ALL
            .iter()
            .map(|dimension| {
                let label = self
                    .labels
                    .get(dimension)
                    .map(|span| uid::without_tablet(span))
                    .unwrap_or_default();
                format!("{:<width$}", label, width = LABEL_WIDTH)
            })
            .collect()
    }

    pub fn flag_cell(&self) -> &'static str {
        if self.is_header {
            "H "
        } else {
            " "
        }
    }

    fn continuation(line_number: u32, value: String) -> Self {
        Self {
            line_number,
            kind: RowKind::ValueContinuation,
            labels: BTreeMap::new(),
            is_header: false,
            text: String::new(),
            numeral: String::new(),
            value,
        }
    }
}

/// Everything the assembler reads for one tablet.
#[derive(Debug, Clone, Default)]
pub struct TabletSnapshot {
    /// Tokens in identifier order.
    pub tokens: Vec<TokenFacts>,
    pub closure: Closure,
    /// Span uid -> system name -> raw value.
    pub values: BTreeMap<String, BTreeMap<String, String>>,
    pub header_spans: BTreeSet<String>,
}

impl TabletSnapshot {
    /// Indexes `val_<system>` facts by owner and system.
    pub fn index_values(facts: &[Fact]) -> BTreeMap<String, BTreeMap<String, String>> {
        let mut values: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for fact in facts {
            if let Some(system) = fact.value_system() {
                values
                    .entry(fact.uid.clone())
                    .or_default()
                    .insert(system.to_string(), fact.value.clone());
            }
        }
        values
    }
}

/// Loads tablet data from the store and assembles line records.
pub struct LineAssembler<R: FactRepository> {
    repo: R,
}

impl<R: FactRepository> LineAssembler<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn snapshot(&self, tablet: &str) -> RepoResult<TabletSnapshot> {
        let tokens = self.repo.tokens_under(tablet)?;
        let closure = ClosureEngine::new(&self.repo).closure_for(tablet)?;
        let values = TabletSnapshot::index_values(&self.repo.value_facts_under(tablet)?);
        let header_spans = self.repo.header_spans_under(tablet)?;
        Ok(TabletSnapshot {
            tokens,
            closure,
            values,
            header_spans,
        })
    }

    /// Assembles the ordered physical-line records of `tablet`.
    pub fn assemble(&self, tablet: &str) -> RepoResult<Vec<LineRecord>> {
        let snapshot = self.snapshot(tablet)?;
        let records = assemble_lines(&snapshot);
        debug!(
            "event=lines_assemble module=assembler status=ok tablet={} tokens={} rows={}",
            tablet,
            snapshot.tokens.len(),
            records.len()
        );
        Ok(records)
    }
}

/// Display form of a token, or `None` when it has no name at all.
pub fn token_display(token: &TokenFacts) -> Option<String> {
    let name = match (&token.catalog_name, &token.raw_name) {
        (Some(catalog), _) => catalog.clone(),
        (None, Some(raw)) if is_placeholder(raw) => raw.clone(),
        (None, Some(raw)) => format!("{raw}{UNRESOLVED_MARKER}"),
        (None, None) => return None,
    };
    Some(match &token.quantity {
        Some(quantity) => format!("{quantity}({name})"),
        None => name,
    })
}

/// Formats a numeral value as `{:>6.2}` with a `.00` fraction blanked.
pub fn format_value(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(number) => format!("{number:>6.2}").replace(".00", "   "),
        Err(_) => format!("{:>6}", raw.trim()),
    }
}

/// Builds the value rows of one numeral span, sorted by system name.
pub fn value_rows(values: &BTreeMap<String, String>) -> Vec<String> {
    let last = values.len().saturating_sub(1);
    values
        .iter()
        .enumerate()
        .map(|(index, (system, raw))| {
            format!(
                "{} {} xN01 ({}){}",
                if index == 0 { '=' } else { ' ' },
                format_value(raw),
                system.replace(',', ""),
                if index < last { ',' } else { ' ' }
            )
        })
        .collect()
}

/// Assembles line records from an already loaded snapshot.
pub fn assemble_lines(snapshot: &TabletSnapshot) -> Vec<LineRecord> {
    let mut lines: BTreeMap<u32, Vec<&TokenFacts>> = BTreeMap::new();
    for token in &snapshot.tokens {
        if let Some(line_number) = uid::line_number(&token.uid) {
            lines.entry(line_number).or_default().push(token);
        }
    }

    let mut records = Vec::new();
    for (line_number, mut tokens) in lines {
        tokens.sort_by(|left, right| uid::compare(&left.uid, &right.uid));
        let labels = dimension_labels(&snapshot.closure, &tokens);
        let is_header = labels
            .values()
            .any(|span| snapshot.header_spans.contains(span));
        let text = join_tokens(&snapshot.closure, &tokens, SpanDimension::Numeral);
        let numeral = join_tokens(&snapshot.closure, &tokens, SpanDimension::TextSpan);

        let rows = labels
            .get(&SpanDimension::Numeral)
            .and_then(|span| snapshot.values.get(span))
            .map(value_rows)
            .unwrap_or_default();
        let mut rows = rows.into_iter();

        records.push(LineRecord {
            line_number,
            kind: RowKind::Line,
            labels,
            is_header,
            text,
            numeral,
            value: rows.next().unwrap_or_default(),
        });
        records.extend(rows.map(|value| LineRecord::continuation(line_number, value)));
    }
    records
}

fn dimension_labels(closure: &Closure, tokens: &[&TokenFacts]) -> BTreeMap<SpanDimension, String> {
    let mut touching: Vec<&str> = tokens
        .iter()
        .flat_map(|token| closure.ancestors_of(&token.uid))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    touching.sort_by(|left, right| uid::compare(left, right));

    let mut labels = BTreeMap::new();
    for span in touching {
        if let Some(dimension) = SpanDimension::classify(span) {
            labels.entry(dimension).or_insert_with(|| span.to_string());
        }
    }
    labels
}

/// Joins the tokens not contained in any span of `excluded`.
fn join_tokens(closure: &Closure, tokens: &[&TokenFacts], excluded: SpanDimension) -> String {
    let mut joined = String::new();
    for (index, token) in tokens.iter().enumerate() {
        let in_excluded = closure
            .ancestors_of(&token.uid)
            .any(|span| SpanDimension::classify(span) == Some(excluded));
        if in_excluded {
            continue;
        }
        let Some(display) = token_display(token) else {
            continue;
        };
        joined.push_str(&display);
        let next = tokens.get(index + 1).map(|next| next.uid.as_str());
        joined.push(if joins_next_component(&token.uid, next) {
            '+'
        } else {
            ' '
        });
    }
    joined
}

fn joins_next_component(current: &str, next: Option<&str>) -> bool {
    let Some(next) = next else {
        return false;
    };
    uid::is_grapheme_component(current)
        && uid::is_grapheme_component(next)
        && uid::parent_of(current) == uid::parent_of(next)
}
