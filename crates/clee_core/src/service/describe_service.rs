//! Read-only reports built on the line assembler and table renderer.
//!
//! # Responsibility
//! - Describe an object (tablet, span, token) or a sign by name.
//! - Report attestations per tablet and catalog errors.
//!
//! # Invariants
//! - Reports never write to the store.
//! - The render decorator applies to every produced line exactly once.

use crate::model::comment::CommentRecord;
use crate::model::fact::attr;
use crate::model::sign::{
    is_compound, is_placeholder, parse_sign_name, split_compound, SignEntry, SignId,
};
use crate::model::uid::{self, ObjectKind};
use crate::repo::comment_repo::{CommentRepository, ObjectMatch};
use crate::repo::fact_repo::{Attestation, FactRepository, RepoError};
use crate::repo::sign_repo::SignRepository;
use crate::service::line_assembler::LineAssembler;
use crate::service::table_renderer::{render_table, RenderOptions};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Width used to center headers and wrap prose.
pub const REPORT_WIDTH: usize = 70;
const HEADER_BOX_INNER: usize = 20;
const FIRST_SEGMENT_HEAD: usize = 2;
const ERROR_EXAMPLE_TOKENS: usize = 5;

#[derive(Debug)]
pub enum DescribeError {
    Repo(RepoError),
    /// Input is neither a known identifier nor sign-shaped.
    UnknownIdentifier(String),
}

impl Display for DescribeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::UnknownIdentifier(input) => write!(f, "Unknown identifier: '{input}'"),
        }
    }
}

impl Error for DescribeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::UnknownIdentifier(_) => None,
        }
    }
}

impl From<RepoError> for DescribeError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// What a user-typed describe argument refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescribeTarget {
    /// Stored identifier, in stored casing.
    Object(String),
    /// Sign name in catalog form.
    Sign(String),
}

/// Draws a centered three-line title box.
pub fn header_box(title: &str) -> Vec<String> {
    let rule = "═".repeat(HEADER_BOX_INNER);
    [
        format!("╔{rule}╗"),
        format!(
            "║{:^width$}║",
            title.to_uppercase(),
            width = HEADER_BOX_INNER
        ),
        format!("╚{rule}╝"),
    ]
    .into_iter()
    .map(|line| {
        format!("{:^width$}", line, width = REPORT_WIDTH)
            .trim_end()
            .to_string()
    })
    .collect()
}

/// Greedy word wrap; words longer than the width stay on their own line.
pub fn wrap_text(text: &str, width: usize, initial_indent: &str, indent: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = initial_indent.to_string();
    let mut has_word = false;
    for word in text.split_whitespace() {
        let needed = current.chars().count() + usize::from(has_word) + word.chars().count();
        if has_word && needed > width {
            lines.push(std::mem::replace(&mut current, indent.to_string()));
            has_word = false;
        }
        if has_word {
            current.push(' ');
        }
        current.push_str(word);
        has_word = true;
    }
    if has_word {
        lines.push(current);
    }
    lines
}

/// Output buffer that decorates prose lines and keeps rendered tables as is.
struct Report<'a> {
    lines: Vec<String>,
    options: RenderOptions<'a>,
}

impl<'a> Report<'a> {
    fn new(options: RenderOptions<'a>) -> Self {
        Self {
            lines: Vec::new(),
            options,
        }
    }

    fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        let line = match self.options.decorator {
            Some(decorate) => decorate(line.as_str()),
            None => line,
        };
        self.lines.push(line);
    }

    fn header(&mut self, title: &str) {
        for line in header_box(title) {
            self.push(line);
        }
    }

    fn extend_rendered(&mut self, rendered: Vec<String>) {
        self.lines.extend(rendered);
    }
}

/// Describe/report service facade over repository implementations.
pub struct DescribeService<F: FactRepository, S: SignRepository, C: CommentRepository> {
    facts: F,
    signs: S,
    comments: C,
}

impl<F, S, C> DescribeService<F, S, C>
where
    F: FactRepository,
    S: SignRepository,
    C: CommentRepository,
{
    pub fn new(facts: F, signs: S, comments: C) -> Self {
        Self {
            facts,
            signs,
            comments,
        }
    }

    /// Interprets user input as an identifier first, then as a sign name.
    pub fn resolve_target(&self, input: &str) -> Result<DescribeTarget, DescribeError> {
        if let Some(uid) = self.facts.canonical_uid(input)? {
            return Ok(DescribeTarget::Object(uid));
        }
        parse_sign_name(input)
            .map(DescribeTarget::Sign)
            .ok_or_else(|| DescribeError::UnknownIdentifier(input.trim().to_string()))
    }

    pub fn describe(
        &self,
        input: &str,
        options: &RenderOptions<'_>,
    ) -> Result<Vec<String>, DescribeError> {
        match self.resolve_target(input)? {
            DescribeTarget::Object(uid) => self.describe_object(&uid, options),
            DescribeTarget::Sign(name) => self.describe_sign(&name, options),
        }
    }

    /// Renders the transliteration table for the tablet-relative `scope`.
    pub fn render_scope(
        &self,
        scope: &str,
        options: &RenderOptions<'_>,
    ) -> Result<Vec<String>, DescribeError> {
        let records = LineAssembler::new(&self.facts).assemble(scope)?;
        Ok(render_table(&records, options))
    }

    pub fn describe_object(
        &self,
        uid: &str,
        options: &RenderOptions<'_>,
    ) -> Result<Vec<String>, DescribeError> {
        let kind = ObjectKind::of(uid);
        let facts = self.facts.facts_for(uid)?;
        let mut report = Report::new(*options);
        report.header(uid);

        match kind {
            ObjectKind::Tablet => {
                if let Some(publication) = facts.iter().find(|fact| fact.attribute == attr::PUBLICATION) {
                    report.push(format!("{uid} is the UID for {}", publication.value));
                    report.push("");
                }
                report.extend_rendered(self.render_scope(uid, options)?);
            }
            ObjectKind::Entry | ObjectKind::TextSpan | ObjectKind::Numeral => {
                let scope = uid::parent_of(uid).unwrap_or(uid);
                report.extend_rendered(self.render_scope(scope, options)?);
            }
            ObjectKind::Sign => {
                for line in self.describe_token(uid)? {
                    report.push(line);
                }
                report.push("");
                report.extend_rendered(self.render_scope(&uid::line_scope(uid), options)?);
            }
            ObjectKind::FirstSegment => {
                let head = RenderOptions {
                    head: Some(FIRST_SEGMENT_HEAD),
                    ..*options
                };
                report.extend_rendered(self.render_scope(uid::tablet_of(uid), &head)?);
            }
            ObjectKind::Unknown => {}
        }
        report.push("");

        let comments = self
            .comments
            .comments_for_object(&uid::line_scope(uid), ObjectMatch::Scope)?;
        push_comments(&mut report, &comments, uid);

        let mut listed: Vec<(&str, Vec<&str>)> = Vec::new();
        for fact in &facts {
            if attr::STRUCTURAL.contains(&fact.attribute.as_str()) {
                continue;
            }
            match listed.iter_mut().find(|(name, _)| *name == fact.attribute) {
                Some((_, values)) => {
                    if !values.contains(&fact.value.as_str()) {
                        values.push(fact.value.as_str());
                    }
                }
                None => listed.push((fact.attribute.as_str(), vec![fact.value.as_str()])),
            }
        }
        if !listed.is_empty() {
            report.header("attributes");
            for (name, values) in listed {
                report.push(format!("{name}: {}", values.join(", ")));
            }
        }

        debug!(
            "event=describe module=describe status=ok kind={} lines={}",
            kind.describe(),
            report.lines.len()
        );
        Ok(report.lines)
    }

    fn describe_token(&self, uid: &str) -> Result<Vec<String>, DescribeError> {
        let (sign_id, raw_name) = self.token_names(uid)?;
        if let Some(sign_id) = sign_id {
            return Ok(vec![match self.signs.get_by_id(sign_id)? {
                Some(entry) => format!("{uid} is an instance of {} (sign id {sign_id})", entry.name),
                None => format!(
                    "{uid} is an instance of {}, which does not exist in the signlist.",
                    raw_name.unwrap_or_default()
                ),
            }]);
        }

        let mut parts = Vec::new();
        for part in self.facts.objects_under(uid)? {
            let (part_id, part_raw) = self.token_names(&part)?;
            let catalog = match part_id {
                Some(id) => self.signs.get_by_id(id)?.map(|entry| entry.name),
                None => None,
            };
            let name = catalog.or(part_raw).unwrap_or_default();
            let key = part_id.map_or_else(|| "unknown".to_string(), |id| id.to_string());
            parts.push(format!("{name} (sign id {key})"));
        }
        Ok(vec![format!(
            "{uid} is a complex grapheme with parts {}",
            parts.join(" and ")
        )])
    }

    fn token_names(&self, uid: &str) -> Result<(Option<SignId>, Option<String>), DescribeError> {
        let facts = self.facts.facts_for(uid)?;
        let sign_id = facts
            .iter()
            .find(|fact| fact.attribute == attr::SIGN_ID)
            .and_then(|fact| fact.value.trim().parse().ok());
        let raw_name = facts
            .iter()
            .find(|fact| fact.attribute == attr::RAW_SIGN_NAME)
            .map(|fact| fact.value.clone());
        Ok((sign_id, raw_name))
    }

    pub fn describe_sign(
        &self,
        name: &str,
        options: &RenderOptions<'_>,
    ) -> Result<Vec<String>, DescribeError> {
        let mut report = Report::new(*options);
        let entry = self.signs.find_by_name(name)?.into_iter().next();
        let mut show_texts = entry.is_some();

        match &entry {
            Some(entry) => {
                self.push_variants(&mut report, entry)?;
                let comments = self.comments.comments_for_sign(entry.sign_id)?;
                push_comments(&mut report, &comments, name);
            }
            None => {
                report.push(format!(
                    "{name} looks like a sign name, but it's not in the signlist."
                ));
                report.push("");
            }
        }

        let attestations = if is_compound(name) {
            report.header("components");
            let mut component_ids = Vec::new();
            for component in split_compound(name) {
                match self.signs.find_unique_by_name(component)? {
                    Some(found) => {
                        report.push(format!(
                            "The component {component} has sign id {}",
                            found.sign_id
                        ));
                        component_ids.push(found.sign_id);
                    }
                    None => {
                        report.push(format!("The component {component} is not in the signlist"));
                        show_texts = false;
                    }
                }
            }
            report.push("");
            if show_texts && (2..=3).contains(&component_ids.len()) {
                Some(self.facts.attestations_by_grapheme(&component_ids)?)
            } else {
                None
            }
        } else {
            match &entry {
                Some(entry) if show_texts => Some(self.facts.attestations_by_sign(entry.sign_id)?),
                _ => None,
            }
        };

        if let Some(mut texts) = attestations {
            let total: usize = texts.iter().map(|text| text.count).sum();
            report.header("attestations");
            report.push(format!(
                "{name} is attested {total} times in {} texts:",
                texts.len()
            ));
            texts.sort_by(|left, right| right.count.cmp(&left.count));
            let listing = texts
                .iter()
                .map(|text| format!("{} (x{})", text.tablet, text.count))
                .collect::<Vec<_>>()
                .join(", ");
            for line in wrap_text(&listing, REPORT_WIDTH, "  ", "  ") {
                report.push(line);
            }
            report.push("");
        }

        Ok(report.lines)
    }

    fn push_variants(&self, report: &mut Report<'_>, entry: &SignEntry) -> Result<(), DescribeError> {
        if entry.is_variant() {
            report.header("variants");
            report.push(format!(
                "{} (sign id {}) is a variant of {}",
                entry.name, entry.sign_id, entry.base_name
            ));
            report.push("");
            return Ok(());
        }

        let variants = self.signs.variants_of(&entry.base_name, &entry.name)?;
        if !variants.is_empty() {
            let names: Vec<&str> = variants.iter().map(|variant| variant.name.as_str()).collect();
            report.header("variants");
            report.push(format!(
                "{} (sign id {}) has variants {}",
                entry.name,
                entry.sign_id,
                names.join(", ")
            ));
            report.push("");
        }
        Ok(())
    }

    /// Tablets attesting `name` in tablet order, or `None` when the sign
    /// (or one of its components) is not in the catalog.
    pub fn sign_attestations(&self, name: &str) -> Result<Option<Vec<Attestation>>, DescribeError> {
        if is_compound(name) {
            let components = split_compound(name);
            if !(2..=3).contains(&components.len()) {
                return Ok(None);
            }
            let mut ids = Vec::with_capacity(components.len());
            for component in components {
                match self.signs.find_unique_by_name(component)? {
                    Some(entry) => ids.push(entry.sign_id),
                    None => return Ok(None),
                }
            }
            return Ok(Some(self.facts.attestations_by_grapheme(&ids)?));
        }

        match self.signs.find_by_name(name)?.first() {
            Some(entry) => Ok(Some(self.facts.attestations_by_sign(entry.sign_id)?)),
            None => Ok(None),
        }
    }

    /// Raw sign names without a catalog row, placeholders skipped.
    pub fn errors_report(&self) -> Result<Vec<String>, DescribeError> {
        let mut lines = Vec::new();
        for unresolved in self.facts.unresolved_signs()? {
            if is_placeholder(&unresolved.name) {
                continue;
            }
            let total = unresolved.token_uids.len();
            let mut examples = unresolved
                .token_uids
                .iter()
                .take(ERROR_EXAMPLE_TOKENS)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if total > ERROR_EXAMPLE_TOKENS {
                examples.push_str(", ...");
            }
            lines.push(format!(
                "Sign '{}' does not exist in the signlist. Used on {total} tokens: {examples}",
                unresolved.name
            ));
        }
        Ok(lines)
    }
}

fn push_comments(report: &mut Report<'_>, comments: &[CommentRecord], subject: &str) {
    if comments.is_empty() {
        return;
    }
    report.header("comments");
    for comment in comments {
        for line in wrap_text(&comment.body, REPORT_WIDTH, "• ", "  ") {
            report.push(line);
        }
        for linked in comment.object_uids.iter().chain(&comment.sign_names) {
            if linked != subject {
                report.push(format!("  ↳ see also {linked}"));
            }
        }
        report.push("");
    }
}
