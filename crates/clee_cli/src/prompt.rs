//! Terminal interaction: yes/no confirmation, grep navigation and match
//! highlighting.

use clee_core::Confirmer;
use console::Style;
use dialoguer::{Confirm, Input};
use log::warn;

/// Confirmer backed by interactive terminal prompts.
#[derive(Debug, Default)]
pub struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn confirm(&mut self, question: &str) -> bool {
        match Confirm::new().with_prompt(question).interact() {
            Ok(answer) => answer,
            Err(err) => {
                warn!("event=prompt module=cli status=error error={err}");
                false
            }
        }
    }

    fn notify(&mut self, message: &str) {
        println!("{message}");
    }
}

/// Operator choice while paging through grep results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrepChoice {
    Next,
    Previous,
    Quit,
    /// One-based position typed by the operator.
    Jump(usize),
}

impl GrepChoice {
    /// Parses one answer; `None` means ask again.
    pub fn parse(answer: &str) -> Option<Self> {
        match answer.trim() {
            "n" => Some(Self::Next),
            "p" => Some(Self::Previous),
            "q" => Some(Self::Quit),
            other => other.parse().ok().map(Self::Jump),
        }
    }

    /// Index shown after this choice, or `None` once navigation leaves the
    /// list.
    pub fn apply(self, current: usize, total: usize) -> Option<usize> {
        let next = match self {
            Self::Next => current.checked_add(1)?,
            Self::Previous => current.checked_sub(1)?,
            Self::Quit => return None,
            Self::Jump(position) => position.checked_sub(1)?,
        };
        (next < total).then_some(next)
    }
}

/// Reads grep choices until one parses.
pub fn ask_grep_choice(total: usize) -> GrepChoice {
    let prompt = format!(
        "[n]ext text, [p]rev text, [q]uit, or enter a number to jump to the nth text (1-{total})"
    );
    loop {
        let answer = match Input::<String>::new()
            .with_prompt(prompt.as_str())
            .allow_empty(true)
            .interact_text()
        {
            Ok(answer) => answer,
            Err(err) => {
                warn!("event=prompt module=cli status=error error={err}");
                return GrepChoice::Quit;
            }
        };
        if let Some(choice) = GrepChoice::parse(&answer) {
            return choice;
        }
    }
}

/// Decorator that paints every occurrence of `needle` red and bold.
pub fn highlighter(needle: &str) -> impl Fn(&str) -> String {
    let painted = Style::new()
        .red()
        .bold()
        .force_styling(true)
        .apply_to(needle)
        .to_string();
    let needle = needle.to_string();
    move |line: &str| {
        if needle.is_empty() {
            line.to_string()
        } else {
            line.replace(needle.as_str(), &painted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{highlighter, GrepChoice};

    #[test]
    fn grep_choices_parse_letters_and_numbers() {
        assert_eq!(GrepChoice::parse("n"), Some(GrepChoice::Next));
        assert_eq!(GrepChoice::parse(" q "), Some(GrepChoice::Quit));
        assert_eq!(GrepChoice::parse("3"), Some(GrepChoice::Jump(3)));
        assert_eq!(GrepChoice::parse("x"), None);
        assert_eq!(GrepChoice::parse(""), None);
    }

    #[test]
    fn navigation_leaves_the_list_at_either_end() {
        assert_eq!(GrepChoice::Next.apply(0, 2), Some(1));
        assert_eq!(GrepChoice::Next.apply(1, 2), None);
        assert_eq!(GrepChoice::Previous.apply(0, 2), None);
        assert_eq!(GrepChoice::Jump(2).apply(0, 2), Some(1));
        assert_eq!(GrepChoice::Jump(0).apply(1, 2), None);
        assert_eq!(GrepChoice::Jump(9).apply(1, 2), None);
        assert_eq!(GrepChoice::Quit.apply(0, 2), None);
    }

    #[test]
    fn highlighter_wraps_matches_in_ansi_codes() {
        let highlight = highlighter("M004");
        let line = highlight("│ M004 M001 │");
        assert!(line.contains("\u{1b}["));
        assert_eq!(console::strip_ansi_codes(&line), "│ M004 M001 │");
        assert_eq!(highlight("│ M001 │"), "│ M001 │");
    }
}
