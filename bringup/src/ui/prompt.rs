//! Typed operator prompts.
//!
//! Sessions ask questions through the [`Operator`] trait so their decision
//! logic runs the same against a terminal ([`TerminalOperator`]) and a script
//! of canned answers ([`ScriptedOperator`]).

use bringup_error::{GateError, GateResult};
use dialoguer::Input;
use std::collections::VecDeque;

/// A numbered menu. Answers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub title: String,
    pub items: Vec<String>,
    pub prompt: String,
}

impl Selection {
    pub fn new(title: impl Into<String>, items: Vec<String>, prompt: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items,
            prompt: prompt.into(),
        }
    }

    /// Menu body as printed to the terminal.
    pub fn render(&self) -> String {
        let mut out = format!("{}\n", self.title);
        for (idx, item) in self.items.iter().enumerate() {
            out.push_str(&format!("{}) {}\n", idx + 1, item));
        }
        out
    }
}

pub trait Operator {
    /// Returns the 0-based index of the chosen item.
    fn select(&mut self, selection: &Selection) -> GateResult<usize>;

    fn confirm(&mut self, prompt: &str, default: bool) -> GateResult<bool>;

    /// Free-form answer; may be empty.
    fn text(&mut self, prompt: &str) -> GateResult<String>;
}

/// Parse a 1-based menu answer into a 0-based index.
pub fn parse_selection(answer: &str, len: usize) -> GateResult<usize> {
    let trimmed = answer.trim();
    let number: usize = trimmed
        .parse()
        .map_err(|_| GateError::OperatorInput(format!("'{}' is not a valid number", trimmed)))?;
    if number == 0 || number > len {
        return Err(GateError::OperatorInput(format!(
            "selection {} is out of range (1-{})",
            number, len
        )));
    }
    Ok(number - 1)
}

/// Yes/no prompt with the default shown in capitals.
pub fn confirm_prompt(prompt: &str, default: bool) -> String {
    let choices = if default { "(Y/n)" } else { "(y/N)" };
    format!("{} {}", prompt, choices)
}

/// Parse a yes/no answer; an empty answer takes `default`.
pub fn parse_confirmation(answer: &str, default: bool) -> GateResult<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        other => Err(GateError::OperatorInput(format!(
            "'{}' is not a yes/no answer",
            other
        ))),
    }
}

#[derive(Debug, Default)]
pub struct TerminalOperator;

impl TerminalOperator {
    pub fn new() -> Self {
        Self
    }
}

fn read_line(prompt: &str) -> GateResult<String> {
    Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(|e| GateError::OperatorInput(format!("failed to read input: {}", e)))
}

impl Operator for TerminalOperator {
    fn select(&mut self, selection: &Selection) -> GateResult<usize> {
        print!("{}", selection.render());
        let answer = read_line(&selection.prompt)?;
        parse_selection(&answer, selection.items.len())
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> GateResult<bool> {
        let answer = read_line(&confirm_prompt(prompt, default))?;
        parse_confirmation(&answer, default)
    }

    fn text(&mut self, prompt: &str) -> GateResult<String> {
        Ok(read_line(prompt)?.trim().to_string())
    }
}

/// Operator answering from a fixed script, recording every menu it was shown.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: VecDeque<String>,
    shown: Vec<Selection>,
    asked: Vec<String>,
}

impl ScriptedOperator {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn menus(&self) -> &[Selection] {
        &self.shown
    }

    pub fn questions(&self) -> &[String] {
        &self.asked
    }

    fn next_answer(&mut self, prompt: &str) -> GateResult<String> {
        self.asked.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| GateError::OperatorInput(format!("no answer for '{}'", prompt)))
    }
}

impl Operator for ScriptedOperator {
    fn select(&mut self, selection: &Selection) -> GateResult<usize> {
        self.shown.push(selection.clone());
        let answer = self.next_answer(&selection.prompt)?;
        parse_selection(&answer, selection.items.len())
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> GateResult<bool> {
        let answer = self.next_answer(prompt)?;
        parse_confirmation(&answer, default)
    }

    fn text(&mut self, prompt: &str) -> GateResult<String> {
        Ok(self.next_answer(prompt)?.trim().to_string())
    }
}
