//! Line-oriented terminal input for the wizard
//!
//! Sensitive fields are read without echo when stdin is a terminal. When
//! input is piped (scripts, tests) every answer is a plain line.

use std::io::{self, BufRead, IsTerminal, Write};

use crate::error::{KycError, KycResult};

/// What the user typed at a field prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldInput {
    /// A new value for the field
    Value(String),
    /// Empty line: keep whatever the field holds
    Keep,
    /// `:back`
    Back,
    /// `:save`
    Save,
    /// `:quit` or end of input
    Quit,
}

impl FieldInput {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Self::Keep,
            ":back" | ":b" => Self::Back,
            ":save" | ":s" => Self::Save,
            ":quit" | ":q" => Self::Quit,
            value => Self::Value(value.to_string()),
        }
    }
}

/// Source of user answers
pub struct Console {
    input: Box<dyn BufRead>,
    tty: bool,
}

impl Console {
    /// Read from the process's stdin
    pub fn stdin() -> Self {
        let stdin = io::stdin();
        let tty = stdin.is_terminal();
        Self {
            input: Box::new(stdin.lock()),
            tty,
        }
    }

    /// Read answers from a fixed script, never from a terminal
    pub fn scripted(input: impl BufRead + 'static) -> Self {
        Self {
            input: Box::new(input),
            tty: false,
        }
    }

    /// Prompt for a line; `None` at end of input
    pub fn line(&mut self, prompt: &str) -> KycResult<Option<String>> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut input = String::new();
        let read = self.input.read_line(&mut input)?;
        if read == 0 {
            println!();
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }

    /// Prompt for a line without echo when attached to a terminal
    pub fn hidden(&mut self, prompt: &str) -> KycResult<Option<String>> {
        if !self.tty {
            return self.line(prompt);
        }
        rpassword::prompt_password(prompt)
            .map(|s| Some(s.trim().to_string()))
            .map_err(|e| KycError::Io(format!("Failed to read hidden input: {}", e)))
    }

    /// Prompt for one field of the form
    pub fn field(&mut self, label: &str, current: &str, sensitive: bool) -> KycResult<FieldInput> {
        let shown = if current.is_empty() {
            String::new()
        } else if sensitive {
            " [****]".to_string()
        } else {
            format!(" [{}]", current)
        };
        let prompt = format!("  {}{}: ", label, shown);

        let answer = if sensitive {
            self.hidden(&prompt)?
        } else {
            self.line(&prompt)?
        };
        Ok(answer.map_or(FieldInput::Quit, |a| FieldInput::parse(&a)))
    }

    /// Ask a one-letter choice; blank picks `default`, end of input `None`
    pub fn choice(&mut self, prompt: &str, default: char) -> KycResult<Option<char>> {
        let Some(answer) = self.line(prompt)? else {
            return Ok(None);
        };
        Ok(Some(
            answer
                .chars()
                .next()
                .map(|c| c.to_ascii_lowercase())
                .unwrap_or(default),
        ))
    }
}

/// Turn a camelCase field name into a label
pub fn field_label(field: &str) -> String {
    let mut label = String::with_capacity(field.len() + 4);
    for (i, c) in field.chars().enumerate() {
        if i == 0 {
            label.push(c.to_ascii_uppercase());
        } else if c.is_ascii_uppercase() {
            label.push(' ');
            label.push(c.to_ascii_lowercase());
        } else if c.is_ascii_digit() && !label.ends_with(|p: char| p.is_ascii_digit()) {
            label.push(' ');
            label.push(c);
        } else {
            label.push(c);
        }
    }
    label
}
