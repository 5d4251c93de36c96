//! Interactive terminal input.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::rc::Rc;

use crate::{Error, Result};

/// Source of interactive answers.
pub trait Prompter {
    /// Ask a yes/no question. Only `y` or `yes` (any case) counts as yes.
    fn confirm(&mut self, question: &str) -> Result<bool>;

    /// Read one line of secret text. End of input yields an empty string.
    fn read_secret(&mut self, prompt: &str) -> Result<String>;
}

/// Returns true for `y` / `yes`, ignoring case and surrounding whitespace.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Reads from the controlling terminal.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        print!("{question} [y/N] ");
        std::io::stdout().flush().map_err(Error::Prompt)?;

        let mut answer = String::new();
        std::io::stdin()
            .read_line(&mut answer)
            .map_err(Error::Prompt)?;

        Ok(is_affirmative(&answer))
    }

    // Ctrl-C here ends the process before rpassword can turn echo back on;
    // `stty echo` (or `reset`) recovers the terminal.
    fn read_secret(&mut self, prompt: &str) -> Result<String> {
        match rpassword::prompt_password(prompt) {
            Ok(line) => Ok(line),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(String::new()),
            Err(e) => Err(Error::Prompt(e)),
        }
    }
}

/// Replays canned answers and records every question asked. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct ScriptedPrompter {
    script: Rc<RefCell<Script>>,
}

#[derive(Debug, Default)]
struct Script {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let script = Script {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        };
        Self {
            script: Rc::new(RefCell::new(script)),
        }
    }

    /// Every prompt shown so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.script.borrow().asked.clone()
    }

    fn next_answer(&self, prompt: &str) -> String {
        let mut script = self.script.borrow_mut();
        script.asked.push(prompt.to_string());
        script.answers.pop_front().unwrap_or_default()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.next_answer(question);
        Ok(is_affirmative(&answer))
    }

    fn read_secret(&mut self, prompt: &str) -> Result<String> {
        Ok(self.next_answer(prompt))
    }
}
