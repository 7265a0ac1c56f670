//! Line-based prompts: questions on stderr, answers from stdin.
//!
//! `q` or end of input cancels any prompt.

use std::io::{BufRead, Write};

use laymux_core::{InputRequest, LayoutError, Prompt, Prompter};

pub struct TermPrompter<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> TermPrompter<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.out
    }

    /// One trimmed line; `None` on EOF or `q`.
    fn ask(&mut self, prompt: &str) -> Result<Option<String>, LayoutError> {
        write!(self.out, "{prompt}").map_err(LayoutError::Prompt)?;
        self.out.flush().map_err(LayoutError::Prompt)?;
        let mut line = String::new();
        if self.input.read_line(&mut line).map_err(LayoutError::Prompt)? == 0 {
            writeln!(self.out).map_err(LayoutError::Prompt)?;
            return Ok(None);
        }
        let answer = line.trim();
        if answer == "q" {
            return Ok(None);
        }
        Ok(Some(answer.to_string()))
    }

    fn say(&mut self, message: &str) -> Result<(), LayoutError> {
        writeln!(self.out, "{message}").map_err(LayoutError::Prompt)
    }

    fn list(&mut self, title: &str, items: &[String]) -> Result<(), LayoutError> {
        self.say(title)?;
        for (idx, item) in items.iter().enumerate() {
            writeln!(self.out, "  {:>2}) {item}", idx + 1).map_err(LayoutError::Prompt)?;
        }
        Ok(())
    }
}

/// Parse `1,3 4` into zero-based indices, in the order given.
fn parse_indices(answer: &str, len: usize) -> Result<Vec<usize>, String> {
    answer
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| match token.parse::<usize>() {
            Ok(n) if (1..=len).contains(&n) => Ok(n - 1),
            _ => Err(format!("{token:?} is not a number between 1 and {len}")),
        })
        .collect()
}

impl<R: BufRead, W: Write> Prompter for TermPrompter<R, W> {
    fn input(&mut self, request: &InputRequest<'_>) -> Result<Prompt<String>, LayoutError> {
        let mut prompt = request.prompt.to_string();
        match (request.initial, request.placeholder) {
            (Some(initial), _) => prompt.push_str(&format!(" [{initial}]")),
            (None, Some(placeholder)) => prompt.push_str(&format!(" ({placeholder})")),
            (None, None) => {}
        }
        prompt.push_str(": ");

        loop {
            let Some(answer) = self.ask(&prompt)? else {
                return Ok(Prompt::Cancelled);
            };
            let answer = match (answer.is_empty(), request.initial) {
                (true, Some(initial)) => initial.to_string(),
                _ => answer,
            };
            match request.check(&answer) {
                Some(problem) => self.say(&format!("  {problem}"))?,
                None => return Ok(Prompt::Value(answer)),
            }
        }
    }

    fn select(&mut self, title: &str, items: &[String]) -> Result<Prompt<usize>, LayoutError> {
        self.list(title, items)?;
        loop {
            let Some(answer) = self.ask("> ")? else {
                return Ok(Prompt::Cancelled);
            };
            match parse_indices(&answer, items.len()).as_deref() {
                Ok([idx]) => return Ok(Prompt::Value(*idx)),
                Ok(_) => self.say("  pick exactly one number")?,
                Err(problem) => self.say(&format!("  {problem}"))?,
            }
        }
    }

    fn multi_select(
        &mut self,
        title: &str,
        items: &[String],
    ) -> Result<Prompt<Vec<usize>>, LayoutError> {
        self.list(title, items)?;
        loop {
            let Some(answer) = self.ask("numbers, e.g. 1,3 (blank for none)> ")? else {
                return Ok(Prompt::Cancelled);
            };
            match parse_indices(&answer, items.len()) {
                Ok(indices) => return Ok(Prompt::Value(indices)),
                Err(problem) => self.say(&format!("  {problem}"))?,
            }
        }
    }

    fn confirm(&mut self, question: &str) -> Result<Prompt<bool>, LayoutError> {
        let prompt = format!("{question} [y/N] ");
        loop {
            let Some(answer) = self.ask(&prompt)? else {
                return Ok(Prompt::Cancelled);
            };
            match answer.to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(Prompt::Value(true)),
                "" | "n" | "no" => return Ok(Prompt::Value(false)),
                _ => self.say("  answer y or n")?,
            }
        }
    }

    fn notify(&mut self, message: &str) {
        if let Err(e) = self.say(message) {
            tracing::warn!("failed to write message: {e}");
        }
    }
}
