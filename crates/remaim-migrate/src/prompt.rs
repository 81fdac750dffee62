//! Operator interaction.
//!
//! Every interactive choice goes through [`Prompter`]: free text questions,
//! validated index selection and yes/no confirmation.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};

use remaim_core::{Error, Result};

/// Terminal-like channel to the operator.
pub trait Prompter: Send {
    /// Print text as-is.
    fn say(&mut self, text: &str);

    /// Print the question and read one answer line, trimmed.
    fn ask(&mut self, question: &str) -> Result<String>;

    /// Ask until the answer is an integer within `[min, max]`.
    ///
    /// With `allow_empty`, an empty answer is returned as-is and means
    /// "go back" or "skip" to the caller.
    fn select_index(
        &mut self,
        message: &str,
        max: u64,
        min: u64,
        allow_empty: bool,
    ) -> Result<String> {
        loop {
            let answer = self.ask(message)?;
            if allow_empty && answer.is_empty() {
                return Ok(answer);
            }
            match answer.parse::<u64>() {
                Ok(index) if (min..=max).contains(&index) => return Ok(answer),
                _ => self.say(&format!(
                    "You must select a value between {} and {}\n",
                    min, max
                )),
            }
        }
    }

    /// Yes only for `y` or `Y`.
    fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.ask(question)?;
        Ok(answer == "y" || answer == "Y")
    }
}

// =============================================================================
// Terminal implementation
// =============================================================================

/// Prompter reading from a line source and writing to an output stream.
pub struct StdPrompter<R, W> {
    input: R,
    output: W,
}

impl StdPrompter<BufReader<std::io::Stdin>, std::io::Stdout> {
    /// Prompter bound to the process' stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> StdPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Give back the output stream.
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead + Send, W: Write + Send> Prompter for StdPrompter<R, W> {
    fn say(&mut self, text: &str) {
        // A broken stdout leaves nothing to report to
        let _ = self.output.write_all(text.as_bytes());
        let _ = self.output.flush();
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}: \n> ", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Error::InputClosed);
        }
        Ok(line.trim().to_string())
    }
}

// =============================================================================
// Scripted implementation
// =============================================================================

/// Prompter answering from a fixed script, recording everything it is told.
///
/// Running out of answers behaves like a closed terminal.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    transcript: Vec<String>,
    questions: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Everything said and asked, in order.
    pub fn transcript(&self) -> String {
        self.transcript.concat()
    }

    /// Questions asked so far.
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn say(&mut self, text: &str) {
        self.transcript.push(text.to_string());
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        self.questions.push(question.to_string());
        self.transcript.push(format!("{}: \n> ", question));

        let answer = self.answers.pop_front().ok_or(Error::InputClosed)?;
        self.transcript.push(format!("{}\n", answer));
        Ok(answer.trim().to_string())
    }
}
