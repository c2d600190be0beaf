use std::io::{self, BufRead, Write};

use crate::overwrite::{ConfirmPrompt, OverwriteConflict, OverwritePolicy};

const CHOICES: &str = "[y]es / [n]o / [a]ll";

/// Asks on a line-oriented terminal. End of input counts as "no".
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> io::Result<OverwritePolicy> {
        loop {
            write!(self.output, "{question} {CHOICES}: ")?;
            self.output.flush()?;

            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                writeln!(self.output)?;
                return Ok(OverwritePolicy::Abort);
            }
            match answer.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(OverwritePolicy::Proceed),
                "n" | "no" => return Ok(OverwritePolicy::Abort),
                "a" | "all" => return Ok(OverwritePolicy::SkipRemaining),
                _ => writeln!(self.output, "Please answer y, n or a.")?,
            }
        }
    }
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stderr> {
    /// Reads answers from stdin and asks on stderr.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> ConfirmPrompt for TerminalPrompt<R, W> {
    fn confirm(&mut self, conflict: &OverwriteConflict<'_>) -> OverwritePolicy {
        self.ask(&conflict.to_string())
            .unwrap_or(OverwritePolicy::Abort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn answer(input: &str) -> (OverwritePolicy, String) {
        let mut output = Vec::new();
        let policy = {
            let mut prompt = TerminalPrompt::new(input.as_bytes(), &mut output);
            prompt.confirm(&OverwriteConflict::OutputFile {
                path: Path::new("/tmp/a.jar"),
            })
        };
        (policy, String::from_utf8(output).unwrap())
    }

    #[test]
    fn recognised_answers() {
        assert_eq!(answer("y\n").0, OverwritePolicy::Proceed);
        assert_eq!(answer("YES\n").0, OverwritePolicy::Proceed);
        assert_eq!(answer("n\n").0, OverwritePolicy::Abort);
        assert_eq!(answer(" a \n").0, OverwritePolicy::SkipRemaining);
        assert_eq!(answer("all\n").0, OverwritePolicy::SkipRemaining);
    }

    #[test]
    fn unknown_answer_asks_again() {
        let (policy, output) = answer("maybe\ny\n");
        assert_eq!(policy, OverwritePolicy::Proceed);
        assert_eq!(output.matches("Overwrite it?").count(), 2);
        assert!(output.contains("Please answer"));
    }

    #[test]
    fn end_of_input_declines() {
        assert_eq!(answer("").0, OverwritePolicy::Abort);
        assert_eq!(answer("what\n").0, OverwritePolicy::Abort);
    }

    #[test]
    fn question_names_the_file() {
        let (_, output) = answer("y\n");
        assert!(output.starts_with("The file '/tmp/a.jar' already exists. Overwrite it?"));
    }
}
