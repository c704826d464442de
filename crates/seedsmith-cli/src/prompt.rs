use std::io::{self, BufRead, Write};

use crate::error::CliResult;

/// Yes/no questions asked before files are written.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> CliResult<bool>;
}

/// Asks on stdout and reads the answer from stdin. Anything but `y` or
/// `yes` declines.
#[derive(Debug, Default)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, question: &str) -> CliResult<bool> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{question} (yes|no) [no]:")?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(is_yes(&answer))
    }
}

/// `--yes`: every question is answered yes.
#[derive(Debug, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _question: &str) -> CliResult<bool> {
        Ok(true)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
