use std::io::{self, BufRead, Write};

use posts_core::{Confirm, Container};

/// Holds whatever was rendered last. Intermediate views such as the loading
/// indicator are replaced before anything reaches the terminal.
#[derive(Debug, Default)]
pub struct Screen {
    content: Option<String>,
}

impl Screen {
    pub fn flush_to(&self, mut out: impl Write) -> io::Result<()> {
        if let Some(content) = &self.content {
            writeln!(out, "{content}")?;
        }
        Ok(())
    }
}

impl Container for Screen {
    fn replace(&mut self, content: String) {
        tracing::trace!(len = content.len(), "screen replaced");
        self.content = Some(content);
    }
}

/// Asks on stderr and reads one line from `input`. Only `y`/`yes` confirm;
/// EOF or a read error counts as no.
pub struct Prompt<R> {
    input: R,
}

impl<R: BufRead> Prompt<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> Confirm for Prompt<R> {
    fn confirm(&mut self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        let _ = io::stderr().flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        }
    }
}
