//! User-facing input and output.
//!
//! Commands print through a `Console` and ask for confirmation through it, so
//! tests can drive them with in-memory buffers.

use std::io::{self, BufRead, Write};

/// Input and output streams of a command.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    /// The process's standard input and output.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Write one line of output.
    pub fn echo(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)?;
        self.output.flush()
    }

    /// Ask a yes/no question until it gets a valid answer.
    ///
    /// Accepts `y` or `n` in any case. End of input counts as `n`.
    pub fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        loop {
            write!(self.output, "{} [y/n]: ", prompt)?;
            self.output.flush()?;

            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                writeln!(self.output)?;
                return Ok(false);
            }
            let answer = answer.trim_end_matches(['\r', '\n']);
            match answer.to_lowercase().as_str() {
                "y" => return Ok(true),
                "n" => return Ok(false),
                _ => writeln!(
                    self.output,
                    "Invalid input: '{}', must be one of 'y' or 'n'.",
                    answer
                )?,
            }
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
