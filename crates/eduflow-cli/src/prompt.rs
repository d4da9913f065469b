//! Interactive prompts
//!
//! Used for confirmations and for secrets that should not end up in shell
//! history when they are not passed as flags.

use anyhow::{bail, Result};
use std::io::{self, BufRead, Write};

/// Prompt for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let answer = read_line(&mut io::stdin().lock())?;
    Ok(is_yes(&answer))
}

/// Use the flag value if given, otherwise ask for it on stdin
pub fn value_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    if let Some(v) = value {
        return Ok(v);
    }
    if !atty::is(atty::Stream::Stdin) {
        bail!("{} is required (no terminal to prompt on)", prompt);
    }

    print!("{}: ", prompt);
    io::stdout().flush()?;
    read_line(&mut io::stdin().lock())
}

fn read_line(input: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

fn is_yes(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer == "y" || answer == "yes"
}
