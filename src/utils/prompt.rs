//! Line-based interactive prompts on the controlling terminal.
//!
//! Plain answers are read from stdin with the question on stdout. Secrets are
//! asked on stderr so they never end up in redirected output.

use std::io::{self, BufRead, Write};

use crate::error::{Result, SshmanError};

/// Read one line from stdin. End of input is treated as a cancellation.
fn read_line() -> Result<String> {
    let mut input = String::new();
    let read = io::stdin().lock().read_line(&mut input)?;
    if read == 0 {
        return Err(SshmanError::Cancelled);
    }
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// Ask a question, returning the trimmed answer or `default` when empty.
pub fn prompt(message: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) if !d.is_empty() => print!("{} [{}]: ", message, d),
        _ => print!("{}: ", message),
    }
    io::stdout().flush()?;
    let input = read_line()?;
    let input = input.trim();
    if input.is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(input.to_string())
    }
}

/// Ask until the answer passes `validate`. Each rejection is printed and the
/// question repeated.
pub fn prompt_validated<F>(message: &str, default: Option<&str>, validate: F) -> Result<String>
where
    F: Fn(&str) -> Result<()>,
{
    loop {
        let answer = prompt(message, default)?;
        match validate(&answer) {
            Ok(()) => return Ok(answer),
            Err(e) => eprintln!("  {}", e),
        }
    }
}

/// y/N confirmation prompt.
pub fn confirm(message: &str) -> Result<bool> {
    print!("{} [y/N]: ", message);
    io::stdout().flush()?;
    let input = read_line()?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Numbered menu. Returns the zero-based index of the chosen option;
/// an empty answer picks the first.
pub fn choose(message: &str, options: &[&str]) -> Result<usize> {
    println!("{}:", message);
    for (i, option) in options.iter().enumerate() {
        println!("  {}) {}", i + 1, option);
    }
    loop {
        print!("Selection [1]: ");
        io::stdout().flush()?;
        let input = read_line()?;
        let input = input.trim();
        if input.is_empty() {
            return Ok(0);
        }
        match input.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Ok(n - 1),
            _ => eprintln!("  Please enter a number between 1 and {}", options.len()),
        }
    }
}

/// Read a secret. Masked input uses the terminal's no-echo mode.
pub fn prompt_secret(message: &str, masked: bool) -> Result<String> {
    eprint!("{}: ", message);
    io::stderr().flush()?;
    if masked {
        Ok(rpassword::read_password()?)
    } else {
        read_line()
    }
}

/// Ask for a new passphrase twice until both entries match and are non-empty.
pub fn prompt_new_passphrase(message: &str, masked: bool) -> Result<String> {
    loop {
        let first = prompt_secret(message, masked)?;
        if first.is_empty() {
            eprintln!("  Passphrase cannot be empty");
            continue;
        }
        let second = prompt_secret("Confirm passphrase", masked)?;
        if first == second {
            return Ok(first);
        }
        eprintln!("  Passphrases do not match");
    }
}
