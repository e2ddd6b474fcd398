use std::io::{self, BufRead, Write};

/// Asks the user to approve a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> anyhow::Result<bool>;
}

pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> anyhow::Result<bool> {
        print!("{} [y/N] ", prompt);
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        Ok(is_yes(&input))
    }
}

/// `--yes` on the command line.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> anyhow::Result<bool> {
        Ok(true)
    }
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
        assert!(!is_yes("yeah"));
    }
}
