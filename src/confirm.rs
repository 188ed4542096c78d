//! Confirmation prompts for bulk and destructive operations

use crate::error::DotfileError;

/// Asks the user a yes/no question
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> Result<bool, DotfileError>;
}

/// Always answers yes (`--assume-yes`, scripts, tests)
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> Result<bool, DotfileError> {
        Ok(true)
    }
}

/// Always answers no
#[derive(Debug, Clone, Copy, Default)]
pub struct Decline;

impl Confirm for Decline {
    fn confirm(&self, _prompt: &str) -> Result<bool, DotfileError> {
        Ok(false)
    }
}

/// Interactive terminal prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct DialoguerConfirm {
    pub assume_yes: bool,
}

impl Confirm for DialoguerConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool, DotfileError> {
        if self.assume_yes {
            return Ok(true);
        }
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| DotfileError::Config(format!("Failed to get user input: {}", e)))
    }
}
