use inquire::{Confirm, CustomType, Select};

use crate::error::Result;
use crate::models::{EnvironmentTag, NamespaceChoice};
use crate::session::Prompter;

/// Terminal prompts backed by `inquire`.
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn namespace(&mut self, choices: Vec<NamespaceChoice>) -> Result<NamespaceChoice> {
        Ok(Select::new("Select namespace:", choices).prompt()?)
    }

    fn service(&mut self, services: Vec<String>) -> Result<String> {
        Ok(Select::new("Select service:", services).prompt()?)
    }

    fn environment(&mut self, service: &str, environments: Vec<EnvironmentTag>) -> Result<EnvironmentTag> {
        Ok(Select::new(&format!("Select environment for {service}:"), environments).prompt()?)
    }

    fn remote_port(&mut self, detected: Vec<u16>, fallback: u16) -> Result<u16> {
        if detected.len() > 1 {
            return Ok(Select::new("Select remote port:", detected).prompt()?);
        }
        let suggested = detected.first().copied().unwrap_or(fallback);
        Ok(CustomType::<u16>::new("Remote port:")
            .with_default(suggested)
            .with_error_message("Port must be 0-65535")
            .prompt()?)
    }

    fn local_port(&mut self, suggested: u16) -> Result<u16> {
        Ok(CustomType::<u16>::new("Local port:")
            .with_default(suggested)
            .with_error_message("Port must be 0-65535")
            .prompt()?)
    }

    fn follow_logs(&mut self) -> Result<bool> {
        Ok(Confirm::new("Follow logs?").with_default(true).prompt()?)
    }
}

/// Asks whether to start another session after one ends.
pub fn another_session() -> Result<bool> {
    Ok(Confirm::new("Open another tunnel?").with_default(false).prompt()?)
}
