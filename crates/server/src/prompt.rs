//! Interactive prompting for missing credentials.
//!
//! Questions go to stderr; stdout is reserved for MCP messages.

use sonar_mcp_tools::config::Prompter;
use std::io::{BufRead as _, Write as _};

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt(&mut self, label: &str) -> std::io::Result<String> {
        let mut stderr = std::io::stderr().lock();
        write!(stderr, "{label}: ")?;
        stderr.flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}
