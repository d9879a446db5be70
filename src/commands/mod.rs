pub mod forget;
pub mod history;
pub mod logs;
pub mod report;
pub mod revert;
pub mod status;
pub mod stop;
pub mod watch;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
    /// Structured payload for `--json` consumers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
            data: None,
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn merge(&mut self, mut other: CommandReport) {
        self.ok &= other.ok;
        self.details.append(&mut other.details);
        self.issues.append(&mut other.issues);
    }

    pub fn attach(&mut self, value: &impl Serialize) {
        match serde_json::to_value(value) {
            Ok(value) => self.data = Some(value),
            Err(err) => tracing::warn!("failed to serialise {} payload: {err}", self.command),
        }
    }
}
