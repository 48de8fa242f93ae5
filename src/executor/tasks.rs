//! Delegated system maintenance tasks.

use serde::{Deserialize, Serialize};

use crate::core::config::SystemConfig;
use crate::executor::runner::render_command;
use crate::gate::confirm::ActionTag;

/// One external command the run may delegate to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemTask {
    /// Human-readable label.
    pub name: String,
    /// Decides whether emergency mode may auto-approve it.
    pub tag: ActionTag,
    /// Executable looked up on `PATH`.
    pub program: String,
    /// Arguments passed verbatim, no shell.
    pub args: Vec<String>,
}

impl SystemTask {
    fn new(name: &str, tag: ActionTag, program: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            tag,
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
        }
    }

    /// Full command as typed in a shell.
    #[must_use]
    pub fn command_line(&self) -> String {
        render_command(&self.program, &self.args)
    }

    /// Prompt and report text.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} (`{}`)", self.name, self.command_line())
    }
}

/// Tasks enabled by `config`, cleanup first, system changes last.
#[must_use]
pub fn system_tasks(config: &SystemConfig) -> Vec<SystemTask> {
    let mut tasks = Vec::new();
    if config.tasks {
        tasks.push(SystemTask::new("clean package cache", ActionTag::Cleanup, "apt-get", &["clean"]));
        tasks.push(SystemTask::new(
            "remove orphaned packages",
            ActionTag::Cleanup,
            "apt-get",
            &["autoremove", "-y"],
        ));
        tasks.push(SystemTask::new(
            "vacuum system journal",
            ActionTag::Cleanup,
            "journalctl",
            &["--vacuum-size=100M"],
        ));
        tasks.push(SystemTask::new(
            "prune container images",
            ActionTag::Cleanup,
            "docker",
            &["system", "prune", "-f"],
        ));
    }
    if config.upgrade {
        tasks.push(SystemTask::new(
            "system upgrade",
            ActionTag::SystemChange,
            "apt-get",
            &["upgrade", "-y"],
        ));
    }
    tasks
}
