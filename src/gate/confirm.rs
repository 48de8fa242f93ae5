//! Approval policies and the gate that applies them.

#![allow(missing_docs)]

use std::fmt;
use std::io::Write;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::TidyError;
use crate::gate::prompt::{PromptAnswer, PromptInput};

/// How long a prompt waits before the action is denied.
pub const PROMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Run-wide approval policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmPolicy {
    /// Approve everything (`--yes`, `--quiet`).
    AutoYes,
    /// Approve cleanup without asking; system changes still prompt.
    EmergencyAutoYes,
    /// Ask, and treat silence as "no".
    PromptWithTimeout,
}

impl ConfirmPolicy {
    #[must_use]
    pub const fn auto_approves(self, tag: ActionTag) -> bool {
        match self {
            Self::AutoYes => true,
            Self::EmergencyAutoYes => matches!(tag, ActionTag::Cleanup),
            Self::PromptWithTimeout => false,
        }
    }
}

/// What an action does, as far as approval is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTag {
    /// Frees space or tidies files.
    Cleanup,
    /// Upgrades or installs software.
    SystemChange,
}

/// Gate verdict. A timeout is a denial, kept distinct for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    Approved,
    Denied,
    TimedOutDenied,
}

impl Confirmation {
    #[must_use]
    pub const fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::TimedOutDenied => "timed out",
        })
    }
}

/// Applies one [`ConfirmPolicy`] to every action of a run.
pub struct ConfirmationGate<'a> {
    policy: ConfirmPolicy,
    input: Box<dyn PromptInput + 'a>,
    out: Box<dyn Write + 'a>,
    timeout: Duration,
}

impl<'a> ConfirmationGate<'a> {
    #[must_use]
    pub fn new(
        policy: ConfirmPolicy,
        input: impl PromptInput + 'a,
        out: impl Write + 'a,
    ) -> Self {
        Self {
            policy,
            input: Box::new(input),
            out: Box::new(out),
            timeout: PROMPT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> ConfirmPolicy {
        self.policy
    }

    /// Decide on one action. Only terminal I/O happens here.
    pub fn confirm(&mut self, description: &str, tag: ActionTag) -> Confirmation {
        if self.policy.auto_approves(tag) {
            if self.policy == ConfirmPolicy::EmergencyAutoYes {
                let _ = writeln!(self.out, "[emergency] auto-approved: {description}");
            }
            return Confirmation::Approved;
        }

        let _ = write!(
            self.out,
            "{description}? [y/N] (no answer in {}s means no): ",
            self.timeout.as_secs()
        );
        let _ = self.out.flush();

        match self.input.read_answer(self.timeout) {
            PromptAnswer::Line(line) => {
                let answer = line.trim().to_ascii_lowercase();
                if answer == "y" || answer == "yes" {
                    Confirmation::Approved
                } else {
                    Confirmation::Denied
                }
            }
            PromptAnswer::TimedOut => {
                let timeout = TidyError::TimeoutDenied {
                    action: description.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                };
                let _ = writeln!(self.out);
                let _ = writeln!(self.out, "{timeout}; skipping");
                Confirmation::TimedOutDenied
            }
            PromptAnswer::Closed => {
                let _ = writeln!(self.out);
                Confirmation::Denied
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::prompt::ScriptedPrompt;

    #[test]
    fn auto_yes_never_prompts() {
        let mut prompt = ScriptedPrompt::default();
        let mut out = Vec::new();
        {
            let mut gate = ConfirmationGate::new(ConfirmPolicy::AutoYes, &mut prompt, &mut out);
            assert_eq!(gate.confirm("upgrade packages", ActionTag::SystemChange), Confirmation::Approved);
            assert_eq!(gate.confirm("move a.pdf", ActionTag::Cleanup), Confirmation::Approved);
        }
        assert_eq!(prompt.asked(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn emergency_auto_yes_covers_cleanup_only() {
        let mut prompt = ScriptedPrompt::new([PromptAnswer::Line("n\n".into())]);
        let mut out = Vec::new();
        {
            let mut gate =
                ConfirmationGate::new(ConfirmPolicy::EmergencyAutoYes, &mut prompt, &mut out);
            assert_eq!(gate.confirm("archive old.zip", ActionTag::Cleanup), Confirmation::Approved);
            assert_eq!(gate.confirm("upgrade packages", ActionTag::SystemChange), Confirmation::Denied);
        }
        assert_eq!(prompt.asked(), 1);
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("[emergency] auto-approved: archive old.zip"));
    }

    #[test]
    fn prompt_answers_map_to_verdicts() {
        let mut prompt = ScriptedPrompt::new([
            PromptAnswer::Line(" YES \n".into()),
            PromptAnswer::Line("maybe\n".into()),
            PromptAnswer::TimedOut,
            PromptAnswer::Closed,
        ]);
        let mut gate = ConfirmationGate::new(
            ConfirmPolicy::PromptWithTimeout,
            &mut prompt,
            std::io::sink(),
        )
        .with_timeout(Duration::from_millis(5));
        assert_eq!(gate.confirm("a", ActionTag::Cleanup), Confirmation::Approved);
        assert_eq!(gate.confirm("b", ActionTag::Cleanup), Confirmation::Denied);
        assert_eq!(gate.confirm("c", ActionTag::Cleanup), Confirmation::TimedOutDenied);
        assert_eq!(gate.confirm("d", ActionTag::Cleanup), Confirmation::Denied);
    }

    #[test]
    fn timeout_notice_carries_error_code() {
        let mut prompt = ScriptedPrompt::new([PromptAnswer::TimedOut]);
        let mut out = Vec::new();
        let verdict = ConfirmationGate::new(ConfirmPolicy::PromptWithTimeout, &mut prompt, &mut out)
            .confirm("delete x.tmp", ActionTag::Cleanup);
        assert_eq!(verdict, Confirmation::TimedOutDenied);
        let text = String::from_utf8(out).expect("utf8");
        assert!(
            text.contains("[TT-3003] no answer within 120s for: delete x.tmp; skipping"),
            "{text}"
        );
    }

    #[test]
    fn default_timeout_is_two_minutes() {
        assert_eq!(PROMPT_TIMEOUT, Duration::from_secs(120));
    }
}
