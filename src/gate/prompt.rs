//! Answer sources for interactive prompts.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::io::BufRead;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};

/// What came back from one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAnswer {
    Line(String),
    /// Nothing arrived before the deadline.
    TimedOut,
    /// The input stream ended.
    Closed,
}

/// Bounded-wait line source.
pub trait PromptInput {
    fn read_answer(&mut self, timeout: Duration) -> PromptAnswer;
}

/// Reads stdin on a background thread so the wait can be bounded.
///
/// The reader thread is spawned on first use and lives for the rest of the
/// process. Lines typed after a prompt timed out are discarded before the
/// next prompt.
#[derive(Debug, Default)]
pub struct StdinPrompt {
    lines: Option<Receiver<Option<String>>>,
}

impl StdinPrompt {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn receiver(&mut self) -> &Receiver<Option<String>> {
        self.lines.get_or_insert_with(|| {
            let (tx, rx) = unbounded();
            thread::spawn(move || {
                let stdin = std::io::stdin();
                let mut handle = stdin.lock();
                loop {
                    let mut line = String::new();
                    match handle.read_line(&mut line) {
                        Ok(0) | Err(_) => {
                            let _ = tx.send(None);
                            break;
                        }
                        Ok(_) => {
                            if tx.send(Some(line)).is_err() {
                                break;
                            }
                        }
                    }
                }
            });
            rx
        })
    }
}

impl PromptInput for StdinPrompt {
    fn read_answer(&mut self, timeout: Duration) -> PromptAnswer {
        let rx = self.receiver();
        while let Ok(stale) = rx.try_recv() {
            if stale.is_none() {
                return PromptAnswer::Closed;
            }
        }
        match rx.recv_timeout(timeout) {
            Ok(Some(line)) => PromptAnswer::Line(line),
            Ok(None) | Err(RecvTimeoutError::Disconnected) => PromptAnswer::Closed,
            Err(RecvTimeoutError::Timeout) => PromptAnswer::TimedOut,
        }
    }
}

/// Replays a fixed list of answers; `Closed` once exhausted.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompt {
    answers: VecDeque<PromptAnswer>,
    asked: usize,
}

impl ScriptedPrompt {
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = PromptAnswer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: 0,
        }
    }

    /// Number of prompts that were actually shown.
    #[must_use]
    pub const fn asked(&self) -> usize {
        self.asked
    }
}

impl PromptInput for ScriptedPrompt {
    fn read_answer(&mut self, _timeout: Duration) -> PromptAnswer {
        self.asked += 1;
        self.answers.pop_front().unwrap_or(PromptAnswer::Closed)
    }
}

impl<T: PromptInput + ?Sized> PromptInput for &mut T {
    fn read_answer(&mut self, timeout: Duration) -> PromptAnswer {
        (**self).read_answer(timeout)
    }
}

impl<T: PromptInput + ?Sized> PromptInput for Box<T> {
    fn read_answer(&mut self, timeout: Duration) -> PromptAnswer {
        (**self).read_answer(timeout)
    }
}
