use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use colored::Colorize;
use dialoguer::Confirm as Prompt;

use crate::commands::{DbResult, help_text};
use crate::db::{CANCELLED, Confirm, Database, NO_MATCHES};
use crate::error::Result;
use crate::protocol::parse_command;
use crate::storage::Storage;

pub const WELCOME: &str = "***Database***";
const PROMPT: &str = "Enter command: ";

/// Interactive `[y/N]` confirmation on the terminal. Anything other
/// than an explicit yes, including a non-interactive stdin, declines.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, action: &str) -> bool {
        Prompt::new()
            .with_prompt(format!("Are you sure you want to {}?", action))
            .default(false)
            .interact()
            .unwrap_or_else(|e| {
                log::warn!("confirmation prompt failed: {}", e);
                false
            })
    }
}

/// What one input line produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Nothing,
    Output(String),
    /// A write that went through.
    Confirmed(String),
    Error(String),
    Exit(String),
}

/// Ctrl-C state shared between the signal handler and the loop. An
/// interrupt at the prompt may exit at once; one that lands while a
/// command runs is honoured before the next prompt.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    requested: Arc<AtomicBool>,
    busy: Arc<AtomicBool>,
}

impl Interrupt {
    /// Records the interrupt. Returns true when no command is running,
    /// so the process can stop right away.
    pub fn trigger(&self) -> bool {
        self.requested.store(true, Ordering::SeqCst);
        !self.busy.load(Ordering::SeqCst)
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }
}

/// Logs how long each command took, when enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timing {
    enabled: bool,
}

impl Timing {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn observe<T>(&self, label: &str, f: impl FnOnce() -> T) -> T {
        if !self.enabled {
            return f();
        }
        let start = Instant::now();
        let result = f();
        self.report(label, start.elapsed());
        result
    }

    fn report(&self, label: &str, elapsed: Duration) {
        log::info!("{:<32}{:.3}s", format!("'{}' finished in", label), elapsed.as_secs_f64());
    }
}

pub struct Shell<S: Storage> {
    db: Database<S>,
    timing: Timing,
    interrupt: Interrupt,
}

impl<S: Storage> Shell<S> {
    pub fn new(db: Database<S>, timing: Timing) -> Self {
        Self {
            db,
            timing,
            interrupt: Interrupt::default(),
        }
    }

    pub fn database(&self) -> &Database<S> {
        &self.db
    }

    /// Handle for a Ctrl-C handler to flag this loop.
    pub fn interrupt(&self) -> Interrupt {
        self.interrupt.clone()
    }

    /// Runs one line through parse and execute, capturing every error
    /// as a printable message.
    pub fn handle(&mut self, line: &str) -> Outcome {
        let label = line.split_whitespace().next().unwrap_or_default().to_lowercase();
        let mut mutating = false;
        let result = self.timing.observe(&label, || -> Result<Option<DbResult>> {
            let Some(cmd) = parse_command(line)? else {
                return Ok(None);
            };
            mutating = cmd.is_mutating();
            self.db.execute(cmd).map(Some)
        });

        match result {
            Ok(None) => Outcome::Nothing,
            Ok(Some(DbResult::Exit)) => Outcome::Exit(DbResult::Exit.to_string()),
            Ok(Some(DbResult::Message(text)))
                if mutating && text != CANCELLED && text != NO_MATCHES =>
            {
                log::debug!("'{}' committed", label);
                Outcome::Confirmed(text)
            }
            Ok(Some(result)) => Outcome::Output(result.to_string()),
            Err(e) => Outcome::Error(format!("Error: {}", e)),
        }
    }

    /// Reads commands until `exit`, end of input or an interrupt. Lines
    /// that are not valid UTF-8 are decoded lossily and handled like any
    /// other input.
    pub fn run(&mut self, mut input: impl BufRead, mut output: impl Write) -> anyhow::Result<()> {
        writeln!(output, "{}\n\n{}\n", WELCOME, help_text())?;
        let mut buf = Vec::new();
        loop {
            if self.interrupt.is_requested() {
                writeln!(output, "\n{}", DbResult::Exit)?;
                break;
            }
            write!(output, "{}", PROMPT)?;
            output.flush()?;

            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                writeln!(output)?;
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);

            self.interrupt.set_busy(true);
            let outcome = self.handle(line);
            self.interrupt.set_busy(false);

            match outcome {
                Outcome::Nothing => {}
                Outcome::Output(text) => writeln!(output, "{}", text)?,
                Outcome::Confirmed(text) => writeln!(output, "{}", text.green())?,
                Outcome::Error(text) => writeln!(output, "{}", text.red())?,
                Outcome::Exit(text) => {
                    writeln!(output, "{}", text)?;
                    break;
                }
            }
        }
        Ok(())
    }
}
