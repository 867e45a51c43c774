//! Commit State Machine.
//!
//! # Modes
//!
//! ```text
//! FreeForm    frame ─► debouncer ─► space / delete applied once
//!             letters and phrases are shown, never typed
//!
//! AutoCommit  every interval:
//!               hands > 0 ? ── no ──► skip
//!               snapshot age ≤ grace ? ── no ──► skip
//!               spelling: append letter, clear letter buffer
//!               phrase:   append "<label> " (single separating space)
//! ```
//!
//! Frames update the per-pipeline snapshots in both modes; ticks only read
//! them.

use crate::config::{CommitConfig, CommitMode, PipelineKind};
use crate::stabilizer::RingBuffer;

use super::debounce::CommandDebouncer;
use super::text::TextBuffer;
use super::token::{Command, Token};

// ---------------------------------------------------------------------------
// Snapshot / tick outcome
// ---------------------------------------------------------------------------

/// Latest confident prediction for one pipeline.  Overwritten, never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSnapshot {
    pub label: String,
    pub confidence: f32,
    pub observed_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoHand,
    NoSnapshot,
    Stale { age_ms: u64 },
}

/// The single decision made by one auto-commit tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Committed(String),
    Skipped(SkipReason),
}

// ---------------------------------------------------------------------------
// CommitMachine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CommitMachine {
    config: CommitConfig,
    mode: CommitMode,
    letters: RingBuffer<char>,
    debouncer: CommandDebouncer,
    spelling: Option<PredictionSnapshot>,
    phrase: Option<PredictionSnapshot>,
    next_commit_at_ms: Option<u64>,
    text: TextBuffer,
}

impl CommitMachine {
    pub fn new(config: CommitConfig, mode: CommitMode) -> Self {
        Self {
            letters: RingBuffer::new(config.letter_buffer_capacity.max(1)),
            debouncer: CommandDebouncer::new(
                config.command_stable_frames,
                config.command_cooldown_frames,
            ),
            config,
            mode,
            spelling: None,
            phrase: None,
            next_commit_at_ms: None,
            text: TextBuffer::new(),
        }
    }

    pub fn mode(&self) -> CommitMode {
        self.mode
    }

    pub fn config(&self) -> &CommitConfig {
        &self.config
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    pub fn snapshot(&self, pipeline: PipelineKind) -> Option<&PredictionSnapshot> {
        match pipeline {
            PipelineKind::Spelling => self.spelling.as_ref(),
            PipelineKind::Phrase => self.phrase.as_ref(),
        }
    }

    pub fn debouncer(&self) -> &CommandDebouncer {
        &self.debouncer
    }

    // -----------------------------------------------------------------------
    // Frame path
    // -----------------------------------------------------------------------

    /// Consume one stabilized frame.
    ///
    /// `gate` is the pipeline's confidence gate.  Returns the command applied
    /// to the text, if any.
    pub fn observe(
        &mut self,
        pipeline: PipelineKind,
        gate: f32,
        label: &str,
        confidence: f32,
        now_ms: u64,
    ) -> Option<Command> {
        let token = Token::from_label(label);
        let confident = confidence >= gate;

        if confident {
            match (pipeline, &token) {
                (PipelineKind::Spelling, Some(Token::Letter(c))) => {
                    self.letters.push(*c);
                    self.spelling = Some(PredictionSnapshot {
                        label: c.to_string(),
                        confidence,
                        observed_at_ms: now_ms,
                    });
                }
                (PipelineKind::Phrase, Some(_)) => {
                    self.phrase = Some(PredictionSnapshot {
                        label: label.trim().to_string(),
                        confidence,
                        observed_at_ms: now_ms,
                    });
                }
                _ => {}
            }
        }

        if self.mode != CommitMode::FreeForm {
            return None;
        }

        let command = token
            .as_ref()
            .and_then(Token::command)
            .filter(|_| confident);
        let fired = self.debouncer.observe(command)?;
        self.apply(fired);
        log::debug!("commit: applied {} command", fired.label());
        Some(fired)
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Space => self.text.push_space(),
            Command::Delete => {
                self.text.delete_last();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tick path
    // -----------------------------------------------------------------------

    /// Make the single commit decision for an auto-commit tick at `now_ms`.
    pub fn tick(&mut self, pipeline: PipelineKind, hands: usize, now_ms: u64) -> TickOutcome {
        let outcome = self.decide(pipeline, hands, now_ms);
        if pipeline == PipelineKind::Spelling {
            self.letters.clear();
        }
        self.schedule_next(now_ms);

        match &outcome {
            TickOutcome::Committed(s) => log::debug!("commit: tick at {now_ms} ms appended {s:?}"),
            TickOutcome::Skipped(reason) => {
                log::debug!("commit: tick at {now_ms} ms skipped ({reason:?})")
            }
        }
        outcome
    }

    fn decide(&mut self, pipeline: PipelineKind, hands: usize, now_ms: u64) -> TickOutcome {
        if hands == 0 {
            return TickOutcome::Skipped(SkipReason::NoHand);
        }
        let Some(snapshot) = self.snapshot(pipeline) else {
            return TickOutcome::Skipped(SkipReason::NoSnapshot);
        };
        let age_ms = now_ms.saturating_sub(snapshot.observed_at_ms);
        if age_ms > self.config.freshness_grace_ms {
            return TickOutcome::Skipped(SkipReason::Stale { age_ms });
        }

        let label = snapshot.label.clone();
        let appended = match pipeline {
            PipelineKind::Spelling => {
                self.text.push_str(&label);
                label
            }
            PipelineKind::Phrase => {
                let before = self.text.as_str().len();
                self.text.append_phrase(&label);
                self.text.as_str()[before..].to_string()
            }
        };
        TickOutcome::Committed(appended)
    }

    /// Set the next tick deadline one interval after `now_ms`.
    pub fn schedule_next(&mut self, now_ms: u64) {
        self.next_commit_at_ms = Some(now_ms + self.config.auto_interval_ms);
    }

    pub fn next_commit_at_ms(&self) -> Option<u64> {
        self.next_commit_at_ms
    }

    /// Whole seconds until the next tick, never below 1.
    pub fn countdown_secs(&self, now_ms: u64) -> u64 {
        let remaining = match self.next_commit_at_ms {
            Some(at) => at.saturating_sub(now_ms),
            None => self.config.auto_interval_ms,
        };
        remaining.div_ceil(1000).max(1)
    }

    // -----------------------------------------------------------------------
    // Mode / lifecycle
    // -----------------------------------------------------------------------

    /// Switch modes.  Debounce counters survive; the tick deadline is set
    /// when entering auto-commit and dropped when leaving it.
    pub fn set_mode(&mut self, mode: CommitMode, now_ms: u64) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        match mode {
            CommitMode::AutoCommit => self.schedule_next(now_ms),
            CommitMode::FreeForm => self.next_commit_at_ms = None,
        }
    }

    /// Most frequent letter in the letter buffer.
    pub fn majority_letter(&self) -> Option<char> {
        self.letters.majority()
    }

    pub fn letter_count(&self) -> usize {
        self.letters.len()
    }

    /// Discard buffers, snapshots, counters and the tick deadline.  The text
    /// survives.
    pub fn reset(&mut self) {
        self.letters.clear();
        self.debouncer.reset();
        self.spelling = None;
        self.phrase = None;
        self.next_commit_at_ms = None;
    }

    // -----------------------------------------------------------------------
    // Manual edits
    // -----------------------------------------------------------------------

    pub fn type_space(&mut self) {
        self.text.push_space();
    }

    pub fn backspace(&mut self) {
        self.text.delete_last();
    }

    pub fn clear_text(&mut self) {
        self.text.clear();
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text.set(text);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
