//! Command debouncer for free-form mode.
//!
//! A command fires once after `stable_frames` consecutive qualifying frames
//! and is then held off for `cooldown_frames`.  Cooldown decays on every
//! observed frame, qualifying or not.

use super::token::Command;

#[derive(Debug, Clone)]
pub struct CommandDebouncer {
    stable_frames: u32,
    cooldown_frames: u32,
    tracked: Option<Command>,
    count: u32,
    cooldown: u32,
}

impl CommandDebouncer {
    pub fn new(stable_frames: u32, cooldown_frames: u32) -> Self {
        Self {
            stable_frames: stable_frames.max(1),
            cooldown_frames,
            tracked: None,
            count: 0,
            cooldown: 0,
        }
    }

    /// Feed one frame.  `command` is `Some` only when the frame carries a
    /// confident command label.  Returns the command when it fires.
    pub fn observe(&mut self, command: Option<Command>) -> Option<Command> {
        self.cooldown = self.cooldown.saturating_sub(1);

        let Some(cmd) = command else {
            self.tracked = None;
            self.count = 0;
            return None;
        };

        if self.tracked == Some(cmd) {
            self.count += 1;
        } else {
            self.tracked = Some(cmd);
            self.count = 1;
        }

        if self.count >= self.stable_frames && self.cooldown == 0 {
            self.cooldown = self.cooldown_frames;
            self.count = 0;
            return Some(cmd);
        }
        None
    }

    pub fn tracked(&self) -> Option<Command> {
        self.tracked
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    pub fn reset(&mut self) {
        self.tracked = None;
        self.count = 0;
        self.cooldown = 0;
    }
}
