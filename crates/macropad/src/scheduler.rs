//! Macro execution scheduler
//!
//! Sequences macro steps into timed HID report writes without blocking.
//! Each step compiles to a flat list of actions (report writes and pauses);
//! `tick()` consumes actions synchronously and returns an explicit effect
//! for the host loop to execute: write a report, sleep for a duration, or
//! signal completion. The scheduler itself never touches a clock, which
//! keeps it testable without real timers.

use hidp::{InputReport, KeyCode, MacroStep, Modifiers, keymap};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// Hold time between a press report and its release
pub const KEY_SETTLE: Duration = Duration::from_millis(10);

/// Delay between characters when typing text
pub const CHAR_INTERVAL: Duration = Duration::from_millis(20);

/// Delay between consecutive macro steps
pub const STEP_INTERVAL: Duration = Duration::from_millis(30);

/// A single scheduled effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write this report to the interrupt channel now
    Write(InputReport),
    /// Wait this long before the next action
    Pause(Duration),
}

/// Compile a press-and-release of a single key
pub fn key_actions(key: KeyCode, modifiers: Modifiers) -> Vec<Action> {
    vec![
        Action::Write(InputReport::new(modifiers, key)),
        Action::Pause(KEY_SETTLE),
        Action::Write(InputReport::release_all()),
    ]
}

/// Compile a text string into per-character press/release cycles
///
/// Unmappable characters produce no actions; the rest of the string still
/// types.
pub fn text_actions(text: &str) -> Vec<Action> {
    let mut actions = Vec::new();
    for c in text.chars() {
        let (key, shift) = keymap::map_char(c);
        if !key.is_some() {
            debug!("skipping untypable character {:?}", c);
            continue;
        }
        let modifiers = if shift {
            Modifiers::LEFT_SHIFT
        } else {
            Modifiers::NONE
        };
        actions.extend(key_actions(key, modifiers));
        actions.push(Action::Pause(CHAR_INTERVAL));
    }
    actions
}

/// Compile a key combination: press each key in order while holding the
/// modifiers, then release everything with a single report.
pub fn combo_actions(keys: &[KeyCode], modifiers: Modifiers) -> Vec<Action> {
    let mut actions = Vec::new();
    for &key in keys {
        actions.push(Action::Write(InputReport::new(modifiers, key)));
        actions.push(Action::Pause(KEY_SETTLE));
    }
    actions.push(Action::Write(InputReport::release_all()));
    actions
}

/// Compile one macro step, including its trailing inter-step delay
fn compile_step(step: &MacroStep) -> VecDeque<Action> {
    let mut actions: VecDeque<Action> = match step {
        MacroStep::Key {
            key_code,
            modifiers,
        } => key_actions(*key_code, *modifiers).into(),
        MacroStep::Text { text } => text_actions(text).into(),
        MacroStep::Combo { keys, modifiers } => combo_actions(keys, *modifiers).into(),
        // A delay step is its own pause; no inter-step interval on top.
        MacroStep::Delay { ms } => {
            return VecDeque::from([Action::Pause(Duration::from_millis(*ms))]);
        }
    };
    actions.push_back(Action::Pause(STEP_INTERVAL));
    actions
}

/// Effect returned by a scheduler tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Write this report, then tick again immediately
    Write(InputReport),
    /// Re-enter the scheduler after this duration
    Sleep(Duration),
    /// The queue ran to completion; emit the macro-complete notification
    Complete,
    /// Nothing queued
    Idle,
}

/// Drives an ordered queue of macro steps, one compiled action at a time
///
/// At most one queue is active; starting a new one discards whatever was
/// in flight. The queue advances through a cursor so steps are immutable
/// once enqueued.
#[derive(Debug, Default)]
pub struct MacroScheduler {
    steps: Vec<MacroStep>,
    cursor: usize,
    actions: VecDeque<Action>,
    running: bool,
}

impl MacroScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any in-flight queue and start from the first step
    pub fn start(&mut self, steps: Vec<MacroStep>) {
        if self.running {
            debug!(
                "replacing in-flight macro at step {}/{}",
                self.cursor,
                self.steps.len()
            );
        }
        self.steps = steps;
        self.cursor = 0;
        self.actions.clear();
        self.running = true;
    }

    /// Discard the queue without emitting completion
    pub fn cancel(&mut self) {
        self.steps.clear();
        self.cursor = 0;
        self.actions.clear();
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance the scheduler by one effect
    pub fn tick(&mut self) -> Tick {
        loop {
            if let Some(action) = self.actions.pop_front() {
                return match action {
                    Action::Write(report) => Tick::Write(report),
                    Action::Pause(d) => Tick::Sleep(d),
                };
            }

            if self.cursor < self.steps.len() {
                let step = &self.steps[self.cursor];
                self.cursor += 1;
                self.actions = compile_step(step);
                continue;
            }

            if self.running {
                self.steps.clear();
                self.cursor = 0;
                self.running = false;
                return Tick::Complete;
            }

            return Tick::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hidp::Modifiers;

    /// Drain the scheduler, collecting writes and sleeps until Complete/Idle
    fn drain(scheduler: &mut MacroScheduler) -> (Vec<InputReport>, Vec<Duration>, bool) {
        let mut writes = Vec::new();
        let mut sleeps = Vec::new();
        loop {
            match scheduler.tick() {
                Tick::Write(r) => writes.push(r),
                Tick::Sleep(d) => sleeps.push(d),
                Tick::Complete => return (writes, sleeps, true),
                Tick::Idle => return (writes, sleeps, false),
            }
        }
    }

    #[test]
    fn test_idle_when_nothing_queued() {
        let mut s = MacroScheduler::new();
        assert_eq!(s.tick(), Tick::Idle);
        assert!(!s.is_running());
    }

    #[test]
    fn test_ctrl_c_macro_produces_two_writes_then_complete() {
        let mut s = MacroScheduler::new();
        s.start(vec![MacroStep::Key {
            key_code: KeyCode::C,
            modifiers: Modifiers::LEFT_CTRL,
        }]);

        let (writes, sleeps, completed) = drain(&mut s);
        assert!(completed);
        assert_eq!(writes.len(), 2);
        assert_eq!(
            writes[0].as_bytes(),
            &[0xA1, 0x01, 0x01, 0x00, 0x06, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            writes[1].as_bytes(),
            &[0xA1, 0x01, 0x00, 0x00, 0x00, 0, 0, 0, 0, 0]
        );
        assert_eq!(sleeps, vec![KEY_SETTLE, STEP_INTERVAL]);
    }

    #[test]
    fn test_text_step_types_each_character() {
        let mut s = MacroScheduler::new();
        s.start(vec![MacroStep::Text {
            text: "Hi!".to_string(),
        }]);

        let (writes, _, completed) = drain(&mut s);
        assert!(completed);
        // Three characters, one press/release pair each.
        assert_eq!(writes.len(), 6);
        // 'H' is shift + the 'h' scancode.
        assert_eq!(writes[0].as_bytes()[2], Modifiers::LEFT_SHIFT.0);
        assert_eq!(writes[0].as_bytes()[4], KeyCode::H.0);
        // 'i' unshifted.
        assert_eq!(writes[2].as_bytes()[2], 0x00);
        assert_eq!(writes[2].as_bytes()[4], KeyCode::I.0);
        // '!' is shift + digit 1.
        assert_eq!(writes[4].as_bytes()[2], Modifiers::LEFT_SHIFT.0);
        assert_eq!(writes[4].as_bytes()[4], KeyCode::NUM_1.0);
        // Every release is the canonical empty report.
        for pair in writes.chunks(2) {
            assert_eq!(pair[1], InputReport::release_all());
        }
    }

    #[test]
    fn test_text_skips_unmappable_characters() {
        let mut s = MacroScheduler::new();
        s.start(vec![MacroStep::Text {
            text: "a🦀b".to_string(),
        }]);

        let (writes, _, completed) = drain(&mut s);
        assert!(completed);
        // The emoji produces no press/release cycle; a and b still type.
        assert_eq!(writes.len(), 4);
        assert_eq!(writes[0].as_bytes()[4], KeyCode::A.0);
        assert_eq!(writes[2].as_bytes()[4], KeyCode::B.0);
    }

    #[test]
    fn test_combo_holds_keys_until_single_release() {
        let mut s = MacroScheduler::new();
        s.start(vec![MacroStep::Combo {
            keys: vec![KeyCode::TAB, KeyCode::A],
            modifiers: Modifiers::LEFT_ALT,
        }]);

        let (writes, _, completed) = drain(&mut s);
        assert!(completed);
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[0].as_bytes()[4], KeyCode::TAB.0);
        assert_eq!(writes[1].as_bytes()[4], KeyCode::A.0);
        // Both presses carry the modifier; the single release clears all.
        assert_eq!(writes[0].as_bytes()[2], Modifiers::LEFT_ALT.0);
        assert_eq!(writes[1].as_bytes()[2], Modifiers::LEFT_ALT.0);
        assert_eq!(writes[2], InputReport::release_all());
    }

    #[test]
    fn test_delay_step_sleeps_exactly_its_duration() {
        let mut s = MacroScheduler::new();
        s.start(vec![
            MacroStep::Delay { ms: 500 },
            MacroStep::Key {
                key_code: KeyCode::A,
                modifiers: Modifiers::NONE,
            },
        ]);

        // The delay is the first effect, with no inter-step interval added.
        assert_eq!(s.tick(), Tick::Sleep(Duration::from_millis(500)));
        let (writes, sleeps, completed) = drain(&mut s);
        assert!(completed);
        assert_eq!(writes.len(), 2);
        assert_eq!(sleeps, vec![KEY_SETTLE, STEP_INTERVAL]);
    }

    #[test]
    fn test_start_replaces_in_flight_queue() {
        let mut s = MacroScheduler::new();
        s.start(vec![
            MacroStep::Text {
                text: "long first macro".to_string(),
            },
            MacroStep::Delay { ms: 10_000 },
        ]);
        // Partially execute the first queue.
        assert!(matches!(s.tick(), Tick::Write(_)));
        assert!(matches!(s.tick(), Tick::Sleep(_)));

        s.start(vec![MacroStep::Key {
            key_code: KeyCode::B,
            modifiers: Modifiers::NONE,
        }]);
        let (writes, _, completed) = drain(&mut s);
        assert!(completed);
        // Only the replacement queue's reports come out.
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].as_bytes()[4], KeyCode::B.0);
        // Completion fires exactly once: the scheduler is idle afterwards.
        assert_eq!(s.tick(), Tick::Idle);
    }

    #[test]
    fn test_cancel_discards_without_completion() {
        let mut s = MacroScheduler::new();
        s.start(vec![MacroStep::Delay { ms: 1000 }]);
        assert!(s.is_running());
        s.cancel();
        assert!(!s.is_running());
        assert_eq!(s.tick(), Tick::Idle);
    }

    #[test]
    fn test_empty_macro_completes_immediately() {
        let mut s = MacroScheduler::new();
        s.start(Vec::new());
        assert_eq!(s.tick(), Tick::Complete);
        assert_eq!(s.tick(), Tick::Idle);
    }
}
