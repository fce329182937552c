// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Homing sequencer.
//!
//! Interprets the configured homing string one step at a time. The controller calls
//! [`HomingSequencer::service`] from its main-loop service and carries out each returned
//! [`HomingStep`]: queue a stepwise move, or mark an axis as home. Moves are numbered so the
//! sequencer can wait for each to retire before reading further.
//!
//! ```text
//! A-10000n;B10000;#;A+10000N;B-10000;#;A=h;B=h;$
//! ```
//!
//! | Token | Meaning |
//! | ----- | ------- |
//! | `A` `B` `C` | Select axis 0, 1, 2 |
//! | `±<int>` | Relative steps for the selected axis |
//! | `R<rpm>` `S<steps/s>` | Rate for this command (after a step count) |
//! | `N` `X` | Stop when the min / max end-stop triggers |
//! | `n` `x` | Stop when the min / max end-stop releases |
//! | `=h` | Selected axis is home now |
//! | `F` | Default rate for the rest of the sequence (`FR<rpm>` or `FS<steps/s>`) |
//! | `#` | Queue the accumulated command and wait for it |
//! | `$` | Finished, axes homed |
//!
//! Any other character is skipped.

use heapless::String;
use log::{info, warn};

use crate::motion::args::MoveArgs;
use crate::motion::config::{AxesConfig, HomingConfig, HOMING_SEQ_LEN};
use crate::motion::values::{AxisEnd, EndstopCheck, MAX_AXES};

/// First sequence id used for homing moves (ids count up from here).
pub const HOMING_BASE_SEQUENCE_ID: u32 = 10_000;

/// Action requested by the sequencer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum HomingStep {
    /// Queue this stepwise move. Call [`HomingSequencer::cancel_command`] if it is refused.
    Move(MoveArgs),
    /// Treat the axis' current position as home.
    SetHome(usize),
}

#[derive(Copy, Clone)]
enum State {
    Idle,
    Running,
    WaitingFor { id: u32 },
}

/// Runs a homing sequence.
pub struct HomingSequencer {
    state: State,
    seq: String<HOMING_SEQ_LEN>,
    pos: usize,
    max_homing_ms: u32,
    started_ms: Option<u32>,
    axes_to_home: u8,
    command: MoveArgs,
    default_rate: Option<f32>,
    last_id: u32,
    homed_ok: bool,
}

impl HomingSequencer {
    pub fn new(cfg: &HomingConfig) -> Self {
        Self {
            state: State::Idle,
            seq: cfg.homing_seq.clone(),
            pos: 0,
            max_homing_ms: cfg.max_homing_secs.saturating_mul(1000),
            started_ms: None,
            axes_to_home: 0,
            command: MoveArgs::new(),
            default_rate: None,
            last_id: HOMING_BASE_SEQUENCE_ID,
            homed_ok: false,
        }
    }

    /// Begin homing the axes present in `args` (all axes if none). The timeout runs from the
    /// first [`service`](Self::service) call after this.
    pub fn start(&mut self, args: &MoveArgs) {
        let mut mask = 0u8;
        for axis in 0..MAX_AXES {
            if args.target().is_valid(axis) || args.is_steps_valid(axis) {
                mask |= 1 << axis;
            }
        }
        self.axes_to_home = if mask == 0 { (1 << MAX_AXES) - 1 } else { mask };
        self.state = State::Running;
        self.pos = 0;
        self.started_ms = None;
        self.command = MoveArgs::new();
        self.default_rate = None;
        self.homed_ok = false;
        info!("homing: start, seq {}", self.seq.as_str());
    }

    #[inline]
    pub fn is_homing(&self) -> bool {
        !matches!(self.state, State::Idle)
    }

    /// True after a sequence reached `$`. Cleared when homing restarts or times out.
    #[inline]
    pub fn is_homed(&self) -> bool {
        self.homed_ok
    }

    /// Abort without marking the axes homed.
    pub fn abort(&mut self) {
        if self.is_homing() {
            warn!("homing: aborted");
        }
        self.state = State::Idle;
        self.homed_ok = false;
    }

    /// The last [`HomingStep::Move`] could not be queued; carry on with the sequence.
    pub fn cancel_command(&mut self) {
        if let State::WaitingFor { .. } = self.state {
            self.state = State::Running;
        }
    }

    /// Advance the sequence. Returns the next step to carry out, or `None` while waiting for a
    /// move to retire or once homing has ended.
    pub fn service(
        &mut self,
        now_ms: u32,
        last_completed: Option<u32>,
        axes: &AxesConfig,
    ) -> Option<HomingStep> {
        if self.is_homing() && self.started_ms.is_none() {
            self.started_ms = Some(now_ms);
        }
        let elapsed = now_ms.wrapping_sub(self.started_ms.unwrap_or(now_ms));

        match self.state {
            State::Idle => return None,
            _ if elapsed > self.max_homing_ms => {
                warn!("homing: timed out");
                self.state = State::Idle;
                self.homed_ok = false;
                return None;
            }
            State::WaitingFor { id } if last_completed != Some(id) => return None,
            _ => self.state = State::Running,
        }

        let mut cur = Cursor {
            bytes: self.seq.as_bytes(),
            pos: self.pos,
        };
        let step = loop {
            let Some(ch) = cur.peek() else {
                info!("homing: sequence ended without $");
                self.state = State::Idle;
                break None;
            };
            cur.bump();
            match ch {
                b'$' => {
                    info!("homing: homed ok");
                    self.homed_ok = true;
                    self.state = State::Idle;
                    break None;
                }
                b'#' => {
                    self.last_id += 1;
                    let args = core::mem::take(&mut self.command)
                        .allow_out_of_bounds()
                        .dont_split()
                        .numbered(self.last_id);
                    self.state = State::WaitingFor { id: self.last_id };
                    break Some(HomingStep::Move(args));
                }
                b'A' | b'a' | b'B' | b'b' | b'C' | b'c' => {
                    let axis = usize::from(ch.to_ascii_uppercase() - b'A');
                    let requested = self.axes_to_home & (1 << axis) != 0;
                    self.command = self.command.relative();

                    if let Some(steps) = cur.integer() {
                        if requested {
                            self.command = self.command.with_axis_steps(axis, steps);
                        }
                        let fallback = self
                            .default_rate
                            .unwrap_or_else(|| axes.rates(axis).max_step_rate);
                        let rate = cur.rate(fallback, axes.steps_per_rot(axis));
                        self.command.set_feedrate(rate);
                        if let Some((end, check)) = cur.endstop() {
                            if requested {
                                self.command.set_endstop(axis, end, check);
                            }
                        }
                    } else if cur.peek() == Some(b'=') {
                        cur.bump();
                        if matches!(cur.peek(), Some(b'H' | b'h')) {
                            cur.bump();
                            info!("homing: axis {} at home", axis);
                            break Some(HomingStep::SetHome(axis));
                        }
                    }
                }
                b'F' | b'f' => {
                    let fallback = axes.rates(0).max_step_rate;
                    let rate = cur.rate(fallback, axes.steps_per_rot(0));
                    if rate > 0.0 {
                        self.default_rate = Some(rate);
                    }
                }
                _ => {}
            }
        };
        self.pos = cur.pos;
        step
    }
}

/// Read position within the homing string.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline]
    fn bump(&mut self) {
        self.pos += 1;
    }

    /// Signed integer. Consumes any run of digits, signs and dots; the value is the leading
    /// `[+-]digits` part. `None` if no such characters follow.
    fn integer(&mut self) -> Option<i32> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9' | b'+' | b'-' | b'.')) {
            self.bump();
        }
        let run = &self.bytes[start..self.pos];
        if run.is_empty() {
            return None;
        }

        let (negative, digits) = match run[0] {
            b'-' => (true, &run[1..]),
            b'+' => (false, &run[1..]),
            _ => (false, run),
        };
        let mut val: i32 = 0;
        for &d in digits.iter().take_while(|d| d.is_ascii_digit()) {
            val = val.saturating_mul(10).saturating_add(i32::from(d - b'0'));
        }
        Some(if negative { -val } else { val })
    }

    /// Optional `R<rpm>` or `S<steps/s>`, in steps/s. Non-positive values keep `fallback`.
    fn rate(&mut self, fallback: f32, steps_per_rot: f32) -> f32 {
        match self.peek() {
            Some(b'R' | b'r') => {
                self.bump();
                match self.integer() {
                    Some(rpm) if rpm > 0 => libm::floorf(rpm as f32 * steps_per_rot / 60.0),
                    _ => fallback,
                }
            }
            Some(b'S' | b's') => {
                self.bump();
                match self.integer() {
                    Some(rate) if rate > 0 => rate as f32,
                    _ => fallback,
                }
            }
            _ => fallback,
        }
    }

    /// Optional end-stop qualifier.
    fn endstop(&mut self) -> Option<(AxisEnd, EndstopCheck)> {
        let found = match self.peek()? {
            b'N' => (AxisEnd::Min, EndstopCheck::Hit),
            b'n' => (AxisEnd::Min, EndstopCheck::NotHit),
            b'X' => (AxisEnd::Max, EndstopCheck::Hit),
            b'x' => (AxisEnd::Max, EndstopCheck::NotHit),
            _ => return None,
        };
        self.bump();
        Some(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::config::AxisConfig;

    const SEQ_ENDSTOPS: &str =
        "A-10000n;B10000;#;A+10000N;B-10000;#;A+500;B-500;#;B+10000n;#;B-10000N;#;B-1050;#;A=h;B=h;$";
    const SEQ_RATES: &str = "FS1000;A-10000N;B+10000#;A-10000n;B+10000S2000;#;FR60;A+470;B-470;#;B-10000S2200N;#;B10000R120n;#;B+850R240;#;A=h;B=h;$";

    fn axes() -> AxesConfig {
        let axis = AxisConfig::default()
            .with_max_speed(50.0)
            .with_max_accel(50.0)
            .with_max_rpm(30.0)
            .with_rotation(9600.0, 1.0)
            .with_limits(None, Some(92.5));
        AxesConfig::new(&[axis.clone(), axis]).unwrap()
    }

    fn sequencer(seq: &str) -> HomingSequencer {
        HomingSequencer::new(&HomingConfig::with_sequence(seq).unwrap())
    }

    /// Run to the end, completing every move immediately.
    fn run(homing: &mut HomingSequencer, axes: &AxesConfig) -> Vec<HomingStep> {
        let mut steps = Vec::new();
        let mut done = None;
        for _ in 0..100 {
            match homing.service(0, done, axes) {
                Some(step) => {
                    if let HomingStep::Move(args) = step {
                        done = args.sequence_id();
                    }
                    steps.push(step);
                }
                None if !homing.is_homing() => break,
                None => {}
            }
        }
        steps
    }

    fn moves(steps: &[HomingStep]) -> Vec<MoveArgs> {
        steps
            .iter()
            .filter_map(|s| match s {
                HomingStep::Move(args) => Some(*args),
                _ => None,
            })
            .collect()
    }

    fn axis_steps(args: &MoveArgs, axis: usize) -> Option<i32> {
        args.is_steps_valid(axis).then(|| args.steps(axis))
    }

    #[test]
    fn endstop_sequence_issues_expected_moves() {
        let axes = axes();
        let mut homing = sequencer(SEQ_ENDSTOPS);
        homing.start(&MoveArgs::new().with_axis(0, 0.0).with_axis(1, 0.0));
        let steps = run(&mut homing, &axes);
        let moves = moves(&steps);
        assert_eq!(moves.len(), 6);

        let expected: [(Option<i32>, Option<i32>, [[u8; 2]; 2]); 6] = [
            (Some(-10_000), Some(10_000), [[2, 0], [0, 0]]),
            (Some(10_000), Some(-10_000), [[1, 0], [0, 0]]),
            (Some(500), Some(-500), [[0, 0], [0, 0]]),
            (None, Some(10_000), [[0, 0], [2, 0]]),
            (None, Some(-10_000), [[0, 0], [1, 0]]),
            (None, Some(-1050), [[0, 0], [0, 0]]),
        ];
        for (i, (args, (a, b, codes))) in moves.iter().zip(expected).enumerate() {
            assert_eq!(axis_steps(args, 0), a, "move {}", i);
            assert_eq!(axis_steps(args, 1), b, "move {}", i);
            assert_eq!(args.endstops().to_codes()[..2], codes, "move {}", i);
            assert_eq!(args.feedrate(), Some(4800.0));
            assert_eq!(args.sequence_id(), Some(10_001 + i as u32));
            assert!(args.is_stepwise());
            assert!(args.is_out_of_bounds_allowed());
            assert!(args.is_dont_split());
            assert_eq!(args.mode(), crate::motion::args::MoveMode::Relative);
        }

        assert_eq!(
            steps[steps.len() - 2..],
            [HomingStep::SetHome(0), HomingStep::SetHome(1)]
        );
        assert!(!homing.is_homing());
        assert!(homing.is_homed());
    }

    #[test]
    fn rate_tokens_set_feedrates_and_ids_continue() {
        let axes = axes();
        let mut homing = sequencer(SEQ_ENDSTOPS);
        homing.start(&MoveArgs::new());
        run(&mut homing, &axes);

        homing.seq = String::try_from(SEQ_RATES).unwrap();
        homing.start(&MoveArgs::new());
        let moves = moves(&run(&mut homing, &axes));
        let rates: Vec<f32> = moves.iter().filter_map(|m| m.feedrate()).collect();
        assert_eq!(rates, [1000.0, 2000.0, 9600.0, 2200.0, 19_200.0, 38_400.0]);
        let ids: Vec<u32> = moves.iter().filter_map(|m| m.sequence_id()).collect();
        assert_eq!(ids, [10_007, 10_008, 10_009, 10_010, 10_011, 10_012]);
        assert!(homing.is_homed());
    }

    #[test]
    fn waits_for_move_to_retire() {
        let axes = axes();
        let mut homing = sequencer("A-100;#;A=h;$");
        homing.start(&MoveArgs::new());
        let first = homing.service(0, None, &axes);
        assert!(matches!(first, Some(HomingStep::Move(_))));
        assert_eq!(homing.service(10, None, &axes), None);
        assert_eq!(homing.service(20, Some(9_999), &axes), None);
        assert!(homing.is_homing());

        assert_eq!(
            homing.service(30, Some(10_001), &axes),
            Some(HomingStep::SetHome(0))
        );
        assert_eq!(homing.service(30, Some(10_001), &axes), None);
        assert!(homing.is_homed());
    }

    #[test]
    fn unrequested_axis_is_left_alone() {
        let axes = axes();
        let mut homing = sequencer("A-100N;B-200X;#;$");
        homing.start(&MoveArgs::new().with_axis(1, 0.0));
        let moves = moves(&run(&mut homing, &axes));
        assert_eq!(axis_steps(&moves[0], 0), None);
        assert_eq!(axis_steps(&moves[0], 1), Some(-200));
        assert_eq!(moves[0].endstops().to_codes()[0], [0, 0]);
        assert_eq!(moves[0].endstops().to_codes()[1], [0, 1]);
    }

    #[test]
    fn refused_move_continues_sequence() {
        let axes = axes();
        let mut homing = sequencer("A-100;#;B=h;$");
        homing.start(&MoveArgs::new().with_axis(1, 0.0));
        assert!(matches!(homing.service(0, None, &axes), Some(HomingStep::Move(_))));
        homing.cancel_command();
        assert_eq!(homing.service(0, None, &axes), Some(HomingStep::SetHome(1)));
    }

    #[test]
    fn times_out_while_waiting() {
        let axes = axes();
        let mut cfg = HomingConfig::with_sequence("A-100000N;#;A=h;$").unwrap();
        cfg.max_homing_secs = 2;
        let mut homing = HomingSequencer::new(&cfg);
        homing.start(&MoveArgs::new());
        assert!(homing.service(1_500, None, &axes).is_some());
        assert_eq!(homing.service(3_400, None, &axes), None);
        assert!(homing.is_homing());
        assert_eq!(homing.service(3_501, None, &axes), None);
        assert!(!homing.is_homing());
        assert!(!homing.is_homed());
    }

    #[test]
    fn sequence_without_terminator_is_not_homed() {
        let axes = axes();
        let mut homing = sequencer("A=h;");
        homing.start(&MoveArgs::new());
        assert_eq!(homing.service(0, None, &axes), Some(HomingStep::SetHome(0)));
        assert_eq!(homing.service(0, None, &axes), None);
        assert!(!homing.is_homing());
        assert!(!homing.is_homed());
    }
}
