//! Jump detection on the sample grid.
//!
//! Detection is deliberately approximate: there is no sub-step root search.
//! A guard crossing inside `(t_k, t_k+1]` is attributed to whichever of the
//! two samples has the smaller guard magnitude, and an input event is
//! attributed to the sample nearest its scheduled time. Jump times are
//! therefore off by at most one sample interval.
//!
//! When several transitions are eligible, the lowest rank wins regardless of
//! whether it is triggered by an input or a crossing. Ranks are unique per
//! mode, so the only remaining tie is between input events accepted by the
//! same transition; the earliest event wins.

use hy_automaton::{Automaton, HybridState, InputEvent, InputSchedule, Mode, TransitionId, Trigger};
use hy_core::Real;
use tracing::trace;

/// Sample step an input event fires at: the nearest grid sample, ties to the later one.
///
/// Events at or before t = 0 fire at step 0.
pub fn input_step(time: Real, dt: Real) -> u64 {
    if time <= 0.0 {
        return 0;
    }
    (time / dt + 0.5).floor() as u64
}

#[derive(Clone, Debug)]
struct QueuedInput {
    step: u64,
    event: InputEvent,
    consumed: bool,
}

/// Input events of one run, each attributed to a grid step and consumed at most once.
#[derive(Clone, Debug)]
pub struct InputQueue {
    inputs: Vec<QueuedInput>,
    /// First unconsumed input; everything before it is consumed
    cursor: usize,
}

impl InputQueue {
    /// Attribute every event of `schedule` to a grid step.
    ///
    /// Events attributed past `last_step` can never fire and are left out.
    pub fn new(schedule: &InputSchedule, dt: Real, last_step: u64) -> Self {
        let inputs = schedule
            .iter()
            .map(|&event| QueuedInput {
                step: input_step(event.time, dt),
                event,
                consumed: false,
            })
            .filter(|q| q.step <= last_step)
            .collect();
        Self { inputs, cursor: 0 }
    }

    /// Unconsumed inputs attributed to `step`, in schedule order.
    pub fn at_step(&self, step: u64) -> impl Iterator<Item = (usize, &InputEvent)> + '_ {
        let cursor = self.cursor;
        self.inputs[cursor..]
            .iter()
            .enumerate()
            .skip_while(move |(_, q)| q.step < step)
            .take_while(move |(_, q)| q.step == step)
            .filter(|(_, q)| !q.consumed)
            .map(move |(i, q)| (cursor + i, &q.event))
    }

    pub fn event(&self, index: usize) -> &InputEvent {
        &self.inputs[index].event
    }

    pub fn step_of(&self, index: usize) -> u64 {
        self.inputs[index].step
    }

    /// Mark an input as used by a jump.
    pub fn consume(&mut self, index: usize) {
        self.inputs[index].consumed = true;
        while self.cursor < self.inputs.len() && self.inputs[self.cursor].consumed {
            self.cursor += 1;
        }
    }

    /// Discard an input that no transition accepted.
    pub fn discard(&mut self, index: usize) {
        if !self.inputs[index].consumed {
            let q = &self.inputs[index];
            trace!(time = q.event.time, step = q.step, payload = ?q.event.payload, "input dropped");
            self.consume(index);
        }
    }

    /// Discard every unconsumed input attributed before `step`.
    pub fn discard_before(&mut self, step: u64) {
        while self.cursor < self.inputs.len() && self.inputs[self.cursor].step < step {
            self.discard(self.cursor);
        }
    }

    /// Number of inputs not yet consumed.
    pub fn remaining(&self) -> usize {
        self.inputs[self.cursor..].iter().filter(|q| !q.consumed).count()
    }
}

/// A transition chosen to fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Detection {
    pub transition: TransitionId,
    /// Grid step the jump is attributed to
    pub step: u64,
    /// Index of the consumed input in the [`InputQueue`], for input-triggered jumps
    pub input: Option<usize>,
}

/// Result of scanning an interval or an instant.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scan {
    pub detection: Option<Detection>,
    /// Inputs examined that no transition of the mode accepted
    pub unaccepted: Vec<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Key {
    rank: u32,
    step: u64,
    input: usize,
}

#[derive(Default)]
struct Candidates {
    best: Option<(Key, Detection)>,
}

impl Candidates {
    fn offer(&mut self, rank: u32, detection: Detection) {
        let key = Key {
            rank,
            step: detection.step,
            input: detection.input.unwrap_or(usize::MAX),
        };
        if self.best.as_ref().is_none_or(|(best, _)| key < *best) {
            self.best = Some((key, detection));
        }
    }

    fn winner(self) -> Option<Detection> {
        self.best.map(|(_, d)| d)
    }
}

/// Offer the lowest-rank input transition accepting each input at `step`.
fn offer_inputs<M: Mode>(
    automaton: &Automaton<M>,
    state: &HybridState<M>,
    step: u64,
    queue: &InputQueue,
    candidates: &mut Candidates,
    unaccepted: &mut Vec<usize>,
) {
    for (index, event) in queue.at_step(step) {
        let accepted = automaton
            .transitions_from(state.mode)
            .filter(|t| t.trigger == Trigger::Input)
            .find(|t| t.holds(state, Some(&event.payload)));
        match accepted {
            Some(t) => candidates.offer(
                t.rank,
                Detection {
                    transition: t.id,
                    step,
                    input: Some(index),
                },
            ),
            None => unaccepted.push(index),
        }
    }
}

/// Scan the interval between consecutive samples `prev` (step `k`) and `next` (step `k + 1`).
///
/// Both samples are in the same mode. A crossing is a guard metric going
/// from negative at `prev` to non-negative at `next`.
pub fn scan_interval<M: Mode>(
    automaton: &Automaton<M>,
    prev: &HybridState<M>,
    next: &HybridState<M>,
    k: u64,
    queue: &InputQueue,
) -> Scan {
    let mut candidates = Candidates::default();
    let mut unaccepted = Vec::new();

    for t in automaton.transitions_from(prev.mode) {
        if t.trigger != Trigger::Crossing {
            continue;
        }
        let g0 = t.guard_value(prev, None);
        let g1 = t.guard_value(next, None);
        if g0 < 0.0 && g1 >= 0.0 {
            let step = if g0.abs() < g1.abs() { k } else { k + 1 };
            candidates.offer(
                t.rank,
                Detection {
                    transition: t.id,
                    step,
                    input: None,
                },
            );
        }
    }

    offer_inputs(automaton, prev, k, queue, &mut candidates, &mut unaccepted);
    offer_inputs(automaton, next, k + 1, queue, &mut candidates, &mut unaccepted);

    Scan {
        detection: candidates.winner(),
        unaccepted,
    }
}

/// Scan a single instant: crossing guards that already hold and inputs attributed to `step`.
pub fn scan_instant<M: Mode>(
    automaton: &Automaton<M>,
    state: &HybridState<M>,
    step: u64,
    queue: &InputQueue,
) -> Scan {
    let mut candidates = Candidates::default();
    let mut unaccepted = Vec::new();

    for t in automaton.transitions_from(state.mode) {
        if t.trigger == Trigger::Crossing && t.holds(state, None) {
            candidates.offer(
                t.rank,
                Detection {
                    transition: t.id,
                    step,
                    input: None,
                },
            );
        }
    }
    offer_inputs(automaton, state, step, queue, &mut candidates, &mut unaccepted);

    Scan {
        detection: candidates.winner(),
        unaccepted,
    }
}
