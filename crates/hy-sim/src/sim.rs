//! Hybrid trajectory simulator.
//!
//! A run alternates flow and jumps:
//!
//! 1. Settle the initial instant: fire every transition already eligible.
//! 2. Integrate one grid interval in the current mode.
//! 3. Scan the interval for crossings and inputs; if a transition fires,
//!    record the jump at its attributed step and settle that instant.
//! 4. Repeat until the last grid step, a terminal mode, the jump budget, or
//!    an integrator failure.
//!
//! A run is a pure function of its inputs: the same automaton, initial state,
//! input schedule and options always give the same trajectory.

use hy_automaton::{Automaton, ConfigurationError, HybridState, InputSchedule, Mode};
use hy_core::{Real, ensure_finite, ensure_positive, grid_steps};
use tracing::{debug, warn};

use crate::error::{SimError, SimResult};
use crate::events::{Detection, InputQueue, scan_instant, scan_interval};
use crate::integrator::{IntegratorOptions, step_on_grid};
use crate::model::ModeFlow;
use crate::trajectory::{
    IntegrationFailure, Termination, TerminationReason, Trajectory, TrajectorySample,
};

/// How far a run goes.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Horizon {
    /// Fixed end time (s), snapped onto the sample grid
    Time(Real),
    /// One grid step per entry of the input sequence
    InputLength,
}

impl Default for Horizon {
    fn default() -> Self {
        Horizon::Time(1.0)
    }
}

/// Options for simulation runs.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimOptions {
    /// Sample interval Δt (seconds per grid step)
    pub sample_rate: Real,
    pub horizon: Horizon,
    /// Maximum number of jumps in one run (safety limit)
    pub max_jumps: usize,
    pub integrator: IntegratorOptions,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            sample_rate: 1.0 / 60.0,
            horizon: Horizon::default(),
            max_jumps: 1_000,
            integrator: IntegratorOptions::default(),
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        ensure_positive(self.sample_rate, "sample rate")?;
        if let Horizon::Time(h) = self.horizon {
            ensure_finite(h, "horizon")?;
            if h < 0.0 {
                return Err(SimError::InvalidArg {
                    what: "horizon must be non-negative",
                });
            }
        }
        self.integrator.validate()
    }

    /// Index of the last grid sample for a run driven by `inputs`.
    pub fn last_step(&self, inputs: &InputSchedule) -> SimResult<u64> {
        Ok(match self.horizon {
            Horizon::Time(h) => grid_steps(h, self.sample_rate)?,
            Horizon::InputLength => inputs.sequence_len() as u64,
        })
    }
}

/// Simulator for one automaton.
///
/// Holds no mutable state, so a single simulator can serve many runs,
/// including concurrent ones.
#[derive(Clone)]
pub struct Simulator<'a, M> {
    automaton: &'a Automaton<M>,
    options: SimOptions,
}

impl<'a, M: Mode> Simulator<'a, M> {
    pub fn new(automaton: &'a Automaton<M>, options: SimOptions) -> SimResult<Self> {
        options.validate()?;
        Ok(Self { automaton, options })
    }

    pub fn automaton(&self) -> &'a Automaton<M> {
        self.automaton
    }

    pub fn options(&self) -> &SimOptions {
        &self.options
    }

    /// Simulate one run and record it.
    ///
    /// Integrator failures end the trajectory early with
    /// [`TerminationReason::IntegrationFailure`]; configuration errors, such
    /// as a reset that re-arms its own guard, are returned as errors.
    pub fn trace(
        &self,
        initial: &HybridState<M>,
        inputs: &InputSchedule,
    ) -> SimResult<Trajectory<M>> {
        let automaton = self.automaton;
        if initial.continuous.dims() != automaton.dims() {
            return Err(ConfigurationError::DimensionMismatch {
                what: "initial state",
                expected: automaton.dims(),
                actual: initial.continuous.dims(),
            }
            .into());
        }
        if !initial.continuous.is_finite() {
            return Err(SimError::InvalidArg {
                what: "initial state must be finite",
            });
        }
        automaton.mode_spec(initial.mode)?;

        let dt = self.options.sample_rate;
        let last_step = self.options.last_step(inputs)?;
        let mut run = Run {
            automaton,
            options: &self.options,
            queue: InputQueue::new(inputs, dt, last_step),
            samples: Vec::with_capacity(last_step.min(1 << 16) as usize + 1),
            state: HybridState::new(initial.mode, initial.continuous.at_time(0.0)),
            step: 0,
            jumps: 0,
        };
        run.record(false);

        let reason = if last_step == 0 {
            TerminationReason::HorizonReached
        } else {
            run.simulate(last_step)?
        };

        debug!(
            reason = %reason,
            step = run.step,
            time = run.state.time(),
            samples = run.samples.len(),
            jumps = run.jumps,
            "run terminated"
        );

        Ok(Trajectory {
            sample_rate: dt,
            termination: Termination {
                reason,
                step: run.step,
                time: run.state.time(),
            },
            samples: run.samples,
        })
    }

    /// Simulate one run; an integrator failure is returned as [`SimError::Integration`].
    pub fn run(&self, initial: &HybridState<M>, inputs: &InputSchedule) -> SimResult<Trajectory<M>> {
        let trajectory = self.trace(initial, inputs)?;
        if let Some(failure) = trajectory.integration_failure() {
            return Err(failure.clone().into());
        }
        Ok(trajectory)
    }
}

/// Run a single simulation of `automaton` from `initial` under `inputs`.
pub fn run_sim<M: Mode>(
    automaton: &Automaton<M>,
    initial: &HybridState<M>,
    inputs: &InputSchedule,
    options: &SimOptions,
) -> SimResult<Trajectory<M>> {
    Simulator::new(automaton, options.clone())?.run(initial, inputs)
}

/// Mutable bookkeeping of one run in progress.
struct Run<'s, M> {
    automaton: &'s Automaton<M>,
    options: &'s SimOptions,
    queue: InputQueue,
    samples: Vec<TrajectorySample<M>>,
    state: HybridState<M>,
    step: u64,
    jumps: usize,
}

impl<M: Mode> Run<'_, M> {
    fn record(&mut self, jump: bool) {
        self.samples.push(TrajectorySample {
            step: self.step,
            jumps: self.jumps,
            jump,
            state: self.state.clone(),
        });
    }

    fn simulate(&mut self, last_step: u64) -> SimResult<TerminationReason> {
        if let Some(reason) = self.settle()? {
            return Ok(reason);
        }
        while self.step < last_step {
            if let Some(reason) = self.advance()? {
                return Ok(reason);
            }
        }
        Ok(TerminationReason::HorizonReached)
    }

    /// Apply a detected transition at the current step.
    fn fire(&mut self, detection: Detection) -> SimResult<Option<TerminationReason>> {
        if self.jumps >= self.options.max_jumps {
            return Ok(Some(TerminationReason::JumpLimit));
        }
        let automaton = self.automaton;
        let payload = detection.input.map(|i| self.queue.event(i).payload);
        let post = automaton.reset(detection.transition, &self.state, payload.as_ref())?;
        if let Some(i) = detection.input {
            self.queue.consume(i);
        }

        self.jumps += 1;
        debug!(
            transition = %automaton.transition(detection.transition).name,
            from = %automaton.mode_name(self.state.mode),
            to = %automaton.mode_name(post.mode),
            step = self.step,
            time = post.time(),
            jumps = self.jumps,
            "jump"
        );
        self.state = post;
        self.record(true);

        if automaton.is_terminal(self.state.mode) {
            return Ok(Some(TerminationReason::Collision));
        }
        Ok(None)
    }

    /// Fire transitions eligible at the current instant until none is left.
    fn settle(&mut self) -> SimResult<Option<TerminationReason>> {
        loop {
            if self.automaton.is_terminal(self.state.mode) {
                return Ok(Some(TerminationReason::Collision));
            }
            let scan = scan_instant(self.automaton, &self.state, self.step, &self.queue);
            match scan.detection {
                Some(detection) => {
                    if let Some(reason) = self.fire(detection)? {
                        return Ok(Some(reason));
                    }
                }
                None => {
                    for i in scan.unaccepted {
                        self.queue.discard(i);
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Flow over one grid interval and handle whatever fires inside it.
    fn advance(&mut self) -> SimResult<Option<TerminationReason>> {
        let automaton = self.automaton;
        let k = self.step;
        let flow = ModeFlow::new(automaton, self.state.mode);
        let next = match step_on_grid(
            &self.options.integrator,
            &flow,
            &self.state.continuous,
            k,
            self.options.sample_rate,
        ) {
            Ok(x) => HybridState::new(self.state.mode, x),
            Err(SimError::ConvergenceFailed { what }) => {
                let failure = IntegrationFailure {
                    mode: automaton.mode_name(self.state.mode),
                    step: k,
                    time: self.state.time(),
                    reason: what,
                    last_valid: self.state.continuous.clone(),
                };
                warn!(
                    mode = %failure.mode,
                    time = failure.time,
                    reason = %failure.reason,
                    "integration failed"
                );
                return Ok(Some(TerminationReason::IntegrationFailure(failure)));
            }
            Err(e) => return Err(e),
        };

        let scan = scan_interval(automaton, &self.state, &next, k, &self.queue);
        match scan.detection {
            None => {
                for i in scan.unaccepted {
                    self.queue.discard(i);
                }
                self.step = k + 1;
                self.state = next;
                self.record(false);
                Ok(None)
            }
            Some(detection) if detection.step == k => {
                // Jump at the start of the interval: the flow to k+1 is discarded
                for i in scan.unaccepted {
                    if self.queue.step_of(i) == k {
                        self.queue.discard(i);
                    }
                }
                if let Some(reason) = self.fire(detection)? {
                    return Ok(Some(reason));
                }
                self.settle()
            }
            Some(detection) => {
                for i in scan.unaccepted {
                    self.queue.discard(i);
                }
                self.queue.discard_before(k + 1);
                self.step = k + 1;
                self.state = next;
                self.record(false);
                if let Some(reason) = self.fire(detection)? {
                    return Ok(Some(reason));
                }
                self.settle()
            }
        }
    }
}
