//! Integration test: runs that stop abnormally.
//!
//! A mode whose acceleration blows up after t = 0.55 cannot be integrated
//! across the interval [0.5, 0.6]. The run keeps every sample up to t = 0.5
//! and reports the failure; a crossing self-loop whose reset leaves its guard
//! satisfied is a configuration error.

use hy_automaton::{
    Automaton, AutomatonBuilder, ConfigurationError, ContinuousState, HybridState, InputSchedule,
};
use hy_core::{Real, Tolerances, nearly_equal};
use hy_sim::{
    Horizon, IntegratorKind, IntegratorOptions, SimError, SimOptions, Simulator,
    TerminationReason,
};
use nalgebra::DVector;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Rod {
    Sliding,
}

fn unstable() -> Automaton<Rod> {
    let mut b = AutomatonBuilder::new(1);
    b.add_mode(Rod::Sliding, "unstable", |x: &ContinuousState| {
        if x.time > 0.55 {
            DVector::from_element(1, Real::INFINITY)
        } else {
            DVector::zeros(1)
        }
    });
    b.build().unwrap()
}

fn options(kind: IntegratorKind) -> SimOptions {
    SimOptions {
        sample_rate: 0.1,
        horizon: Horizon::Time(1.0),
        integrator: IntegratorOptions {
            kind,
            ..IntegratorOptions::default()
        },
        ..SimOptions::default()
    }
}

fn start() -> HybridState<Rod> {
    HybridState::new(
        Rod::Sliding,
        ContinuousState::new(0.0, vec![0.05], vec![1.0]).unwrap(),
    )
}

#[test]
fn trace_keeps_samples_before_the_failure() {
    let automaton = unstable();
    let tol = Tolerances::default();

    for kind in [IntegratorKind::DormandPrince, IntegratorKind::Rk4] {
        let sim = Simulator::new(&automaton, options(kind)).unwrap();
        let trajectory = sim.trace(&start(), &InputSchedule::empty()).unwrap();

        let failure = trajectory
            .integration_failure()
            .unwrap_or_else(|| panic!("{kind:?}: run should fail"));
        assert_eq!(failure.mode, "unstable");
        assert_eq!(failure.step, 5, "{kind:?}");
        assert!(nearly_equal(failure.time, 0.5, tol));
        assert!(!failure.reason.is_empty());

        // Samples 0..=5 survive and the last one is the last valid state
        assert_eq!(trajectory.len(), 6);
        assert_eq!(trajectory.termination.step, 5);
        let last = &trajectory.last().unwrap().state.continuous;
        assert_eq!(last, &failure.last_valid);
        assert!(failure.last_valid.is_finite());
        assert!(nearly_equal(failure.last_valid.position[0], 0.55, tol));
        assert_eq!(trajectory.termination.reason.label(), "integration failure");
        assert!(matches!(
            trajectory.termination.reason,
            TerminationReason::IntegrationFailure(_)
        ));
    }
}

#[test]
fn run_reports_mode_and_time() {
    let automaton = unstable();
    let sim = Simulator::new(&automaton, options(IntegratorKind::DormandPrince)).unwrap();

    let err = sim.run(&start(), &InputSchedule::empty()).unwrap_err();
    match err {
        SimError::Integration { mode, time, .. } => {
            assert_eq!(mode, "unstable");
            assert!(nearly_equal(time, 0.5, Tolerances::default()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rearming_self_loop_aborts_the_run() {
    let mut b = AutomatonBuilder::new(1);
    b.add_mode(Rod::Sliding, "sliding", |_x: &ContinuousState| DVector::zeros(1));
    // Leaves the rod past the stop, so the guard still holds after the reset
    b.add_crossing(
        "stop",
        Rod::Sliding,
        Rod::Sliding,
        0,
        |s, _| s.continuous.position[0] - 0.3,
        |s, _| s.continuous.clone(),
    );
    let automaton = b.build().unwrap();
    let sim = Simulator::new(&automaton, options(IntegratorKind::DormandPrince)).unwrap();

    let err = sim.trace(&start(), &InputSchedule::empty()).unwrap_err();
    assert!(matches!(
        err,
        SimError::Configuration(ConfigurationError::SelfRetrigger { .. })
    ));
}
