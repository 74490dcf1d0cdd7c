//! Integration test: input events and collisions in the flappy game.

use hy_automaton::{InputEvent, InputSchedule, Payload};
use hy_core::{Tolerances, nearly_equal};
use hy_games::{ControlStyle, FlappyLevel, FlappyMode, FlappyParams, flappy_automaton};
use hy_sim::{Horizon, SimOptions, Simulator, TerminationReason};

fn options(horizon: Horizon) -> SimOptions {
    SimOptions {
        sample_rate: 0.02,
        horizon,
        ..SimOptions::default()
    }
}

fn schedule(events: &[(f64, Payload)]) -> InputSchedule {
    InputSchedule::new(
        events
            .iter()
            .map(|&(t, p)| InputEvent::new(t, p))
            .collect(),
    )
    .unwrap()
}

#[test]
fn tap_flap_jumps_at_nearest_sample() {
    let params = FlappyParams::default();
    let automaton = flappy_automaton(&params, &FlappyLevel::open()).unwrap();
    let sim = Simulator::new(&automaton, options(Horizon::Time(1.0))).unwrap();
    let initial = params.initial_state(0.0, 0.0, 0.0).unwrap();

    let trajectory = sim
        .run(&initial, &schedule(&[(0.505, Payload::Press)]))
        .unwrap();

    assert_eq!(trajectory.jump_count(), 1);
    let at_flap: Vec<_> = trajectory.samples_at_step(25).collect();
    assert_eq!(at_flap.len(), 2);
    assert!(!at_flap[0].jump);
    assert!(at_flap[1].jump);
    assert_eq!(at_flap[0].time(), at_flap[1].time());

    let before = at_flap[0].state.continuous.velocity[1];
    let after = at_flap[1].state.continuous.velocity[1];
    let tol = Tolerances::default();
    assert!(nearly_equal(after, before + params.flap_impulse, tol));
    assert!(nearly_equal(before, -9.81 * 0.5, tol));
}

#[test]
fn simultaneous_presses_jump_twice_at_one_step() {
    let params = FlappyParams::default();
    let automaton = flappy_automaton(&params, &FlappyLevel::open()).unwrap();
    let sim = Simulator::new(&automaton, options(Horizon::Time(1.0))).unwrap();
    let initial = params.initial_state(0.0, 0.0, 0.0).unwrap();

    let trajectory = sim
        .run(
            &initial,
            &schedule(&[(0.5, Payload::Press), (0.5, Payload::Impulse(3.0))]),
        )
        .unwrap();

    let jumps: Vec<_> = trajectory.jumps().collect();
    assert_eq!(jumps.len(), 2);
    assert_eq!(jumps[0].step, 25);
    assert_eq!(jumps[1].step, 25);
    assert_eq!((jumps[0].jumps, jumps[1].jumps), (1, 2));
    let gained = jumps[1].state.continuous.velocity[1]
        - trajectory.samples_at_step(25).next().unwrap().state.continuous.velocity[1];
    assert!(nearly_equal(gained, 5.0, Tolerances::default()));
}

#[test]
fn release_is_dropped_in_tap_style() {
    let params = FlappyParams::default();
    let automaton = flappy_automaton(&params, &FlappyLevel::open()).unwrap();
    let sim = Simulator::new(&automaton, options(Horizon::Time(0.5))).unwrap();
    let initial = params.initial_state(0.0, 0.0, 0.0).unwrap();

    let trajectory = sim
        .run(&initial, &schedule(&[(0.2, Payload::Release)]))
        .unwrap();
    assert_eq!(trajectory.jump_count(), 0);
    assert_eq!(trajectory.len(), 26);
}

#[test]
fn input_past_horizon_never_fires() {
    let params = FlappyParams::default();
    let automaton = flappy_automaton(&params, &FlappyLevel::open()).unwrap();
    let sim = Simulator::new(&automaton, options(Horizon::Time(1.0))).unwrap();
    let initial = params.initial_state(0.0, 0.0, 0.0).unwrap();

    let trajectory = sim
        .run(&initial, &schedule(&[(2.0, Payload::Press)]))
        .unwrap();
    assert_eq!(trajectory.jump_count(), 0);
    assert_eq!(trajectory.len(), 51);
}

#[test]
fn falling_onto_the_floor_ends_the_game() {
    let params = FlappyParams::default();
    let automaton = flappy_automaton(&params, &FlappyLevel::scripted()).unwrap();
    let sim = Simulator::new(&automaton, options(Horizon::Time(2.0))).unwrap();
    let initial = params.initial_state(0.0, 2.5, 0.0).unwrap();

    let trajectory = sim.run(&initial, &InputSchedule::empty()).unwrap();

    assert_eq!(trajectory.termination.reason, TerminationReason::Collision);
    let last = trajectory.last().unwrap();
    assert!(last.jump);
    assert_eq!(last.state.mode, FlappyMode::GameOver);
    // Floor contact at sqrt(2·2.5/9.81) ≈ 0.714 s
    assert!((trajectory.termination.time - 0.714).abs() <= 0.02);
}

#[test]
fn hitting_a_pipe_ends_the_game() {
    let params = FlappyParams::default();
    let automaton = flappy_automaton(&params, &FlappyLevel::scripted()).unwrap();
    let sim = Simulator::new(&automaton, options(Horizon::Time(2.0))).unwrap();
    // Flying level at y = 1.5 toward the lower pipe at x = 2.0
    let initial = params.initial_state(1.5, 1.5, 0.0).unwrap();
    let presses: Vec<(f64, Payload)> = (0..40)
        .map(|i| (0.02 * i as f64, Payload::Impulse(9.81 * 0.02)))
        .collect();

    let trajectory = sim.run(&initial, &schedule(&presses)).unwrap();
    assert_eq!(trajectory.termination.reason, TerminationReason::Collision);
    let hit = &trajectory.last().unwrap().state.continuous;
    assert!(hit.position[0] >= 1.96 && hit.position[0] <= 2.04);
}

#[test]
fn hold_style_flaps_while_pressed() {
    let params = FlappyParams {
        style: ControlStyle::Hold,
        ..FlappyParams::default()
    };
    let automaton = flappy_automaton(&params, &FlappyLevel::open()).unwrap();
    let sim = Simulator::new(&automaton, options(Horizon::Time(0.5))).unwrap();
    let initial = params.initial_state(0.0, 0.0, -1.0).unwrap();

    let trajectory = sim
        .run(
            &initial,
            &schedule(&[(0.1, Payload::Press), (0.3, Payload::Release)]),
        )
        .unwrap();

    assert_eq!(trajectory.jump_count(), 2);
    let mid = trajectory.at_step(10).unwrap();
    assert_eq!(mid.state.mode, FlappyMode::Flapping);
    assert_eq!(mid.state.continuous.velocity[1], params.flap_velocity);
    assert_eq!(
        trajectory.at_step(15).unwrap().state.mode,
        FlappyMode::Falling
    );
    let jump_steps: Vec<u64> = trajectory.jumps().map(|s| s.step).collect();
    assert_eq!(jump_steps, vec![5, 15]);
}

#[test]
fn button_samples_drive_input_length_horizon() {
    let params = FlappyParams {
        style: ControlStyle::Hold,
        ..FlappyParams::default()
    };
    let automaton = flappy_automaton(&params, &FlappyLevel::open()).unwrap();
    let sim = Simulator::new(&automaton, options(Horizon::InputLength)).unwrap();
    let initial = params.initial_state(0.0, 0.0, 0.0).unwrap();
    let inputs = InputSchedule::from_button_samples(&[0, 0, 0, 1, 0, 0], 0.02).unwrap();

    let trajectory = sim.run(&initial, &inputs).unwrap();
    assert_eq!(trajectory.termination.step, 6);
    assert_eq!(trajectory.len(), 9);
    let jump_steps: Vec<u64> = trajectory.jumps().map(|s| s.step).collect();
    assert_eq!(jump_steps, vec![3, 4]);
}

#[test]
fn empty_input_length_gives_single_sample() {
    let params = FlappyParams::default();
    let automaton = flappy_automaton(&params, &FlappyLevel::open()).unwrap();
    let sim = Simulator::new(&automaton, options(Horizon::InputLength)).unwrap();
    let initial = params.initial_state(0.0, 1.0, 0.0).unwrap();

    let trajectory = sim.run(&initial, &InputSchedule::empty()).unwrap();
    assert_eq!(trajectory.len(), 1);
    assert_eq!(trajectory.samples[0].state, initial);
    assert!(!trajectory.samples[0].jump);
}
