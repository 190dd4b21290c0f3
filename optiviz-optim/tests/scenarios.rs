//! End-to-end runs through `minimize`, using closure-built problems the way a
//! problem catalog would hand them over.

use approx::assert_relative_eq;
use optiviz_optim::{
    minimize, Algorithm, AlgorithmOptions, AlgorithmRun, ConvergenceCriterion, LineSearchKind,
    ProblemFunctions,
};

fn bowl() -> ProblemFunctions<f64> {
    ProblemFunctions::new(
        2,
        |w: &[f64]| w[0] * w[0] + w[1] * w[1],
        |w: &[f64]| vec![2.0 * w[0], 2.0 * w[1]],
    )
    .with_hessian(|_| vec![vec![2.0, 0.0], vec![0.0, 2.0]])
}

fn ill_conditioned() -> ProblemFunctions<f64> {
    ProblemFunctions::new(
        2,
        |w: &[f64]| w[0] * w[0] + 100.0 * w[1] * w[1],
        |w: &[f64]| vec![2.0 * w[0], 200.0 * w[1]],
    )
    .with_hessian(|_| vec![vec![2.0, 0.0], vec![0.0, 200.0]])
}

fn newton_options() -> AlgorithmOptions<f64> {
    AlgorithmOptions {
        initial_point: Some(vec![-1.0, 1.0]),
        hessian_damping: 0.0,
        line_search: LineSearchKind::None,
        ..AlgorithmOptions::new().with_tolerances(1e-6, 1e-9, 1e-9)
    }
}

fn gd_options(max_iter: usize) -> AlgorithmOptions<f64> {
    AlgorithmOptions {
        initial_point: Some(vec![-1.0, 1.0]),
        alpha: 0.1,
        max_iter,
        ..AlgorithmOptions::new()
    }
}

#[test]
fn newton_solves_isotropic_bowl_in_one_step() {
    let run = minimize(Algorithm::Newton, &bowl(), &newton_options()).unwrap();
    let summary = run.summary();

    assert_eq!(summary.iteration_count, 1);
    assert_eq!(
        summary.convergence_criterion,
        ConvergenceCriterion::Gradient
    );
    assert_relative_eq!(summary.final_location[0], 0.0, epsilon = 1e-12);
    assert_relative_eq!(summary.final_location[1], 0.0, epsilon = 1e-12);
    assert!(summary.converged);
    assert!(!summary.stalled);
    assert!(summary
        .termination_message
        .contains("second-order convergence"));
}

#[test]
fn fixed_step_gd_descends_monotonically() {
    let run = minimize(Algorithm::GdFixed, &bowl(), &gd_options(100)).unwrap();
    let AlgorithmRun::GdFixed(result) = &run else {
        panic!("unexpected variant {}", run.algorithm());
    };

    assert!(result.summary.iteration_count > 10);
    assert!(result.summary.converged, "{}", result.summary.termination_message);
    assert_eq!(
        result.summary.convergence_criterion,
        ConvergenceCriterion::Gradient
    );
    assert!(!result.summary.stalled);
    assert!(result.summary.final_grad_norm < 1e-6);
    for record in &result.iterations {
        assert!(record.new_loss < record.loss);
    }
}

#[test]
fn ill_conditioning_makes_gd_oscillate_but_not_newton() {
    let gd = minimize(Algorithm::GdFixed, &ill_conditioned(), &gd_options(50)).unwrap();
    let AlgorithmRun::GdFixed(gd) = gd else {
        panic!("unexpected variant");
    };

    // alpha * 200 = 20 overshoots the steep axis: w1 <- -19 * w1.
    assert!(!gd.summary.converged);
    assert_eq!(
        gd.summary.convergence_criterion,
        ConvergenceCriterion::MaxIter
    );
    assert_eq!(gd.summary.iteration_count, 50);
    for record in &gd.iterations {
        assert!(record.w[1] * record.w_new[1] < 0.0, "w1 must flip sign every step");
    }

    let newton = minimize(Algorithm::Newton, &ill_conditioned(), &newton_options()).unwrap();
    assert_eq!(newton.summary().iteration_count, 1);
    assert_eq!(
        newton.summary().convergence_criterion,
        ConvergenceCriterion::Gradient
    );
}

#[test]
fn non_finite_loss_ends_run_as_diverged() {
    // Linear descent until w0 reaches 3.5, then the loss blows up.
    let cliff = ProblemFunctions::new(
        2,
        |w: &[f64]| if w[0] < 3.5 { -w[0] } else { f64::INFINITY },
        |_: &[f64]| vec![-1.0, 0.0],
    );
    let options = AlgorithmOptions {
        initial_point: Some(vec![0.0, 0.0]),
        alpha: 1.0,
        ..AlgorithmOptions::new()
    };
    let run = minimize(Algorithm::GdFixed, &cliff, &options).unwrap();
    let AlgorithmRun::GdFixed(result) = &run else {
        panic!("unexpected variant");
    };

    assert!(result.summary.diverged);
    assert!(!result.summary.converged);
    assert_eq!(
        result.summary.convergence_criterion,
        ConvergenceCriterion::Diverged
    );
    assert_eq!(result.iterations.len(), 4);
    assert!(result.iterations[..3].iter().all(|r| r.new_loss.is_finite()));
    assert!(result.iterations[3].new_loss.is_infinite());
    assert!(result.summary.termination_message.starts_with("Diverged"));
}

#[test]
fn saddle_is_reported_not_a_minimum() {
    let saddle = ProblemFunctions::new(
        2,
        |w: &[f64]| w[0] * w[0] - w[1] * w[1],
        |w: &[f64]| vec![2.0 * w[0], -2.0 * w[1]],
    )
    .with_hessian(|_| vec![vec![2.0, 0.0], vec![0.0, -2.0]]);

    let run = minimize(Algorithm::Newton, &saddle, &newton_options()).unwrap();
    assert!(run.summary().saddle_point);
    assert!(run
        .summary()
        .termination_message
        .starts_with("Saddle point detected"));
}

#[test]
fn rosenbrock_every_algorithm() {
    let rosenbrock = ProblemFunctions::new(
        2,
        |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2),
        |x: &[f64]| {
            let b = x[1] - x[0] * x[0];
            vec![-2.0 * (1.0 - x[0]) - 400.0 * x[0] * b, 200.0 * b]
        },
    )
    .with_hessian(|x: &[f64]| {
        let h01 = -400.0 * x[0];
        vec![
            vec![2.0 - 400.0 * (x[1] - 3.0 * x[0] * x[0]), h01],
            vec![h01, 200.0],
        ]
    });
    let options = AlgorithmOptions {
        initial_point: Some(vec![-1.2, 1.0]),
        max_iter: 50,
        alpha: 1e-3,
        ..AlgorithmOptions::new().with_tolerances(1e-6, 1e-12, 1e-12)
    };

    for algorithm in Algorithm::ALL {
        let run = minimize(algorithm, &rosenbrock, &options).unwrap();
        let summary = run.summary();
        assert_eq!(run.algorithm(), algorithm);
        assert!(summary.iteration_count >= 1 && summary.iteration_count <= 50);
        assert!(!summary.diverged, "{algorithm}: {}", summary.termination_message);
        assert_eq!(run.trajectory().len(), summary.iteration_count + 1);
    }
}

#[test]
fn repeated_runs_are_bit_identical() {
    let options = AlgorithmOptions {
        initial_point: Some(vec![0.3, -0.8]),
        alpha: 1e-3,
        ..AlgorithmOptions::new().with_tolerances(1e-8, 1e-14, 1e-14)
    };
    for algorithm in Algorithm::ALL {
        let first = minimize(algorithm, &ill_conditioned(), &options).unwrap();
        let second = minimize(algorithm, &ill_conditioned(), &options).unwrap();
        assert_eq!(first, second, "{algorithm} is not deterministic");
    }
}
