use lattice::{Activations, DenseNet, DerivativeCache, NetError};

fn widths(net: &DenseNet) -> Vec<usize> {
    net.layer_sizes().to_vec()
}

#[test]
fn rejects_single_layer() {
    let result = DenseNet::new(-1., 1., 1, &[(3, Activations::Sigmoid)]);
    assert!(matches!(result, Err(NetError::TooFewLayers(1))));
}

#[test]
fn rejects_zero_width_layer() {
    let result = DenseNet::new(
        -1.,
        1.,
        1,
        &[
            (3, Activations::Linear),
            (0, Activations::Sigmoid),
            (1, Activations::Sigmoid),
        ],
    );
    assert!(matches!(result, Err(NetError::EmptyLayer(1))));
}

#[test]
fn equal_arguments_build_identical_networks() {
    let layers = [
        (3, Activations::Linear),
        (5, Activations::Tanh),
        (2, Activations::Sigmoid),
    ];
    let a = DenseNet::new(-1., 1., 777, &layers).unwrap();
    let b = DenseNet::new(-1., 1., 777, &layers).unwrap();

    for layer in 1..a.depth() {
        assert_eq!(a.weights(layer), b.weights(layer));
        assert_eq!(a.biases(layer), b.biases(layer));
    }
}

#[test]
fn initial_values_follow_the_range_formula() {
    // lower + draw * (|lower| + upper) with draw in [0, 1] lands every
    // value in [lower, lower + |lower| + upper].
    let net = DenseNet::new(
        -1.,
        1.,
        42,
        &[(4, Activations::Linear), (6, Activations::Relu), (3, Activations::Relu)],
    )
    .unwrap();

    for layer in 1..net.depth() {
        for b in net.biases(layer) {
            assert!((-1.0..=1.0).contains(b));
        }
        for w in net.weights(layer) {
            assert!((-1.0..=1.0).contains(w));
        }
    }
}

#[test]
fn reset_continues_the_stream() {
    let layers = [(2, Activations::Linear), (2, Activations::Sigmoid)];

    let mut a = DenseNet::new(-1., 1., 9, &layers).unwrap();
    let fresh = a.weights(1).clone();
    a.reset();
    assert_ne!(&fresh, a.weights(1));

    // The same seed and the same reset count land on the same values.
    let mut b = DenseNet::new(-1., 1., 9, &layers).unwrap();
    b.reset();
    assert_eq!(a.weights(1), b.weights(1));
    assert_eq!(a.biases(1), b.biases(1));
}

#[test]
fn identity_network_passes_input_through() {
    let mut net =
        DenseNet::new(-1., 1., 3, &[(1, Activations::Linear), (1, Activations::Linear)]).unwrap();
    net.weights_mut(1)[[0, 0]] = 1.;
    net.biases_mut(1)[0] = 0.;

    let out = net.predict(&[5.0]).unwrap();
    assert_eq!(out, vec![5.0]);
}

#[test]
fn forward_is_deterministic() {
    let mut net = DenseNet::new(
        -1.,
        1.,
        21,
        &[
            (3, Activations::Linear),
            (4, Activations::Sigmoid),
            (2, Activations::Tanh),
        ],
    )
    .unwrap();

    let first = net.predict(&[0.1, -0.7, 0.4]).unwrap();
    let second = net.predict(&[0.1, -0.7, 0.4]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn fast_and_full_passes_agree_on_outputs() {
    let mut net = DenseNet::new(
        -1.,
        1.,
        5,
        &[
            (2, Activations::Linear),
            (3, Activations::Sigmoid),
            (1, Activations::Sigmoid),
        ],
    )
    .unwrap();

    let fast = net.predict(&[0.3, 0.9]).unwrap();
    net.forward_on(&[0.3, 0.9]).unwrap();
    let full = net.output().to_vec();
    assert_eq!(fast, full);
}

#[test]
fn fast_pass_leaves_derivatives_untouched() {
    let mut net =
        DenseNet::new(-1., 1., 5, &[(2, Activations::Linear), (2, Activations::Sigmoid)]).unwrap();

    let before = net.derivatives(1).clone();
    net.predict(&[0.3, 0.9]).unwrap();
    assert_eq!(&before, net.derivatives(1));
}

#[test]
fn cache_strategies_disagree_for_sigmoid() {
    let layers = [(1, Activations::Linear), (1, Activations::Sigmoid)];

    let mut reactivated = DenseNet::new(-1., 1., 11, &layers).unwrap();
    let mut analytic = DenseNet::new(-1., 1., 11, &layers).unwrap();
    analytic.set_derivative_cache(DerivativeCache::Analytic);

    reactivated.forward_on(&[0.5]).unwrap();
    analytic.forward_on(&[0.5]).unwrap();

    // Identical weights, identical outputs, different cached values.
    assert_eq!(reactivated.output(), analytic.output());
    assert_ne!(reactivated.derivatives(1)[0], analytic.derivatives(1)[0]);

    let out = reactivated.output()[0];
    let sigmoid = |x: f64| 1. / (1. + (-x).exp());
    assert!((reactivated.derivatives(1)[0] - sigmoid(out)).abs() < 1e-12);
    assert!((analytic.derivatives(1)[0] - out * (1. - out)).abs() < 1e-12);
}

#[test]
fn error_terms_follow_the_delta_rule() {
    // Pin the pre-activation sum to ln(4): sigmoid gives 0.8, and the
    // analytic derivative 0.8 * 0.2 = 0.16.
    let mut net =
        DenseNet::new(-1., 1., 2, &[(1, Activations::Linear), (1, Activations::Sigmoid)]).unwrap();
    net.set_derivative_cache(DerivativeCache::Analytic);
    net.weights_mut(1)[[0, 0]] = 0.;
    net.biases_mut(1)[0] = 4.0_f64.ln();

    net.forward_on(&[1.0]).unwrap();
    assert!((net.output()[0] - 0.8).abs() < 1e-12);

    net.train_step(&[1.0], 0.1).unwrap();

    // (0.8 - 1.0) * 0.16 = -0.032, so the bias moves by +0.0032 and the
    // weight by +0.0032 * input.
    assert!((net.errors(1)[0] - (-0.032)).abs() < 1e-12);
    assert!((net.biases(1)[0] - (4.0_f64.ln() + 0.0032)).abs() < 1e-12);
    assert!((net.weights(1)[[0, 0]] - 0.0032).abs() < 1e-12);
}

#[test]
fn training_step_reduces_squared_error() {
    let mut net = DenseNet::new(
        -0.5,
        0.5,
        13,
        &[
            (2, Activations::Linear),
            (2, Activations::Linear),
            (1, Activations::Linear),
        ],
    )
    .unwrap();
    net.set_derivative_cache(DerivativeCache::Analytic);

    let input = [0.5, -0.3];
    let target = [0.7];

    net.forward_on(&input).unwrap();
    let before = (net.output()[0] - target[0]).powi(2);

    net.train_step(&target, 0.01).unwrap();

    net.forward_on(&input).unwrap();
    let after = (net.output()[0] - target[0]).powi(2);

    assert!(after < before);
}

#[test]
fn two_layer_network_trains_without_hidden_errors() {
    let mut net =
        DenseNet::new(-1., 1., 17, &[(2, Activations::Linear), (1, Activations::Linear)]).unwrap();
    net.set_derivative_cache(DerivativeCache::Analytic);

    net.forward_on(&[0.2, 0.4]).unwrap();
    net.train_step(&[1.0], 0.1).unwrap();

    assert_eq!(net.errors(1).len(), 1);
    assert_eq!(widths(&net), vec![2, 1]);
}

#[test]
fn rejects_mismatched_input_and_target_widths() {
    let mut net =
        DenseNet::new(-1., 1., 1, &[(2, Activations::Linear), (1, Activations::Sigmoid)]).unwrap();

    assert!(matches!(
        net.predict(&[1.0]),
        Err(NetError::DimensionMismatch { expected: 2, got: 1 })
    ));

    net.forward_on(&[1.0, 2.0]).unwrap();
    assert!(matches!(
        net.train_step(&[1.0, 2.0], 0.1),
        Err(NetError::DimensionMismatch { expected: 1, got: 2 })
    ));
}

#[test]
fn activation_pairs_are_consistent() {
    use lattice::Activations::*;

    assert_eq!(Sigmoid.wake().a(0.), 0.5);
    assert_eq!(Relu.wake().a(-3.), 0.);
    assert_eq!(Relu.wake().d(2.), 1.);
    assert_eq!(LeakyRelu.wake().a(-1.), -0.05);
    assert_eq!(LeakyRelu.wake().d(-1.), 0.05);
    assert_eq!(Linear.wake().d(123.), 1.);
    assert!((Tanh.wake().d(0.) - 1.).abs() < 1e-12);
}
