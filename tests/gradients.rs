//! Backward-pass correctness: analytic gradients against central-difference
//! estimates, the analytic fast paths against the general chain, and the
//! masking and flattening machinery around them.

use gradnet::approx::within_tolerance;
use gradnet::dataset::{DataSet, StaticDataSet, SupervisedInOutSet};
use gradnet::derivatives::{UnrolledParameters, WeightDecayParameters};
use gradnet::functions::{ActivationFunction, CostFunction, ParameterApply};
use gradnet::learner::SupervisedLearner;
use gradnet::network::NeuralNetwork;
use gradnet::regression::Regression;
use gradnet::tensors::Tensor;
use gradnet::values::{
    InputSet, LayerInputSet, LayerWeights, OutputMixer, OutputSet, UnactivatedLayerOutputSet,
};

fn dataset(outputs: &[Vec<f64>], seed: u64) -> StaticDataSet {
    let inputs = vec![
        vec![0.3, -1.2, 0.8],
        vec![1.1, 0.4, -0.5],
        vec![-0.7, 0.9, 0.2],
        vec![0.5, -0.3, -1.4],
    ];
    let input = InputSet::from_rows(&inputs).unwrap();
    let output = OutputSet::from_rows(outputs).unwrap();
    StaticDataSet::with_split(input, output, 0.0, 0.0, seed).unwrap()
}

fn regression_outputs() -> Vec<Vec<f64>> {
    vec![
        vec![1.7, -0.9],
        vec![-2.2, 0.6],
        vec![0.4, 1.3],
        vec![3.1, -1.8],
    ]
}

fn label_outputs() -> Vec<Vec<f64>> {
    vec![
        vec![1.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 1.0],
        vec![0.0, 0.0],
    ]
}

fn assert_analytic_matches_numeric<D: DataSet>(
    network: &mut NeuralNetwork<D>,
    set: &SupervisedInOutSet,
) {
    let analytic = network.weight_gradients(set).unwrap();
    for layer in 0..network.layer_count() {
        let numeric = network.check_derivatives(set, layer).unwrap();
        assert!(
            within_tolerance(numeric.values(), analytic[layer].values()),
            "layer {layer} analytic gradient diverges from the numeric estimate"
        );
    }
}

#[test]
fn bias_augmentation_prepends_a_ones_column() {
    let input = InputSet::from_rows(&[vec![2.0, 3.0], vec![4.0, 5.0], vec![6.0, 7.0]]).unwrap();
    let augmented = LayerInputSet::from_input(&input);

    assert_eq!(augmented.set_count(), 3);
    assert_eq!(augmented.input_size(), 2);
    assert_eq!(augmented.values().cols(), input.input_count() + 1);
    for row in 0..augmented.set_count() {
        assert_eq!(augmented.values().get(row, 0), 1.0);
    }
}

#[test]
fn unroll_and_scatter_round_trips_exactly() {
    let first = LayerWeights::from_matrix(Tensor::new(
        3,
        2,
        vec![0.1, -0.2, 0.3, -0.4, 0.5, -0.6],
    ))
    .unwrap();
    let second = LayerWeights::from_matrix(Tensor::new(2, 1, vec![1.5, -2.5])).unwrap();
    let original = vec![first, second];

    let unrolled = UnrolledParameters::unroll(&original);
    assert_eq!(unrolled.len(), 8);

    let mut restored = original.clone();
    unrolled.scatter_into(&mut restored);
    assert_eq!(original, restored);
}

#[test]
fn scatter_places_updates_at_the_right_cells() {
    let first = LayerWeights::from_matrix(Tensor::new(2, 2, vec![0.0; 4])).unwrap();
    let second = LayerWeights::from_matrix(Tensor::new(2, 1, vec![0.0; 2])).unwrap();
    let mut weights = vec![first, second];

    let mut unrolled = UnrolledParameters::unroll(&weights);
    for (i, value) in unrolled.values_mut().iter_mut().enumerate() {
        *value = i as f64;
    }
    unrolled.scatter_into(&mut weights);

    assert_eq!(weights[0].values().data(), &[0.0, 1.0, 2.0, 3.0]);
    assert_eq!(weights[1].values().data(), &[4.0, 5.0]);
}

#[test]
fn gradients_match_numeric_estimates_half_squared_sigmoid() {
    let data = dataset(&label_outputs(), 11);
    let set = data.training_set().inner().clone();
    let mut network = NeuralNetwork::with_functions(
        CostFunction::HalfSquared,
        ActivationFunction::Sigmoid,
        gradnet::functions::OptimizationFunction::gradient_descent(0.1),
        data,
        &[4],
        11,
    )
    .unwrap();
    assert_analytic_matches_numeric(&mut network, &set);
}

#[test]
fn gradients_match_numeric_estimates_logarithmic_sigmoid() {
    let data = dataset(&label_outputs(), 13);
    let set = data.training_set().inner().clone();
    let mut network = NeuralNetwork::with_functions(
        CostFunction::Logarithmic,
        ActivationFunction::Sigmoid,
        gradnet::functions::OptimizationFunction::gradient_descent(0.1),
        data,
        &[3],
        13,
    )
    .unwrap();
    assert_analytic_matches_numeric(&mut network, &set);
}

#[test]
fn gradients_match_numeric_estimates_half_squared_softplus() {
    let data = dataset(&regression_outputs(), 17);
    let set = data.training_set().inner().clone();
    let mut network = NeuralNetwork::with_functions(
        CostFunction::HalfSquared,
        ActivationFunction::Softplus,
        gradnet::functions::OptimizationFunction::gradient_descent(0.1),
        data,
        &[3],
        17,
    )
    .unwrap();
    assert_analytic_matches_numeric(&mut network, &set);
}

#[test]
fn gradients_match_numeric_estimates_absolute_identity() {
    let data = dataset(&regression_outputs(), 19);
    let set = data.training_set().inner().clone();
    let mut network = NeuralNetwork::with_functions(
        CostFunction::Absolute,
        ActivationFunction::Identity,
        gradnet::functions::OptimizationFunction::gradient_descent(0.1),
        data,
        &[],
        19,
    )
    .unwrap();
    assert_analytic_matches_numeric(&mut network, &set);
}

#[test]
fn regression_gradient_equals_single_layer_network_gradient() {
    let data = dataset(&regression_outputs(), 23);
    let set = data.training_set().inner().clone();

    let regression = Regression::linear(data.clone(), 0.1, 23).unwrap();
    let network = NeuralNetwork::with_functions(
        CostFunction::HalfSquared,
        ActivationFunction::Identity,
        gradnet::functions::OptimizationFunction::gradient_descent(0.1),
        data,
        &[],
        23,
    )
    .unwrap();

    assert_eq!(regression.weights(), network.layer_weights(0));

    let regression_grad = regression.weight_gradient(&set).unwrap();
    let network_grads = network.weight_gradients(&set).unwrap();
    assert!(within_tolerance(
        regression_grad.values(),
        network_grads[0].values()
    ));
}

#[test]
fn logarithmic_sigmoid_fast_path_equals_general_chain() {
    let unactivated = UnactivatedLayerOutputSet::new(Tensor::new(
        2,
        2,
        vec![0.2, -0.4, 1.0, 0.3],
    ));
    let activation = ActivationFunction::Sigmoid;
    let activated = activation.apply(&unactivated);
    let actual = OutputSet::from_layer_output(&activated);
    let expected = OutputSet::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
    let decay = WeightDecayParameters::unroll(&[]);

    let fast = CostFunction::Logarithmic.erroneousness(
        &decay,
        &expected,
        &actual,
        &unactivated,
        &activated,
        activation,
    );

    let general = CostFunction::Logarithmic
        .output_derivative(&decay, &expected, &actual)
        .chain(&actual.layer_output_derivative())
        .chain(&activation.derivative(&unactivated, &activated));

    assert!(within_tolerance(fast.values(), general.values()));
}

#[test]
fn identity_activation_skip_equals_general_chain() {
    let unactivated = UnactivatedLayerOutputSet::new(Tensor::new(2, 1, vec![0.7, -1.1]));
    let activation = ActivationFunction::Identity;
    let activated = activation.apply(&unactivated);
    let actual = OutputSet::from_layer_output(&activated);
    let expected = OutputSet::from_rows(&[vec![0.5], vec![0.5]]).unwrap();
    let decay = WeightDecayParameters::unroll(&[]);

    let skipped = CostFunction::HalfSquared.erroneousness(
        &decay,
        &expected,
        &actual,
        &unactivated,
        &activated,
        activation,
    );

    let general = CostFunction::HalfSquared
        .output_derivative(&decay, &expected, &actual)
        .chain(&actual.layer_output_derivative())
        .chain(&activation.derivative(&unactivated, &activated));

    assert!(within_tolerance(skipped.values(), general.values()));
}

#[test]
fn masked_cells_ignore_the_expected_label() {
    let actual = OutputSet::new(Tensor::new(2, 2, vec![0.3, 0.6, 0.8, 0.4]));
    let decay = WeightDecayParameters::unroll(&[]);

    let mut masked = OutputSet::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
    masked
        .set_mixer(OutputMixer::new(Tensor::new(2, 2, vec![0.0, 1.0, 1.0, 1.0])).unwrap())
        .unwrap();

    let mut perturbed = OutputSet::from_rows(&[vec![0.0, 0.0], vec![0.0, 1.0]]).unwrap();
    perturbed
        .set_mixer(OutputMixer::new(Tensor::new(2, 2, vec![0.0, 1.0, 1.0, 1.0])).unwrap())
        .unwrap();

    for cost in [
        CostFunction::HalfSquared,
        CostFunction::Absolute,
        CostFunction::Logarithmic,
    ] {
        let a = cost.cost(&decay, &masked, &actual);
        let b = cost.cost(&decay, &perturbed, &actual);
        assert_eq!(a.values(), b.values(), "{cost:?} cost saw a masked label");

        let da = cost.output_derivative(&decay, &masked, &actual);
        let db = cost.output_derivative(&decay, &perturbed, &actual);
        assert_eq!(
            da.values(),
            db.values(),
            "{cost:?} derivative saw a masked label"
        );
        assert_eq!(da.values().get(0, 0), 0.0);
    }
}

#[test]
fn masked_cells_do_not_reach_weight_gradients() {
    let inputs = vec![vec![0.4, -0.6], vec![-0.2, 0.9], vec![1.0, 0.1]];
    let labels = vec![vec![1.0], vec![0.0], vec![1.0]];
    let flipped = vec![vec![0.0], vec![0.0], vec![1.0]];
    let mask = Tensor::new(3, 1, vec![0.0, 1.0, 1.0]);

    let gradient_for = |labels: &[Vec<f64>]| {
        let input = InputSet::from_rows(&inputs).unwrap();
        let mut output = OutputSet::from_rows(labels).unwrap();
        output
            .set_mixer(OutputMixer::new(mask.clone()).unwrap())
            .unwrap();
        let data = StaticDataSet::with_split(input, output, 0.0, 0.0, 29).unwrap();
        let set = data.training_set().inner().clone();
        let model = Regression::logistic(data, 0.5, 29).unwrap();
        model.weight_gradient(&set).unwrap().values().clone()
    };

    assert_eq!(gradient_for(&labels), gradient_for(&flipped));
}

#[test]
fn logarithmic_cost_stays_finite_at_saturated_outputs() {
    let decay = WeightDecayParameters::unroll(&[]);
    let expected = OutputSet::from_rows(&[vec![1.0], vec![0.0]]).unwrap();
    let actual = OutputSet::new(Tensor::new(2, 1, vec![0.0, 0.5]));

    let cost = CostFunction::Logarithmic.cost(&decay, &expected, &actual);
    assert!(cost.values().data().iter().all(|c| c.is_finite()));

    let derivative = CostFunction::Logarithmic.output_derivative(&decay, &expected, &actual);
    assert!(derivative.values().data().iter().all(|d| d.is_finite()));
}

#[test]
fn activation_shapes_and_kinks() {
    let unactivated = UnactivatedLayerOutputSet::new(Tensor::new(1, 4, vec![-2.0, 0.0, 1.0, 3.0]));

    let relu = ActivationFunction::Relu;
    let activated = relu.apply(&unactivated);
    assert_eq!(activated.values().data(), &[0.0, 0.0, 1.0, 3.0]);
    let derivative = relu.derivative(&unactivated, &activated);
    assert_eq!(derivative.values().data(), &[0.0, 0.0, 1.0, 1.0]);

    let softplus = ActivationFunction::Softplus;
    let activated = softplus.apply(&unactivated);
    assert!((activated.values().get(0, 1) - 2.0f64.ln()).abs() < 1e-12);
    let huge = UnactivatedLayerOutputSet::new(Tensor::new(1, 1, vec![1000.0]));
    assert!(softplus.apply(&huge).values().get(0, 0).is_finite());

    let sigmoid = ActivationFunction::Sigmoid;
    let activated = sigmoid.apply(&unactivated);
    let derivative = sigmoid.derivative(&unactivated, &activated);
    for (a, d) in activated
        .values()
        .data()
        .iter()
        .zip(derivative.values().data())
    {
        assert!((d - a * (1.0 - a)).abs() < 1e-15);
    }
}

#[test]
fn check_derivatives_leaves_the_live_state_alone() {
    let data = dataset(&label_outputs(), 31);
    let set = data.training_set().inner().clone();
    let mut network = NeuralNetwork::new(data, 0.1, &[3], 31).unwrap();

    let before = network.state().clone();
    network.check_derivatives(&set, 0).unwrap();
    network.check_derivatives(&set, 1).unwrap();

    assert_eq!(before.weights(), network.state().weights());
    assert_eq!(before.iteration_count(), network.iteration_count());
}

#[test]
fn apply_derivatives_return_the_operands() {
    let input = InputSet::from_rows(&[vec![1.0, 2.0]]).unwrap();
    let layer_input = LayerInputSet::from_input(&input);
    let weights =
        LayerWeights::from_matrix(Tensor::new(3, 1, vec![0.5, -0.5, 0.25])).unwrap();
    let apply = gradnet::functions::MatrixMultiply;

    // augmented row [1, 1, 2] against the weight column [0.5, -0.5, 0.25]
    let output = apply.output(&layer_input, &weights);
    assert_eq!(output.values().data(), &[0.5]);

    assert_eq!(
        apply.weight_derivative(&layer_input, &weights).values(),
        layer_input.values()
    );
    assert_eq!(
        apply.input_derivative(&layer_input, &weights).values(),
        weights.values()
    );
}
