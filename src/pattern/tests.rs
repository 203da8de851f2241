//! Tests for pattern composition, tagging and loss construction

use super::*;
use crate::error::Error;
use crate::graph::{
    evaluate, evaluate_scalar, Activation, Dense, Expr, Feed, InputLayer, Network, Objective, Param,
    Sequential, TagFilter, Variable, REGULARIZABLE, TRAINABLE,
};
use approx::assert_abs_diff_eq;
use ndarray::{array, Array2};
use proptest::prelude::*;
use std::rc::Rc;

fn layer(name: &str, weights: Array2<f32>, activation: Activation) -> Rc<Dense> {
    let bias = Array2::zeros((1, weights.ncols()));
    Rc::new(Dense::from_arrays(name, weights, bias, activation).unwrap())
}

/// phi: 3 -> 2 linear, psi: 2 -> 2 softmax, beta: 2 -> 2 linear
struct Fixture {
    phi_layer: Rc<Dense>,
    phi: Rc<Sequential>,
    psi: Rc<Sequential>,
    beta: Rc<Sequential>,
    target_var: Variable,
    context_var: Variable,
    transform_var: Variable,
}

impl Fixture {
    fn new() -> Self {
        let phi_layer = layer(
            "phi.0",
            array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
            Activation::Identity,
        );
        let phi = Sequential::new("phi", InputLayer::new("x_i", vec![None, Some(3)]))
            .with_layer(phi_layer.clone());
        let psi = Sequential::new("psi", InputLayer::new("s", vec![None, Some(2)])).with_layer(
            layer("psi.0", array![[1.0, 0.0], [0.0, 1.0]], Activation::Softmax),
        );
        let beta = Sequential::new("beta", InputLayer::new("ds", vec![None, Some(2)])).with_layer(
            layer("beta.0", array![[2.0, 0.0], [0.0, 2.0]], Activation::Identity),
        );

        Self {
            phi_layer,
            phi: Rc::new(phi),
            psi: Rc::new(psi),
            beta: Rc::new(beta),
            target_var: Variable::matrix("y", 2),
            context_var: Variable::matrix("x_j", 3),
            transform_var: Variable::matrix("c", 2),
        }
    }

    fn builder(&self) -> PatternBuilder {
        PatternBuilder::new(self.phi.clone(), self.psi.clone())
    }

    fn pairwise(&self) -> PatternBuilder {
        self.builder()
            .target_var(self.target_var.clone())
            .context_var(self.context_var.clone())
            .context_transform_var(self.transform_var.clone())
    }

    fn feed(&self, pattern: &Pattern) -> Feed {
        Feed::new()
            .with(pattern.input_var(), array![[1.0, 2.0, 3.0], [0.0, 1.0, 0.0]])
            .with(&self.target_var, array![[0.0, 1.0], [1.0, 0.0]])
            .with(&self.context_var, array![[0.0, 0.0, 1.0], [1.0, 1.0, 1.0]])
            .with(&self.transform_var, array![[3.0, 3.0], [-2.0, -1.0]])
    }
}

fn ids(params: &[Param]) -> Vec<&str> {
    params.iter().map(|p| p.name()).collect()
}

#[test]
fn test_input_var_is_phi_input() {
    let fx = Fixture::new();
    let pattern = fx.pairwise().build_pairwise_predict().unwrap();

    assert_eq!(pattern.input_var(), fx.phi.input_layer().var());
    assert_eq!(pattern.input_layer().shape(), &vec![None, Some(3)]);
}

#[test]
fn test_objective_loss_is_deferred_then_built_once() {
    let fx = Fixture::new();
    let objective = Objective::squared_error();
    let pattern = fx
        .builder()
        .target_var(fx.target_var.clone())
        .target_loss(objective.clone())
        .build();

    assert!(pattern.target_loss().is_none());
    assert!(pattern.target_loss_fn().unwrap().same(&objective));

    pattern.create_target_objective(None, None).unwrap();
    let first = pattern.target_loss().unwrap().clone();

    pattern.create_target_objective(None, None).unwrap();
    assert!(pattern.target_loss().unwrap().ptr_eq(&first));
}

#[test]
fn test_explicit_loss_expression_is_kept() {
    let fx = Fixture::new();
    let loss = fx.target_var.expr().mean();
    let pattern = fx
        .pairwise()
        .target_loss(loss.clone())
        .build_pairwise_predict()
        .unwrap();

    assert!(pattern.target_loss().unwrap().ptr_eq(&loss));
    assert!(pattern.target_loss_fn().is_none());
}

#[test]
fn test_create_target_objective_requires_target_var() {
    let fx = Fixture::new();
    let pattern = fx.builder().target_loss(Objective::squared_error()).build();

    let err = pattern.create_target_objective(None, None).unwrap_err();
    assert!(matches!(err, Error::MissingVariable("target_var")));
    assert!(pattern.target_loss().is_none());
}

#[test]
fn test_create_target_objective_with_explicit_output_and_target() {
    let fx = Fixture::new();
    let pattern = fx
        .builder()
        .target_var(fx.target_var.clone())
        .target_loss(Objective::squared_error())
        .build();

    let output = pattern.get_phi_output_for(&pattern.input_var().expr());
    let target = Expr::constant(array![[4.0, 5.0], [0.0, 0.0]]);
    pattern
        .create_target_objective(Some(&output), Some(&target))
        .unwrap();

    let feed = Feed::new().with(pattern.input_var(), array![[1.0, 2.0, 3.0], [0.0, 1.0, 0.0]]);
    let loss = evaluate_scalar(pattern.target_loss().unwrap(), &feed).unwrap();
    // phi(x_i) = [[4, 5], [0, 1]], only the last element differs by 1
    assert_abs_diff_eq!(loss, 0.25, epsilon = 1e-6);
}

#[test]
fn test_base_pattern_has_no_defaults() {
    let fx = Fixture::new();
    let pattern = fx
        .builder()
        .target_var(fx.target_var.clone())
        .context_var(fx.context_var.clone())
        .build();

    assert!(matches!(
        pattern.default_target_objective(),
        Err(Error::NotImplemented("default_target_objective"))
    ));
    assert!(matches!(
        pattern.default_context_objective(),
        Err(Error::NotImplemented("default_context_objective"))
    ));
    assert!(matches!(
        pattern.create_target_objective(None, None),
        Err(Error::NotImplemented("default_target_objective"))
    ));
    assert!(matches!(
        pattern.create_context_objective(),
        Err(Error::NotImplemented("create_context_objective"))
    ));

    let x = pattern.input_var().expr();
    assert!(matches!(
        pattern.get_beta_output_for(&x, &x),
        Err(Error::NotImplemented("get_beta_output_for"))
    ));
    assert!(matches!(
        pattern.default_beta_input(),
        Err(Error::NotImplemented("default_beta_input"))
    ));
}

#[test]
fn test_pairwise_requires_transform_var() {
    let fx = Fixture::new();
    let result = fx
        .builder()
        .target_var(fx.target_var.clone())
        .context_var(fx.context_var.clone())
        .build_pairwise_predict();

    assert!(matches!(
        result,
        Err(Error::MissingVariable("context_transform_var"))
    ));
}

#[test]
fn test_pairwise_requires_context_var() {
    let fx = Fixture::new();
    let result = fx
        .builder()
        .target_var(fx.target_var.clone())
        .context_transform_var(fx.transform_var.clone())
        .build_pairwise_predict();

    assert!(matches!(result, Err(Error::MissingVariable("context_var"))));
}

#[test]
fn test_pairwise_builds_both_losses_with_defaults() {
    let fx = Fixture::new();
    let pattern = fx.pairwise().build_pairwise_predict().unwrap();

    assert!(pattern.target_loss().is_some());
    assert!(pattern.context_loss().is_some());
    assert_eq!(
        pattern.default_target_objective().unwrap().name(),
        "categorical_crossentropy"
    );
    assert_eq!(
        pattern.default_context_objective().unwrap().name(),
        "squared_error"
    );
}

#[test]
fn test_pairwise_loss_values() {
    let fx = Fixture::new();
    let pattern = fx.pairwise().build_pairwise_predict().unwrap();
    let feed = fx.feed(&pattern);

    // psi(phi(x_i)) = softmax([[4, 5], [0, 1]]) against y = [[0, 1], [1, 0]]
    let ce_first = (1.0f32 + (-1.0f32).exp()).ln();
    let ce_second = (1.0f32 + 1.0f32.exp()).ln();
    let target = evaluate_scalar(pattern.target_loss().unwrap(), &feed).unwrap();
    assert_abs_diff_eq!(target, (ce_first + ce_second) / 2.0, epsilon = 1e-5);

    // phi(x_i) - phi(x_j) = [[3, 4], [-2, -1]] against c = [[3, 3], [-2, -1]]
    let context = evaluate_scalar(pattern.context_loss().unwrap(), &feed).unwrap();
    assert_abs_diff_eq!(context, 0.25, epsilon = 1e-6);
}

#[test]
fn test_custom_context_objective_is_used() {
    let fx = Fixture::new();
    let objective = Objective::new("difference", |p, t| p - t);
    let pattern = fx
        .pairwise()
        .context_loss(objective.clone())
        .build_pairwise_predict()
        .unwrap();

    assert!(pattern.context_loss_fn().unwrap().same(&objective));

    let feed = fx.feed(&pattern);
    let context = evaluate_scalar(pattern.context_loss().unwrap(), &feed).unwrap();
    // diff - c = [[0, 1], [0, 0]]
    assert_abs_diff_eq!(context, 0.25, epsilon = 1e-6);
}

#[test]
fn test_training_loss_weighting() {
    let fx = Fixture::new();
    let pattern = fx.pairwise().build_pairwise_predict().unwrap();
    let feed = fx.feed(&pattern);

    let target = evaluate_scalar(pattern.target_loss().unwrap(), &feed).unwrap();
    let context = evaluate_scalar(pattern.context_loss().unwrap(), &feed).unwrap();

    let only_target = evaluate_scalar(&pattern.training_loss(1.0, 0.0).unwrap(), &feed).unwrap();
    let only_context = evaluate_scalar(&pattern.training_loss(0.0, 1.0).unwrap(), &feed).unwrap();
    let blended = evaluate_scalar(&pattern.training_loss(0.5, 0.5).unwrap(), &feed).unwrap();
    let unnormalized = evaluate_scalar(&pattern.training_loss(2.0, 3.0).unwrap(), &feed).unwrap();

    assert_eq!(only_target, target);
    assert_eq!(only_context, context);
    assert_abs_diff_eq!(blended, 0.5 * target + 0.5 * context, epsilon = 1e-6);
    assert_abs_diff_eq!(unnormalized, 2.0 * target + 3.0 * context, epsilon = 1e-5);
}

#[test]
fn test_training_loss_with_missing_context() {
    let fx = Fixture::new();
    let pattern = fx
        .builder()
        .target_var(fx.target_var.clone())
        .target_loss(Objective::categorical_crossentropy())
        .build();
    pattern.create_target_objective(None, None).unwrap();

    assert!(pattern.training_loss(1.0, 0.0).is_ok());
    assert!(matches!(
        pattern.training_loss(0.5, 0.5),
        Err(Error::MissingLoss("context"))
    ));
    assert!(matches!(
        pattern.training_loss(0.0, 1.0),
        Err(Error::MissingLoss("context"))
    ));
}

#[test]
fn test_training_loss_with_missing_target() {
    let fx = Fixture::new();
    let pattern = fx
        .builder()
        .context_loss(fx.context_var.expr().mean())
        .build();

    assert!(pattern.training_loss(0.0, 1.0).is_ok());
    assert!(matches!(
        pattern.training_loss(1.0, 0.0),
        Err(Error::MissingLoss("target"))
    ));
}

#[test]
fn test_get_params_order() {
    let fx = Fixture::new();
    let pattern = fx
        .pairwise()
        .beta(fx.beta.clone())
        .build_pairwise_predict()
        .unwrap();

    let params = pattern.get_params(&TagFilter::new());
    assert_eq!(
        ids(&params),
        vec!["psi.0.W", "psi.0.b", "beta.0.W", "beta.0.b", "phi.0.W", "phi.0.b"]
    );
}

#[test]
fn test_get_params_without_beta() {
    let fx = Fixture::new();
    let pattern = fx.pairwise().build_pairwise_predict().unwrap();

    let params = pattern.get_params(&TagFilter::new());
    assert_eq!(ids(&params), vec!["psi.0.W", "psi.0.b", "phi.0.W", "phi.0.b"]);
}

#[test]
fn test_get_params_role_filters() {
    let fx = Fixture::new();
    let pattern = fx
        .pairwise()
        .beta(fx.beta.clone())
        .build_pairwise_predict()
        .unwrap();

    let phi = pattern.get_params(&TagFilter::new().require("phi"));
    assert_eq!(ids(&phi), vec!["phi.0.W", "phi.0.b"]);

    let not_phi = pattern.get_params(&TagFilter::new().with("phi", false));
    assert_eq!(ids(&not_phi), vec!["psi.0.W", "psi.0.b", "beta.0.W", "beta.0.b"]);

    let regularizable = pattern.get_params(&TagFilter::new().require(REGULARIZABLE));
    assert_eq!(ids(&regularizable), vec!["psi.0.W", "beta.0.W", "phi.0.W"]);

    let trainable_beta = pattern.get_params(&TagFilter::new().require(TRAINABLE).require("beta"));
    assert_eq!(ids(&trainable_beta), vec!["beta.0.W", "beta.0.b"]);
}

#[test]
fn test_shared_phi_param_is_only_tagged_phi() {
    let fx = Fixture::new();
    // beta reuses phi's layer, so its parameters are reachable through both
    let beta = Sequential::new("beta", InputLayer::new("ds", vec![None, Some(3)]))
        .with_layer(fx.phi_layer.clone());
    let pattern = fx.builder().beta(Rc::new(beta)).build();

    let weights = fx.phi_layer.weights();
    let tags = pattern.param_tags(weights).unwrap();
    assert!(tags.contains("phi"));
    assert!(!tags.contains("beta"));
    assert!(tags.contains(TRAINABLE));
    assert!(pattern.param_tag_map().has_role(weights, Role::Phi));
    assert!(!pattern.param_tag_map().has_role(weights, Role::Beta));

    // Listed once, in the phi block
    let params = pattern.get_params(&TagFilter::new());
    assert_eq!(ids(&params), vec!["psi.0.W", "psi.0.b", "phi.0.W", "phi.0.b"]);
    assert!(pattern.get_params(&TagFilter::new().require("beta")).is_empty());
}

#[test]
fn test_phi_param_reached_by_beta_stays_in_phi_block() {
    let shared = layer("shared", array![[1.0, 0.0], [0.0, 1.0]], Activation::Identity);
    let phi = Sequential::new("phi", InputLayer::new("x_i", vec![None, Some(3)]))
        .with_layer(layer(
            "phiA",
            array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
            Activation::Identity,
        ))
        .with_layer(shared.clone());
    let psi = Sequential::new("psi", InputLayer::new("s", vec![None, Some(2)]))
        .with_layer(layer("psi0", array![[1.0, 0.0], [0.0, 1.0]], Activation::Softmax));
    let beta = Sequential::new("beta", InputLayer::new("ds", vec![None, Some(2)]))
        .with_layer(shared)
        .with_layer(layer("beta1", array![[2.0, 0.0], [0.0, 2.0]], Activation::Identity));

    let pattern = PatternBuilder::new(Rc::new(phi), Rc::new(psi))
        .beta(Rc::new(beta))
        .build();

    let params = pattern.get_params(&TagFilter::new());
    assert_eq!(
        ids(&params),
        vec![
            "psi0.W", "psi0.b", "beta1.W", "beta1.b", "phiA.W", "phiA.b", "shared.W", "shared.b",
        ]
    );

    let roles: Vec<Role> = params
        .iter()
        .map(|p| {
            let tags = pattern.param_tags(p).unwrap();
            Role::ALL
                .into_iter()
                .find(|r| tags.contains(r.as_str()))
                .unwrap()
        })
        .collect();
    let mut grouped = roles.clone();
    grouped.dedup();
    assert_eq!(grouped, vec![Role::Psi, Role::Beta, Role::Phi]);
}

#[test]
fn test_shared_psi_beta_param_gets_both_roles() {
    let fx = Fixture::new();
    let shared = layer("shared", array![[1.0, 0.0], [0.0, 1.0]], Activation::Identity);
    let psi = Sequential::new("psi", InputLayer::new("s", vec![None, Some(2)]))
        .with_layer(shared.clone());
    let beta =
        Sequential::new("beta", InputLayer::new("ds", vec![None, Some(2)])).with_layer(shared.clone());

    let pattern = PatternBuilder::new(fx.phi.clone(), Rc::new(psi))
        .beta(Rc::new(beta))
        .build();

    let tags = pattern.param_tags(shared.weights()).unwrap();
    assert!(tags.contains("psi"));
    assert!(tags.contains("beta"));
    assert!(!tags.contains("phi"));
}

#[test]
fn test_beta_output_without_beta_is_embedding_difference() {
    let fx = Fixture::new();
    let pattern = fx.pairwise().build_pairwise_predict().unwrap();
    let feed = fx.feed(&pattern);

    let beta_out = pattern
        .get_beta_output_for(&pattern.input_var().expr(), &fx.context_var.expr())
        .unwrap();
    let value = evaluate(&beta_out, &feed).unwrap();
    assert_eq!(value, array![[3.0, 4.0], [-2.0, -1.0]]);
}

#[test]
fn test_beta_output_with_beta_maps_difference() {
    let fx = Fixture::new();
    let pattern = fx
        .pairwise()
        .beta(fx.beta.clone())
        .build_pairwise_predict()
        .unwrap();
    let feed = fx.feed(&pattern);

    let beta_out = pattern
        .get_beta_output_for(&pattern.input_var().expr(), &fx.context_var.expr())
        .unwrap();
    let value = evaluate(&beta_out, &feed).unwrap();
    assert_eq!(value, array![[6.0, 8.0], [-4.0, -2.0]]);
}

#[test]
fn test_default_beta_input_is_cached() {
    let fx = Fixture::new();
    let pattern = fx
        .pairwise()
        .context_shape(3usize)
        .build_pairwise_predict()
        .unwrap();

    let pairwise = pattern.kind().pairwise().unwrap();
    assert!(!pairwise.has_context_input_layer());

    let first = pattern.default_beta_input().unwrap() as *const InputLayer;
    let second = pattern.default_beta_input().unwrap() as *const InputLayer;
    assert!(std::ptr::eq(first, second));
    assert!(pairwise.has_context_input_layer());

    let input = pattern.default_beta_input().unwrap();
    assert_eq!(input.var(), &fx.context_var);
    assert_eq!(input.shape(), &vec![None, Some(3)]);
}

#[test]
fn test_default_beta_input_falls_back_to_context_shape() {
    let fx = Fixture::new();
    let pattern = fx.pairwise().build_pairwise_predict().unwrap();

    let input = pattern.default_beta_input().unwrap();
    assert_eq!(input.shape(), fx.context_var.shape());
}

#[test]
fn test_training_input_vars_order() {
    let fx = Fixture::new();

    let base = fx
        .builder()
        .target_var(fx.target_var.clone())
        .context_var(fx.context_var.clone())
        .build();
    assert_eq!(
        base.training_input_vars(),
        vec![
            Some(base.input_var().clone()),
            Some(fx.target_var.clone()),
            Some(fx.context_var.clone()),
        ]
    );
    assert_eq!(base.context_vars(), vec![Some(fx.context_var.clone())]);

    let pairwise = fx.pairwise().build_pairwise_predict().unwrap();
    assert_eq!(
        pairwise.training_input_vars(),
        vec![
            Some(pairwise.input_var().clone()),
            Some(fx.target_var.clone()),
            Some(fx.context_var.clone()),
            Some(fx.transform_var.clone()),
        ]
    );
    assert_eq!(
        pairwise.context_vars(),
        vec![Some(fx.context_var.clone()), Some(fx.transform_var.clone())]
    );
}

#[test]
fn test_base_training_input_vars_keep_unset_slots() {
    let fx = Fixture::new();
    let base = fx.builder().build();

    let vars = base.training_input_vars();
    assert_eq!(vars.len(), 3);
    assert!(vars[1].is_none());
    assert!(vars[2].is_none());
}

#[test]
fn test_output_shape_and_outputs() {
    let fx = Fixture::new();
    let pattern = fx.pairwise().build_pairwise_predict().unwrap();

    assert_eq!(pattern.output_shape().unwrap(), vec![None, Some(2)]);
    assert!(pattern.get_output_shape_for(&vec![None, Some(5)]).is_err());

    let feed = fx.feed(&pattern);
    let via_output = evaluate(&pattern.get_output(), &feed).unwrap();
    let via_psi = evaluate(&pattern.get_psi_output_for(&pattern.input_var().expr()), &feed).unwrap();
    assert_eq!(via_output, via_psi);
    for row in via_output.rows() {
        assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-6);
    }
}

#[test]
fn test_training_feed_follows_input_order() {
    let fx = Fixture::new();
    let pattern = fx.pairwise().build_pairwise_predict().unwrap();

    let feed = Feed::zip(
        &pattern.training_input_vars(),
        vec![
            array![[1.0, 2.0, 3.0], [0.0, 1.0, 0.0]],
            array![[0.0, 1.0], [1.0, 0.0]],
            array![[0.0, 0.0, 1.0], [1.0, 1.0, 1.0]],
            array![[3.0, 3.0], [-2.0, -1.0]],
        ],
    )
    .unwrap();

    let expected = evaluate_scalar(&pattern.training_loss(0.5, 0.5).unwrap(), &fx.feed(&pattern)).unwrap();
    let got = evaluate_scalar(&pattern.training_loss(0.5, 0.5).unwrap(), &feed).unwrap();
    assert_eq!(got, expected);
}

fn matrix(rows: usize, cols: usize) -> impl Strategy<Value = Array2<f32>> {
    prop::collection::vec(-10.0f32..10.0, rows * cols)
        .prop_map(move |data| Array2::from_shape_vec((rows, cols), data).unwrap())
}

proptest! {
    #[test]
    fn prop_beta_output_is_elementwise_difference(
        x_i in matrix(4, 3),
        x_j in matrix(4, 3),
    ) {
        let fx = Fixture::new();
        let pattern = fx.pairwise().build_pairwise_predict().unwrap();
        let feed = Feed::new()
            .with(pattern.input_var(), x_i.clone())
            .with(&fx.context_var, x_j.clone());

        let beta_out = pattern
            .get_beta_output_for(&pattern.input_var().expr(), &fx.context_var.expr())
            .unwrap();
        let value = evaluate(&beta_out, &feed).unwrap();

        let w = fx.phi_layer.weights().value().clone();
        let expected = x_i.dot(&w) - x_j.dot(&w);
        for (got, want) in value.iter().zip(expected.iter()) {
            prop_assert!((got - want).abs() < 1e-3);
        }
    }

    #[test]
    fn prop_tag_filters_partition_params(
        tag in prop::sample::select(vec!["phi", "psi", "beta", TRAINABLE, REGULARIZABLE]),
        with_beta in any::<bool>(),
    ) {
        let fx = Fixture::new();
        let builder = if with_beta { fx.builder().beta(fx.beta.clone()) } else { fx.builder() };
        let pattern = builder.build();

        let all = pattern.get_params(&TagFilter::new());
        let with_tag = pattern.get_params(&TagFilter::new().require(tag));
        let without_tag = pattern.get_params(&TagFilter::new().exclude(tag));

        prop_assert_eq!(with_tag.len() + without_tag.len(), all.len());
        for p in &with_tag {
            prop_assert!(pattern.param_tags(p).unwrap().contains(tag));
            prop_assert!(!without_tag.contains(p));
        }
        for p in &without_tag {
            prop_assert!(!pattern.param_tags(p).unwrap().contains(tag));
        }

        // Filtering preserves the psi, beta, phi order
        let positions: Vec<usize> = with_tag
            .iter()
            .map(|p| all.iter().position(|q| q == p).unwrap())
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
