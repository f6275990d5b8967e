#![cfg(test)]

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::arch::{
    Categorical, NetSpec, PolicyNet, RecurrentState, StepCache,
    loss::{ActorCriticLoss, SegmentBuilder, Targets},
};

const SPEC: NetSpec = NetSpec {
    obs_size: 3,
    hidden_size: 5,
    lstm_size: 4,
    num_actions: 3,
};

struct Rollout {
    values: Vec<f32>,
    logits: Array2<f32>,
    caches: Vec<StepCache>,
}

fn observations(rng: &mut StdRng, len: usize) -> Vec<Array1<f32>> {
    (0..len)
        .map(|_| Array1::from_shape_fn(SPEC.obs_size, |_| rng.random_range(-1.0..1.0)))
        .collect()
}

fn rollout(net: &PolicyNet, params: &[f32], obs: &[Array1<f32>], state: &RecurrentState) -> Rollout {
    let mut state = state.clone();
    let mut values = Vec::new();
    let mut logits = Array2::zeros((obs.len(), SPEC.num_actions));
    let mut caches = Vec::new();

    for (t, x) in obs.iter().enumerate() {
        let (out, cache) = net.forward(params, x.view(), &state).unwrap();
        values.push(out.value);
        logits.row_mut(t).assign(&out.logits);
        caches.push(cache);
        state = out.state;
    }

    Rollout {
        values,
        logits,
        caches,
    }
}

/// A warm recurrent state, so the segment doesn't start from zeros.
fn warm_state(net: &PolicyNet, params: &[f32], rng: &mut StdRng) -> RecurrentState {
    let x = observations(rng, 1).remove(0);
    let (out, _) = net
        .forward(params, x.view(), &RecurrentState::zeros(SPEC.lstm_size))
        .unwrap();
    out.state
}

fn assert_close(numeric: f32, analytic: f32, i: usize) {
    let tol = 2e-3 + 2e-2 * analytic.abs();
    assert!(
        (numeric - analytic).abs() < tol,
        "param {i}: numeric {numeric} analytic {analytic}"
    );
}

#[test]
fn backward_matches_finite_differences() {
    let net = PolicyNet::new(SPEC);
    let params = net.init_params(11).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let state = warm_state(&net, &params, &mut rng);
    let obs = observations(&mut rng, 4);

    // An arbitrary linear functional of every output.
    let d_values: Vec<f32> = (0..obs.len()).map(|_| rng.random_range(-1.0..1.0)).collect();
    let d_logits = Array2::from_shape_fn((obs.len(), SPEC.num_actions), |_| {
        rng.random_range(-1.0..1.0)
    });

    let objective = |params: &[f32]| {
        let r = rollout(&net, params, &obs, &state);
        let v: f32 = r.values.iter().zip(&d_values).map(|(v, d)| v * d).sum();
        v + (&r.logits * &d_logits).sum()
    };

    let base = rollout(&net, &params, &obs, &state);
    let mut grad = vec![0.; net.size()];
    net.backward(&params, &mut grad, &base.caches, &d_values, d_logits.view())
        .unwrap();

    let h = 1e-2;
    let mut probe = params.clone();
    for i in 0..net.size() {
        probe[i] = params[i] + h;
        let plus = objective(&probe);
        probe[i] = params[i] - h;
        let minus = objective(&probe);
        probe[i] = params[i];

        assert_close((plus - minus) / (2. * h), grad[i], i);
    }
}

#[test]
fn cost_gradient_matches_finite_differences() {
    let net = PolicyNet::new(SPEC);
    let params = net.init_params(23).unwrap();
    let mut rng = StdRng::seed_from_u64(9);
    let state = warm_state(&net, &params, &mut rng);
    let obs = observations(&mut rng, 3);
    let actions = [2, 0, 1];
    let rewards = [1., -1., 0.5];
    let bootstrap = 0.3;
    let loss = ActorCriticLoss::new(0.99, 0.95);

    let segment = |params: &[f32]| {
        let r = rollout(&net, params, &obs, &state);
        let mut builder = SegmentBuilder::new(SPEC.num_actions, obs.len());
        for t in 0..obs.len() {
            let dist = Categorical::from_logits(r.logits.row(t));
            builder.push(r.values[t], dist.log_probs(), actions[t], rewards[t]);
        }
        (builder.finish(bootstrap).unwrap(), r.caches)
    };

    let (base, caches) = segment(&params);
    let targets: Targets = loss.targets(&base);
    let cost_grad = loss.grad(&base, &targets);

    let mut grad = vec![0.; net.size()];
    net.backward(
        &params,
        &mut grad,
        &caches,
        &cost_grad.d_values,
        cost_grad.d_logits.view(),
    )
    .unwrap();

    let h = 1e-2;
    let mut probe = params.clone();
    for i in 0..net.size() {
        probe[i] = params[i] + h;
        let plus = loss.cost_with(&segment(&probe).0, &targets).total;
        probe[i] = params[i] - h;
        let minus = loss.cost_with(&segment(&probe).0, &targets).total;
        probe[i] = params[i];

        assert_close((plus - minus) / (2. * h), grad[i], i);
    }
}

#[test]
fn zero_derivatives_accumulate_nothing() {
    // Backpropagating a zero derivative must leave the gradient untouched, whatever the state.
    let net = PolicyNet::new(SPEC);
    let params = net.init_params(1).unwrap();
    let mut rng = StdRng::seed_from_u64(2);
    let state = warm_state(&net, &params, &mut rng);
    let obs = observations(&mut rng, 2);
    let r = rollout(&net, &params, &obs, &state);

    let mut grad = vec![0.; net.size()];
    net.backward(&params, &mut grad, &r.caches, &[0., 0.], Array2::zeros((2, 3)).view())
        .unwrap();

    assert!(grad.iter().all(|&g| g == 0.));
}
