//! Online regret minimizers over a fixed, ordered action set.
//!
//! Every learner follows the same protocol: [`RegretMinimizer::next_strategy`]
//! produces a distribution and remembers it, then
//! [`RegretMinimizer::observe_utility`] receives the per-action utility of
//! that round and updates the accumulated regret relative to the remembered
//! distribution.
//!
//! ```text
//! RegretMatching:      regret += g - <prev, g>
//! RegretMatchingPlus:  regret += max(0, g - <prev, g>)
//! MWU:                 regret += g - <prev, g>,  next = softmax(regret)
//! ```

use std::fmt::Debug;

/// A learner producing distributions over a fixed action set.
pub trait RegretMinimizer: Debug + Send + Sync {
    /// Number of actions.
    fn num_actions(&self) -> usize;

    /// Feed the utility of each action for the last produced strategy.
    ///
    /// # Panics
    /// Panics if no strategy was produced yet, or if `utility` has the
    /// wrong length.
    fn observe_utility(&mut self, utility: &[f64]);

    /// Produce the next distribution and remember it.
    fn next_strategy(&mut self) -> Vec<f64>;

    /// Accumulated regret per action.
    fn regrets(&self) -> &[f64];

    /// The last produced distribution, if any.
    fn previous(&self) -> Option<&[f64]>;

    /// Overwrite the learner state, e.g. from a checkpoint.
    fn restore(&mut self, regrets: Vec<f64>, previous: Option<Vec<f64>>);

    /// Clone behind a box.
    fn boxed_clone(&self) -> Box<dyn RegretMinimizer>;
}

/// Regret and last-strategy vectors shared by the learners below.
#[derive(Debug, Clone, PartialEq)]
struct RegretState {
    regret: Vec<f64>,
    previous: Option<Vec<f64>>,
}

impl RegretState {
    fn new(num_actions: usize) -> Self {
        Self {
            regret: vec![0.0; num_actions],
            previous: None,
        }
    }

    /// Instantaneous regret `g - <prev, g>` of each action.
    fn instantaneous(&self, utility: &[f64]) -> Vec<f64> {
        let previous = match &self.previous {
            Some(p) => p,
            None => panic!("observe_utility called before next_strategy"),
        };
        assert_eq!(
            utility.len(),
            self.regret.len(),
            "utility has {} entries, learner has {} actions",
            utility.len(),
            self.regret.len()
        );
        let played: f64 = previous.iter().zip(utility).map(|(p, g)| p * g).sum();
        utility.iter().map(|g| g - played).collect()
    }

    fn remember(&mut self, strategy: Vec<f64>) -> Vec<f64> {
        self.previous = Some(strategy.clone());
        strategy
    }

    fn restore(&mut self, regrets: Vec<f64>, previous: Option<Vec<f64>>) {
        assert_eq!(regrets.len(), self.regret.len(), "restored regret has wrong length");
        self.regret = regrets;
        self.previous = previous;
    }
}

/// Positive part of `regret`, normalized; uniform when nothing is positive.
pub fn regret_matching(regret: &[f64]) -> Vec<f64> {
    let positive: Vec<f64> = regret.iter().map(|&r| r.max(0.0)).collect();
    let sum: f64 = positive.iter().sum();
    if sum > 0.0 {
        positive.iter().map(|&x| x / sum).collect()
    } else {
        vec![1.0 / regret.len() as f64; regret.len()]
    }
}

/// Numerically stable softmax.
pub fn softmax(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values.iter().map(|&v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|&e| e / sum).collect()
}

/// Regret matching: play proportionally to positive accumulated regret.
#[derive(Debug, Clone, PartialEq)]
pub struct RegretMatching {
    state: RegretState,
}

impl RegretMatching {
    /// Create a learner over `num_actions` actions.
    pub fn new(num_actions: usize) -> Self {
        Self {
            state: RegretState::new(num_actions),
        }
    }
}

impl RegretMinimizer for RegretMatching {
    fn num_actions(&self) -> usize {
        self.state.regret.len()
    }

    fn observe_utility(&mut self, utility: &[f64]) {
        let delta = self.state.instantaneous(utility);
        for (r, d) in self.state.regret.iter_mut().zip(delta) {
            *r += d;
        }
    }

    fn next_strategy(&mut self) -> Vec<f64> {
        let strategy = regret_matching(&self.state.regret);
        self.state.remember(strategy)
    }

    fn regrets(&self) -> &[f64] {
        &self.state.regret
    }

    fn previous(&self) -> Option<&[f64]> {
        self.state.previous.as_deref()
    }

    fn restore(&mut self, regrets: Vec<f64>, previous: Option<Vec<f64>>) {
        self.state.restore(regrets, previous);
    }

    fn boxed_clone(&self) -> Box<dyn RegretMinimizer> {
        Box::new(self.clone())
    }
}

/// Regret matching that only ever adds positive instantaneous regret.
///
/// Negative instantaneous regret is dropped before accumulation, so it can
/// never offset later gains.
#[derive(Debug, Clone, PartialEq)]
pub struct RegretMatchingPlus {
    state: RegretState,
}

impl RegretMatchingPlus {
    /// Create a learner over `num_actions` actions.
    pub fn new(num_actions: usize) -> Self {
        Self {
            state: RegretState::new(num_actions),
        }
    }
}

impl RegretMinimizer for RegretMatchingPlus {
    fn num_actions(&self) -> usize {
        self.state.regret.len()
    }

    fn observe_utility(&mut self, utility: &[f64]) {
        let delta = self.state.instantaneous(utility);
        for (r, d) in self.state.regret.iter_mut().zip(delta) {
            *r += d.max(0.0);
        }
    }

    fn next_strategy(&mut self) -> Vec<f64> {
        let strategy = regret_matching(&self.state.regret);
        self.state.remember(strategy)
    }

    fn regrets(&self) -> &[f64] {
        &self.state.regret
    }

    fn previous(&self) -> Option<&[f64]> {
        self.state.previous.as_deref()
    }

    fn restore(&mut self, regrets: Vec<f64>, previous: Option<Vec<f64>>) {
        self.state.restore(regrets, previous);
    }

    fn boxed_clone(&self) -> Box<dyn RegretMinimizer> {
        Box::new(self.clone())
    }
}

/// Softmax over accumulated regret.
///
/// The learning rate is stored but not applied: the update accumulates
/// unscaled regret and `next_strategy` takes a plain softmax.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiplicativeWeightUpdates {
    state: RegretState,
    learning_rate: f64,
}

impl MultiplicativeWeightUpdates {
    /// Create a learner over `num_actions` actions.
    pub fn new(num_actions: usize, learning_rate: f64) -> Self {
        Self {
            state: RegretState::new(num_actions),
            learning_rate,
        }
    }

    /// The configured learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

impl RegretMinimizer for MultiplicativeWeightUpdates {
    fn num_actions(&self) -> usize {
        self.state.regret.len()
    }

    fn observe_utility(&mut self, utility: &[f64]) {
        let delta = self.state.instantaneous(utility);
        for (r, d) in self.state.regret.iter_mut().zip(delta) {
            *r += d;
        }
    }

    fn next_strategy(&mut self) -> Vec<f64> {
        let strategy = softmax(&self.state.regret);
        self.state.remember(strategy)
    }

    fn regrets(&self) -> &[f64] {
        &self.state.regret
    }

    fn previous(&self) -> Option<&[f64]> {
        self.state.previous.as_deref()
    }

    fn restore(&mut self, regrets: Vec<f64>, previous: Option<Vec<f64>>) {
        self.state.restore(regrets, previous);
    }

    fn boxed_clone(&self) -> Box<dyn RegretMinimizer> {
        Box::new(self.clone())
    }
}

/// Buffers several utility contributions and applies them in one update.
///
/// Needed when several game positions map to one information set: their
/// contributions are summed first, then [`Accumulator::flush`] applies the
/// regret transform once on the sum.
#[derive(Debug)]
pub struct Accumulator {
    inner: Box<dyn RegretMinimizer>,
    buffer: Vec<f64>,
    pending: bool,
}

impl Accumulator {
    /// Wrap a learner.
    pub fn new(inner: Box<dyn RegretMinimizer>) -> Self {
        let buffer = vec![0.0; inner.num_actions()];
        Self {
            inner,
            buffer,
            pending: false,
        }
    }

    /// Add one contribution to the buffer.
    pub fn accumulate(&mut self, utility: &[f64]) {
        assert_eq!(utility.len(), self.buffer.len(), "contribution has wrong length");
        for (b, u) in self.buffer.iter_mut().zip(utility) {
            *b += u;
        }
        self.pending = true;
    }

    /// Apply the buffered sum, then clear it. No-op when nothing was added.
    pub fn flush(&mut self) {
        if !self.pending {
            return;
        }
        self.inner.observe_utility(&self.buffer);
        self.buffer.iter_mut().for_each(|b| *b = 0.0);
        self.pending = false;
    }

    /// Whether contributions are waiting for a flush.
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

impl RegretMinimizer for Accumulator {
    fn num_actions(&self) -> usize {
        self.inner.num_actions()
    }

    fn observe_utility(&mut self, utility: &[f64]) {
        self.accumulate(utility);
        self.flush();
    }

    fn next_strategy(&mut self) -> Vec<f64> {
        self.inner.next_strategy()
    }

    fn regrets(&self) -> &[f64] {
        self.inner.regrets()
    }

    fn previous(&self) -> Option<&[f64]> {
        self.inner.previous()
    }

    fn restore(&mut self, regrets: Vec<f64>, previous: Option<Vec<f64>>) {
        self.inner.restore(regrets, previous);
        self.buffer.iter_mut().for_each(|b| *b = 0.0);
        self.pending = false;
    }

    fn boxed_clone(&self) -> Box<dyn RegretMinimizer> {
        Box::new(Accumulator {
            inner: self.inner.boxed_clone(),
            buffer: self.buffer.clone(),
            pending: self.pending,
        })
    }
}
