//! Binary decision procedures.
//!
//! Three learners back the optimization catalogue: a bagged forest of
//! regression trees (probability = mean leaf frequency), gradient-boosted
//! trees under logistic loss (probability = sigmoid of the additive score),
//! and a linear max-margin model with no native probability, whose confidence
//! is `logistic(|margin|)`.

use super::dataset::{BoostingParams, ForestParams, MarginParams, TrainingConfig};
use super::rng::XorShift64;
use crate::error::{EngineError, Result};
use crate::optimization::LearnerKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub apply: bool,
    /// In `[0, 1]`.
    pub confidence: f64,
}

pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub trait BinaryClassifier {
    fn fit(&mut self, rows: &[Vec<f64>], labels: &[bool]) -> Result<()>;

    /// Class-1 probability, for procedures that estimate one.
    fn probability(&self, row: &[f64]) -> Option<f64>;

    /// Signed decision score; positive means "apply".
    fn margin(&self, row: &[f64]) -> f64;

    fn decide(&self, row: &[f64]) -> Decision {
        match self.probability(row) {
            Some(p) => Decision {
                apply: p > 0.5,
                confidence: p.max(1.0 - p).clamp(0.0, 1.0),
            },
            None => {
                let m = self.margin(row);
                Decision {
                    apply: m > 0.0,
                    confidence: logistic(m.abs()),
                }
            }
        }
    }
}

fn check_shape(rows: &[Vec<f64>], labels: &[bool]) -> Result<()> {
    if rows.is_empty() {
        return Err(EngineError::EmptyTrainingSet);
    }
    if rows.len() != labels.len() {
        return Err(EngineError::ShapeMismatch {
            expected: rows.len(),
            actual: labels.len(),
        });
    }
    Ok(())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

// =============================================================================
// Regression trees
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn eval(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = row.get(*feature).copied().unwrap_or(0.0);
                    node = if x <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Greedy variance-reduction tree builder. Leaf values come from a caller
/// supplied rule so the same builder serves bagging and boosting.
struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    target: &'a [f64],
    max_depth: usize,
    min_samples_split: usize,
    /// Feature subsampling for forests; `None` searches every column.
    subsample: Option<(XorShift64, usize)>,
    leaf: &'a dyn Fn(&[usize]) -> f64,
}

impl TreeBuilder<'_> {
    fn build(&mut self, idx: Vec<usize>, depth: usize) -> Node {
        if depth >= self.max_depth || idx.len() < self.min_samples_split || self.sse(&idx) < 1e-12 {
            return Node::Leaf {
                value: (self.leaf)(&idx),
            };
        }
        let Some((feature, threshold)) = self.best_split(&idx) else {
            return Node::Leaf {
                value: (self.leaf)(&idx),
            };
        };
        let (left, right): (Vec<usize>, Vec<usize>) = idx
            .iter()
            .partition(|&&i| self.rows[i][feature] <= threshold);
        if left.is_empty() || right.is_empty() {
            return Node::Leaf {
                value: (self.leaf)(&idx),
            };
        }
        Node::Split {
            feature,
            threshold,
            left: Box::new(self.build(left, depth + 1)),
            right: Box::new(self.build(right, depth + 1)),
        }
    }

    fn sse(&self, idx: &[usize]) -> f64 {
        let n = idx.len() as f64;
        if n == 0.0 {
            return 0.0;
        }
        let sum: f64 = idx.iter().map(|&i| self.target[i]).sum();
        let sq: f64 = idx.iter().map(|&i| self.target[i] * self.target[i]).sum();
        sq - sum * sum / n
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let width = self.rows.first().map(Vec::len).unwrap_or(0);
        let mut features: Vec<usize> = (0..width).collect();
        if let Some((rng, max_features)) = self.subsample.as_mut() {
            rng.shuffle(&mut features);
            features.truncate(*max_features);
        }
        features
    }

    fn best_split(&mut self, idx: &[usize]) -> Option<(usize, f64)> {
        let n = idx.len() as f64;
        let total_sum: f64 = idx.iter().map(|&i| self.target[i]).sum();
        let total_sq: f64 = idx.iter().map(|&i| self.target[i] * self.target[i]).sum();
        let parent = total_sq - total_sum * total_sum / n;

        let mut best: Option<(f64, usize, f64)> = None;
        for feature in self.candidate_features() {
            let mut order = idx.to_vec();
            order.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

            let (mut left_sum, mut left_sq) = (0.0, 0.0);
            for k in 0..order.len() - 1 {
                let y = self.target[order[k]];
                left_sum += y;
                left_sq += y * y;

                let a = self.rows[order[k]][feature];
                let b = self.rows[order[k + 1]][feature];
                if b - a <= f64::EPSILON * a.abs().max(1.0) {
                    continue;
                }
                let nl = (k + 1) as f64;
                let nr = n - nl;
                let left_sse = left_sq - left_sum * left_sum / nl;
                let right_sum = total_sum - left_sum;
                let right_sse = (total_sq - left_sq) - right_sum * right_sum / nr;
                let gain = parent - left_sse - right_sse;
                if best.map_or(true, |(g, _, _)| gain > g + 1e-12) {
                    best = Some((gain, feature, (a + b) / 2.0));
                }
            }
        }
        best.filter(|(gain, _, _)| *gain > 1e-12)
            .map(|(_, feature, threshold)| (feature, threshold))
    }
}

// =============================================================================
// Random forest
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    seed: u64,
    trees: Vec<Node>,
}

impl RandomForest {
    pub fn new(params: ForestParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            trees: Vec::new(),
        }
    }

    pub fn trees(&self) -> &[Node] {
        &self.trees
    }
}

impl BinaryClassifier for RandomForest {
    fn fit(&mut self, rows: &[Vec<f64>], labels: &[bool]) -> Result<()> {
        check_shape(rows, labels)?;
        let n = rows.len();
        let width = rows[0].len();
        let max_features = ((width as f64).sqrt().ceil() as usize).max(1);
        let target: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
        let mean = |idx: &[usize]| {
            if idx.is_empty() {
                0.0
            } else {
                idx.iter().map(|&i| target[i]).sum::<f64>() / idx.len() as f64
            }
        };

        self.trees = (0..self.params.trees)
            .map(|t| {
                let mut rng = XorShift64::derive(self.seed, t as u64);
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range_usize(n)).collect();
                let mut builder = TreeBuilder {
                    rows,
                    target: &target,
                    max_depth: self.params.max_depth,
                    min_samples_split: self.params.min_samples_split.max(2),
                    subsample: Some((rng, max_features)),
                    leaf: &mean,
                };
                builder.build(bootstrap, 0)
            })
            .collect();
        Ok(())
    }

    fn probability(&self, row: &[f64]) -> Option<f64> {
        if self.trees.is_empty() {
            return Some(0.5);
        }
        let sum: f64 = self.trees.iter().map(|t| t.eval(row)).sum();
        Some(sum / self.trees.len() as f64)
    }

    fn margin(&self, row: &[f64]) -> f64 {
        self.probability(row).unwrap_or(0.5) - 0.5
    }
}

// =============================================================================
// Gradient boosting
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    params: BoostingParams,
    init: f64,
    trees: Vec<Node>,
}

impl GradientBoosting {
    pub fn new(params: BoostingParams) -> Self {
        Self {
            params,
            init: 0.0,
            trees: Vec::new(),
        }
    }

    fn score(&self, row: &[f64]) -> f64 {
        self.init
            + self.params.learning_rate * self.trees.iter().map(|t| t.eval(row)).sum::<f64>()
    }
}

impl BinaryClassifier for GradientBoosting {
    fn fit(&mut self, rows: &[Vec<f64>], labels: &[bool]) -> Result<()> {
        check_shape(rows, labels)?;
        let y: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
        let prior = (y.iter().sum::<f64>() / y.len() as f64).clamp(1e-6, 1.0 - 1e-6);
        self.init = (prior / (1.0 - prior)).ln();
        self.trees.clear();

        let mut scores = vec![self.init; rows.len()];
        for _ in 0..self.params.rounds {
            let p: Vec<f64> = scores.iter().map(|&s| logistic(s)).collect();
            let residual: Vec<f64> = y.iter().zip(&p).map(|(y, p)| y - p).collect();
            let hessian: Vec<f64> = p.iter().map(|p| p * (1.0 - p)).collect();
            // One Newton step per leaf.
            let newton = |idx: &[usize]| {
                let num: f64 = idx.iter().map(|&i| residual[i]).sum();
                let den: f64 = idx.iter().map(|&i| hessian[i]).sum();
                if den < 1e-12 {
                    0.0
                } else {
                    num / den
                }
            };
            let mut builder = TreeBuilder {
                rows,
                target: &residual,
                max_depth: self.params.max_depth,
                min_samples_split: 2,
                subsample: None,
                leaf: &newton,
            };
            let tree = builder.build((0..rows.len()).collect(), 0);
            for (s, row) in scores.iter_mut().zip(rows) {
                *s += self.params.learning_rate * tree.eval(row);
            }
            self.trees.push(tree);
        }
        Ok(())
    }

    fn probability(&self, row: &[f64]) -> Option<f64> {
        Some(logistic(self.score(row)))
    }

    fn margin(&self, row: &[f64]) -> f64 {
        self.score(row)
    }
}

// =============================================================================
// Linear max-margin
// =============================================================================

/// Hinge loss with L2 regularization, trained by deterministic SGD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearMargin {
    params: MarginParams,
    seed: u64,
    weights: Vec<f64>,
    bias: f64,
}

impl LinearMargin {
    pub fn new(params: MarginParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            weights: Vec::new(),
            bias: 0.0,
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl BinaryClassifier for LinearMargin {
    fn fit(&mut self, rows: &[Vec<f64>], labels: &[bool]) -> Result<()> {
        check_shape(rows, labels)?;
        let lr = self.params.learning_rate;
        let lambda = self.params.regularization;
        let mut rng = XorShift64::new(self.seed);
        let mut order: Vec<usize> = (0..rows.len()).collect();
        self.weights = vec![0.0; rows[0].len()];
        self.bias = 0.0;

        let mut t = 0.0;
        for _ in 0..self.params.epochs {
            rng.shuffle(&mut order);
            for &i in &order {
                t += 1.0;
                let eta = lr / (1.0 + lr * lambda * t);
                let y = if labels[i] { 1.0 } else { -1.0 };
                let m = y * (dot(&self.weights, &rows[i]) + self.bias);
                for w in self.weights.iter_mut() {
                    *w *= 1.0 - eta * lambda;
                }
                if m < 1.0 {
                    for (w, x) in self.weights.iter_mut().zip(&rows[i]) {
                        *w += eta * y * x;
                    }
                    self.bias += eta * y;
                }
            }
        }
        Ok(())
    }

    fn probability(&self, _row: &[f64]) -> Option<f64> {
        None
    }

    fn margin(&self, row: &[f64]) -> f64 {
        dot(&self.weights, row) + self.bias
    }
}

// =============================================================================
// Persisted learner
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Learner {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    LinearMargin(LinearMargin),
}

impl Learner {
    /// Fresh, unfitted learner; `stream` decorrelates learners sharing a seed.
    pub fn new(kind: LearnerKind, config: &TrainingConfig, stream: u64) -> Self {
        let seed = config.seed.wrapping_add(stream);
        match kind {
            LearnerKind::RandomForest => Learner::RandomForest(RandomForest::new(config.forest.clone(), seed)),
            LearnerKind::GradientBoosting => {
                Learner::GradientBoosting(GradientBoosting::new(config.boosting.clone()))
            }
            LearnerKind::LinearMargin => Learner::LinearMargin(LinearMargin::new(config.margin.clone(), seed)),
        }
    }

    pub fn kind(&self) -> LearnerKind {
        match self {
            Learner::RandomForest(_) => LearnerKind::RandomForest,
            Learner::GradientBoosting(_) => LearnerKind::GradientBoosting,
            Learner::LinearMargin(_) => LearnerKind::LinearMargin,
        }
    }

    fn inner(&self) -> &dyn BinaryClassifier {
        match self {
            Learner::RandomForest(l) => l,
            Learner::GradientBoosting(l) => l,
            Learner::LinearMargin(l) => l,
        }
    }
}

impl BinaryClassifier for Learner {
    fn fit(&mut self, rows: &[Vec<f64>], labels: &[bool]) -> Result<()> {
        match self {
            Learner::RandomForest(l) => l.fit(rows, labels),
            Learner::GradientBoosting(l) => l.fit(rows, labels),
            Learner::LinearMargin(l) => l.fit(rows, labels),
        }
    }

    fn probability(&self, row: &[f64]) -> Option<f64> {
        self.inner().probability(row)
    }

    fn margin(&self, row: &[f64]) -> f64 {
        self.inner().margin(row)
    }
}
