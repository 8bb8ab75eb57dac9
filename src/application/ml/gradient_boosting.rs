//! Gradient-boosted decision trees for binary classification.
//!
//! Each round fits one regression tree to the gradient and hessian of the
//! logistic loss at the current margins, using exact greedy split search and
//! Newton leaf weights (`-G / (H + lambda)`, scaled by the learning rate).
//!
//! Inputs are `f32`, like the tensor the exported model receives. Every split
//! threshold is a value seen in training and routing is `x < threshold` goes
//! left, so scoring a row here and through the exported graph takes the same
//! path through every tree.

use crate::domain::errors::TrainingError;

/// Minimum loss reduction for a split to be kept.
const MIN_SPLIT_GAIN: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 regularization on leaf weights
    pub lambda: f64,
    /// Minimum gain required on top of `MIN_SPLIT_GAIN`
    pub gamma: f64,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
    /// Initial probability for every row
    pub base_score: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 5,
            learning_rate: 0.1,
            lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            base_score: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        weight: f64,
    },
}

/// A fitted tree; `nodes[0]` is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    pub fn predict(&self, row: &[f32]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { weight } => return *weight,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoostedClassifier {
    params: BoostingParams,
    n_features: usize,
    base_margin: f64,
    trees: Vec<RegressionTree>,
}

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

fn logit(p: f64) -> f64 {
    let p = p.clamp(1e-12, 1.0 - 1e-12);
    (p / (1.0 - p)).ln()
}

impl GradientBoostedClassifier {
    /// Fits the ensemble on `x` (rows of equal width) against 0/1 labels.
    pub fn fit(x: &[Vec<f32>], y: &[u8], params: BoostingParams) -> Result<Self, TrainingError> {
        if x.is_empty() {
            return Err(TrainingError::InsufficientSamples { samples: 0 });
        }
        if x.len() != y.len() {
            return Err(TrainingError::LabelCount {
                rows: x.len(),
                labels: y.len(),
            });
        }
        let n_features = x[0].len();
        if let Some(bad) = x.iter().find(|row| row.len() != n_features) {
            return Err(TrainingError::FeatureWidth {
                expected: n_features,
                actual: bad.len(),
            });
        }

        let base_margin = logit(params.base_score);
        let targets: Vec<f64> = y.iter().map(|&l| if l == 1 { 1.0 } else { 0.0 }).collect();
        let mut margins = vec![base_margin; x.len()];
        let mut grad = vec![0.0; x.len()];
        let mut hess = vec![0.0; x.len()];
        let all_rows: Vec<usize> = (0..x.len()).collect();
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            for i in 0..x.len() {
                let p = sigmoid(margins[i]);
                grad[i] = p - targets[i];
                hess[i] = (p * (1.0 - p)).max(1e-16);
            }

            let mut builder = TreeBuilder {
                x,
                grad: &grad,
                hess: &hess,
                params: &params,
                n_features,
                nodes: Vec::new(),
            };
            builder.grow(&all_rows, 0);
            let tree = RegressionTree {
                nodes: builder.nodes,
            };

            for (margin, row) in margins.iter_mut().zip(x.iter()) {
                *margin += tree.predict(row);
            }
            trees.push(tree);
        }

        Ok(Self {
            params,
            n_features,
            base_margin,
            trees,
        })
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn base_margin(&self) -> f64 {
        self.base_margin
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn predict_margin(&self, row: &[f32]) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    /// Probability of the positive class.
    pub fn predict_proba(&self, row: &[f32]) -> f64 {
        sigmoid(self.predict_margin(row))
    }

    pub fn predict(&self, x: &[Vec<f32>]) -> Vec<u8> {
        x.iter()
            .map(|row| u8::from(self.predict_proba(row) > 0.5))
            .collect()
    }
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f32>],
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a BoostingParams,
    n_features: usize,
    nodes: Vec<TreeNode>,
}

struct SplitCandidate {
    gain: f64,
    feature: usize,
    threshold: f32,
}

impl TreeBuilder<'_> {
    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.lambda)
    }

    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        -g / (h + self.params.lambda) * self.params.learning_rate
    }

    /// Grows the subtree for `rows` and returns its node index.
    fn grow(&mut self, rows: &[usize], depth: usize) -> usize {
        let g: f64 = rows.iter().map(|&r| self.grad[r]).sum();
        let h: f64 = rows.iter().map(|&r| self.hess[r]).sum();

        let id = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            weight: self.leaf_weight(g, h),
        });

        if depth >= self.params.max_depth || rows.len() < 2 {
            return id;
        }

        if let Some(split) = self.best_split(rows, g, h) {
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&r| self.x[r][split.feature] < split.threshold);
            let left = self.grow(&left_rows, depth + 1);
            let right = self.grow(&right_rows, depth + 1);
            self.nodes[id] = TreeNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
        }
        id
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let parent = self.score(g, h);
        let min_child = self.params.min_child_weight;
        let mut best: Option<SplitCandidate> = None;
        let mut order = rows.to_vec();

        for feature in 0..self.n_features {
            order.sort_by(|a, b| self.x[*a][feature].total_cmp(&self.x[*b][feature]));

            let (mut gl, mut hl) = (0.0, 0.0);
            for pair in order.windows(2) {
                let (r, next) = (pair[0], pair[1]);
                gl += self.grad[r];
                hl += self.hess[r];

                let current = self.x[r][feature];
                let threshold = self.x[next][feature];
                // Equal values must land on the same side
                if threshold <= current {
                    continue;
                }

                let (gr, hr) = (g - gl, h - hl);
                if hl < min_child || hr < min_child {
                    continue;
                }

                let gain = 0.5 * (self.score(gl, hl) + self.score(gr, hr) - parent)
                    - self.params.gamma;
                if gain > MIN_SPLIT_GAIN && best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        gain,
                        feature,
                        threshold,
                    });
                }
            }
        }
        best
    }
}
