//! Regression tree fit on per-row gradient statistics
//!
//! Split gain is the second-order boosting criterion
//! `G_L²/H_L + G_R²/H_R − G²/H` and leaves predict `G/H`. With unit hessians
//! and 0/1 targets this is plain variance reduction with mean leaves, which
//! is what the random forest uses; gradient boosting passes log-loss
//! gradients and hessians.

use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use crate::ml::features::{FeatureVector, NUM_FEATURES};

const MIN_HESSIAN: f64 = 1e-12;

/// Tree growth limits
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split (None = all)
    pub max_features: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        gain: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RegressionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

struct Builder<'a> {
    rows: &'a [FeatureVector],
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a TreeParams,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree over `sample` (row indices, repeats allowed)
    pub fn fit(
        rows: &[FeatureVector],
        grad: &[f64],
        hess: &[f64],
        sample: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut builder = Builder {
            rows,
            grad,
            hess,
            params,
            rng,
            nodes: Vec::new(),
        };
        if sample.is_empty() {
            builder.nodes.push(Node::Leaf { value: 0.0 });
        } else {
            builder.build(sample, 0);
        }
        Self {
            nodes: builder.nodes,
        }
    }

    pub fn predict(&self, row: &FeatureVector) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if row[*feature_idx] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Add each split's gain to its feature's slot
    pub fn accumulate_importance(&self, out: &mut [f64; NUM_FEATURES]) {
        for node in &self.nodes {
            if let Node::Split {
                feature_idx, gain, ..
            } = node
            {
                out[*feature_idx] += gain;
            }
        }
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

impl Builder<'_> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let (g, h) = self.sums(&indices);
        let value = leaf_value(g, h);

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { value });

        if depth >= self.params.max_depth || indices.len() < self.params.min_samples_split {
            return id;
        }

        let Some(split) = self.best_split(&indices, g, h) else {
            return id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.rows[i][split.feature_idx] <= split.threshold);

        let left = self.build(left_idx, depth + 1);
        let right = self.build(right_idx, depth + 1);

        self.nodes[id] = Node::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            gain: split.gain,
            left,
            right,
        };
        id
    }

    fn sums(&self, indices: &[usize]) -> (f64, f64) {
        indices
            .iter()
            .fold((0.0, 0.0), |(g, h), &i| (g + self.grad[i], h + self.hess[i]))
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        match self.params.max_features {
            Some(k) if k > 0 && k < NUM_FEATURES => {
                let mut picked = index::sample(&mut *self.rng, NUM_FEATURES, k).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..NUM_FEATURES).collect(),
        }
    }

    fn best_split(&mut self, indices: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let parent_score = score(g, h);
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut best: Option<SplitCandidate> = None;

        for feature_idx in self.candidate_features() {
            let mut order = indices.to_vec();
            order.sort_by(|&a, &b| self.rows[a][feature_idx].total_cmp(&self.rows[b][feature_idx]));

            let mut gl = 0.0;
            let mut hl = 0.0;
            for pos in 0..order.len() - 1 {
                gl += self.grad[order[pos]];
                hl += self.hess[order[pos]];

                let value = self.rows[order[pos]][feature_idx];
                let next = self.rows[order[pos + 1]][feature_idx];
                if value == next {
                    continue;
                }

                let left_n = pos + 1;
                if left_n < min_leaf || order.len() - left_n < min_leaf {
                    continue;
                }

                let hr = h - hl;
                if hl < MIN_HESSIAN || hr < MIN_HESSIAN {
                    continue;
                }

                let gain = score(gl, hl) + score(g - gl, hr) - parent_score;
                if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold: (value + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

fn score(g: f64, h: f64) -> f64 {
    if h < MIN_HESSIAN {
        0.0
    } else {
        g * g / h
    }
}

fn leaf_value(g: f64, h: f64) -> f64 {
    if h < MIN_HESSIAN {
        0.0
    } else {
        g / h
    }
}
