//! Bagged regression trees
//!
//! Each tree is grown on a bootstrap resample of the training rows and
//! splits on the feature/threshold pair with the lowest summed squared
//! error. The forest prediction is the mean of the tree predictions. All
//! randomness comes from a single `StdRng` seeded from the configuration,
//! so equal seeds give identical forests.

use crate::error::{ForecastError, Result};
use crate::models::{FittedRegressor, Regressor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random forest regressor
#[derive(Debug, Clone)]
pub struct RandomForest {
    name: String,
    n_trees: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    seed: u64,
}

/// Node of a fitted tree; children are indices into the tree's node list
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single fitted regression tree
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

/// Fitted random forest
#[derive(Debug, Clone)]
pub struct FittedForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Create a forest of `n_trees` trees
    pub fn new(
        n_trees: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
        seed: u64,
    ) -> Result<Self> {
        if n_trees == 0 {
            return Err(ForecastError::InvalidParameter(
                "Number of trees must be positive".to_string(),
            ));
        }
        if max_depth == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "Maximum depth must be positive".to_string(),
            ));
        }
        if min_samples_split < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "min_samples_split must be at least 2, got {}",
                min_samples_split
            )));
        }

        Ok(Self {
            name: "ensemble".to_string(),
            n_trees,
            max_depth,
            min_samples_split,
            seed,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Regressor for RandomForest {
    type Fitted = FittedForest;

    fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Self::Fitted> {
        let n = y.len();
        if n == 0 {
            return Err(ForecastError::InsufficientHistory { needed: 1, got: 0 });
        }
        if x.len() != n {
            return Err(ForecastError::DimensionMismatch {
                expected: n,
                got: x.len(),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut trees = Vec::with_capacity(self.n_trees);

        for tree_index in 0..self.n_trees {
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut builder = TreeBuilder {
                x,
                y,
                max_depth: self.max_depth,
                min_samples_split: self.min_samples_split,
                nodes: Vec::new(),
            };
            builder.grow(sample, 0);
            tracing::trace!(tree = tree_index, nodes = builder.nodes.len(), "grew tree");
            trees.push(RegressionTree {
                nodes: builder.nodes,
            });
        }

        Ok(FittedForest { trees })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl RegressionTree {
    pub fn predict_row(&self, x: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Number of nodes, leaves included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Length of the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

impl FittedForest {
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

impl FittedRegressor for FittedForest {
    fn predict_row(&self, x: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.predict_row(x)).sum();
        total / self.trees.len() as f64
    }
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    max_depth: Option<usize>,
    min_samples_split: usize,
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl<'a> TreeBuilder<'a> {
    /// Grow the subtree for `rows`, returning the index of its root
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let mean = rows.iter().map(|&i| self.y[i]).sum::<f64>() / rows.len() as f64;
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        let depth_reached = self.max_depth.map_or(false, |max| depth >= max);
        if depth_reached || rows.len() < self.min_samples_split {
            return index;
        }

        let split = match self.best_split(&rows) {
            Some(split) => split,
            None => return index,
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    /// Split minimizing the children's summed squared error
    ///
    /// Minimizing SSE_left + SSE_right is the same as maximizing
    /// sum_left²/n_left + sum_right²/n_right, which needs only prefix sums.
    fn best_split(&self, rows: &[usize]) -> Option<SplitCandidate> {
        let n = rows.len() as f64;
        let total: f64 = rows.iter().map(|&i| self.y[i]).sum();
        let parent_score = total * total / n;
        let n_features = self.x[rows[0]].len();

        let mut best: Option<SplitCandidate> = None;
        let mut sorted = rows.to_vec();

        for feature in 0..n_features {
            sorted.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left_sum = 0.0;
            for k in 0..sorted.len() - 1 {
                left_sum += self.y[sorted[k]];
                let here = self.x[sorted[k]][feature];
                let next = self.x[sorted[k + 1]][feature];
                if here == next {
                    continue;
                }

                let n_left = (k + 1) as f64;
                let right_sum = total - left_sum;
                let score = left_sum * left_sum / n_left + right_sum * right_sum / (n - n_left);

                if best.as_ref().map_or(true, |b| score > b.score) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (here + next) / 2.0,
                        score,
                    });
                }
            }
        }

        // Splits that do not reduce the error leave a leaf
        best.filter(|b| b.score - parent_score > 1e-12 * parent_score.abs().max(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { 0.0 } else { 10.0 }).collect();
        (x, y)
    }

    fn noisy_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64, ((i * 3) % 7) as f64])
            .collect();
        let y: Vec<f64> = (0..40).map(|i| ((i * 7) % 11) as f64 + i as f64 * 0.5).collect();
        (x, y)
    }

    #[test]
    fn test_fits_step_function() {
        let (x, y) = step_data();
        let fitted = RandomForest::new(25, None, 2, 42).unwrap().fit(&x, &y).unwrap();

        assert_relative_eq!(fitted.predict_row(&[3.0]), 0.0, epsilon = 1e-9);
        assert_relative_eq!(fitted.predict_row(&[16.0]), 10.0, epsilon = 1e-9);
        assert_eq!(fitted.trees().len(), 25);
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let (x, y) = noisy_data();
        let a = RandomForest::new(10, None, 2, 7).unwrap().fit(&x, &y).unwrap();
        let b = RandomForest::new(10, None, 2, 7).unwrap().fit(&x, &y).unwrap();
        let c = RandomForest::new(10, None, 2, 8).unwrap().fit(&x, &y).unwrap();

        assert_eq!(a.predict(&x), b.predict(&x));
        assert_ne!(a.predict(&x), c.predict(&x));
    }

    #[test]
    fn test_max_depth_limits_trees() {
        let (x, y) = noisy_data();
        let fitted = RandomForest::new(5, Some(2), 2, 1).unwrap().fit(&x, &y).unwrap();
        for tree in fitted.trees() {
            assert!(tree.depth() <= 2);
            assert!(tree.node_count() <= 7);
        }
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y = vec![4.0; 10];
        let fitted = RandomForest::new(3, None, 2, 0).unwrap().fit(&x, &y).unwrap();
        for tree in fitted.trees() {
            assert_eq!(tree.node_count(), 1);
        }
        assert_eq!(fitted.predict_row(&[100.0]), 4.0);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(RandomForest::new(0, None, 2, 0).is_err());
        assert!(RandomForest::new(10, Some(0), 2, 0).is_err());
        assert!(RandomForest::new(10, None, 1, 0).is_err());
    }
}
