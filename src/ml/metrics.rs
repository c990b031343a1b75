// ============================================================
// Layer 5 — Per-class ROC-AUC
// ============================================================
// For each class c, every pixel of the epoch is one binary
// example: positive when its label is c, scored by the
// softmax probability the model assigns to c. The area under
// the ROC curve is computed from ranks (Mann–Whitney U):
//
//   AUC = (R₊ − P(P+1)/2) / (P · N)
//
//   R₊ — sum of the ranks of the positive examples
//   P  — number of positives, N — number of negatives
//
// Tied scores share the average of the ranks they span.
// A class with no positives or no negatives has no defined
// AUC and reports NaN.

use anyhow::{anyhow, Result};
use burn::{prelude::*, tensor::activation::softmax};

use crate::ml::traits::MetricsFunction;

/// One-vs-rest ROC-AUC for every output class, in class order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassAuc;

impl MetricsFunction for ClassAuc {
    fn compute<B: Backend>(
        &self,
        labels:  Tensor<B, 4, Int>,
        outputs: Tensor<B, 4>,
    ) -> Result<Vec<f64>> {
        let [n, classes, h, w] = outputs.dims();
        let hw = h * w;

        let probs = softmax(outputs, 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("reading probabilities: {e:?}"))?;
        let labels = labels
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| anyhow!("reading labels: {e:?}"))?;

        let mut aucs = Vec::with_capacity(classes);
        for c in 0..classes {
            let mut scores    = Vec::with_capacity(n * hw);
            let mut positives = Vec::with_capacity(n * hw);
            for s in 0..n {
                let plane = (s * classes + c) * hw;
                for p in 0..hw {
                    scores.push(probs[plane + p]);
                    positives.push(labels[s * hw + p] == c as i64);
                }
            }
            aucs.push(roc_auc(&scores, &positives));
        }
        Ok(aucs)
    }
}

/// Rank-based ROC-AUC. NaN when either class is absent.
pub fn roc_auc(scores: &[f32], positives: &[bool]) -> f64 {
    let pos = positives.iter().filter(|&&p| p).count();
    let neg = positives.len() - pos;
    if pos == 0 || neg == 0 {
        return f64::NAN;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum = 0.0f64;
    let mut i = 0;
    while i < order.len() {
        // [i, j) is a run of tied scores
        let mut j = i + 1;
        while j < order.len() && scores[order[j]] == scores[order[i]] {
            j += 1;
        }
        // ranks are 1-based: the run covers ranks i+1 ..= j
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        rank_sum += avg_rank * order[i..j].iter().filter(|&&k| positives[k]).count() as f64;
        i = j;
    }

    let (p, n) = (pos as f64, neg as f64);
    (rank_sum - p * (p + 1.0) / 2.0) / (p * n)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_roc_auc_extremes() {
        let scores = [0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&scores, &[false, false, true, true]), 1.0);
        assert_eq!(roc_auc(&scores, &[true, true, false, false]), 0.0);
    }

    #[test]
    fn test_roc_auc_ties_count_half() {
        let scores = [0.5, 0.5];
        assert_eq!(roc_auc(&scores, &[true, false]), 0.5);
    }

    #[test]
    fn test_roc_auc_mixed() {
        // one positive outranks one of two negatives
        let scores = [0.3, 0.6, 0.9];
        assert_eq!(roc_auc(&scores, &[false, true, false]), 0.5);
    }

    #[test]
    fn test_roc_auc_undefined_without_negatives() {
        assert!(roc_auc(&[0.2, 0.4], &[true, true]).is_nan());
    }

    #[test]
    fn test_class_auc_one_value_per_class() {
        let device = Default::default();
        // 1 sample, 2 classes, 1x2 image; pixel 0 is class 0, pixel 1 is class 1
        let outputs = Tensor::<NdArray, 4>::from_floats(
            [[[[3.0, -3.0]], [[-3.0, 3.0]]]],
            &device,
        );
        let labels = Tensor::<NdArray, 4, Int>::from_ints([[[[0, 1]]]], &device);

        let aucs = ClassAuc.compute(labels, outputs).unwrap();
        assert_eq!(aucs, vec![1.0, 1.0]);
    }
}
