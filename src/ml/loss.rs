use burn::{prelude::*, tensor::activation::log_softmax};

use crate::ml::traits::LossFunction;

/// Cross-entropy averaged over every pixel of every sample.
///
/// The auxiliary output is the per-sample mean, shape [batch].
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelCrossEntropy;

impl LossFunction for PixelCrossEntropy {
    fn forward<B: Backend>(
        &self,
        output: Tensor<B, 4>,
        labels: Tensor<B, 4, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 1>) {
        let [batch, _, _, _] = output.dims();

        // log p(label) for each pixel → [batch, 1, h, w]
        let nll = log_softmax(output, 1).gather(1, labels).neg();

        let per_sample = nll.clone().flatten::<2>(1, 3).mean_dim(1).reshape([batch]);
        (nll.mean(), per_sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_uniform_logits_give_log_classes() {
        let device = Default::default();
        let output = Tensor::<NdArray, 4>::zeros([2, 4, 3, 3], &device);
        let labels = Tensor::<NdArray, 4, Int>::zeros([2, 1, 3, 3], &device);

        let (loss, per_sample) = PixelCrossEntropy.forward(output, labels);
        let loss: f32 = loss.into_scalar().elem();
        assert!((loss - 4f32.ln()).abs() < 1e-5);
        assert_eq!(per_sample.dims(), [2]);
    }

    #[test]
    fn test_confident_correct_prediction_is_near_zero() {
        let device = Default::default();
        // class 1 wins every pixel by a wide margin
        let output = Tensor::<NdArray, 4>::from_floats(
            [[[[0.0, 0.0]], [[20.0, 20.0]]]],
            &device,
        );
        let labels = Tensor::<NdArray, 4, Int>::ones([1, 1, 1, 2], &device);

        let (loss, _) = PixelCrossEntropy.forward(output, labels);
        let loss: f32 = loss.into_scalar().elem();
        assert!(loss < 1e-6);
    }
}
