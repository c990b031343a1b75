// ============================================================
// Layer 5 — Parameter Freeze + Optimizer Builder
// ============================================================
// Order matters: the model's frozen subset is switched off
// FIRST, then the optimizer is built. Burn only produces
// gradients for parameters that require them, so the
// optimizer's managed set is exactly
//
//   all parameters − frozen parameters
//
// and it can never touch a frozen value.
//
// SGD with momentum:
//   v = μ·v + (g + λ·θ)       μ = 0.9, λ = weight_decay
//   θ = θ − lr·v
//
// Reference: Burn Book §5 (Optimizers)

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, momentum::MomentumConfig, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::domain::error::TrainError;
use crate::ml::traits::SegmentationModel;

pub const MOMENTUM: f64 = 0.9;

/// Apply the model's freeze policy and log the parameter split.
///
/// Fails when nothing is left to train.
pub fn freeze_parameters<B: Backend, M: SegmentationModel<B>>(model: M) -> Result<M> {
    let total     = model.num_params();
    let model     = model.freeze();
    let frozen    = model.num_frozen_params();
    let trainable = total.saturating_sub(frozen);

    if trainable == 0 {
        return Err(TrainError::config(format!(
            "all {total} parameters are frozen; nothing left to optimise"
        ))
        .into());
    }

    tracing::info!("Number of parameters: {trainable} ({frozen} frozen of {total})");
    Ok(model)
}

pub fn sgd_config(weight_decay: f64) -> SgdConfig {
    SgdConfig::new()
        .with_momentum(Some(
            MomentumConfig::new()
                .with_momentum(MOMENTUM)
                .with_dampening(0.0)
                .with_nesterov(false),
        ))
        .with_weight_decay(Some(WeightDecayConfig::new(weight_decay as _)))
}

/// Freeze, then build the optimizer over what remains trainable.
pub fn build_optimizer<B, M>(model: M, weight_decay: f64) -> Result<(M, impl Optimizer<M, B>)>
where
    B: AutodiffBackend,
    M: SegmentationModel<B> + AutodiffModule<B>,
{
    let model = freeze_parameters(model)?;
    let optim = sgd_config(weight_decay).init::<B, M>();
    Ok((model, optim))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::loss::PixelCrossEntropy;
    use crate::ml::test_support::*;
    use crate::ml::traits::LossFunction;
    use burn::optim::GradientsParams;

    #[test]
    fn test_only_trainable_params_receive_gradients() {
        let model = ScaleModel::<TestBackend>::new(&device());
        let (model, _optim) = build_optimizer::<TestBackend, _>(model, 0.0).unwrap();

        let b = batch::<TestBackend>(2, 1);
        let (loss, _) = PixelCrossEntropy.forward(model.forward(b.images), b.labels);
        let grads = GradientsParams::from_grads(loss.backward(), &model);

        // {p1, p2} − {p1} = {p2}
        assert_eq!(grads.len(), 1);
    }

    #[test]
    fn test_frozen_param_survives_updates() {
        let model = ScaleModel::<TestBackend>::new(&device());
        let (mut model, mut optim) = build_optimizer::<TestBackend, _>(model, 1e-2).unwrap();
        let (p1_before, p2_before) = model.values();

        for _ in 0..3 {
            let b = batch::<TestBackend>(2, 1);
            let (loss, _) = PixelCrossEntropy.forward(model.forward(b.images), b.labels);
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(0.1, model, grads);
        }

        let (p1_after, p2_after) = model.values();
        assert_eq!(p1_after, p1_before);
        assert!(p2_after > p2_before, "p2 should move toward class 1");
    }

    #[test]
    fn test_freezing_p1_keeps_p2_gradient() {
        let p2_grad = |model: ScaleModel<TestBackend>| -> f32 {
            let b = batch::<TestBackend>(2, 1);
            let (loss, _) = PixelCrossEntropy.forward(model.forward(b.images), b.labels);
            let grads = loss.backward();
            model.p2.val().grad(&grads).unwrap().into_scalar().elem()
        };

        let free   = p2_grad(ScaleModel::new(&device()));
        let frozen = p2_grad(ScaleModel::new(&device()).freeze());
        assert!((free - frozen).abs() < 1e-6, "free {free}, frozen {frozen}");
        // label 1: raising p2 raises the class-1 logit, so the loss falls
        assert!(frozen < 0.0);
    }

    #[test]
    fn test_fully_frozen_model_is_rejected() {
        #[derive(Module, Debug)]
        struct AllFrozen<B: Backend> {
            inner: ScaleModel<B>,
        }
        impl<B: Backend> SegmentationModel<B> for AllFrozen<B> {
            fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
                self.inner.forward(images)
            }
            fn freeze(self) -> Self {
                Self { inner: self.inner.no_grad() }
            }
            fn num_frozen_params(&self) -> usize {
                self.inner.num_params()
            }
        }

        let model = AllFrozen::<TestBackend> { inner: ScaleModel::new(&device()) };
        let err = build_optimizer::<TestBackend, _>(model, 0.0).err().unwrap();
        assert!(matches!(err.downcast_ref::<TrainError>(), Some(TrainError::Configuration(_))));
    }
}
