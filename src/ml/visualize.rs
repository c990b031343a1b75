// ============================================================
// Layer 5 — Diagnostic Panel
// ============================================================
// Builds the three-row image saved at the diagnostic batch:
//
//   row 0: input channel 0, each sample scaled to its own max → 0..255
//   row 1: predicted class (argmax over the class dim) × 255/(C−1)
//   row 2: ground-truth class                         × 255/(C−1)
//
// Samples sit side by side, so the panel is [3·h, n·w].
// The result is copied to the host so sinks never touch
// tensors.

use anyhow::{anyhow, bail, Result};
use burn::prelude::*;

use crate::domain::panel::Panel;

pub fn render_panel<B: Backend>(
    images: Tensor<B, 4>,
    output: Tensor<B, 4>,
    labels: Tensor<B, 4, Int>,
) -> Result<Panel> {
    let [n, _, h, w] = images.dims();
    if n == 0 {
        bail!("cannot render a panel from an empty batch");
    }
    let classes = output.dims()[1];
    let scale   = 255.0 / classes.saturating_sub(1).max(1) as f32;

    let predicted = output.argmax(1); // [n, 1, h, w]

    let mut input_row = Vec::with_capacity(n);
    let mut pred_row  = Vec::with_capacity(n);
    let mut label_row = Vec::with_capacity(n);
    for i in 0..n {
        let channel = images.clone().slice([i..i + 1, 0..1, 0..h, 0..w]).reshape([h, w]);
        let peak: f32 = channel.clone().max().into_scalar().elem();
        let peak = if peak > 0.0 { peak } else { 1.0 };
        input_row.push(channel.div_scalar(peak).mul_scalar(255.0));

        pred_row.push(
            predicted.clone().slice([i..i + 1, 0..1, 0..h, 0..w]).reshape([h, w]).float().mul_scalar(scale),
        );
        label_row.push(
            labels.clone().slice([i..i + 1, 0..1, 0..h, 0..w]).reshape([h, w]).float().mul_scalar(scale),
        );
    }

    let panel = Tensor::cat(
        vec![Tensor::cat(input_row, 1), Tensor::cat(pred_row, 1), Tensor::cat(label_row, 1)],
        0,
    );
    let [height, width] = panel.dims();
    let pixels = panel
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("reading panel pixels: {e:?}"))?;

    Ok(Panel::new(width, height, pixels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_panel_layout() {
        let device = Default::default();
        // 2 samples, 1 channel, 1x2 pixels
        let images = Tensor::<NdArray, 4>::from_floats([[[[0.5, 1.0]]], [[[2.0, 0.0]]]], &device);
        // 3 classes; sample 0 predicts [2, 0], sample 1 predicts [1, 1]
        let output = Tensor::<NdArray, 4>::from_floats(
            [
                [[[0.0, 9.0]], [[0.0, 0.0]], [[9.0, 0.0]]],
                [[[0.0, 0.0]], [[9.0, 9.0]], [[0.0, 0.0]]],
            ],
            &device,
        );
        let labels = Tensor::<NdArray, 4, Int>::from_ints([[[[2, 1]]], [[[0, 2]]]], &device);

        let panel = render_panel(images, output, labels).unwrap();
        assert_eq!((panel.height, panel.width), (3, 4));

        // input row: each sample normalised by its own max
        assert_eq!(&panel.pixels[0..4], &[127.5, 255.0, 255.0, 0.0]);
        // prediction row: class × 127.5
        assert_eq!(&panel.pixels[4..8], &[255.0, 0.0, 127.5, 127.5]);
        // label row
        assert_eq!(&panel.pixels[8..12], &[255.0, 127.5, 0.0, 255.0]);
    }

    #[test]
    fn test_black_input_does_not_divide_by_zero() {
        let device = Default::default();
        let images = Tensor::<NdArray, 4>::zeros([1, 1, 2, 2], &device);
        let output = Tensor::<NdArray, 4>::zeros([1, 2, 2, 2], &device);
        let labels = Tensor::<NdArray, 4, Int>::zeros([1, 1, 2, 2], &device);

        let panel = render_panel(images, output, labels).unwrap();
        assert!(panel.pixels.iter().all(|v| v.is_finite()));
    }
}
