use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::traits::SegmentationModel;

// #[derive(Config)] already provides Clone + Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct SegNetConfig {
    pub in_channels:     usize,
    pub hidden_channels: usize,
    pub num_classes:     usize,
}

impl SegNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SegNet<B> {
        let stem = Conv2dConfig::new([self.in_channels, self.hidden_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let body = Conv2dConfig::new([self.hidden_channels, self.hidden_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let head = Conv2dConfig::new([self.hidden_channels, self.num_classes], [1, 1])
            .init(device);
        SegNet { stem, body, head }
    }
}

/// Three convolutions, spatial size preserved end to end.
///
/// The stem is the frozen subset: it acts as a fixed random feature
/// extractor and only `body` and `head` are optimised.
#[derive(Module, Debug)]
pub struct SegNet<B: Backend> {
    pub stem: Conv2d<B>,
    pub body: Conv2d<B>,
    pub head: Conv2d<B>,
}

impl<B: Backend> SegmentationModel<B> for SegNet<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.stem.forward(images));
        let x = relu(self.body.forward(x));
        self.head.forward(x)
    }

    fn freeze(self) -> Self {
        Self { stem: self.stem.no_grad(), ..self }
    }

    fn num_frozen_params(&self) -> usize {
        self.stem.num_params()
    }
}
