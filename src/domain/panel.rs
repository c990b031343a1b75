/// A single-channel diagnostic image already copied off the device.
///
/// Pixels are row-major with values in display range `[0, 255]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub width:  usize,
    pub height: usize,
    pub pixels: Vec<f32>,
}

impl Panel {
    pub fn new(width: usize, height: usize, pixels: Vec<f32>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self { width, height, pixels }
    }

    /// Quantise to 8-bit grey, saturating out-of-range values.
    pub fn to_luma8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .map(|&v| if v.is_finite() { v.round().clamp(0.0, 255.0) as u8 } else { 0 })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_saturates() {
        let p = Panel::new(4, 1, vec![-3.0, 12.4, 300.0, f32::NAN]);
        assert_eq!(p.to_luma8(), vec![0, 12, 255, 0]);
        assert_eq!(p.pixels[1], 12.4);
    }
}
