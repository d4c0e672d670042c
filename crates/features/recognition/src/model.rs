//! CRNN: three conv blocks, a dense bottleneck, two bidirectional LSTMs and a
//! per-timestep softmax over [`NUM_CLASSES`].
//!
//! Weights are read from a safetensors file in `PyTorch` layout:
//!
//! | prefix            | tensors                                              |
//! |-------------------|------------------------------------------------------|
//! | `conv{1,2,3}`     | `weight`, `bias`                                     |
//! | `bn{1,2,3}`       | `weight`, `bias`, `running_mean`, `running_var`      |
//! | `dense1`, `output`| `weight`, `bias`                                     |
//! | `lstm{1,2}.forward`  | `weight_ih_l0`, `weight_hh_l0`, `bias_ih_l0`, `bias_hh_l0` |
//! | `lstm{1,2}.backward` | the same names with a `_reverse` suffix          |

use crate::alphabet::NUM_CLASSES;
use crate::error::{RecognitionError, RecognitionErrorExt};
use crate::preprocess::{InputPlane, TARGET_HEIGHT, TARGET_WIDTH};
use candle_core::{D, DType, Device, Module, ModuleT, Tensor};
use candle_nn::rnn::{Direction, LSTM, LSTMConfig, RNN};
use candle_nn::{BatchNorm, BatchNormConfig, Conv2d, Conv2dConfig, Linear, VarBuilder};
use std::path::Path;

const BN_EPS: f64 = 1e-3;
const DENSE_UNITS: usize = 64;
const LSTM_UNITS: usize = 256;

#[derive(Debug)]
struct ConvBlock {
    conv: Conv2d,
    norm: BatchNorm,
    pool: (usize, usize),
}

impl ConvBlock {
    fn new(
        vb: &VarBuilder<'_>,
        index: usize,
        in_channels: usize,
        out_channels: usize,
        pool: (usize, usize),
    ) -> candle_core::Result<Self> {
        let conv = candle_nn::conv2d(
            in_channels,
            out_channels,
            3,
            Conv2dConfig { padding: 1, ..Default::default() },
            vb.pp(format!("conv{index}")),
        )?;
        let norm = candle_nn::batch_norm(
            out_channels,
            BatchNormConfig { eps: BN_EPS, ..Default::default() },
            vb.pp(format!("bn{index}")),
        )?;
        Ok(Self { conv, norm, pool })
    }

    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let xs = self.conv.forward(xs)?;
        self.norm.forward_t(&xs, false)?.relu()?.max_pool2d(self.pool)
    }
}

/// Forward and backward LSTM whose outputs are concatenated per timestep.
#[derive(Debug)]
struct BiLstm {
    forward: LSTM,
    backward: LSTM,
}

impl BiLstm {
    fn new(vb: &VarBuilder<'_>, name: &str, input: usize) -> candle_core::Result<Self> {
        let vb = vb.pp(name);
        let forward = candle_nn::lstm(input, LSTM_UNITS, LSTMConfig::default(), vb.pp("forward"))?;
        let backward = candle_nn::lstm(
            input,
            LSTM_UNITS,
            LSTMConfig { direction: Direction::Backward, ..LSTMConfig::default() },
            vb.pp("backward"),
        )?;
        Ok(Self { forward, backward })
    }

    fn run(lstm: &LSTM, xs: &Tensor) -> candle_core::Result<Tensor> {
        lstm.states_to_tensor(&lstm.seq(xs)?)
    }

    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let fwd = Self::run(&self.forward, xs)?;
        let bwd = reverse_time(&Self::run(&self.backward, &reverse_time(xs)?)?)?;
        Tensor::cat(&[&fwd, &bwd], D::Minus1)
    }
}

/// Flips a `[batch, time, features]` tensor along the time axis.
fn reverse_time(xs: &Tensor) -> candle_core::Result<Tensor> {
    let steps = u32::try_from(xs.dim(1)?).map_err(candle_core::Error::wrap)?;
    let order: Vec<u32> = (0..steps).rev().collect();
    xs.index_select(&Tensor::new(order.as_slice(), xs.device())?, 1)
}

#[derive(Debug)]
pub struct Crnn {
    blocks: [ConvBlock; 3],
    dense: Linear,
    lstm1: BiLstm,
    lstm2: BiLstm,
    output: Linear,
    device: Device,
}

impl Crnn {
    /// Builds the network from `vb`.
    ///
    /// # Errors
    /// Fails when a tensor is missing or has the wrong shape.
    pub fn new(vb: &VarBuilder<'_>) -> Result<Self, RecognitionError> {
        let blocks = [
            ConvBlock::new(vb, 1, 1, 32, (2, 2))?,
            ConvBlock::new(vb, 2, 32, 64, (2, 2))?,
            ConvBlock::new(vb, 3, 64, 128, (1, 2))?,
        ];
        // 256x64 input -> 64 timesteps of 8 x 128 features.
        let features = (TARGET_HEIGHT / 8) * 128;

        Ok(Self {
            blocks,
            dense: candle_nn::linear(features, DENSE_UNITS, vb.pp("dense1"))?,
            lstm1: BiLstm::new(vb, "lstm1", DENSE_UNITS)?,
            lstm2: BiLstm::new(vb, "lstm2", 2 * LSTM_UNITS)?,
            output: candle_nn::linear(2 * LSTM_UNITS, NUM_CLASSES, vb.pp("output"))?,
            device: vb.device().clone(),
        })
    }

    /// Loads weights from a safetensors file onto `device`.
    ///
    /// # Errors
    /// [`RecognitionError::Model`] if the file is unreadable or incomplete.
    pub fn load(path: &Path, device: &Device) -> Result<Self, RecognitionError> {
        let tensors = candle_core::safetensors::load(path, device)
            .context(format!("Failed to read weights: {}", path.display()))?;
        Self::new(&VarBuilder::from_tensors(tensors, DType::F32, device))
    }

    /// Class probabilities for every timestep, shape `[64, NUM_CLASSES]`.
    ///
    /// # Errors
    /// Propagates tensor errors from the forward pass.
    pub fn forward(&self, plane: &InputPlane) -> Result<Vec<Vec<f32>>, RecognitionError> {
        let shape = (1, 1, TARGET_WIDTH, TARGET_HEIGHT);
        let xs = Tensor::from_slice(&plane.data, shape, &self.device)?;
        Ok(self.probabilities(&xs)?)
    }

    fn probabilities(&self, xs: &Tensor) -> candle_core::Result<Vec<Vec<f32>>> {
        let mut xs = xs.clone();
        for block in &self.blocks {
            xs = block.forward(&xs)?;
        }

        let (batch, channels, steps, width) = xs.dims4()?;
        let xs = xs.permute((0, 2, 3, 1))?.contiguous()?.reshape((batch, steps, width * channels))?;
        let xs = self.dense.forward(&xs)?.relu()?;
        let xs = self.lstm1.forward(&xs)?;
        let xs = self.lstm2.forward(&xs)?;
        let logits = self.output.forward(&xs)?;

        candle_nn::ops::softmax_last_dim(&logits)?.squeeze(0)?.to_vec2::<f32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctc::greedy_decode;

    fn zero_model() -> Crnn {
        Crnn::new(&VarBuilder::zeros(DType::F32, &Device::Cpu)).expect("zero weights build")
    }

    #[test]
    fn test_output_shape_is_64_steps_by_classes() {
        let plane = InputPlane { data: vec![0.5; TARGET_WIDTH * TARGET_HEIGHT] };
        let probs = zero_model().forward(&plane).expect("forward");

        assert_eq!(probs.len(), 64);
        assert!(probs.iter().all(|row| row.len() == NUM_CLASSES));
        let total: f32 = probs[0].iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_zero_weights_give_uniform_output() {
        let plane = InputPlane { data: vec![1.0; TARGET_WIDTH * TARGET_HEIGHT] };
        let probs = zero_model().forward(&plane).expect("forward");

        let uniform = 1.0 / NUM_CLASSES as f32;
        assert!(probs.iter().flatten().all(|p| (p - uniform).abs() < 1e-5));
        // Every step ties, so argmax picks class 0 and the repeats collapse.
        assert_eq!(greedy_decode(&probs), "A");
    }

    #[test]
    fn test_reverse_time_flips_axis_one() {
        let xs = Tensor::new(&[[[1f32], [2.], [3.]]], &Device::Cpu).expect("tensor");
        let flipped = reverse_time(&xs).expect("flip").flatten_all().expect("flat");
        assert_eq!(flipped.to_vec1::<f32>().expect("vec"), vec![3., 2., 1.]);
    }

    #[test]
    fn test_missing_weights_file_is_model_error() {
        let err = Crnn::load(Path::new("/nonexistent/best_model.safetensors"), &Device::Cpu)
            .unwrap_err();
        assert!(matches!(err, RecognitionError::Model { .. }));
    }
}
