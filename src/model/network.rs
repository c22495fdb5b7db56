// 该文件是 Shanying （山鹰） 项目的一部分。
// src/model/network.rs - 全连接网络定义与前向计算
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use ndarray::{Array1, Array2, ArrayView1};
use serde::Deserialize;
use tracing::debug;

use crate::model::ModelError;

const HIDDEN_WIDTHS: [usize; 2] = [64, 32];
const DROPOUT_RATES: [f32; 2] = [0.2, 0.1];

/// 网络结构的扁平描述，按顺序求值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerSpec {
  Linear {
    in_features: usize,
    out_features: usize,
  },
  Relu,
  /// 推理时为恒等变换
  Dropout(f32),
  Sigmoid,
}

/// D -> 64 -> 32 -> 1
pub fn bird_drone_architecture(input_dim: usize) -> [LayerSpec; 8] {
  let [h1, h2] = HIDDEN_WIDTHS;
  let [p1, p2] = DROPOUT_RATES;
  [
    LayerSpec::Linear {
      in_features: input_dim,
      out_features: h1,
    },
    LayerSpec::Relu,
    LayerSpec::Dropout(p1),
    LayerSpec::Linear {
      in_features: h1,
      out_features: h2,
    },
    LayerSpec::Relu,
    LayerSpec::Dropout(p2),
    LayerSpec::Linear {
      in_features: h2,
      out_features: 1,
    },
    LayerSpec::Sigmoid,
  ]
}

/// 一个线性层的参数，weight 为 (out, in) 布局
#[derive(Debug, Clone, PartialEq)]
pub struct DenseWeights {
  weight: Array2<f32>,
  bias: Array1<f32>,
}

impl DenseWeights {
  pub fn new(weight: Array2<f32>, bias: Array1<f32>) -> Self {
    Self { weight, bias }
  }

  pub fn zeros(in_features: usize, out_features: usize) -> Self {
    Self {
      weight: Array2::zeros((out_features, in_features)),
      bias: Array1::zeros(out_features),
    }
  }

  pub fn in_features(&self) -> usize {
    self.weight.ncols()
  }

  pub fn out_features(&self) -> usize {
    self.weight.nrows()
  }

  fn apply(&self, x: &Array1<f32>) -> Array1<f32> {
    self.weight.dot(x) + &self.bias
  }
}

#[derive(Debug, Deserialize)]
struct LinearCheckpoint {
  weight: Vec<Vec<f32>>,
  bias: Vec<f32>,
}

/// 持久化的模型参数
#[derive(Debug, Deserialize)]
pub struct NetworkCheckpoint {
  pub input_dim: usize,
  layers: Vec<LinearCheckpoint>,
}

impl NetworkCheckpoint {
  pub fn from_slice(data: &[u8]) -> Result<Self, ModelError> {
    Ok(serde_json::from_slice(data)?)
  }

  pub fn into_weights(self) -> Result<Vec<DenseWeights>, ModelError> {
    self
      .layers
      .into_iter()
      .enumerate()
      .map(|(index, layer)| {
        let out_features = layer.weight.len();
        let in_features = layer.weight.first().map(Vec::len).unwrap_or(0);
        if layer.weight.iter().any(|row| row.len() != in_features) {
          return Err(ModelError::invalid(format!("第 {} 个线性层的权重不是矩阵", index)));
        }
        let flat = layer.weight.into_iter().flatten().collect::<Vec<_>>();
        let weight = Array2::from_shape_vec((out_features, in_features), flat)
          .map_err(|e| ModelError::invalid(format!("第 {} 个线性层: {}", index, e)))?;
        Ok(DenseWeights::new(weight, Array1::from(layer.bias)))
      })
      .collect()
  }
}

#[derive(Debug, Clone)]
enum Layer {
  Linear(DenseWeights),
  Relu,
  Identity,
  Sigmoid,
}

/// 按结构描述装配好参数的网络
#[derive(Debug, Clone)]
pub struct Network {
  spec: Vec<LayerSpec>,
  layers: Vec<Layer>,
}

impl Network {
  pub fn new(spec: &[LayerSpec], weights: Vec<DenseWeights>) -> Result<Self, ModelError> {
    let linear_count = spec
      .iter()
      .filter(|layer| matches!(layer, LayerSpec::Linear { .. }))
      .count();
    if linear_count != weights.len() {
      return Err(ModelError::invalid(format!(
        "预期 {} 个线性层参数, 实际为 {}",
        linear_count,
        weights.len()
      )));
    }

    let mut weights = weights.into_iter();
    let mut width: Option<usize> = None;
    let mut layers = Vec::with_capacity(spec.len());

    for (index, layer) in spec.iter().enumerate() {
      let layer = match *layer {
        LayerSpec::Linear {
          in_features,
          out_features,
        } => {
          if width.is_some_and(|w| w != in_features) {
            return Err(ModelError::invalid(format!(
              "第 {} 层输入宽度 {} 与上一层输出不一致",
              index, in_features
            )));
          }
          let dense = weights
            .next()
            .ok_or_else(|| ModelError::invalid("线性层参数不足"))?;
          if dense.in_features() != in_features
            || dense.out_features() != out_features
            || dense.bias.len() != out_features
          {
            return Err(ModelError::invalid(format!(
              "第 {} 层参数形状错误: 期望 {}x{}, 实际权重 {}x{}, 偏置 {}",
              index,
              out_features,
              in_features,
              dense.out_features(),
              dense.in_features(),
              dense.bias.len()
            )));
          }
          width = Some(out_features);
          Layer::Linear(dense)
        }
        LayerSpec::Relu => Layer::Relu,
        LayerSpec::Dropout(_) => Layer::Identity,
        LayerSpec::Sigmoid => Layer::Sigmoid,
      };
      layers.push(layer);
    }

    debug!("网络装配完成: {} 层", layers.len());
    Ok(Self {
      spec: spec.to_vec(),
      layers,
    })
  }

  pub fn spec(&self) -> &[LayerSpec] {
    &self.spec
  }

  pub fn input_width(&self) -> Option<usize> {
    self.layers.iter().find_map(|layer| match layer {
      Layer::Linear(dense) => Some(dense.in_features()),
      _ => None,
    })
  }

  pub fn output_width(&self) -> Option<usize> {
    self.layers.iter().rev().find_map(|layer| match layer {
      Layer::Linear(dense) => Some(dense.out_features()),
      _ => None,
    })
  }

  pub fn forward(&self, input: ArrayView1<f32>) -> Array1<f32> {
    self
      .layers
      .iter()
      .fold(input.to_owned(), |x, layer| match layer {
        Layer::Linear(dense) => dense.apply(&x),
        Layer::Relu => x.mapv_into(|v| v.max(0.0)),
        Layer::Identity => x,
        Layer::Sigmoid => x.mapv_into(sigmoid),
      })
  }
}

fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::array;

  #[test]
  fn dropout_is_identity_at_inference() {
    let spec = [
      LayerSpec::Linear {
        in_features: 2,
        out_features: 2,
      },
      LayerSpec::Dropout(0.5),
      LayerSpec::Relu,
    ];
    let dense = DenseWeights::new(array![[1.0, 0.0], [0.0, -1.0]], array![0.5, 0.0]);
    let network = Network::new(&spec, vec![dense]).unwrap();

    let out = network.forward(array![2.0, 3.0].view());
    assert_eq!(out, array![2.5, 0.0]);
  }

  #[test]
  fn sigmoid_of_bias_only_network() {
    let spec = bird_drone_architecture(3);
    let weights = vec![
      DenseWeights::zeros(3, 64),
      DenseWeights::zeros(64, 32),
      DenseWeights::zeros(32, 1),
    ];
    let network = Network::new(&spec, weights).unwrap();

    let out = network.forward(array![7.0, -1.0, 2.0].view());
    assert_eq!(out.len(), 1);
    assert!((out[0] - 0.5).abs() < 1e-6);
    assert_eq!(network.input_width(), Some(3));
    assert_eq!(network.output_width(), Some(1));
  }

  #[test]
  fn rejects_wrong_layer_shapes() {
    let spec = bird_drone_architecture(10);
    let weights = vec![
      DenseWeights::zeros(10, 64),
      DenseWeights::zeros(64, 16),
      DenseWeights::zeros(16, 1),
    ];
    assert!(matches!(
      Network::new(&spec, weights),
      Err(ModelError::ModelInvalid(_))
    ));

    let too_few = vec![DenseWeights::zeros(10, 64)];
    assert!(Network::new(&spec, too_few).is_err());
  }

  #[test]
  fn checkpoint_weights_keep_out_in_layout() {
    let checkpoint = NetworkCheckpoint::from_slice(
      br#"{"input_dim": 3, "layers": [{"weight": [[1, 2, 3], [4, 5, 6]], "bias": [0, 1]}]}"#,
    )
    .unwrap();
    assert_eq!(checkpoint.input_dim, 3);

    let weights = checkpoint.into_weights().unwrap();
    assert_eq!(weights[0].in_features(), 3);
    assert_eq!(weights[0].out_features(), 2);
    assert_eq!(weights[0].apply(&array![1.0, 0.0, 0.0]), array![1.0, 5.0]);
  }

  #[test]
  fn ragged_checkpoint_rows_are_invalid() {
    let checkpoint = NetworkCheckpoint::from_slice(
      br#"{"input_dim": 2, "layers": [{"weight": [[1, 2], [3]], "bias": [0, 0]}]}"#,
    )
    .unwrap();
    assert!(checkpoint.into_weights().is_err());
  }
}
