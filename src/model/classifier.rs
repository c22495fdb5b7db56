// 该文件是 Shanying （山鹰） 项目的一部分。
// src/model/classifier.rs - 鸟类/无人机分类器
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use ndarray::ArrayView1;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::FeatureSample,
  model::{
    DenseWeights, Model, ModelError, Network, NetworkCheckpoint, PredictionResult, ScalerState,
    ShapeError, bird_drone_architecture, decide, normalize,
  },
};

pub const DEFAULT_INPUT_DIM: usize = 10;

/// 固定结构的前馈网络，输出为 (0, 1) 之间的无人机概率
#[derive(Debug, Clone)]
pub struct BirdDroneClassifier {
  input_dim: usize,
  network: Network,
}

impl BirdDroneClassifier {
  pub fn new(input_dim: usize, weights: Vec<DenseWeights>) -> Result<Self, ModelError> {
    let network = Network::new(&bird_drone_architecture(input_dim), weights)?;
    Ok(Self { input_dim, network })
  }

  pub fn from_checkpoint(
    checkpoint: NetworkCheckpoint,
    input_dim: usize,
  ) -> Result<Self, ModelError> {
    if checkpoint.input_dim != input_dim {
      return Err(ModelError::invalid(format!(
        "预期模型输入宽度为 {}, 实际为 {}",
        input_dim, checkpoint.input_dim
      )));
    }
    Self::new(input_dim, checkpoint.into_weights()?)
  }

  pub fn input_dim(&self) -> usize {
    self.input_dim
  }

  pub fn network(&self) -> &Network {
    &self.network
  }

  pub fn score(&self, row: ArrayView1<f32>) -> Result<f32, ShapeError> {
    if row.len() != self.input_dim {
      return Err(ShapeError::FeatureMismatch {
        expected: self.input_dim,
        actual: row.len(),
      });
    }
    let output = self.network.forward(row);
    Ok(output[0])
  }
}

/// 启动时构建一次、之后只读的推理上下文
#[derive(Debug, Clone)]
pub struct InferenceContext {
  scaler: ScalerState,
  classifier: BirdDroneClassifier,
}

impl InferenceContext {
  pub fn new(scaler: ScalerState, classifier: BirdDroneClassifier) -> Result<Self, ModelError> {
    if scaler.n_features() != classifier.input_dim() {
      error!(
        "标准化特征数量 {} 与模型输入宽度 {} 不一致",
        scaler.n_features(),
        classifier.input_dim()
      );
      return Err(ModelError::invalid(format!(
        "标准化特征数量 {} 与模型输入宽度 {} 不一致",
        scaler.n_features(),
        classifier.input_dim()
      )));
    }
    Ok(Self { scaler, classifier })
  }

  pub fn scaler(&self) -> &ScalerState {
    &self.scaler
  }

  pub fn classifier(&self) -> &BirdDroneClassifier {
    &self.classifier
  }
}

impl Model for InferenceContext {
  type Input = FeatureSample;
  type Output = PredictionResult;
  type Error = ShapeError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("标准化样本");
    let normalized = normalize(input, &self.scaler)?;
    if normalized.nrows() != 1 {
      return Err(ShapeError::MultipleRows(normalized.nrows()));
    }

    debug!("执行模型推理");
    let probability = self.classifier.score(normalized.row(0))?;
    if !probability.is_finite() {
      warn!("模型输出不是有限值: {}", probability);
    }
    debug!("模型输出概率: {}", probability);

    Ok(Self::postprocess(probability))
  }

  fn postprocess(probability: f32) -> Self::Output {
    decide(probability as f64)
  }
}

pub struct ClassifierBuilder {
  model_path: PathBuf,
  scaler_path: Option<PathBuf>,
  input_dim: usize,
}

impl FromUrlWithScheme for ClassifierBuilder {
  const SCHEME: &'static str = "mlp";
}

impl FromUrl for ClassifierBuilder {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut scaler_path = None;
    let mut input_dim = DEFAULT_INPUT_DIM;
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "scaler" => scaler_path = Some(PathBuf::from(v.as_ref())),
        "input_dim" => {
          input_dim = v
            .parse()
            .map_err(|_| ModelError::ModelPathError(format!("input_dim 无效: {}", v)))?;
        }
        _ => warn!("忽略未知的模型参数: {}", k),
      }
    }

    Ok(ClassifierBuilder {
      model_path: PathBuf::from(url.path()),
      scaler_path,
      input_dim,
    })
  }
}

impl ClassifierBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      scaler_path: None,
      input_dim: DEFAULT_INPUT_DIM,
    }
  }

  pub fn scaler(mut self, path: impl Into<PathBuf>) -> Self {
    self.scaler_path = Some(path.into());
    self
  }

  pub fn input_dim(mut self, input_dim: usize) -> Self {
    self.input_dim = input_dim;
    self
  }

  pub fn build(self) -> Result<InferenceContext, ModelError> {
    info!("加载模型文件: {}", self.model_path.display());
    let data = std::fs::read(&self.model_path)?;
    debug!("模型文件大小: {:.2} KB", data.len() as f64 / 1024.0);

    let checkpoint = NetworkCheckpoint::from_slice(&data)?;
    let classifier = BirdDroneClassifier::from_checkpoint(checkpoint, self.input_dim)?;
    info!("模型加载完成, 输入宽度 {}", self.input_dim);

    let scaler = match &self.scaler_path {
      Some(path) => ScalerState::from_path(path)?,
      None => {
        warn!("未指定标准化参数, 使用恒等变换");
        ScalerState::identity(self.input_dim)
      }
    };

    InferenceContext::new(scaler, classifier)
  }
}

#[cfg(test)]
impl BirdDroneClassifier {
  /// 除最后一层偏置外全部为 0，输出恒为给定概率
  pub(crate) fn with_constant_output(input_dim: usize, probability: f32) -> Self {
    let logit = (probability / (1.0 - probability)).ln();
    Self::new(
      input_dim,
      vec![
        DenseWeights::zeros(input_dim, 64),
        DenseWeights::zeros(64, 32),
        DenseWeights::new(ndarray::Array2::zeros((1, 32)), ndarray::array![logit]),
      ],
    )
    .unwrap()
  }
}
