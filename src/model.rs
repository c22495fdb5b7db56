// 该文件是 Shanying （山鹰） 项目的一部分。
// src/model.rs - 模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
  fn postprocess(probability: f32) -> Self::Output;
}

impl<M: Model> Model for &M {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }

  fn postprocess(probability: f32) -> Self::Output {
    M::postprocess(probability)
  }
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn from_label_str(label: &str) -> Option<Self>;
}

/// 样本宽度与模型不符
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
  #[error("特征数量不匹配: 期望 {expected}, 实际 {actual}")]
  FeatureMismatch { expected: usize, actual: usize },
  #[error("每次只能推理一个样本, 实际 {0} 行")]
  MultipleRows(usize),
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型文件解析错误: {0}")]
  CheckpointParseError(#[from] serde_json::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl ModelError {
  pub fn invalid(msg: impl Into<String>) -> Self {
    ModelError::ModelInvalid(msg.into())
  }
}

mod classifier;
mod decision;
mod network;
mod scaler;

pub use self::classifier::{
  BirdDroneClassifier, ClassifierBuilder, DEFAULT_INPUT_DIM, InferenceContext,
};
pub use self::decision::{DECISION_THRESHOLD, Label, PredictionResult, decide};
pub use self::network::{
  DenseWeights, LayerSpec, Network, NetworkCheckpoint, bird_drone_architecture,
};
pub use self::scaler::{ScalerState, normalize};
