// 该文件是 Shanying （山鹰） 项目的一部分。
// src/model/scaler.rs - 特征标准化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use ndarray::{Array1, Array2};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
  input::FeatureSample,
  model::{ModelError, ShapeError},
};

#[derive(Debug, Deserialize)]
struct ScalerFile {
  mean: Vec<f64>,
  scale: Vec<f64>,
}

/// 训练时拟合好的逐特征标准化参数，推理期间只读
#[derive(Debug, Clone, PartialEq)]
pub struct ScalerState {
  mean: Array1<f64>,
  scale: Array1<f64>,
}

impl ScalerState {
  pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ModelError> {
    if mean.len() != scale.len() {
      return Err(ModelError::invalid(format!(
        "标准化参数长度不一致: mean {}, scale {}",
        mean.len(),
        scale.len()
      )));
    }

    // 常数特征的 scale 为 0，按 1 处理
    let scale = scale
      .into_iter()
      .map(|s| if s == 0.0 { 1.0 } else { s })
      .collect::<Vec<_>>();

    Ok(Self {
      mean: Array1::from(mean),
      scale: Array1::from(scale),
    })
  }

  pub fn identity(n_features: usize) -> Self {
    Self {
      mean: Array1::zeros(n_features),
      scale: Array1::ones(n_features),
    }
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelError> {
    let path = path.as_ref();
    info!("加载标准化参数: {}", path.display());
    let data = std::fs::read(path)?;
    let file: ScalerFile = serde_json::from_slice(&data)?;
    let scaler = Self::new(file.mean, file.scale)?;
    debug!("标准化特征数量: {}", scaler.n_features());
    Ok(scaler)
  }

  pub fn n_features(&self) -> usize {
    self.mean.len()
  }

  pub fn transform(&self, sample: &FeatureSample) -> Result<Array2<f32>, ShapeError> {
    if sample.ncols() != self.n_features() {
      return Err(ShapeError::FeatureMismatch {
        expected: self.n_features(),
        actual: sample.ncols(),
      });
    }

    let scaled = (sample.as_array() - &self.mean) / &self.scale;
    Ok(scaled.mapv(|v| v as f32))
  }
}

pub fn normalize(sample: &FeatureSample, scaler: &ScalerState) -> Result<Array2<f32>, ShapeError> {
  scaler.transform(sample)
}
