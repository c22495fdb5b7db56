// 该文件是 Shanying （山鹰） 项目的一部分。
// src/model/decision.rs - 判定规则
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::fmt;

use serde::Serialize;

use crate::model::WithLabel;

/// 小于该阈值判为鸟，等于或大于判为无人机
pub const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Label {
  Bird,
  Drone,
}

impl Label {
  pub fn as_str(&self) -> &'static str {
    match self {
      Label::Bird => "Bird",
      Label::Drone => "Drone",
    }
  }
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl WithLabel for Label {
  fn to_label_str(&self) -> String {
    self.as_str().to_string()
  }

  fn from_label_str(label: &str) -> Option<Self> {
    match label {
      "Bird" => Some(Label::Bird),
      "Drone" => Some(Label::Drone),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
  pub label: Label,
  pub probability: f64,
  pub confidence_percent: f64,
}

impl PredictionResult {
  /// 报告与响应中使用的置信度文本，如 "80.00%"
  pub fn confidence_display(&self) -> String {
    format!("{:.2}%", self.confidence_percent)
  }
}

pub fn decide(probability: f64) -> PredictionResult {
  // NaN 视为无法区分
  let probability = if probability.is_nan() {
    DECISION_THRESHOLD
  } else {
    probability.clamp(0.0, 1.0)
  };

  let (label, confidence) = if probability < DECISION_THRESHOLD {
    (Label::Bird, 1.0 - probability)
  } else {
    (Label::Drone, probability)
  };

  PredictionResult {
    label,
    probability,
    confidence_percent: confidence * 100.0,
  }
}
