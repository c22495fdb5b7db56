// 该文件是 Shanying （山鹰） 项目的一部分。
// src/input.rs - 雷达特征样本输入
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use ndarray::{Array1, Array2, Axis};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

mod sample_file;
pub use self::sample_file::{SampleFileInput, SampleFileInputError};

#[derive(Error, Debug)]
pub enum SampleError {
  #[error("Sample is not valid JSON: {0}")]
  Json(#[from] serde_json::Error),
  #[error("Sample must be an array of numbers or an array of rows")]
  NotAnArray,
  #[error("Row {row} contains a non-numeric value")]
  NotNumeric { row: usize },
  #[error("Row {row} has {actual} values, expected {expected}")]
  Ragged {
    row: usize,
    expected: usize,
    actual: usize,
  },
  #[error("Sample layout error: {0}")]
  Layout(#[from] ndarray::ShapeError),
}

/// 一个雷达特征样本，已整理为 (行, 特征) 二维矩阵
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSample {
  data: Array2<f64>,
}

impl FeatureSample {
  /// 一维样本提升为单行矩阵
  pub fn from_row(row: Vec<f64>) -> Self {
    let data = Array1::from(row).insert_axis(Axis(0));
    Self { data }
  }

  pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, SampleError> {
    let height = rows.len();
    let width = rows.first().map(Vec::len).unwrap_or(0);
    let mut flat = Vec::with_capacity(height * width);
    for (row, values) in rows.into_iter().enumerate() {
      if values.len() != width {
        return Err(SampleError::Ragged {
          row,
          expected: width,
          actual: values.len(),
        });
      }
      flat.extend(values);
    }
    let data = Array2::from_shape_vec((height, width), flat)?;
    Ok(Self { data })
  }

  pub fn from_value(value: &Value) -> Result<Self, SampleError> {
    let items = value.as_array().ok_or(SampleError::NotAnArray)?;

    if items.iter().all(Value::is_number) {
      debug!("一维样本，长度 {}", items.len());
      return Ok(Self::from_row(numbers(items, 0)?));
    }

    if items.iter().all(Value::is_array) {
      let rows = items
        .iter()
        .enumerate()
        .map(|(row, item)| match item.as_array() {
          Some(values) => numbers(values, row),
          None => Err(SampleError::NotNumeric { row }),
        })
        .collect::<Result<Vec<_>, _>>()?;
      debug!("二维样本，行数 {}", rows.len());
      return Self::from_rows(rows);
    }

    Err(SampleError::NotNumeric { row: 0 })
  }

  pub fn from_slice(bytes: &[u8]) -> Result<Self, SampleError> {
    let value: Value = serde_json::from_slice(bytes)?;
    Self::from_value(&value)
  }

  pub fn nrows(&self) -> usize {
    self.data.nrows()
  }

  pub fn ncols(&self) -> usize {
    self.data.ncols()
  }

  pub fn as_array(&self) -> &Array2<f64> {
    &self.data
  }
}

fn numbers(values: &[Value], row: usize) -> Result<Vec<f64>, SampleError> {
  values
    .iter()
    .map(|v| v.as_f64().ok_or(SampleError::NotNumeric { row }))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flat_array_is_promoted_to_one_row() {
    let sample = FeatureSample::from_slice(b"[1, 2.5, -3]").unwrap();
    assert_eq!(sample.nrows(), 1);
    assert_eq!(sample.ncols(), 3);
    assert_eq!(sample.as_array()[[0, 1]], 2.5);
  }

  #[test]
  fn nested_rows_keep_their_shape() {
    let sample = FeatureSample::from_slice(b"[[1, 2], [3, 4], [5, 6]]").unwrap();
    assert_eq!(sample.nrows(), 3);
    assert_eq!(sample.ncols(), 2);
    assert_eq!(sample.as_array()[[2, 0]], 5.0);
  }

  #[test]
  fn ragged_rows_are_rejected() {
    let err = FeatureSample::from_slice(b"[[1, 2], [3]]").unwrap_err();
    assert!(matches!(
      err,
      SampleError::Ragged {
        row: 1,
        expected: 2,
        actual: 1
      }
    ));
  }

  #[test]
  fn non_numeric_content_is_rejected() {
    assert!(matches!(
      FeatureSample::from_slice(br#"[1, "two", 3]"#),
      Err(SampleError::NotNumeric { .. })
    ));
    assert!(matches!(
      FeatureSample::from_slice(br#"[[1, 2], [3, [4]]]"#),
      Err(SampleError::NotNumeric { row: 1 })
    ));
    assert!(matches!(
      FeatureSample::from_slice(br#"{"features": [1, 2]}"#),
      Err(SampleError::NotAnArray)
    ));
    assert!(matches!(
      FeatureSample::from_slice(b"42"),
      Err(SampleError::NotAnArray)
    ));
  }

  #[test]
  fn broken_json_is_a_format_error() {
    assert!(matches!(
      FeatureSample::from_slice(b"[1, 2"),
      Err(SampleError::Json(_))
    ));
  }
}
