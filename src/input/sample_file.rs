// 该文件是 Shanying （山鹰） 项目的一部分。
// src/input/sample_file.rs - 样本文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::{FeatureSample, SampleError},
};

#[derive(Error, Debug)]
pub enum SampleFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Sample format error: {0}")]
  FormatError(#[from] SampleError),
}

/// 从 JSON 文件读取的单个样本，迭代一次后耗尽
pub struct SampleFileInput {
  filename: String,
  sample: Option<FeatureSample>,
}

impl FromUrlWithScheme for SampleFileInput {
  const SCHEME: &'static str = "sample";
}

impl FromUrl for SampleFileInput {
  type Error = SampleFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(SampleFileInputError::SchemaMismatch);
    }

    let path = url.path();
    info!("读取样本文件: {}", path);
    let bytes = std::fs::read(path)?;
    let sample = FeatureSample::from_slice(&bytes)?;

    Ok(SampleFileInput {
      filename: file_name_of(path),
      sample: Some(sample),
    })
  }
}

impl SampleFileInput {
  pub fn new(filename: impl Into<String>, sample: FeatureSample) -> Self {
    Self {
      filename: filename.into(),
      sample: Some(sample),
    }
  }

  /// 报告中记录的源文件名
  pub fn filename(&self) -> &str {
    &self.filename
  }
}

impl Iterator for SampleFileInput {
  type Item = FeatureSample;

  fn next(&mut self) -> Option<Self::Item> {
    self.sample.take()
  }
}

fn file_name_of(path: &str) -> String {
  Path::new(path)
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.to_string())
}
