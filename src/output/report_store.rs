// 该文件是 Shanying （山鹰） 项目的一部分。
// src/output/report_store.rs - 报告存储
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

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportStoreError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("报告编号无效: {0:?}")]
  InvalidReportId(String),
  #[error("读取报告 {path} 失败: {source}")]
  ReadError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("写入报告 {path} 失败: {source}")]
  WriteError {
    path: PathBuf,
    source: std::io::Error,
  },
}

/// 按报告编号保存与读取渲染后的文档
///
/// 同一编号的并发读写没有顺序保证，以最后一次写入为准。
pub trait ReportStore {
  /// 未找到时返回 `Ok(None)`
  fn get(&self, report_id: &str) -> Result<Option<Vec<u8>>, ReportStoreError>;
  /// 返回保存位置
  fn put(&self, report_id: &str, bytes: &[u8]) -> Result<PathBuf, ReportStoreError>;
}

impl<S: ReportStore> ReportStore for &S {
  fn get(&self, report_id: &str) -> Result<Option<Vec<u8>>, ReportStoreError> {
    (**self).get(report_id)
  }

  fn put(&self, report_id: &str, bytes: &[u8]) -> Result<PathBuf, ReportStoreError> {
    (**self).put(report_id, bytes)
  }
}

/// 编号直接用作文件名，只允许字母、数字、`-` 与 `_`
pub fn validate_report_id(report_id: &str) -> Result<(), ReportStoreError> {
  let valid = !report_id.is_empty()
    && report_id
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
  if valid {
    Ok(())
  } else {
    Err(ReportStoreError::InvalidReportId(report_id.to_string()))
  }
}

/// 下载时提供给调用方的文件名
pub fn download_name(report_id: &str, extension: &str) -> String {
  format!("classification_report_{}.{}", report_id, extension)
}

/// 进程内存储，用于嵌入与测试
#[derive(Debug, Default)]
pub struct MemoryReportStore {
  reports: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryReportStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.reports.lock().unwrap_or_else(|e| e.into_inner()).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl ReportStore for MemoryReportStore {
  fn get(&self, report_id: &str) -> Result<Option<Vec<u8>>, ReportStoreError> {
    validate_report_id(report_id)?;
    let reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
    Ok(reports.get(report_id).cloned())
  }

  fn put(&self, report_id: &str, bytes: &[u8]) -> Result<PathBuf, ReportStoreError> {
    validate_report_id(report_id)?;
    let mut reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
    reports.insert(report_id.to_string(), bytes.to_vec());
    Ok(PathBuf::from(report_id))
  }
}
