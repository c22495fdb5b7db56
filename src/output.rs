// 该文件是 Shanying （山鹰） 项目的一部分。
// src/output.rs - 输出定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::convert::Infallible;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::model::PredictionResult;

pub trait Render<Source: ?Sized, Output>: Sized {
  type Artifact;
  type Error;
  fn render_result(&self, source: &Source, result: &Output) -> Result<Self::Artifact, Self::Error>;
}

impl<Source: ?Sized, Output, T: Render<Source, Output>> Render<Source, Output> for &T {
  type Artifact = T::Artifact;
  type Error = T::Error;

  fn render_result(&self, source: &Source, result: &Output) -> Result<Self::Artifact, Self::Error> {
    (**self).render_result(source, result)
  }
}

pub mod pdf;
pub mod report;
pub mod report_store;

#[cfg(feature = "directory_store")]
mod directory_store;
#[cfg(feature = "directory_store")]
pub use self::directory_store::{DirectoryReportStore, REPORT_EXTENSION};

pub use self::pdf::{Block, Document, DocumentRenderer, PdfRenderer};
pub use self::report::{Clock, FixedClock, LocalClock, ReportBuilder, ReportRecord};
pub use self::report_store::{MemoryReportStore, ReportStore, ReportStoreError, download_name};

pub const FALLBACK_FILENAME: &str = "unknown.pkl";
pub const FALLBACK_PREDICTION: &str = "Unknown";

/// 一次报告生成的结果，保存失败不影响已渲染的内容
#[derive(Debug)]
pub struct GeneratedReport {
  pub record: ReportRecord,
  pub bytes: Vec<u8>,
  pub stored_at: Option<PathBuf>,
  pub persist_error: Option<ReportStoreError>,
}

impl GeneratedReport {
  pub fn is_persisted(&self) -> bool {
    self.persist_error.is_none()
  }
}

/// 报告缺失时用于重新生成的调用方参数
#[derive(Debug, Clone, Default)]
pub struct ReportFallback {
  pub filename: Option<String>,
  pub prediction: Option<String>,
  pub confidence: Option<String>,
}

impl ReportFallback {
  pub fn filename(&self) -> &str {
    self.filename.as_deref().unwrap_or(FALLBACK_FILENAME)
  }

  pub fn prediction(&self) -> &str {
    self.prediction.as_deref().unwrap_or(FALLBACK_PREDICTION)
  }

  /// 空字符串在报告中显示为 "Not available"
  pub fn confidence(&self) -> &str {
    self.confidence.as_deref().unwrap_or("")
  }
}

#[derive(Debug)]
pub struct FetchedReport {
  /// 调用方请求的编号，下载文件名使用该编号
  pub requested_id: String,
  /// 文档内容中记录的编号；重新生成时与请求编号不同
  pub content_id: String,
  pub regenerated: bool,
  pub bytes: Vec<u8>,
  pub download_name: String,
  pub persist_error: Option<ReportStoreError>,
}

/// 报告构建与存储的组合
pub struct Reporter<S, C = LocalClock, R = PdfRenderer> {
  builder: ReportBuilder<C, R>,
  store: S,
}

impl<S: ReportStore> Reporter<S> {
  pub fn new(store: S) -> Self {
    Self {
      builder: ReportBuilder::default(),
      store,
    }
  }
}

impl<S: ReportStore, C: Clock, R: DocumentRenderer> Reporter<S, C, R> {
  pub fn with_builder(builder: ReportBuilder<C, R>, store: S) -> Self {
    Self { builder, store }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn generate(
    &self,
    prediction: &str,
    source_filename: &str,
    confidence_display: &str,
  ) -> GeneratedReport {
    let (record, bytes) = self
      .builder
      .build(prediction, source_filename, confidence_display);

    let (stored_at, persist_error) = match self.store.put(&record.report_id, &bytes) {
      Ok(path) => (Some(path), None),
      Err(e) => {
        warn!("报告 {} 保存失败: {}", record.report_id, e);
        (None, Some(e))
      }
    };

    GeneratedReport {
      record,
      bytes,
      stored_at,
      persist_error,
    }
  }

  pub fn fetch(
    &self,
    report_id: &str,
    fallback: &ReportFallback,
  ) -> Result<FetchedReport, ReportStoreError> {
    let download_name = download_name(report_id, self.builder.extension());

    if let Some(bytes) = self.store.get(report_id)? {
      info!("找到报告: {}", report_id);
      return Ok(FetchedReport {
        requested_id: report_id.to_string(),
        content_id: report_id.to_string(),
        regenerated: false,
        bytes,
        download_name,
        persist_error: None,
      });
    }

    let generated = self.generate(
      fallback.prediction(),
      fallback.filename(),
      fallback.confidence(),
    );
    // 重新生成的报告使用新的编号，但仍以请求的编号交付
    warn!(
      "报告 {} 不存在, 已按回退参数重新生成为 {}",
      report_id, generated.record.report_id
    );

    Ok(FetchedReport {
      requested_id: report_id.to_string(),
      content_id: generated.record.report_id,
      regenerated: true,
      bytes: generated.bytes,
      download_name,
      persist_error: generated.persist_error,
    })
  }
}

impl<S: ReportStore, C: Clock, R: DocumentRenderer> Render<str, PredictionResult>
  for Reporter<S, C, R>
{
  type Artifact = GeneratedReport;
  type Error = Infallible;

  fn render_result(
    &self,
    source_filename: &str,
    result: &PredictionResult,
  ) -> Result<Self::Artifact, Self::Error> {
    Ok(self.generate(
      result.label.as_str(),
      source_filename,
      &result.confidence_display(),
    ))
  }
}
