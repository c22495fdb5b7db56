// 该文件是 Shanying （山鹰） 项目的一部分。
// src/task.rs - 分类任务
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

use std::convert::Infallible;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  input::{FeatureSample, SampleError},
  model::{Label, Model, PredictionResult, ShapeError},
  output::{GeneratedReport, Render},
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 单次请求的处理错误，均不影响共享的模型状态
#[derive(Error, Debug)]
pub enum ProcessingError {
  #[error("没有输入样本")]
  NoSample,
  #[error("样本格式错误: {0}")]
  InputFormat(#[from] SampleError),
  #[error("样本形状错误: {0}")]
  Shape(#[from] ShapeError),
}

impl From<Infallible> for ProcessingError {
  fn from(e: Infallible) -> Self {
    match e {}
  }
}

impl ProcessingError {
  /// 交给传输层的错误响应
  pub fn envelope(&self) -> serde_json::Value {
    serde_json::json!({ "error": format!("Error processing file: {}", self) })
  }
}

/// 分类结果响应
#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
  pub success: bool,
  pub prediction: Label,
  pub confidence: String,
  pub confidence_percent: f64,
  pub report_id: String,
  pub report_persisted: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub warning: Option<String>,
  #[serde(skip)]
  pub report: Vec<u8>,
}

impl ClassifyResponse {
  fn new(prediction: &PredictionResult, report: GeneratedReport) -> Self {
    let warning = report.persist_error.as_ref().map(|e| e.to_string());
    Self {
      success: true,
      prediction: prediction.label,
      confidence: prediction.confidence_display(),
      confidence_percent: prediction.confidence_percent,
      report_id: report.record.report_id,
      report_persisted: warning.is_none(),
      warning,
      report: report.bytes,
    }
  }
}

/// 取输入中的第一个样本完成一次分类并生成报告
pub struct ClassifyTask {
  source_filename: String,
}

impl ClassifyTask {
  pub fn new(source_filename: impl Into<String>) -> Self {
    Self {
      source_filename: source_filename.into(),
    }
  }
}

impl<I, M, O> Task<I, M, O> for ClassifyTask
where
  I: IntoIterator<Item = FeatureSample>,
  M: Model<Input = FeatureSample, Output = PredictionResult>,
  O: Render<str, PredictionResult, Artifact = GeneratedReport>,
  ProcessingError: From<M::Error> + From<O::Error>,
{
  type Output = ClassifyResponse;
  type Error = ProcessingError;

  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    let sample = input
      .into_iter()
      .next()
      .ok_or(ProcessingError::NoSample)?;
    info!("样本 {} 获取成功，开始推理...", self.source_filename);

    let now = std::time::Instant::now();
    let prediction = model.infer(&sample)?;
    info!(
      "推理完成，耗时: {:.2?}, 结果: {} ({})",
      now.elapsed(),
      prediction.label,
      prediction.confidence_display()
    );

    let report = output.render_result(&self.source_filename, &prediction)?;
    if report.is_persisted() {
      info!("报告 {} 已生成", report.record.report_id);
    } else {
      warn!("报告 {} 未能保存, 之后可能无法下载", report.record.report_id);
    }

    Ok(ClassifyResponse::new(&prediction, report))
  }
}

/// 从序列化的样本字节完成一次分类
pub fn classify<M, O>(
  raw: &[u8],
  source_filename: &str,
  model: M,
  output: O,
) -> Result<ClassifyResponse, ProcessingError>
where
  M: Model<Input = FeatureSample, Output = PredictionResult>,
  O: Render<str, PredictionResult, Artifact = GeneratedReport>,
  ProcessingError: From<M::Error> + From<O::Error>,
{
  let sample = FeatureSample::from_slice(raw)?;
  ClassifyTask::new(source_filename).run_task(std::iter::once(sample), model, output)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    model::{BirdDroneClassifier, InferenceContext, ScalerState},
    output::{
      MemoryReportStore, ReportBuilder, ReportFallback, ReportStore, ReportStoreError, Reporter,
      report::tests::{at, contains},
    },
  };
  use std::path::PathBuf;

  fn context(probability: f32) -> InferenceContext {
    let classifier = BirdDroneClassifier::with_constant_output(10, probability);
    InferenceContext::new(ScalerState::identity(10), classifier).unwrap()
  }

  fn reporter() -> Reporter<MemoryReportStore, crate::output::FixedClock> {
    Reporter::with_builder(
      ReportBuilder::default().with_clock(at(2024, 1, 1, 0, 0, 0)),
      MemoryReportStore::new(),
    )
  }

  struct BrokenStore;

  impl ReportStore for BrokenStore {
    fn get(&self, _: &str) -> Result<Option<Vec<u8>>, ReportStoreError> {
      Ok(None)
    }

    fn put(&self, report_id: &str, _: &[u8]) -> Result<PathBuf, ReportStoreError> {
      Err(ReportStoreError::WriteError {
        path: PathBuf::from(report_id),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
      })
    }
  }

  #[test]
  fn zeros_sample_classified_as_bird_with_report() {
    let model = context(0.2);
    let reporter = reporter();

    let response = classify(b"[0, 0, 0, 0, 0, 0, 0, 0, 0, 0]", "zeros.pkl", &model, &reporter)
      .unwrap();
    assert!(response.success);
    assert_eq!(response.prediction, Label::Bird);
    assert_eq!(response.confidence, "80.00%");
    assert_eq!(response.report_id, "RPT-2024-01-01-000000");
    assert!(response.report_persisted);

    let stored = reporter.store().get(&response.report_id).unwrap().unwrap();
    assert_eq!(stored, response.report);
    assert!(contains(&stored, "Analyzed File: zeros.pkl"));
    assert!(contains(&stored, "Prediction: Bird"));
  }

  #[test]
  fn wrong_width_fails_without_writing_a_report() {
    let model = context(0.2);
    let reporter = reporter();

    let err = classify(b"[1, 2, 3, 4, 5, 6, 7]", "short.pkl", &model, &reporter).unwrap_err();
    assert!(matches!(
      err,
      ProcessingError::Shape(ShapeError::FeatureMismatch {
        expected: 10,
        actual: 7
      })
    ));
    assert!(reporter.store().is_empty());
  }

  #[test]
  fn unparsable_sample_is_an_input_format_error() {
    let model = context(0.2);
    let reporter = reporter();

    let err = classify(b"not json", "junk.pkl", &model, &reporter).unwrap_err();
    assert!(matches!(err, ProcessingError::InputFormat(_)));
    assert!(err.envelope()["error"]
      .as_str()
      .unwrap()
      .starts_with("Error processing file:"));
    assert!(reporter.store().is_empty());
  }

  #[test]
  fn storage_failure_is_flagged_not_swallowed() {
    let model = context(0.9);
    let reporter = Reporter::with_builder(
      ReportBuilder::default().with_clock(at(2024, 1, 1, 0, 0, 0)),
      BrokenStore,
    );

    let response = classify(b"[0,0,0,0,0,0,0,0,0,0]", "a.pkl", &model, &reporter).unwrap();
    assert_eq!(response.prediction, Label::Drone);
    assert!(!response.report_persisted);
    assert!(response.warning.as_deref().unwrap().contains("read-only"));
    assert!(!response.report.is_empty());

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["report_persisted"], false);
    assert_eq!(json["prediction"], "Drone");
    assert!(json.get("report").is_none());
  }

  #[test]
  fn empty_input_is_refused() {
    let model = context(0.2);
    let reporter = reporter();
    let err = ClassifyTask::new("none.pkl")
      .run_task(Vec::<FeatureSample>::new(), &model, &reporter)
      .unwrap_err();
    assert!(matches!(err, ProcessingError::NoSample));
  }

  #[test]
  fn classify_then_fetch_returns_same_artifact() {
    let model = context(0.2);
    let reporter = reporter();
    let response = classify(b"[0,0,0,0,0,0,0,0,0,0]", "zeros.pkl", &model, &reporter).unwrap();

    let fetched = reporter
      .fetch(&response.report_id, &ReportFallback::default())
      .unwrap();
    assert!(!fetched.regenerated);
    assert_eq!(fetched.bytes, response.report);
  }
}
