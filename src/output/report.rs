// 该文件是 Shanying （山鹰） 项目的一部分。
// src/output/report.rs - 分类报告构建
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use crate::{
  model::{Label, WithLabel},
  output::pdf::{Block, Document, DocumentRenderer, PdfRenderer},
};

pub const REPORT_TITLE: &str = "Bird/Drone Classification Report";
pub const REPORT_ID_PREFIX: &str = "RPT-";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const NOT_AVAILABLE: &str = "Not available";

pub const BIRD_RECOMMENDATION: &str =
  "The object detected is classified as a bird. No further action needed for airspace security.";
pub const DRONE_RECOMMENDATION: &str = "The object detected is classified as a drone. \
  Consider monitoring this object as it may represent an unauthorized entry in restricted airspace.";

pub trait Clock {
  fn now(&self) -> NaiveDateTime;
}

/// 本地墙上时间
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
  fn now(&self) -> NaiveDateTime {
    Local::now().naive_local()
  }
}

/// 固定时间，报告编号因此可预知
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
  fn now(&self) -> NaiveDateTime {
    self.0
  }
}

/// "2024-01-01 00:00:00" -> "RPT-2024-01-01-000000"
pub fn report_id_for(timestamp: &str) -> String {
  format!(
    "{}{}",
    REPORT_ID_PREFIX,
    timestamp.replace(' ', "-").replace(':', "")
  )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRecord {
  pub report_id: String,
  pub timestamp: String,
  pub source_filename: String,
  pub prediction: String,
  pub confidence_display: String,
}

impl ReportRecord {
  /// 只有 "Bird" 得到鸟类建议，其余一律按无人机处理
  pub fn recommendation(&self) -> &'static str {
    match Label::from_label_str(&self.prediction) {
      Some(Label::Bird) => BIRD_RECOMMENDATION,
      _ => DRONE_RECOMMENDATION,
    }
  }

  pub fn to_document(&self) -> Document {
    Document::new(REPORT_TITLE)
      .push(Block::Title(REPORT_TITLE.to_string()))
      .push(Block::Line(format!("Report ID: {}", self.report_id)))
      .push(Block::Line(format!("Date: {}", self.timestamp)))
      .push(Block::Line(format!("Analyzed File: {}", self.source_filename)))
      .push(Block::Blank)
      .push(Block::Heading("Classification Results".to_string()))
      .push(Block::Line(format!("Prediction: {}", self.prediction)))
      .push(Block::Line(format!(
        "Confidence Score: {}",
        self.confidence_display
      )))
      .push(Block::Heading("Recommendations".to_string()))
      .push(Block::Paragraph(self.recommendation().to_string()))
  }
}

pub struct ReportBuilder<C = LocalClock, R = PdfRenderer> {
  clock: C,
  renderer: R,
}

impl Default for ReportBuilder {
  fn default() -> Self {
    Self {
      clock: LocalClock,
      renderer: PdfRenderer,
    }
  }
}

impl<C: Clock, R: DocumentRenderer> ReportBuilder<C, R> {
  pub fn new(clock: C, renderer: R) -> Self {
    Self { clock, renderer }
  }

  pub fn with_clock<C2: Clock>(self, clock: C2) -> ReportBuilder<C2, R> {
    ReportBuilder {
      clock,
      renderer: self.renderer,
    }
  }

  pub fn extension(&self) -> &'static str {
    self.renderer.extension()
  }

  pub fn record(
    &self,
    prediction: &str,
    source_filename: &str,
    confidence_display: &str,
  ) -> ReportRecord {
    let timestamp = self.clock.now().format(TIMESTAMP_FORMAT).to_string();
    let confidence_display = if confidence_display.is_empty() {
      NOT_AVAILABLE
    } else {
      confidence_display
    };

    ReportRecord {
      report_id: report_id_for(&timestamp),
      timestamp,
      source_filename: source_filename.to_string(),
      prediction: prediction.to_string(),
      confidence_display: confidence_display.to_string(),
    }
  }

  pub fn build(
    &self,
    prediction: &str,
    source_filename: &str,
    confidence_display: &str,
  ) -> (ReportRecord, Vec<u8>) {
    let record = self.record(prediction, source_filename, confidence_display);
    let bytes = self.renderer.render(&record.to_document());
    debug!("报告 {} 渲染完成: {} 字节", record.report_id, bytes.len());
    (record, bytes)
  }
}
