// 该文件是 Shanying （山鹰） 项目的一部分。
// src/bin/fetch_report.rs - 报告下载
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use url::Url;

use shanying::{
  FromUrl,
  output::{DirectoryReportStore, ReportFallback, Reporter},
};
use tracing::{info, warn};

/// 按编号取回报告，缺失时按给定参数重新生成
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 报告目录，如 folder:///path/reports
  #[arg(long, value_name = "REPORTS")]
  pub reports: Url,
  /// 报告编号
  #[arg(long, value_name = "ID")]
  pub report_id: String,
  /// 重新生成时使用的源文件名
  #[arg(long)]
  pub filename: Option<String>,
  /// 重新生成时使用的预测标签
  #[arg(long)]
  pub prediction: Option<String>,
  /// 重新生成时使用的置信度，如 91.50%
  #[arg(long)]
  pub confidence: Option<String>,
  /// 保存目录，默认为当前目录
  #[arg(long, value_name = "DIR", default_value = ".")]
  pub output: PathBuf,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let reporter = Reporter::new(DirectoryReportStore::from_url(&args.reports)?);
  let fallback = ReportFallback {
    filename: args.filename,
    prediction: args.prediction,
    confidence: args.confidence,
  };

  let fetched = reporter.fetch(&args.report_id, &fallback)?;
  if fetched.regenerated {
    warn!(
      "请求的报告 {} 不存在, 文件内容中的编号为 {}",
      fetched.requested_id, fetched.content_id
    );
  }
  if let Some(e) = &fetched.persist_error {
    warn!("重新生成的报告未能保存: {}", e);
  }

  let path = args.output.join(&fetched.download_name);
  std::fs::write(&path, &fetched.bytes)?;
  info!("报告已写入: {}", path.display());

  Ok(())
}
