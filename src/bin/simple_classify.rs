// 该文件是 Shanying （山鹰） 项目的一部分。
// src/bin/simple_classify.rs - 单样本分类
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::Result;
use clap::Parser;
use url::Url;

use shanying::{
  FromUrl,
  input::SampleFileInput,
  model::ClassifierBuilder,
  output::{DirectoryReportStore, Reporter},
  task::{ClassifyTask, Task},
};
use tracing::{error, info};

/// Shanying 分类参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型检查点，如 mlp:///path/model.json?scaler=/path/scaler.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 样本文件，如 sample:///path/sample.json
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 报告目录，如 folder:///path/reports
  #[arg(long, value_name = "REPORTS")]
  pub reports: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("报告目录: {}", args.reports);

  let model = ClassifierBuilder::from_url(&args.model)?.build()?;
  let input = SampleFileInput::from_url(&args.input)?;
  let reporter = Reporter::new(DirectoryReportStore::from_url(&args.reports)?);

  let task = ClassifyTask::new(input.filename());
  match task.run_task(input, &model, &reporter) {
    Ok(response) => {
      println!("{}", serde_json::to_string_pretty(&response)?);
      Ok(())
    }
    Err(e) => {
      error!("分类失败: {}", e);
      println!("{}", e.envelope());
      Err(e.into())
    }
  }
}
