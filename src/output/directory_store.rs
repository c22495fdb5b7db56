// 该文件是 Shanying （山鹰） 项目的一部分。
// src/output/directory_store.rs - 目录报告存储
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme,
  output::report_store::{ReportStore, ReportStoreError, validate_report_id},
};

pub const REPORT_EXTENSION: &str = "pdf";

/// 每个报告保存为 `<目录>/<报告编号>.pdf`
#[derive(Debug, Clone)]
pub struct DirectoryReportStore {
  directory: PathBuf,
}

impl FromUrlWithScheme for DirectoryReportStore {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryReportStore {
  type Error = ReportStoreError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(ReportStoreError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(DirectoryReportStore::new(uri.path()))
  }
}

impl DirectoryReportStore {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
    }
  }

  pub fn directory(&self) -> &PathBuf {
    &self.directory
  }

  pub fn report_path(&self, report_id: &str) -> PathBuf {
    self
      .directory
      .join(format!("{}.{}", report_id, REPORT_EXTENSION))
  }
}

impl ReportStore for DirectoryReportStore {
  fn get(&self, report_id: &str) -> Result<Option<Vec<u8>>, ReportStoreError> {
    validate_report_id(report_id)?;
    let path = self.report_path(report_id);
    match std::fs::read(&path) {
      Ok(bytes) => {
        debug!("读取报告: {}", path.display());
        Ok(Some(bytes))
      }
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(source) => Err(ReportStoreError::ReadError { path, source }),
    }
  }

  fn put(&self, report_id: &str, bytes: &[u8]) -> Result<PathBuf, ReportStoreError> {
    validate_report_id(report_id)?;
    let path = self.report_path(report_id);
    let write_error = |source| ReportStoreError::WriteError {
      path: path.clone(),
      source,
    };

    std::fs::create_dir_all(&self.directory).map_err(write_error)?;

    // 先写临时文件再整体替换，读者不会看到写了一半的报告
    let mut file = NamedTempFile::new_in(&self.directory).map_err(write_error)?;
    file.write_all(bytes).map_err(write_error)?;
    file.flush().map_err(write_error)?;
    file.persist(&path).map_err(|e| write_error(e.error))?;

    info!("保存报告到文件: {}", path.display());
    Ok(path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn put_then_get_returns_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirectoryReportStore::new(dir.path().join("reports"));
    let bytes = b"%PDF-1.4\nsome report\n%%EOF\n";

    let path = store.put("RPT-2024-01-01-000000", bytes).unwrap();
    assert_eq!(
      path,
      dir.path().join("reports").join("RPT-2024-01-01-000000.pdf")
    );
    assert_eq!(
      store.get("RPT-2024-01-01-000000").unwrap().as_deref(),
      Some(&bytes[..])
    );
  }

  #[test]
  fn unknown_id_is_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirectoryReportStore::new(dir.path());
    assert!(store.get("RPT-2024-01-01-000000").unwrap().is_none());
  }

  #[test]
  fn rewrite_replaces_whole_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirectoryReportStore::new(dir.path());
    store.put("RPT-1", b"a much longer first version").unwrap();
    store.put("RPT-1", b"short").unwrap();
    assert_eq!(store.get("RPT-1").unwrap().as_deref(), Some(&b"short"[..]));

    let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 1);
  }

  #[test]
  fn unwritable_directory_is_a_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    let store = DirectoryReportStore::new(&blocker);

    assert!(matches!(
      store.put("RPT-1", b"bytes"),
      Err(ReportStoreError::WriteError { .. })
    ));
  }

  #[test]
  fn regenerated_report_is_filed_under_new_id() {
    use crate::output::{
      ReportBuilder, ReportFallback, Reporter,
      report::tests::{at, contains},
    };

    let dir = tempfile::tempdir().unwrap();
    let reporter = Reporter::with_builder(
      ReportBuilder::default().with_clock(at(2024, 6, 2, 10, 11, 12)),
      DirectoryReportStore::new(dir.path()),
    );
    let fallback = ReportFallback {
      filename: Some("x.pkl".to_string()),
      prediction: Some("Drone".to_string()),
      confidence: Some("91.50%".to_string()),
    };

    let fetched = reporter.fetch("RPT-2024-01-01-000000", &fallback).unwrap();
    assert_eq!(
      fetched.download_name,
      "classification_report_RPT-2024-01-01-000000.pdf"
    );
    assert!(!dir.path().join("RPT-2024-01-01-000000.pdf").exists());

    let filed = std::fs::read(dir.path().join("RPT-2024-06-02-101112.pdf")).unwrap();
    assert_eq!(filed, fetched.bytes);
    assert!(contains(&filed, "Report ID: RPT-2024-06-02-101112"));
  }

  #[test]
  fn from_url_uses_folder_scheme() {
    let store = DirectoryReportStore::from_url(&url::Url::parse("folder:///srv/reports").unwrap())
      .unwrap();
    assert_eq!(
      store.report_path("RPT-1"),
      PathBuf::from("/srv/reports/RPT-1.pdf")
    );
    assert!(DirectoryReportStore::from_url(&url::Url::parse("image:///x").unwrap()).is_err());
  }
}
