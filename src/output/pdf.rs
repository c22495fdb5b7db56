// 该文件是 Shanying （山鹰） 项目的一部分。
// src/output/pdf.rs - 单页 PDF 文档渲染
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

use std::io::Write;

use tracing::debug;

// A4，单位为 pt
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 28.35;
const LINE_HEIGHT: f32 = 28.35;

const TITLE_FONT_SIZE: f32 = 16.0;
const HEADING_FONT_SIZE: f32 = 14.0;
const BODY_FONT_SIZE: f32 = 12.0;
// Helvetica 平均字宽（粗略估计，单位为字号）
const AVG_CHAR_WIDTH: f32 = 0.5;

/// 文档中的一块内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
  /// 居中粗体标题
  Title(String),
  Heading(String),
  Line(String),
  /// 自动换行的段落
  Paragraph(String),
  Blank,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
  pub title: String,
  pub blocks: Vec<Block>,
}

impl Document {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      blocks: Vec::new(),
    }
  }

  pub fn push(mut self, block: Block) -> Self {
    self.blocks.push(block);
    self
  }
}

/// 结构化文本进，渲染后的字节出
pub trait DocumentRenderer {
  fn render(&self, document: &Document) -> Vec<u8>;

  /// 保存时使用的文件扩展名
  fn extension(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

enum Font {
  Regular,
  Bold,
}

impl Font {
  fn resource(&self) -> &'static str {
    match self {
      Font::Regular => "F1",
      Font::Bold => "F2",
    }
  }
}

struct Page {
  content: Vec<u8>,
  cursor: f32,
}

impl Page {
  fn new() -> Self {
    Self {
      content: Vec::new(),
      cursor: PAGE_HEIGHT - MARGIN,
    }
  }

  fn text(&mut self, font: Font, size: f32, x: f32, text: &str) {
    let baseline = self.cursor - LINE_HEIGHT / 2.0 - size / 3.0;
    self.content.extend_from_slice(
      format!(
        "BT /{} {} Tf {:.2} {:.2} Td (",
        font.resource(),
        size,
        x,
        baseline
      )
      .as_bytes(),
    );
    self.content.extend(escape(text));
    self.content.extend_from_slice(b") Tj ET\n");
    self.cursor -= LINE_HEIGHT;
  }

  fn skip(&mut self) {
    self.cursor -= LINE_HEIGHT;
  }
}

impl DocumentRenderer for PdfRenderer {
  fn render(&self, document: &Document) -> Vec<u8> {
    let mut page = Page::new();
    let text_width = PAGE_WIDTH - 2.0 * MARGIN;

    for block in &document.blocks {
      match block {
        Block::Title(text) => {
          let width = text.chars().count() as f32 * TITLE_FONT_SIZE * AVG_CHAR_WIDTH;
          let x = MARGIN + ((text_width - width) / 2.0).max(0.0);
          page.text(Font::Bold, TITLE_FONT_SIZE, x, text);
        }
        Block::Heading(text) => page.text(Font::Bold, HEADING_FONT_SIZE, MARGIN, text),
        Block::Line(text) => page.text(Font::Regular, BODY_FONT_SIZE, MARGIN, text),
        Block::Paragraph(text) => {
          let per_line = (text_width / (BODY_FONT_SIZE * AVG_CHAR_WIDTH)) as usize;
          for line in wrap(text, per_line) {
            page.text(Font::Regular, BODY_FONT_SIZE, MARGIN, &line);
          }
        }
        Block::Blank => page.skip(),
      }
    }

    debug!("文档内容流大小: {} 字节", page.content.len());
    assemble(&document.title, &page.content)
  }

  fn extension(&self) -> &'static str {
    "pdf"
  }
}

/// 按空白切分，每行不超过 per_line 个字符（超长单词单独成行）
fn wrap(text: &str, per_line: usize) -> Vec<String> {
  let mut lines = Vec::new();
  let mut current = String::new();
  for word in text.split_whitespace() {
    if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > per_line {
      lines.push(std::mem::take(&mut current));
    }
    if !current.is_empty() {
      current.push(' ');
    }
    current.push_str(word);
  }
  if !current.is_empty() {
    lines.push(current);
  }
  lines
}

/// 转为 WinAnsi 字节并转义 PDF 字符串中的特殊字符
fn escape(text: &str) -> Vec<u8> {
  let mut out = Vec::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '(' | ')' | '\\' => {
        out.push(b'\\');
        out.push(c as u8);
      }
      '\r' | '\n' | '\t' => out.push(b' '),
      c if (c as u32) < 0x20 => {}
      c if (c as u32) <= 0xFF => out.push(c as u32 as u8),
      _ => out.push(b'?'),
    }
  }
  out
}

fn assemble(title: &str, content: &[u8]) -> Vec<u8> {
  let mut objects: Vec<Vec<u8>> = Vec::new();
  objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
  objects.push(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec());
  objects.push(
    format!(
      "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
       /Resources << /Font << /F1 4 0 R /F2 5 0 R >> >> /Contents 6 0 R >>",
      PAGE_WIDTH, PAGE_HEIGHT
    )
    .into_bytes(),
  );
  objects.push(
    b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec(),
  );
  objects.push(
    b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
      .to_vec(),
  );

  let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
  stream.extend_from_slice(content);
  stream.extend_from_slice(b"\nendstream");
  objects.push(stream);

  let mut info = b"<< /Title (".to_vec();
  info.extend(escape(title));
  info.extend_from_slice(b") /Producer (shanying) >>");
  objects.push(info);

  let mut out = b"%PDF-1.4\n".to_vec();
  let mut offsets = Vec::with_capacity(objects.len());
  for (index, body) in objects.iter().enumerate() {
    offsets.push(out.len());
    out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
    out.extend_from_slice(body);
    out.extend_from_slice(b"\nendobj\n");
  }

  let xref = out.len();
  // 写入 Vec 不会失败
  let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
  for offset in offsets {
    let _ = write!(out, "{:010} 00000 n \n", offset);
  }
  let _ = write!(
    out,
    "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
    objects.len() + 1,
    objects.len(),
    xref
  );
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
      .windows(needle.len())
      .any(|window| window == needle.as_bytes())
  }

  #[test]
  fn renders_every_block_as_text() {
    let document = Document::new("Report")
      .push(Block::Title("Report".into()))
      .push(Block::Line("File: x.pkl".into()))
      .push(Block::Blank)
      .push(Block::Heading("Results".into()))
      .push(Block::Paragraph("word ".repeat(60)));

    let bytes = PdfRenderer.render(&document);
    assert!(bytes.starts_with(b"%PDF-1.4\n"));
    assert!(bytes.ends_with(b"%%EOF\n"));
    assert!(contains(&bytes, "(File: x.pkl) Tj"));
    assert!(contains(&bytes, "/F2 14 Tf"));
    assert!(contains(&bytes, "/Title (Report)"));
  }

  #[test]
  fn xref_points_at_objects() {
    let bytes = PdfRenderer.render(&Document::new("t").push(Block::Line("a".into())));
    let text = String::from_utf8(bytes).unwrap();
    let startxref = text.rsplit("startxref\n").next().unwrap();
    let xref: usize = startxref.lines().next().unwrap().parse().unwrap();
    assert!(text[xref..].starts_with("xref\n0 8\n"));

    let first = text[xref..].lines().nth(3).unwrap();
    let offset: usize = first[..10].parse().unwrap();
    assert!(text[offset..].starts_with("1 0 obj"));
  }

  #[test]
  fn escapes_pdf_string_delimiters() {
    assert_eq!(escape(r"a(b)c\d"), br"a\(b\)c\\d".to_vec());
    assert_eq!(escape("é字"), vec![0xE9, b'?']);
    assert_eq!(escape("a\nb"), b"a b".to_vec());
  }

  #[test]
  fn wraps_long_paragraphs() {
    let lines = wrap("aaa bbb ccc ddd", 7);
    assert_eq!(lines, vec!["aaa bbb", "ccc ddd"]);
    assert_eq!(wrap("", 10), Vec::<String>::new());
  }
}
