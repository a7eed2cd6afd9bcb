use std::{collections::HashMap, path::PathBuf};

use crate::{BytePosition, Id, Store, span::Span};

pub type FileId = Id<SourceFile>;

#[derive(Default, Clone, Eq, PartialEq, Hash, Debug)]
pub struct SourceFile {
  pub path: PathBuf,
  pub text: String,
  pub line_starts: Vec<BytePosition>,
}

impl SourceFile {
  pub fn new(
    path: PathBuf,
    text: String,
  ) -> Self {
    let line_starts = compute_line_starts(&text);
    Self { path, text, line_starts }
  }

  #[inline]
  pub fn len_bytes(&self) -> u32 {
    self.text.len() as u32
  }
}

impl std::fmt::Display for SourceFile {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "(file path: {})", self.path.display())
  }
}

/// Source texts of the compilation units, used to turn spans into line/column pairs.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
  files: Store<SourceFile>,
  by_path: HashMap<PathBuf, FileId>,
}

impl SourceMap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_file<P: Into<PathBuf>>(
    &mut self,
    path: P,
    text: String,
  ) -> FileId {
    let path = path.into();

    if let Some(id) = self.by_path.get(&path) {
      return *id;
    }

    let id = self.files.alloc(SourceFile::new(path.clone(), text));
    self.by_path.insert(path, id);
    id
  }

  pub fn add_virtual(
    &mut self,
    label: &str,
    text: String,
  ) -> FileId {
    let path = PathBuf::from(format!("<{}>", label));
    self.files.alloc(SourceFile::new(path, text))
  }

  #[inline]
  pub fn get(
    &self,
    id: &FileId,
  ) -> Option<&SourceFile> {
    self.files.try_get(id)
  }

  pub fn lookup_by_path<P: AsRef<std::path::Path>>(
    &self,
    path: P,
  ) -> Option<FileId> {
    self.by_path.get(path.as_ref()).copied()
  }

  /// 1-based line and column of `pos`. Positions past the end clamp to the last line.
  pub fn line_col(
    &self,
    file: &FileId,
    pos: BytePosition,
  ) -> Option<(u32, u32)> {
    let f = self.get(file)?;
    let pos = BytePosition(pos.0.min(f.len_bytes()));
    let line = upper_bound_line(&f.line_starts, pos);
    let line_start = f.line_starts[line].0 as usize;
    let slice = &f.text.as_bytes()[line_start..pos.0 as usize];
    let col = unicode_column(slice);

    Some(((line as u32) + 1, (col as u32) + 1))
  }

  pub fn line_text(
    &self,
    file: &FileId,
    line: u32,
  ) -> Option<&str> {
    let f = self.get(file)?;
    f.text.lines().nth(line.checked_sub(1)? as usize)
  }

  pub fn slice(
    &self,
    span: &Span,
  ) -> Option<&str> {
    let f = self.get(&span.file)?;
    f.text.get(span.start.0 as usize..span.end.0 as usize)
  }
}

fn compute_line_starts(text: &str) -> Vec<BytePosition> {
  let mut v = Vec::with_capacity(128);
  v.push(BytePosition(0));

  for (i, b) in text.as_bytes().iter().enumerate() {
    if *b == b'\n' {
      v.push(BytePosition((i + 1) as u32));
    }
  }
  v
}

fn upper_bound_line(
  starts: &[BytePosition],
  pos: BytePosition,
) -> usize {
  let mut lo = 0usize;
  let mut hi = starts.len();
  while lo + 1 < hi {
    let mid = (lo + hi) / 2;
    if starts[mid].0 <= pos.0 { lo = mid } else { hi = mid }
  }
  lo
}

fn unicode_column(slice: &[u8]) -> usize {
  std::str::from_utf8(slice).map(|s| s.chars().count()).unwrap_or(slice.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn line_col_is_one_based() {
    let mut sm = SourceMap::new();
    let file = sm.add_file("unit.rr", "let x = 1;\nprint(x);\n".to_string());

    assert_eq!(sm.line_col(&file, BytePosition(0)), Some((1, 1)));
    assert_eq!(sm.line_col(&file, BytePosition(11)), Some((2, 1)));
    assert_eq!(sm.line_col(&file, BytePosition(17)), Some((2, 7)));
    assert_eq!(sm.line_text(&file, 2), Some("print(x);"));
  }

  #[test]
  fn unknown_file_has_no_location() {
    let sm = SourceMap::new();
    assert_eq!(sm.line_col(&FileId::new(3), BytePosition(0)), None);
  }
}
