use std::path::{Path, PathBuf};

use rr_config::DumpKind;

use crate::pipeline::RunOutcome;

fn sanitize_file_name(name: &str) -> String {
  name
    .chars()
    .map(|ch| {
      if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
        ch
      } else {
        '_'
      }
    })
    .collect()
}

/// File name of one dump of a unit, e.g. `main.mir-opt.txt`.
pub fn dump_file_name(
  unit: &str,
  kind: DumpKind,
) -> String {
  let suffix = match kind {
    DumpKind::Hir => "hir",
    DumpKind::Mir => "mir",
    DumpKind::MirOpt => "mir-opt",
    DumpKind::R => "r",
  };
  format!("{}.{}.txt", sanitize_file_name(unit), suffix)
}

/// Writes `<unit>.R` for every compiled unit plus its dumps into `dir`,
/// creating it if needed. Returns the written paths.
pub fn write_outputs(
  outcome: &RunOutcome,
  dir: &Path,
) -> std::io::Result<Vec<PathBuf>> {
  std::fs::create_dir_all(dir)?;

  let mut written = Vec::new();
  for unit in &outcome.units {
    if let Some(source) = &unit.r_source {
      let path = dir.join(format!("{}.R", sanitize_file_name(&unit.name)));
      std::fs::write(&path, source)?;
      written.push(path);
    }

    for (kind, content) in &unit.dumps {
      let path = dir.join(dump_file_name(&unit.name, *kind));
      std::fs::write(&path, content)?;
      written.push(path);
    }
  }
  Ok(written)
}
