use serde::{Deserialize, Serialize};

/// Intermediate artifacts a unit can hand back alongside its R output.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DumpKind {
  Hir,
  Mir,
  /// MIR after Tachyon.
  MirOpt,
  R,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugTrace {
  Hir,
  Mir,
  Tachyon,
  Codegen,
  Driver,
}

/// One entry of the ordered Tachyon pass list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSetting {
  pub name: String,
  #[serde(default = "default_enabled")]
  pub enabled: bool,
}

fn default_enabled() -> bool {
  true
}

impl PassSetting {
  pub fn new(
    name: &str,
    enabled: bool,
  ) -> Self {
    Self {
      name: name.to_string(),
      enabled,
    }
  }
}

pub const DEFAULT_PASSES: &[&str] = &["dominance", "const-prop", "dce", "cse", "branch-simplify"];
pub const DEFAULT_MAX_ITERATIONS: usize = 16;

/// Optimizer settings as supplied by the configuration loader.
///
/// ```toml
/// max_iterations = 8
/// verify_each_pass = true
///
/// [[passes]]
/// name = "const-prop"
///
/// [[passes]]
/// name = "cse"
/// enabled = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TachyonConfig {
  pub passes: Vec<PassSetting>,
  pub max_iterations: usize,
  pub verify_each_pass: bool,
}

impl Default for TachyonConfig {
  fn default() -> Self {
    Self {
      passes: DEFAULT_PASSES.iter().map(|name| PassSetting::new(name, true)).collect(),
      max_iterations: DEFAULT_MAX_ITERATIONS,
      verify_each_pass: false,
    }
  }
}

impl TachyonConfig {
  pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(text)
  }

  /// Names of the enabled passes, in configured order.
  pub fn enabled_passes(&self) -> Vec<&str> {
    self.passes.iter().filter(|p| p.enabled).map(|p| p.name.as_str()).collect()
  }

  pub fn with_pass_enabled(
    mut self,
    name: &str,
    enabled: bool,
  ) -> Self {
    match self.passes.iter_mut().find(|p| p.name == name) {
      Some(setting) => setting.enabled = enabled,
      None => self.passes.push(PassSetting::new(name, enabled)),
    }
    self
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrConfig {
  pub quiet: bool,
  pub verbose: u8,
  pub debug: bool,
  pub debug_trace: Vec<DebugTrace>,
  pub dump: Vec<DumpKind>,
  pub optimize: bool,
  /// Cumulative error count across all units after which remaining units stop
  /// between stages.
  pub max_errors: usize,
  pub tachyon: TachyonConfig,
}

impl Default for RrConfig {
  fn default() -> Self {
    Self {
      quiet: false,
      verbose: 0,
      debug: false,
      debug_trace: Vec::new(),
      dump: Vec::new(),
      optimize: true,
      max_errors: 64,
      tachyon: TachyonConfig::default(),
    }
  }
}

impl RrConfig {
  pub fn new_basic(
    debug: bool,
    debug_trace: Vec<DebugTrace>,
    quiet: bool,
    verbose: u8,
  ) -> Self {
    Self {
      debug,
      debug_trace,
      quiet,
      verbose,
      ..Self::default()
    }
  }

  pub fn quiet() -> Self {
    Self {
      quiet: true,
      ..Self::default()
    }
  }

  pub fn wants_dump(
    &self,
    kind: DumpKind,
  ) -> bool {
    self.dump.contains(&kind)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_pass_list_is_ordered() {
    let config = TachyonConfig::default();
    assert_eq!(config.enabled_passes(), DEFAULT_PASSES.to_vec());
    assert_eq!(config.max_iterations, 16);
  }

  #[test]
  fn parses_pass_list_from_toml() {
    let config = TachyonConfig::from_toml_str(
      r#"
max_iterations = 4
verify_each_pass = true

[[passes]]
name = "const-prop"

[[passes]]
name = "cse"
enabled = false
"#,
    )
    .unwrap();

    assert_eq!(config.max_iterations, 4);
    assert!(config.verify_each_pass);
    assert_eq!(config.passes, vec![PassSetting::new("const-prop", true), PassSetting::new("cse", false)]);
    assert_eq!(config.enabled_passes(), vec!["const-prop"]);
  }

  #[test]
  fn missing_fields_fall_back_to_defaults() {
    let config = TachyonConfig::from_toml_str("verify_each_pass = true").unwrap();
    assert_eq!(config.passes.len(), DEFAULT_PASSES.len());
    assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
  }

  #[test]
  fn rejects_malformed_payload() {
    assert!(TachyonConfig::from_toml_str("max_iterations = \"many\"").is_err());
  }
}
