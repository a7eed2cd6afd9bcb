use rr_config::{DebugTrace, RrConfig};
use rr_log::{log_dbg, trace_dbg};
use rr_mir::{FunctionMir, MirProgram, verify_function};

use crate::{
  AnalysisCache, FunctionReport, Pass, TachyonError, TachyonReport,
  passes::create_pass,
};

/// The Tachyon pass manager.
///
/// Built once per run from the configured pass list; validates and orders
/// the list up front, then drives each function to a fixpoint.
pub struct Tachyon {
  passes: Vec<Box<dyn Pass>>,
  max_iterations: usize,
  verify_each_pass: bool,
  config: RrConfig,
}

impl std::fmt::Debug for Tachyon {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    f.debug_struct("Tachyon")
      .field("passes", &self.pass_names())
      .field("max_iterations", &self.max_iterations)
      .field("verify_each_pass", &self.verify_each_pass)
      .finish()
  }
}

impl Tachyon {
  pub fn new(config: &RrConfig) -> Result<Self, TachyonError> {
    let settings = &config.tachyon;

    let mut passes: Vec<Box<dyn Pass>> = Vec::new();
    for name in settings.enabled_passes() {
      let pass = create_pass(name).ok_or_else(|| TachyonError::UnknownPass(name.to_string()))?;
      if passes.iter().all(|p| p.name() != pass.name()) {
        passes.push(pass);
      }
    }

    let passes = schedule(passes)?;
    log_dbg!(
      config,
      "tachyon schedule: {}",
      passes.iter().map(|p| p.name()).collect::<Vec<_>>().join(", ")
    );

    Ok(Self {
      passes,
      max_iterations: settings.max_iterations.max(1),
      verify_each_pass: settings.verify_each_pass,
      config: config.clone(),
    })
  }

  /// Scheduled pass names, in execution order.
  pub fn pass_names(&self) -> Vec<&'static str> {
    self.passes.iter().map(|p| p.name()).collect()
  }

  pub fn optimize_program(
    &self,
    program: &mut MirProgram,
  ) -> Result<TachyonReport, TachyonError> {
    let mut report = TachyonReport::default();
    for function in &mut program.functions {
      report.functions.push(self.optimize_function(function)?);
    }

    if !report.functions.is_empty() {
      log_dbg!(&self.config, "tachyon summary\n{}", report.render());
    }
    Ok(report)
  }

  pub fn optimize_function(
    &self,
    function: &mut FunctionMir,
  ) -> Result<FunctionReport, TachyonError> {
    let mut report = FunctionReport::new(
      function.name.clone(),
      function.span.clone(),
      function.instruction_count(),
      function.live_blocks().count(),
    );
    let mut analyses = AnalysisCache::new();

    while report.iterations < self.max_iterations {
      report.iterations += 1;
      let mut changed = false;

      for pass in &self.passes {
        self.ensure_analyses(pass.as_ref(), function, &mut analyses)?;
        if !pass.run(function, &mut analyses)? {
          continue;
        }

        changed = true;
        report.record(pass.name());
        for analysis in pass.descriptor().invalidates {
          analyses.invalidate(*analysis);
        }
        trace_dbg!(
          &self.config,
          DebugTrace::Tachyon,
          "{} changed '{}' in iteration {}",
          pass.name(),
          function.name,
          report.iterations
        );

        if self.verify_each_pass {
          check(pass.name(), function)?;
        }
      }

      if !changed {
        report.converged = true;
        break;
      }
    }

    report.instructions_after = function.instruction_count();
    report.blocks_after = function.live_blocks().count();
    Ok(report)
  }

  /// Runs the providers of every analysis `pass` needs that is not current.
  fn ensure_analyses(
    &self,
    pass: &dyn Pass,
    function: &mut FunctionMir,
    analyses: &mut AnalysisCache,
  ) -> Result<(), TachyonError> {
    for analysis in pass.descriptor().requires {
      if analyses.is_valid(*analysis) {
        continue;
      }
      let provider = self
        .passes
        .iter()
        .find(|p| p.descriptor().provides.contains(analysis))
        .ok_or_else(|| TachyonError::MissingAnalysis {
          pass: pass.name().to_string(),
          analysis: analysis.name().to_string(),
        })?;
      provider.run(function, analyses)?;
    }
    Ok(())
  }
}

fn check(
  pass: &str,
  function: &FunctionMir,
) -> Result<(), TachyonError> {
  let Err(errors) = verify_function(function) else {
    return Ok(());
  };
  let Some(first) = errors.first() else {
    return Ok(());
  };

  Err(TachyonError::CfgInvariant {
    pass: pass.to_string(),
    function: function.name.clone(),
    block: first.block().map(|b| b.index()),
    detail: first.to_string(),
    span: function.span.clone(),
  })
}

/// Orders the enabled passes so providers precede consumers and every
/// `runs_after` constraint holds. Among passes free to run, the configured
/// order wins.
pub fn schedule(passes: Vec<Box<dyn Pass>>) -> Result<Vec<Box<dyn Pass>>, TachyonError> {
  let count = passes.len();
  let mut edges: Vec<Vec<usize>> = vec![Vec::new(); count];
  let mut indegree = vec![0usize; count];

  for (consumer, pass) in passes.iter().enumerate() {
    let descriptor = pass.descriptor();

    for analysis in descriptor.requires {
      let providers: Vec<usize> = passes
        .iter()
        .enumerate()
        .filter(|(i, p)| *i != consumer && p.descriptor().provides.contains(analysis))
        .map(|(i, _)| i)
        .collect();
      if providers.is_empty() {
        return Err(TachyonError::MissingAnalysis {
          pass: descriptor.name.to_string(),
          analysis: analysis.name().to_string(),
        });
      }
      for provider in providers {
        edges[provider].push(consumer);
        indegree[consumer] += 1;
      }
    }

    for before in descriptor.runs_after {
      if let Some(position) = passes.iter().position(|p| p.name() == *before) {
        edges[position].push(consumer);
        indegree[consumer] += 1;
      }
    }
  }

  let mut order = Vec::with_capacity(count);
  let mut placed = vec![false; count];
  while order.len() < count {
    let Some(next) = (0..count).find(|&i| !placed[i] && indegree[i] == 0) else {
      let stuck = (0..count)
        .filter(|&i| !placed[i])
        .map(|i| passes[i].name().to_string())
        .collect();
      return Err(TachyonError::ScheduleCycle(stuck));
    };
    placed[next] = true;
    order.push(next);
    for &consumer in &edges[next] {
      indegree[consumer] -= 1;
    }
  }

  let mut slots: Vec<Option<Box<dyn Pass>>> = passes.into_iter().map(Some).collect();
  Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}
