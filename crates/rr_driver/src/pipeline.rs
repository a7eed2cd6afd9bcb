use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use colored::*;
use parking_lot::Mutex;
use rr_analyzer::build_hir;
use rr_codegen_r::emit_r;
use rr_config::{DebugTrace, DumpKind, RrConfig};
use rr_diagnostics::{
  DiagnosticSink,
  diagnostic_report::{Diagnostic, Severity},
  message::DiagnosticMessage,
};
use rr_hir::display::HIRPrinter;
use rr_log::{log_dbg, phase_log, phase_ok, phase_warn, trace_dbg};
use rr_mir::{MirProgram, display::MirPrinter, lower_hir, verify_program};
use rr_tachyon::{Tachyon, TachyonError};
use rr_type::{file::SourceMap, symbol::SymbolTable};

use crate::unit::{CompilationUnit, Stage, UnitResult, UnitStatus};

/// Everything a run produced, units in input order.
#[derive(Debug, Clone)]
pub struct RunOutcome {
  pub units: Vec<UnitResult>,
  /// Each unit's diagnostics are contiguous and in program order; units appear
  /// in completion order.
  pub diagnostics: Vec<Diagnostic>,
  /// Set when a fatal error or the error budget stopped the run early.
  pub aborted: bool,
}

impl RunOutcome {
  pub fn succeeded(&self) -> bool {
    !self.aborted && self.units.iter().all(UnitResult::is_compiled)
  }

  pub fn unit(
    &self,
    name: &str,
  ) -> Option<&UnitResult> {
    self.units.iter().find(|unit| unit.name == name)
  }

  pub fn error_count(&self) -> usize {
    self.diagnostics.iter().filter(|d| d.is_error()).count()
  }

  /// Prints the diagnostics and a one-line summary to stderr.
  pub fn render(
    &self,
    sm: &SourceMap,
  ) {
    rr_diagnostics::render_batch(&self.diagnostics, sm);

    let failed = self.units.iter().filter(|unit| !unit.is_compiled()).count();
    if failed > 0 {
      eprintln!(
        "{} {} of {} units did not compile ({} errors)",
        "Error:".red().bold(),
        failed,
        self.units.len(),
        self.error_count()
      );
    }
  }
}

/// Shared state of one run.
struct Run {
  sink: DiagnosticSink,
  abort: AtomicBool,
}

/// Compiles units with one configuration. The pass list is validated once,
/// when the driver is created.
#[derive(Debug)]
pub struct Driver {
  config: RrConfig,
  tachyon: Option<Tachyon>,
  workers: Option<usize>,
}

impl Driver {
  pub fn new(config: &RrConfig) -> Result<Self, TachyonError> {
    let tachyon = if config.optimize {
      Some(Tachyon::new(config)?)
    } else {
      None
    };

    Ok(Self {
      config: config.clone(),
      tachyon,
      workers: None,
    })
  }

  /// Caps the worker pool. Defaults to the available parallelism.
  pub fn with_workers(
    mut self,
    workers: usize,
  ) -> Self {
    self.workers = Some(workers.max(1));
    self
  }

  pub fn config(&self) -> &RrConfig {
    &self.config
  }

  pub fn compile_unit(
    &self,
    unit: &CompilationUnit,
  ) -> RunOutcome {
    self.compile_units(std::slice::from_ref(unit))
  }

  /// Compiles `units` on a pool of scoped worker threads.
  pub fn compile_units(
    &self,
    units: &[CompilationUnit],
  ) -> RunOutcome {
    let config = &self.config;
    let run = Run {
      sink: DiagnosticSink::new(),
      abort: AtomicBool::new(false),
    };

    let workers = self
      .workers
      .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
      .min(units.len())
      .max(1);
    log_dbg!(config, "compiling {} units on {} workers", units.len(), workers);

    let next = AtomicUsize::new(0);
    let results: Mutex<Vec<Option<UnitResult>>> = Mutex::new(vec![None; units.len()]);

    std::thread::scope(|scope| {
      for _ in 0..workers {
        scope.spawn(|| {
          loop {
            let index = next.fetch_add(1, Ordering::Relaxed);
            let Some(unit) = units.get(index) else {
              break;
            };
            let result = self.run_unit(unit, &run);
            results.lock()[index] = Some(result);
          }
        });
      }
    });

    let units: Vec<UnitResult> = results.into_inner().into_iter().flatten().collect();
    let skipped = units.iter().any(|u| matches!(u.status, UnitStatus::Skipped(_)));
    let aborted = run.abort.load(Ordering::SeqCst) || skipped;
    let outcome = RunOutcome {
      units,
      diagnostics: run.sink.into_diagnostics(),
      aborted,
    };

    let compiled = outcome.units.iter().filter(|u| u.is_compiled()).count();
    if outcome.succeeded() {
      phase_ok!(config, "Compiled {} units", compiled);
    } else {
      phase_warn!(config, "Compiled {} of {} units", compiled, outcome.units.len());
    }
    outcome
  }

  fn run_unit(
    &self,
    unit: &CompilationUnit,
    run: &Run,
  ) -> UnitResult {
    let mut result = UnitResult::new(&unit.name);
    let mut diagnostics = Vec::new();

    if let Err(status) = self.stages(unit, run, &mut result, &mut diagnostics) {
      result.status = status;
    }
    trace_dbg!(
      &self.config,
      DebugTrace::Driver,
      "{}: {:?} with {} diagnostics",
      unit.name,
      result.status,
      diagnostics.len()
    );

    if diagnostics.iter().any(|d| d.severity == Severity::Fatal) {
      run.abort.store(true, Ordering::SeqCst);
    }
    run.sink.push_batch(diagnostics);
    result
  }

  fn stages(
    &self,
    unit: &CompilationUnit,
    run: &Run,
    result: &mut UnitResult,
    diagnostics: &mut Vec<Diagnostic>,
  ) -> Result<(), UnitStatus> {
    let config = &self.config;

    self.checkpoint(run, &unit.name, Stage::Hir)?;
    phase_log!(config, "Building HIR... {}", unit.name);
    let hir = match build_hir(&unit.ast, SymbolTable::with_builtins()) {
      Ok(hir) => hir,
      Err(found) => {
        diagnostics.extend(found);
        return Err(UnitStatus::Failed(Stage::Hir));
      },
    };
    trace_dbg!(config, DebugTrace::Hir, "{}: {} HIR nodes", unit.name, hir.nodes.len());
    self.dump(result, DumpKind::Hir, || HIRPrinter::new(&hir).print());

    self.checkpoint(run, &unit.name, Stage::Mir)?;
    phase_log!(config, "Lowering to MIR... {}", unit.name);
    let lowering = match lower_hir(&hir) {
      Ok(lowering) => lowering,
      Err(error) => {
        diagnostics.push(DiagnosticMessage::from(error).report());
        return Err(UnitStatus::Failed(Stage::Mir));
      },
    };
    let mut program = lowering.program;
    diagnostics.extend(lowering.warnings);
    if let Err(errors) = verify_program(&program) {
      diagnostics.extend(errors.iter().map(|error| invariant(&program, error.function(), error.to_string())));
      return Err(UnitStatus::Failed(Stage::Mir));
    }
    trace_dbg!(
      config,
      DebugTrace::Mir,
      "{}: {} functions, {} instructions",
      unit.name,
      program.functions.len(),
      instruction_count(&program)
    );
    self.dump(result, DumpKind::Mir, || MirPrinter::new(&program).print());

    if let Some(tachyon) = &self.tachyon {
      self.checkpoint(run, &unit.name, Stage::Tachyon)?;
      phase_log!(config, "Optimizing... {}", unit.name);
      match tachyon.optimize_program(&mut program) {
        Ok(report) => {
          diagnostics.extend(report.warnings());
          result.tachyon = Some(report);
        },
        Err(error) => {
          diagnostics.push(DiagnosticMessage::from(error).report());
          return Err(UnitStatus::Failed(Stage::Tachyon));
        },
      }
      self.dump(result, DumpKind::MirOpt, || MirPrinter::new(&program).print());
    }

    self.checkpoint(run, &unit.name, Stage::Emit)?;
    phase_log!(config, "Emitting R... {}", unit.name);
    let source = match emit_r(&program, config) {
      Ok(source) => source,
      Err(error) => {
        diagnostics.push(DiagnosticMessage::from(error).report());
        return Err(UnitStatus::Failed(Stage::Emit));
      },
    };
    self.dump(result, DumpKind::R, || source.clone());
    result.r_source = Some(source);

    Ok(())
  }

  /// Stops the unit between stages once the run is aborting or the error
  /// budget is spent. A `max_errors` of 0 disables the budget.
  fn checkpoint(
    &self,
    run: &Run,
    unit: &str,
    stage: Stage,
  ) -> Result<(), UnitStatus> {
    let over_budget = self.config.max_errors > 0 && run.sink.error_count() >= self.config.max_errors;
    if run.abort.load(Ordering::SeqCst) || run.sink.has_fatal() || over_budget {
      trace_dbg!(&self.config, DebugTrace::Driver, "{}: stopped before {}", unit, stage);
      return Err(UnitStatus::Skipped(stage));
    }
    Ok(())
  }

  fn dump(
    &self,
    result: &mut UnitResult,
    kind: DumpKind,
    render: impl FnOnce() -> String,
  ) {
    if self.config.dump.contains(&kind) {
      result.dumps.insert(kind, render());
    }
  }
}

fn invariant(
  program: &MirProgram,
  function: &str,
  detail: String,
) -> Diagnostic {
  let span = program.function(function).map(|f| f.span.clone()).unwrap_or_default();
  DiagnosticMessage::LoweringInvariant {
    function: function.to_string(),
    detail,
    span,
  }
  .report()
}

fn instruction_count(program: &MirProgram) -> usize {
  program.functions.iter().map(|f| f.instruction_count()).sum()
}

/// Compiles one unit with a fresh driver.
pub fn compile_unit(
  config: &RrConfig,
  unit: &CompilationUnit,
) -> Result<RunOutcome, TachyonError> {
  Ok(Driver::new(config)?.compile_unit(unit))
}

/// Compiles independent units in parallel with a fresh driver.
pub fn compile_units(
  config: &RrConfig,
  units: &[CompilationUnit],
) -> Result<RunOutcome, TachyonError> {
  Ok(Driver::new(config)?.compile_units(units))
}
