#![forbid(unsafe_code)]

//! Scripted scroll session.
//!
//! Scrolls a [`VirtualViewport`] down in fixed steps, back to the top, and
//! optionally jumps to a page, feeding every sample through a
//! [`ScrollProgram`] backed by a slow [`SyntheticSource`]. One [`StepLine`]
//! is recorded per sample.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use fscroll_core::{ConfigError, OriginAnchor, ScrollConfig, VirtualViewport};
use fscroll_engine::{ScrollEngine, SyntheticSource, TracingObserver, WindowSummary};
use fscroll_runtime::{RuntimeError, ScrollProgram};
use serde::Serialize;

use crate::cli::Opts;

const SETTLE: Duration = Duration::from_secs(10);

/// One recorded step.
#[derive(Debug, Clone, Serialize)]
pub struct StepLine {
    /// Step number within the session.
    pub step: usize,
    /// What the step did: `mount`, `down`, `top`, `jump` or `settle`.
    pub action: &'static str,
    /// Viewport scroll offset after the step.
    pub offset: f64,
    /// Fetches still running when the line was recorded.
    pub in_flight: usize,
    /// Window state after the step.
    #[serde(flatten)]
    pub summary: WindowSummary,
}

impl fmt::Display for StepLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = self
            .summary
            .live_span
            .as_ref()
            .map_or_else(|| "-".to_string(), |s| format!("{}..{}", s.start, s.end));
        write!(
            f,
            "{:>4} {:<6} offset {:>9.1}  len {:>5}  live {:>3}  span {:>11}  page {:>4}  in-flight {}",
            self.step,
            self.action,
            self.offset,
            self.summary.total,
            self.summary.live,
            span,
            self.summary.current_page,
            self.in_flight,
        )
    }
}

/// Everything the session produced.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// One line per recorded step, in order.
    pub lines: Vec<StepLine>,
    /// Fetch workers spawned over the session.
    pub fetches: u64,
    /// Snapshots delivered to the observer.
    pub snapshots: u64,
    /// Whether every fetch finished before the settle timeout.
    pub settled: bool,
}

/// Errors that abort the demo.
#[derive(Debug)]
pub enum DemoError {
    /// Configuration could not be loaded.
    Config(ConfigError),
    /// The runtime stopped with an error.
    Runtime(RuntimeError),
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration error: {e}"),
            Self::Runtime(e) => write!(f, "runtime error: {e}"),
        }
    }
}

impl std::error::Error for DemoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Runtime(e) => Some(e),
        }
    }
}

impl From<ConfigError> for DemoError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<RuntimeError> for DemoError {
    fn from(e: RuntimeError) -> Self {
        Self::Runtime(e)
    }
}

/// Load the configuration from `path` if given, else from the environment.
pub fn load_config(path: Option<&Path>) -> Result<ScrollConfig, ConfigError> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration file");
            ScrollConfig::from_file(path)
        }
        None => ScrollConfig::from_env(),
    }
}

/// Run the scripted session, calling `emit` for every step as it happens.
pub fn run<F>(config: ScrollConfig, opts: &Opts, mut emit: F) -> Result<SessionReport, DemoError>
where
    F: FnMut(&StepLine),
{
    let source = SyntheticSource::new().with_latency(Duration::from_millis(opts.latency_ms));
    let engine = ScrollEngine::with_observer(config, TracingObserver::new());
    let mut program = ScrollProgram::new(engine, source);
    let handle = program.handle();

    let mut viewport = VirtualViewport::new(config.item_height(), opts.viewport);
    let anchor = OriginAnchor::capture(&viewport);
    let mut lines = Vec::new();
    let mut record = |program: &ScrollProgram<SyntheticSource, TracingObserver>,
                      step: usize,
                      action: &'static str,
                      offset: f64| {
        let line = StepLine {
            step,
            action,
            offset,
            in_flight: program.in_flight(),
            summary: program.engine().summary(),
        };
        emit(&line);
        lines.push(line);
    };

    program.run_until_idle(SETTLE)?;
    record(&program, 0, "mount", viewport.scroll_offset());

    for step in 1..=opts.steps {
        viewport.set_item_count(program.engine().store().len());
        viewport.scroll_by(opts.step);
        handle.scroll(anchor.sample(&viewport))?;
        program.process_pending()?;
        record(&program, step, "down", viewport.scroll_offset());
    }

    let mut step = opts.steps + 1;
    viewport.set_item_count(program.engine().store().len());
    viewport.scroll_to(0.0);
    handle.scroll(anchor.sample(&viewport))?;
    program.process_pending()?;
    record(&program, step, "top", viewport.scroll_offset());

    if let Some(page) = opts.jump {
        step += 1;
        handle.load_page(page)?;
        program.process_pending()?;
        viewport.set_item_count(program.engine().store().len());
        viewport.scroll_to_item(config.page_start(page));
        record(&program, step, "jump", viewport.scroll_offset());
    }

    let settled = program.run_until_idle(SETTLE)?;
    if !settled {
        tracing::warn!(in_flight = program.in_flight(), "fetches still running at exit");
    }
    record(&program, step + 1, "settle", viewport.scroll_offset());
    program.shutdown();

    Ok(SessionReport {
        lines,
        fetches: program.spawned(),
        snapshots: program.engine().observer().snapshots(),
        settled,
    })
}
