//! The property runner: iterate, detect failures, shrink, report.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

use rand::RngCore;

use crate::error::{ConfigError, GenError};
use crate::lift::IntoGen;
use crate::seed::Seed;
use crate::tree::LazyTree;

/// Configuration for a property run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Reproducibility seed; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Generation size of the first run
    pub initial_size: usize,
    /// Number of successful runs after which the property passes
    pub max_runs: usize,
    /// Wall-clock budget for the whole run, checked between iterations
    pub max_run_time: Option<Duration>,
    /// Bound on property evaluations during the shrinking search
    pub max_shrinking_steps: usize,
    /// Cap on size growth; unbounded when absent
    pub max_generation_size: Option<usize>,
    /// Print shrink progress to stderr
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            seed: None,
            initial_size: 1,
            max_runs: 100,
            max_run_time: None,
            max_shrinking_steps: 100,
            max_generation_size: None,
            verbose: false,
        }
    }
}

impl Config {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_runs == 0 {
            return Err(ConfigError::InvalidMaxRuns(self.max_runs));
        }
        Ok(())
    }

    /// Set the reproducibility seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the number of successful runs required.
    pub fn with_max_runs(mut self, max_runs: usize) -> Self {
        self.max_runs = max_runs;
        self
    }

    /// Set the wall-clock budget.
    pub fn with_max_run_time(mut self, max_run_time: Duration) -> Self {
        self.max_run_time = Some(max_run_time);
        self
    }

    /// Set the shrinking-search budget.
    pub fn with_max_shrinking_steps(mut self, steps: usize) -> Self {
        self.max_shrinking_steps = steps;
        self
    }

    /// Cap the generation size.
    pub fn with_max_generation_size(mut self, size: usize) -> Self {
        self.max_generation_size = Some(size);
        self
    }
}

/// How a property signalled failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The property returned an explicit failure
    Assertion,
    /// The property body panicked
    Panic,
}

/// One generated binding, recorded for the failure report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Source-level name of the binding clause
    pub clause: String,
    /// Debug rendering of the bound value
    pub value: String,
}

/// A single property failure: what went wrong and with which inputs.
#[derive(Debug, Clone)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    /// Where the failure was raised, as opaque `file:line:column` text
    pub location: Option<String>,
    /// Bindings in binding order, first bound first
    pub generated: Vec<Binding>,
}

impl Failure {
    /// An explicit assertion failure, located at the caller.
    #[track_caller]
    pub fn assertion(message: impl Into<String>) -> Self {
        Failure {
            kind: FailureKind::Assertion,
            message: message.into(),
            location: Some(std::panic::Location::caller().to_string()),
            generated: Vec::new(),
        }
    }

    /// A failure recovered from a panic payload, located at the catch site.
    #[track_caller]
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "property body panicked".to_string()
        };
        Failure {
            kind: FailureKind::Panic,
            message,
            location: Some(std::panic::Location::caller().to_string()),
            generated: Vec::new(),
        }
    }

    /// Append a binding to the failure record.
    pub fn with_binding(mut self, clause: impl Into<String>, value: impl Into<String>) -> Self {
        self.generated.push(Binding {
            clause: clause.into(),
            value: value.into(),
        });
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Assertion => write!(f, "assertion failed: {}", self.message),
            FailureKind::Panic => write!(f, "panic: {}", self.message),
        }
    }
}

/// Information about a passed property run.
#[derive(Debug, Clone)]
pub struct CheckSuccess {
    /// Number of successful runs performed
    pub runs: usize,
    /// Total time spent
    pub elapsed: Duration,
}

/// Information about a falsified property.
#[derive(Debug, Clone)]
pub struct CheckFailure<T> {
    /// The failure as first found
    pub original: Failure,
    /// The input that first failed
    pub original_value: T,
    /// The failure at the end of the shrinking search
    pub shrunk: Failure,
    /// The locally minimal failing input
    pub shrunk_value: T,
    /// Property evaluations spent shrinking
    pub nodes_visited: usize,
    /// Successful runs before the failure
    pub successful_runs: usize,
    /// Total time spent, shrinking included
    pub elapsed: Duration,
    /// Time spent in the shrinking search
    pub shrink_elapsed: Duration,
    /// The configuration the run used
    pub config: Config,
}

impl<T: fmt::Debug> CheckFailure<T> {
    /// The failure to surface to the user.
    ///
    /// The shrunk failure is preferred for being better minimized, unless
    /// shrinking morphed an explicit assertion into some other error, in
    /// which case the assertion wins. When neither is an assertion the
    /// shrunk one is still reported.
    pub fn reported(&self) -> &Failure {
        match (self.original.kind, self.shrunk.kind) {
            (FailureKind::Assertion, FailureKind::Panic) => &self.original,
            _ => &self.shrunk,
        }
    }

    /// A multi-line report of the failure.
    pub fn report(&self) -> String {
        let mut report = String::new();
        report.push_str(&format!(
            "property failed after {} successful run(s)\n",
            self.successful_runs
        ));
        report.push_str(&format!("failure: {}\n", self.reported()));
        if let Some(location) = &self.reported().location {
            report.push_str(&format!("failed at: {}\n", location));
        }
        report.push_str(&format!("original input: {:?}\n", self.original_value));
        report.push_str(&format!("shrunk input:   {:?}\n", self.shrunk_value));
        report.push_str(&format!(
            "shrinking: {} node(s) visited in {:?}\n",
            self.nodes_visited, self.shrink_elapsed
        ));
        if !self.reported().generated.is_empty() {
            report.push_str("generated values:\n");
            for binding in &self.reported().generated {
                report.push_str(&format!("  {} = {}\n", binding.clause, binding.value));
            }
        }
        if let Some(seed) = self.config.seed {
            report.push_str(&format!("reproduce with seed {}\n", seed));
        }
        report
    }
}

/// Outcome of a falsification attempt that did not pass.
#[derive(Debug)]
pub enum CheckError<T> {
    /// The configuration was rejected
    Config(ConfigError),
    /// A generator failed to draw; nothing was shrunk
    Generation(GenError),
    /// The property was falsified and the counterexample minimized
    Falsified(CheckFailure<T>),
}

impl<T: fmt::Debug> fmt::Display for CheckError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::Config(error) => write!(f, "{}", error),
            CheckError::Generation(error) => write!(f, "{}", error),
            CheckError::Falsified(failure) => write!(f, "{}", failure.report()),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for CheckError<T> {}

fn evaluate<T, P>(property: &P, value: &T) -> Result<(), Failure>
where
    T: fmt::Debug,
    P: Fn(&T) -> Result<(), Failure>,
{
    match catch_unwind(AssertUnwindSafe(|| property(value))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(failure)) => Err(failure.with_binding("value", format!("{:?}", value))),
        Err(payload) => Err(Failure::from_panic(payload).with_binding("value", format!("{:?}", value))),
    }
}

struct ShrinkOutcome<T> {
    value: T,
    failure: Failure,
    visited: usize,
}

/// Greedy leftmost-first descent over the failing tree.
///
/// The first failing child is accepted and descended into, passing
/// children are skipped, and a failing child without children of its own
/// keeps the scan on its siblings. The search never backtracks and is
/// bounded by `max_shrinking_steps` property evaluations.
fn shrink_search<T, P>(
    tree: &LazyTree<T>,
    original: &Failure,
    property: &P,
    config: &Config,
) -> ShrinkOutcome<T>
where
    T: Clone + fmt::Debug + 'static,
    P: Fn(&T) -> Result<(), Failure>,
{
    let mut smallest_value = tree.root.clone();
    let mut smallest = original.clone();
    let mut visited = 0usize;
    let mut cursor = tree.children();
    while visited < config.max_shrinking_steps {
        let Some(child) = cursor.next() else {
            break;
        };
        visited += 1;
        match evaluate(property, &child.root) {
            Ok(()) => {}
            Err(failure) => {
                smallest_value = child.root.clone();
                smallest = failure;
                if config.verbose {
                    eprintln!("shrink step {}: {:?}", visited, smallest_value);
                }
                let mut grandchildren = child.children();
                if let Some(first) = grandchildren.next() {
                    cursor = Box::new(std::iter::once(first).chain(grandchildren));
                }
            }
        }
    }
    ShrinkOutcome {
        value: smallest_value,
        failure: smallest,
        visited,
    }
}

/// Run `property` against values drawn from `gen` until it has passed
/// `max_runs` times, the wall clock runs out, or a counterexample is
/// found and minimized.
pub fn check_all<T, G, P>(gen: G, config: &Config, property: P) -> Result<CheckSuccess, CheckError<T>>
where
    T: Clone + fmt::Debug + 'static,
    G: IntoGen<T>,
    P: Fn(&T) -> Result<(), Failure>,
{
    config.validate().map_err(CheckError::Config)?;
    let gen = gen.into_gen();
    let initial_seed = config
        .seed
        .unwrap_or_else(|| rand::thread_rng().next_u64());
    let mut seed = Seed::new(initial_seed);
    let mut size = config.initial_size;
    let mut successes = 0usize;
    let start = Instant::now();

    loop {
        if successes >= config.max_runs {
            return Ok(CheckSuccess {
                runs: successes,
                elapsed: start.elapsed(),
            });
        }
        if let Some(limit) = config.max_run_time {
            if start.elapsed() >= limit {
                return Ok(CheckSuccess {
                    runs: successes,
                    elapsed: start.elapsed(),
                });
            }
        }

        let (s_draw, s_next) = seed.split();
        let tree = gen
            .run_tree(s_draw, size)
            .map_err(CheckError::Generation)?;
        match evaluate(&property, &tree.root) {
            Ok(()) => {
                successes += 1;
                size = match config.max_generation_size {
                    Some(cap) => (size + 1).min(cap),
                    None => size + 1,
                };
                seed = s_next;
            }
            Err(original) => {
                let shrink_start = Instant::now();
                let outcome = shrink_search(&tree, &original, &property, config);
                let shrink_elapsed = shrink_start.elapsed();
                return Err(CheckError::Falsified(CheckFailure {
                    original,
                    original_value: tree.root,
                    shrunk: outcome.failure,
                    shrunk_value: outcome.value,
                    nodes_visited: outcome.visited,
                    successful_runs: successes,
                    elapsed: start.elapsed(),
                    shrink_elapsed,
                    config: Config {
                        seed: Some(initial_seed),
                        ..config.clone()
                    },
                }));
            }
        }
    }
}

/// Like [`check_all`], but panics with the failure report, for direct use
/// inside `#[test]` functions.
pub fn assert_all<T, G, P>(gen: G, config: &Config, property: P)
where
    T: Clone + fmt::Debug + 'static,
    G: IntoGen<T>,
    P: Fn(&T) -> Result<(), Failure>,
{
    if let Err(error) = check_all(gen, config, property) {
        panic!("{}", error);
    }
}
