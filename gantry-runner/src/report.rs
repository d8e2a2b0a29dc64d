//! Step report
//!
//! Records the outcome and duration of every scenario step and prints the
//! summary at the end of a run.

use colored::*;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Passed,
    Failed(String),
    Skipped(String),
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: String,
    pub outcome: StepOutcome,
    pub duration: Duration,
}

/// Ordered record of a scenario run
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<StepRecord>,
}

impl ScenarioReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Runs a step and records its outcome
    ///
    /// Returns the step's value, or `None` when it failed so the caller can
    /// stop with `?`.
    pub async fn step<T, F>(&mut self, name: impl Into<String>, step: F) -> Option<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let name = name.into();
        info!(step = %name, "Running step");

        let started = Instant::now();
        let result = step.await;
        let duration = started.elapsed();

        match result {
            Ok(value) => {
                info!(step = %name, duration_ms = duration.as_millis() as u64, "Step passed");
                self.steps.push(StepRecord {
                    name,
                    outcome: StepOutcome::Passed,
                    duration,
                });
                Some(value)
            }
            Err(e) => {
                error!(step = %name, "Step failed: {:#}", e);
                self.steps.push(StepRecord {
                    name,
                    outcome: StepOutcome::Failed(format!("{:#}", e)),
                    duration,
                });
                None
            }
        }
    }

    /// Records a step that was not run
    pub fn skip(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        let name = name.into();
        let reason = reason.into();
        info!(step = %name, reason = %reason, "Skipping step");
        self.steps.push(StepRecord {
            name,
            outcome: StepOutcome::Skipped(reason),
            duration: Duration::ZERO,
        });
    }

    pub fn passed_count(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Passed))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Failed(_)))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Skipped(_)))
    }

    fn count(&self, predicate: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|s| predicate(&s.outcome)).count()
    }

    pub fn failed(&self) -> bool {
        self.failed_count() > 0
    }

    /// First failed step, if any
    pub fn first_failure(&self) -> Option<&StepRecord> {
        self.steps
            .iter()
            .find(|s| matches!(s.outcome, StepOutcome::Failed(_)))
    }

    /// Prints the colored summary to stdout
    pub fn print(&self) {
        println!();
        println!("{}", self.name.bold());
        println!();

        for step in &self.steps {
            let duration = format!("({:.1}s)", step.duration.as_secs_f64()).dimmed();
            match &step.outcome {
                StepOutcome::Passed => {
                    println!("  {} {} {}", "✓".green(), step.name, duration);
                }
                StepOutcome::Failed(reason) => {
                    println!("  {} {} {}", "✗".red(), step.name.red(), duration);
                    println!("      {}", reason.red());
                }
                StepOutcome::Skipped(reason) => {
                    println!("  {} {} {}", "-".yellow(), step.name, format!("[{}]", reason).yellow());
                }
            }
        }

        println!();
        let summary = format!(
            "{} passed, {} failed, {} skipped",
            self.passed_count(),
            self.failed_count(),
            self.skipped_count()
        );
        if self.failed() {
            println!("{}", summary.red().bold());
        } else {
            println!("{}", summary.green().bold());
        }
    }
}
