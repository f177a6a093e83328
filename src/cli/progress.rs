//! Step table shown while a flow runs.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use colored::{ColoredString, Colorize};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::plan::TaskKey;
use crate::Result;

const FLOW_STEPS: [(TaskKey, &str); 4] = [
    (TaskKey::GeneratePlan, "Enumerate variants"),
    (TaskKey::GenerateNetlist, "Write netlists"),
    (TaskKey::RunSimulations, "Run simulations"),
    (TaskKey::MeasureResults, "Measure results"),
];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    InProgress,
    Done,
    Failed,
    Skipped,
    Disabled,
}

impl StepStatus {
    fn label(&self) -> ColoredString {
        match self {
            StepStatus::Pending => "Pending".blue().bold(),
            StepStatus::InProgress => "In Progress".bright_white().bold(),
            StepStatus::Done => "Done".green().bold(),
            StepStatus::Failed => "Failed".bright_white().on_red().bold(),
            StepStatus::Skipped => "Skipped".yellow().bold(),
            StepStatus::Disabled => "Disabled".truecolor(120, 120, 120).bold(),
        }
    }

    fn is_active(&self) -> bool {
        matches!(self, StepStatus::Pending | StepStatus::InProgress)
    }

    fn style(&self) -> Option<ProgressStyle> {
        let lead = if self.is_active() {
            "{spinner:.green}"
        } else {
            " "
        };
        let template = format!("{lead} {:16} {{msg}}", self.label());
        match ProgressStyle::with_template(&template) {
            Ok(style) => Some(style),
            Err(e) => {
                log::debug!("bad progress template {template:?}: {e}");
                None
            }
        }
    }
}

struct Step {
    key: TaskKey,
    label: String,
    enabled: bool,
    status: StepStatus,
    started: Option<Instant>,
    bar: ProgressBar,
}

impl Step {
    fn set(&mut self, status: StepStatus) {
        self.status = status;
        if let Some(style) = status.style() {
            self.bar.set_style(style);
        }
        match status {
            StepStatus::InProgress => {
                self.started = Some(Instant::now());
                self.bar.enable_steady_tick(Duration::from_millis(200));
            }
            StepStatus::Done => {
                if let Some(started) = self.started {
                    let secs = started.elapsed().as_secs_f64();
                    self.bar.set_message(format!("{} ({secs:.1}s)", self.label));
                }
                self.bar.finish();
            }
            StepStatus::Pending => {}
            StepStatus::Failed | StepStatus::Skipped | StepStatus::Disabled => self.bar.finish(),
        }
    }
}

/// Tracks the flow's steps and renders one spinner line per step.
///
/// Plan and netlist generation are always enabled; the other steps only
/// when their key is in the task set.
pub struct StepContext {
    steps: Vec<Step>,
    current: Option<usize>,
    _bars: MultiProgress,
}

impl StepContext {
    pub fn new(tasks: &HashSet<TaskKey>) -> Self {
        println!("Tasks:");

        let bars = MultiProgress::new();
        let enabled_count = FLOW_STEPS
            .iter()
            .filter(|(key, _)| always_on(*key) || tasks.contains(key))
            .count();
        let width = enabled_count.to_string().len();

        let mut position = 0;
        let mut steps = Vec::with_capacity(FLOW_STEPS.len());
        for (key, desc) in FLOW_STEPS {
            let enabled = always_on(key) || tasks.contains(&key);
            let label = if enabled {
                position += 1;
                format!("[{position:width$}/{enabled_count:width$}] {desc}")
            } else {
                format!("[-/-] {desc}")
            };
            let bar = bars.add(ProgressBar::new_spinner());
            bar.set_message(label.clone());
            let mut step = Step {
                key,
                label,
                enabled,
                status: StepStatus::Pending,
                started: None,
                bar,
            };
            step.set(if enabled {
                StepStatus::Pending
            } else {
                StepStatus::Disabled
            });
            steps.push(step);
        }

        let mut ctx = Self {
            steps,
            current: None,
            _bars: bars,
        };
        ctx.start_from(0);
        ctx
    }

    /// Makes the first enabled step at or after `idx` the current one.
    fn start_from(&mut self, idx: usize) {
        self.current = (idx..self.steps.len()).find(|&i| self.steps[i].enabled);
        match self.current {
            Some(i) => self.steps[i].set(StepStatus::InProgress),
            None => println!("\n\nCompleted all tasks"),
        }
    }

    pub fn current_key(&self) -> Option<TaskKey> {
        self.current.map(|i| self.steps[i].key)
    }

    /// Passes `res` through, marking the current step failed and the rest
    /// skipped if it is an error.
    pub fn check<T>(&mut self, res: Result<T>) -> Result<T> {
        if res.is_err() {
            if let Some(i) = self.current.take() {
                self.steps[i].set(StepStatus::Failed);
                for step in self.steps[i + 1..].iter_mut().filter(|s| s.enabled) {
                    step.set(StepStatus::Skipped);
                }
            }
            println!("\n");
        }
        res
    }

    /// Marks `key` done and starts the next enabled step.
    ///
    /// Finishing a step other than the current one is logged and ignored.
    pub fn finish(&mut self, key: TaskKey) {
        let Some(i) = self.current else {
            log::warn!("step {key:?} finished after the flow ended");
            return;
        };
        if self.steps[i].key != key {
            log::warn!(
                "step {key:?} finished while {:?} was in progress",
                self.steps[i].key
            );
            return;
        }
        self.steps[i].set(StepStatus::Done);
        self.start_from(i + 1);
    }

    pub fn statuses(&self) -> Vec<(TaskKey, StepStatus)> {
        self.steps.iter().map(|s| (s.key, s.status)).collect()
    }
}

fn always_on(key: TaskKey) -> bool {
    matches!(key, TaskKey::GeneratePlan | TaskKey::GenerateNetlist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_follow_flow() {
        let tasks = HashSet::from([TaskKey::RunSimulations]);
        let mut ctx = StepContext::new(&tasks);
        assert_eq!(ctx.current_key(), Some(TaskKey::GeneratePlan));
        ctx.finish(TaskKey::GeneratePlan);
        ctx.finish(TaskKey::GenerateNetlist);
        // Out of order: ignored.
        ctx.finish(TaskKey::MeasureResults);
        assert_eq!(ctx.current_key(), Some(TaskKey::RunSimulations));
        ctx.finish(TaskKey::RunSimulations);
        assert_eq!(ctx.current_key(), None);
        assert_eq!(
            ctx.statuses(),
            vec![
                (TaskKey::GeneratePlan, StepStatus::Done),
                (TaskKey::GenerateNetlist, StepStatus::Done),
                (TaskKey::RunSimulations, StepStatus::Done),
                (TaskKey::MeasureResults, StepStatus::Disabled),
            ]
        );
    }

    #[test]
    fn test_failure_skips_the_rest() {
        let tasks = HashSet::from([TaskKey::RunSimulations, TaskKey::MeasureResults]);
        let mut ctx = StepContext::new(&tasks);
        ctx.finish(TaskKey::GeneratePlan);
        let res: Result<()> = Err(anyhow::anyhow!("netlist failed"));
        assert!(ctx.check(res).is_err());
        let statuses: Vec<StepStatus> = ctx.statuses().into_iter().map(|(_, s)| s).collect();
        assert_eq!(
            statuses,
            vec![
                StepStatus::Done,
                StepStatus::Failed,
                StepStatus::Skipped,
                StepStatus::Skipped
            ]
        );
        assert_eq!(ctx.current_key(), None);
    }
}
