// src/report/stage.rs

use chrono::{DateTime, Duration, Local};
use serde::Serialize;
use std::fmt;

/// The three kinds of configured stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StageKind {
    DataSource,
    Transformer,
    Loader,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StageKind::DataSource => "extract",
            StageKind::Transformer => "transform",
            StageKind::Loader => "load",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Skipped,
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StageStatus::Pending => "pending",
            StageStatus::Running => "running",
            StageStatus::Completed => "completed",
            StageStatus::Skipped => "skipped",
            StageStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Timing and row-count record for one stage execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub(crate) kind: StageKind,
    pub(crate) name: String,
    pub(crate) order_index: Option<usize>,
    pub(crate) description: String,
    pub(crate) start: Option<DateTime<Local>>,
    pub(crate) end: Option<DateTime<Local>>,
    pub(crate) row_count: usize,
    pub(crate) status: StageStatus,
}

impl StageReport {
    pub fn new(kind: StageKind, name: impl Into<String>) -> Self {
        StageReport {
            kind,
            name: name.into(),
            order_index: None,
            description: String::new(),
            start: None,
            end: None,
            row_count: 0,
            status: StageStatus::Pending,
        }
    }

    /// Marks the stage as running at position `order_index` of the run.
    pub fn start(&mut self, order_index: usize, description: impl Into<String>) {
        self.order_index = Some(order_index);
        self.description = description.into();
        self.start = Some(Local::now());
        self.status = StageStatus::Running;
    }

    pub fn end(&mut self, row_count: usize) {
        self.end = Some(Local::now());
        self.row_count = row_count;
        self.status = StageStatus::Completed;
    }

    /// Marks the stage as bypassed. Keeps the order index if it was started.
    pub fn skip(&mut self) {
        if self.start.is_some() {
            self.end = Some(Local::now());
        }
        self.status = StageStatus::Skipped;
    }

    pub fn fail(&mut self) {
        self.end = Some(Local::now());
        self.status = StageStatus::Failed;
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order_index(&self) -> Option<usize> {
        self.order_index
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start_time(&self) -> Option<DateTime<Local>> {
        self.start
    }

    pub fn end_time(&self) -> Option<DateTime<Local>> {
        self.end
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn status(&self) -> StageStatus {
        self.status
    }

    pub fn duration(&self) -> Option<Duration> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_then_end() {
        let mut entry = StageReport::new(StageKind::DataSource, "orders");
        assert_eq!(entry.status(), StageStatus::Pending);
        assert!(entry.duration().is_none());

        entry.start(1, "CsvFileSource -> Output: [orders]");
        assert_eq!(entry.status(), StageStatus::Running);
        assert_eq!(entry.order_index(), Some(1));

        entry.end(3);
        assert_eq!(entry.status(), StageStatus::Completed);
        assert_eq!(entry.row_count(), 3);
        assert!(entry.end_time().unwrap() >= entry.start_time().unwrap());
        assert!(entry.duration().unwrap() >= Duration::zero());
    }

    #[test]
    fn test_skip_without_start_has_no_timing() {
        let mut entry = StageReport::new(StageKind::Loader, "orders");
        entry.skip();

        assert_eq!(entry.status(), StageStatus::Skipped);
        assert!(entry.order_index().is_none());
        assert!(entry.end_time().is_none());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(StageKind::DataSource.to_string(), "extract");
        assert_eq!(StageKind::Transformer.to_string(), "transform");
        assert_eq!(StageKind::Loader.to_string(), "load");
    }
}
