// src/report/report.rs

use serde::Serialize;

use super::stage::{StageKind, StageReport, StageStatus};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Execution report of one pipeline run.
///
/// Holds one [`StageReport`] per configured stage, keyed by stage kind and
/// name: a loader usually carries the same name as the data source feeding
/// it, and both executions are reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    entries: Vec<StageReport>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for a stage, registering it if absent.
    pub fn get_from_name(&mut self, kind: StageKind, name: &str) -> &mut StageReport {
        let position = self
            .entries
            .iter()
            .position(|e| e.kind == kind && e.name == name);
        match position {
            Some(i) => &mut self.entries[i],
            None => {
                self.entries.push(StageReport::new(kind, name));
                let last = self.entries.len() - 1;
                &mut self.entries[last]
            }
        }
    }

    pub fn get(&self, kind: StageKind, name: &str) -> Option<&StageReport> {
        self.entries
            .iter()
            .find(|e| e.kind == kind && e.name == name)
    }

    pub fn entries(&self) -> &[StageReport] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Executed entries by order index, then never-started ones in
    /// registration order.
    pub fn ordered(&self) -> Vec<&StageReport> {
        let mut executed: Vec<&StageReport> = self
            .entries
            .iter()
            .filter(|e| e.order_index.is_some())
            .collect();
        executed.sort_by_key(|e| e.order_index);
        executed.extend(self.entries.iter().filter(|e| e.order_index.is_none()));
        executed
    }

    /// Marks every stage still running as failed.
    pub fn fail_running(&mut self) {
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.status == StageStatus::Running)
        {
            entry.fail();
        }
    }

    /// Sum of the row counts of completed stages of `kind`.
    pub fn total_rows(&self, kind: StageKind) -> usize {
        self.entries
            .iter()
            .filter(|e| e.kind == kind && e.status == StageStatus::Completed)
            .map(|e| e.row_count)
            .sum()
    }

    /// Renders the whole report as a human-readable block, one line per stage.
    pub fn full_report(&self) -> String {
        let mut lines = Vec::with_capacity(self.entries.len());
        for entry in self.ordered() {
            let order = entry
                .order_index
                .map(|i| i.to_string())
                .unwrap_or_else(|| "-".to_string());
            let start = entry
                .start
                .map(|t| t.format(TIME_FORMAT).to_string())
                .unwrap_or_else(|| "-".to_string());
            let end = entry
                .end
                .map(|t| t.format(TIME_FORMAT).to_string())
                .unwrap_or_else(|| "-".to_string());
            let description = if entry.description.is_empty() {
                "-"
            } else {
                entry.description.as_str()
            };
            lines.push(format!(
                "[{}] {} '{}' | {} | start: {} | end: {} | rows: {} | {}",
                order,
                entry.kind,
                entry.name,
                description,
                start,
                end,
                entry.row_count,
                entry.status
            ));
        }
        lines.join("\n")
    }
}
