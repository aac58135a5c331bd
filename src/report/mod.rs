pub mod report;
pub mod stage;

pub use report::Report;
pub use stage::{StageKind, StageReport, StageStatus};
