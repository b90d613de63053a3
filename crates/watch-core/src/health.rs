use crate::model::{AuditRun, Verdict};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Traffic-light rollup of the currently loaded audit window.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthScore {
    #[default]
    Pending,
    Green,
    Yellow,
    Red,
}

impl HealthScore {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthScore::Pending => "pending",
            HealthScore::Green => "green",
            HealthScore::Yellow => "yellow",
            HealthScore::Red => "red",
        }
    }
}

impl fmt::Display for HealthScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only completed runs count. The checks run in a fixed order: all-PASS wins
/// over everything, then any FAIL/ERROR, and `Yellow` catches completed runs
/// with verdicts that are neither.
pub fn health_score(items: &[AuditRun]) -> HealthScore {
    let completed: Vec<&AuditRun> = items.iter().filter(|run| run.is_completed()).collect();
    if completed.is_empty() {
        return HealthScore::Pending;
    }
    if completed
        .iter()
        .all(|run| run.overall_result == Some(Verdict::Pass))
    {
        return HealthScore::Green;
    }
    if completed
        .iter()
        .any(|run| run.overall_result.as_ref().is_some_and(Verdict::is_failure))
    {
        return HealthScore::Red;
    }
    HealthScore::Yellow
}
