use crate::models::UploadReport;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    /// The CLI reported neither new assets nor duplicates.
    NoProgress,
    CountShortfall { expected: u64, actual: u64 },
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoProgress => write!(f, "upload report shows no new assets and no duplicates"),
            Self::CountShortfall { expected, actual } => write!(
                f,
                "server count {} is below expected minimum {}",
                actual, expected
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(FailReason),
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Lower-bound check on the server's total asset count.
///
/// Passes iff `after >= before + new_files` and the report shows some progress
/// (new assets or duplicates). Equality is never required since other clients
/// may be ingesting at the same time. A report with zero new and zero duplicate
/// files always fails, even if the counts line up.
pub fn verify(before: u64, after: u64, report: &UploadReport) -> Verdict {
    if !report.made_progress() {
        return Verdict::Fail(FailReason::NoProgress);
    }

    let expected = before.saturating_add(report.new_files);
    if after < expected {
        return Verdict::Fail(FailReason::CountShortfall {
            expected,
            actual: after,
        });
    }

    Verdict::Pass
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail(reason) => write!(f, "FAIL ({})", reason),
        }
    }
}
