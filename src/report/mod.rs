//! Comparator & Reporter (C5).
//!
//! Classifies each task's outcome from the paired `(count, checksum)`
//! results C4 produced, and writes the run's detail and summary reports.
//! See `SPEC_FULL.md` §4.5 and §6.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::executor::ExecutionReport;
use crate::synth::SynthesisError;
use crate::types::{CheckTask, ChecksumResult, TaskKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    Pass,
    FailSynthesis,
    #[default]
    FailExecution,
    FailInconsistent,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Pass => "PASS",
            Status::FailSynthesis => "FAIL_SYNTHESIS",
            Status::FailExecution => "FAIL_EXECUTION",
            Status::FailInconsistent => "FAIL_INCONSISTENT",
        };
        f.write_str(s)
    }
}

/// One task's full outcome: status plus everything the detail report's
/// per-`TaskKey` block needs (§6) — emitted SQL, per-side result and
/// duration, per-side error, and a synthesis-failure message when
/// applicable.
#[derive(Debug, Clone, Default)]
pub struct TaskOutcome {
    pub key: TaskKey,
    pub status: Status,
    pub src_sql: Option<String>,
    pub tgt_sql: Option<String>,
    pub src: Option<ChecksumResult>,
    pub tgt: Option<ChecksumResult>,
    pub src_duration: Option<Duration>,
    pub tgt_duration: Option<Duration>,
    pub src_error: Option<String>,
    pub tgt_error: Option<String>,
    pub synthesis_error: Option<String>,
    /// Set only for `FailInconsistent`: which of count/checksum diverged.
    pub inconsistency_detail: Option<String>,
}

/// Describes which component(s) of a `(count, checksum)` pair diverged,
/// per `SPEC_FULL.md` §4.5 ("itemizing which component diverged").
fn describe_inconsistency(src: ChecksumResult, tgt: ChecksumResult) -> String {
    let mut parts = Vec::new();
    if src.count != tgt.count {
        parts.push(format!("count mismatch: SRC={}, TGT={}", src.count, tgt.count));
    }
    if src.checksum != tgt.checksum {
        parts.push(format!("checksum mismatch: SRC={}, TGT={}", src.checksum, tgt.checksum));
    }
    parts.join("; ")
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub pass: usize,
    pub fail_synthesis: usize,
    pub fail_execution: usize,
    pub fail_inconsistent: usize,
}

impl RunSummary {
    /// `PASS / (total - FAIL_SYNTHESIS)`, i.e. agreement among tasks that
    /// actually got to run on both sides. `None` when every task failed to
    /// synthesize (denominator would be zero).
    pub fn consistency_rate(&self) -> Option<f64> {
        let denominator = self.total - self.fail_synthesis;
        if denominator == 0 {
            None
        } else {
            Some(self.pass as f64 / denominator as f64)
        }
    }
}

/// Classify every materialized task plus every synthesis failure into a
/// single, ordered outcome list.
pub fn classify(
    tasks: &[CheckTask],
    synthesis_errors: &[(TaskKey, SynthesisError)],
    execution: &ExecutionReport,
) -> Vec<TaskOutcome> {
    let mut outcomes: Vec<TaskOutcome> = tasks
        .iter()
        .map(|task| classify_one(task, execution))
        .collect();

    outcomes.extend(synthesis_errors.iter().map(|(key, err)| TaskOutcome {
        key: key.clone(),
        status: Status::FailSynthesis,
        synthesis_error: Some(err.to_string()),
        ..Default::default()
    }));

    outcomes
}

fn classify_one(task: &CheckTask, execution: &ExecutionReport) -> TaskOutcome {
    let src = execution.src_results.get(&task.key).map(|r| *r);
    let tgt = execution.tgt_results.get(&task.key).map(|r| *r);
    let src_duration = execution.src_durations.get(&task.key).map(|d| *d);
    let tgt_duration = execution.tgt_durations.get(&task.key).map(|d| *d);

    let (mut src_error, mut tgt_error) = (None, None);
    if let Some(errors) = execution.errors.get(&task.key) {
        for (side, err) in errors.iter() {
            match side {
                crate::executor::Side::Src => src_error = Some(err.to_string()),
                crate::executor::Side::Tgt => tgt_error = Some(err.to_string()),
            }
        }
    }

    let base = TaskOutcome {
        key: task.key.clone(),
        status: Status::FailExecution,
        src_sql: Some(task.src_sql.clone()),
        tgt_sql: Some(task.tgt_sql.clone()),
        src,
        tgt,
        src_duration,
        tgt_duration,
        src_error: src_error.clone(),
        tgt_error: tgt_error.clone(),
        synthesis_error: None,
        inconsistency_detail: None,
    };

    if src_error.is_some() || tgt_error.is_some() {
        return base;
    }

    match (src, tgt) {
        (Some(s), Some(t)) if s.count == t.count && s.checksum == t.checksum => TaskOutcome {
            status: Status::Pass,
            ..base
        },
        (Some(s), Some(t)) => TaskOutcome {
            status: Status::FailInconsistent,
            inconsistency_detail: Some(describe_inconsistency(s, t)),
            ..base
        },
        _ => base,
    }
}

pub fn summarize(outcomes: &[TaskOutcome], generated_at: DateTime<Utc>) -> RunSummary {
    let mut summary = RunSummary {
        generated_at,
        total: outcomes.len(),
        pass: 0,
        fail_synthesis: 0,
        fail_execution: 0,
        fail_inconsistent: 0,
    };
    for outcome in outcomes {
        match outcome.status {
            Status::Pass => summary.pass += 1,
            Status::FailSynthesis => summary.fail_synthesis += 1,
            Status::FailExecution => summary.fail_execution += 1,
            Status::FailInconsistent => summary.fail_inconsistent += 1,
        }
    }
    summary
}

fn collapse_whitespace(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn format_result(result: Option<ChecksumResult>) -> String {
    match result {
        Some(r) => format!("count={}, checksum={}", r.count, r.checksum),
        None => "none".to_string(),
    }
}

fn format_duration(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format!("{}ms", d.as_millis()),
        None => "n/a".to_string(),
    }
}

/// Writes `<dir>/detail_report_<timestamp>.txt` (one block per `TaskKey`)
/// and `<dir>/summary_report_<timestamp>.txt` (aggregate counts, the
/// TaskKeys behind each failing status, and the consistency rate), both
/// stamped with the same `generated_at` instant so the pair is easy to
/// correlate.
pub fn write_reports(
    dir: impl AsRef<Path>,
    outcomes: &[TaskOutcome],
    summary: &RunSummary,
) -> io::Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let stamp = summary.generated_at.format("%Y%m%d_%H%M%S");

    let detail_path = dir.join(format!("detail_report_{stamp}.txt"));
    let mut detail = String::new();
    for outcome in outcomes {
        detail.push_str(&format!("task: {}\n", outcome.key));
        detail.push_str(&format!("status: {}\n", outcome.status));
        if let Some(err) = &outcome.synthesis_error {
            detail.push_str(&format!("synthesis_error: {err}\n"));
        } else {
            detail.push_str(&format!(
                "src_sql: {}\n",
                outcome.src_sql.as_deref().map(collapse_whitespace).unwrap_or_default()
            ));
            detail.push_str(&format!(
                "tgt_sql: {}\n",
                outcome.tgt_sql.as_deref().map(collapse_whitespace).unwrap_or_default()
            ));
            detail.push_str(&format!(
                "src_result: {} ({})\n",
                format_result(outcome.src),
                format_duration(outcome.src_duration)
            ));
            detail.push_str(&format!(
                "tgt_result: {} ({})\n",
                format_result(outcome.tgt),
                format_duration(outcome.tgt_duration)
            ));
            if let Some(err) = &outcome.src_error {
                detail.push_str(&format!("src_error: {err}\n"));
            }
            if let Some(err) = &outcome.tgt_error {
                detail.push_str(&format!("tgt_error: {err}\n"));
            }
            if let Some(detail_msg) = &outcome.inconsistency_detail {
                detail.push_str(&format!("inconsistency: {detail_msg}\n"));
            }
        }
        detail.push('\n');
    }
    fs::write(&detail_path, detail)?;

    let summary_path = dir.join(format!("summary_report_{stamp}.txt"));
    let rate = summary
        .consistency_rate()
        .map(|r| format!("{:.4}", r))
        .unwrap_or_else(|| "n/a".to_string());

    let keys_with = |status: Status| {
        outcomes
            .iter()
            .filter(|o| o.status == status)
            .map(|o| o.key.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let summary_text = format!(
        "generated_at\t{}\n\
         total\t{}\n\
         pass\t{}\n\
         fail_synthesis\t{}\n\
         fail_execution\t{}\n\
         fail_inconsistent\t{}\n\
         consistency_rate\t{}\n\
         fail_synthesis_keys\t{}\n\
         fail_execution_keys\t{}\n\
         fail_inconsistent_keys\t{}\n",
        summary.generated_at.to_rfc3339(),
        summary.total,
        summary.pass,
        summary.fail_synthesis,
        summary.fail_execution,
        summary.fail_inconsistent,
        rate,
        keys_with(Status::FailSynthesis),
        keys_with(Status::FailExecution),
        keys_with(Status::FailInconsistent),
    );
    fs::write(&summary_path, summary_text)?;

    Ok((detail_path, summary_path))
}
