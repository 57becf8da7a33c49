//! 处理轮次指标
//!
//! Listener、relay 与 delivery 计数器在各自 crate 内直接记录；
//! 这里负责轮次级指标以及所有指标的描述信息。

use std::time::Duration;

use contracts::{FileOutcome, RunOutcome};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// 注册全部指标的描述 (Prometheus HELP 文本)
pub fn describe_metrics() {
    describe_counter!(
        "astm_bridge_frames_stored_total",
        "Instrument frames persisted by a listener"
    );
    describe_counter!(
        "astm_bridge_relay_total",
        "Backup frames handled by the relay, by result"
    );
    describe_counter!(
        "astm_bridge_deliveries_total",
        "Backend delivery attempts, by status class"
    );
    describe_counter!(
        "astm_bridge_files_total",
        "Frame files finished by a pass, by outcome"
    );
    describe_counter!("astm_bridge_passes_total", "Processing passes, by outcome");
    describe_gauge!(
        "astm_bridge_last_pass_files",
        "Frame files seen by the most recent pass"
    );
    describe_histogram!(
        "astm_bridge_pass_duration_ms",
        "Wall-clock duration of a processing pass"
    );
}

/// 记录单个文件的处理结果
pub fn record_file_outcome(outcome: FileOutcome) {
    counter!("astm_bridge_files_total", "outcome" => outcome.as_str()).increment(1);
}

/// 记录一次处理轮次
///
/// # Example
///
/// ```ignore
/// let report = pipeline.run_pass().await?;
/// observability::metrics::record_pass(report.outcome, report.files.len(), report.duration);
/// ```
pub fn record_pass(outcome: RunOutcome, files: usize, duration: Duration) {
    let label = match outcome {
        RunOutcome::Success => "success",
        RunOutcome::Failure => "failure",
        RunOutcome::NothingToProcess => "nothing_to_process",
    };
    counter!("astm_bridge_passes_total", "outcome" => label).increment(1);
    gauge!("astm_bridge_last_pass_files").set(files as f64);
    histogram!("astm_bridge_pass_duration_ms").record(duration.as_secs_f64() * 1000.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        // no global recorder installed: calls must not panic
        describe_metrics();
        record_file_outcome(FileOutcome::Partial);
        record_pass(RunOutcome::Failure, 3, Duration::from_millis(12));
    }
}
