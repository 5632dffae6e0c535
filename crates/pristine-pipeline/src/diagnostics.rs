//! Pipeline diagnostics: a per-stage completion hook with wall-clock
//! durations.
//!
//! The pipeline itself never logs. Every stage that completes reports
//! its [`StageId`] and duration to a [`StageObserver`]; callers decide
//! whether to log, count, or collect them.
//!
//! Timestamps are captured via the `web-time` crate, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native.
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Identifies one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Bytes to RGBA.
    Decode,
    /// Aspect-ratio crop of the source.
    Crop,
    /// Studio surface allocation.
    Canvas,
    /// Product and shadow drawn onto the surface.
    Composite,
    /// Sobel edge strength.
    EdgeDetect,
    /// Border-ring background clustering.
    BackgroundSample,
    /// Promotional sticker recolor.
    CleanPromotional,
    /// Background made transparent.
    RemoveBackground,
    /// Warm bias and contrast.
    Grade,
    /// Vignette and watermark.
    Finish,
    /// Serialization to JPEG/PNG.
    Encode,
}

impl StageId {
    /// Every stage, in studio pipeline order, followed by the
    /// cutout-only stage.
    pub const ALL: [Self; 11] = [
        Self::Decode,
        Self::Crop,
        Self::Canvas,
        Self::Composite,
        Self::EdgeDetect,
        Self::BackgroundSample,
        Self::CleanPromotional,
        Self::Grade,
        Self::Finish,
        Self::Encode,
        Self::RemoveBackground,
    ];

    /// Short human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Crop => "crop",
            Self::Canvas => "canvas",
            Self::Composite => "composite",
            Self::EdgeDetect => "edge detect",
            Self::BackgroundSample => "background sample",
            Self::CleanPromotional => "clean promotional",
            Self::RemoveBackground => "remove background",
            Self::Grade => "grade",
            Self::Finish => "finish",
            Self::Encode => "encode",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Decode => 0,
            Self::Crop => 1,
            Self::Canvas => 2,
            Self::Composite => 3,
            Self::EdgeDetect => 4,
            Self::BackgroundSample => 5,
            Self::CleanPromotional => 6,
            Self::Grade => 7,
            Self::Finish => 8,
            Self::Encode => 9,
            Self::RemoveBackground => 10,
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives a callback each time a stage completes successfully.
///
/// Failed stages do not report.
pub trait StageObserver: Send + Sync {
    /// `stage` finished after `duration`.
    fn stage_completed(&self, stage: StageId, duration: Duration);
}

/// Ignores every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn stage_completed(&self, _stage: StageId, _duration: Duration) {}
}

/// Counts completions per stage. Cheap enough to leave in production
/// paths; mostly useful to assert that work was or was not redone.
#[derive(Debug, Default)]
pub struct StageCounter {
    counts: [AtomicUsize; StageId::ALL.len()],
}

impl StageCounter {
    /// A counter with every stage at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `stage` has completed.
    #[must_use]
    pub fn count(&self, stage: StageId) -> usize {
        self.counts[stage.index()].load(Ordering::Relaxed)
    }
}

impl StageObserver for StageCounter {
    fn stage_completed(&self, stage: StageId, _duration: Duration) {
        self.counts[stage.index()].fetch_add(1, Ordering::Relaxed);
    }
}

/// Timing of one completed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    /// Which stage.
    pub stage: StageId,
    /// Wall-clock duration (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

/// Collects every stage timing in completion order.
#[derive(Debug, Default)]
pub struct TimingRecorder {
    timings: Mutex<Vec<StageTiming>>,
}

impl TimingRecorder {
    /// An empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn timings(&self) -> Vec<StageTiming> {
        self.timings
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Format the recorded timings as a human-readable table.
    #[must_use]
    pub fn report(&self) -> String {
        let timings = self.timings();
        let total: Duration = timings.iter().map(|t| t.duration).sum();
        let total_ms = duration_ms(total);

        let mut lines = vec![
            format!("{:<20} {:>10} {:>9}", "Stage", "Duration", "% Total"),
            "-".repeat(41),
        ];
        for timing in &timings {
            let ms = duration_ms(timing.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("{:<20} {ms:>8.3}ms {pct:>8.1}%", timing.stage.name()));
        }
        lines.push(format!("{:<20} {total_ms:>8.3}ms", "total"));
        lines.join("\n")
    }
}

impl StageObserver for TimingRecorder {
    fn stage_completed(&self, stage: StageId, duration: Duration) {
        self.timings
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(StageTiming { stage, duration });
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Run `work`, then report it to `observer` as `stage`.
pub(crate) fn timed<T>(observer: &dyn StageObserver, stage: StageId, work: impl FnOnce() -> T) -> T {
    let start = web_time::Instant::now();
    let output = work();
    observer.stage_completed(stage, start.elapsed());
    output
}

/// Like [`timed`], but only reports when `work` succeeds.
pub(crate) fn timed_result<T, E>(
    observer: &dyn StageObserver,
    stage: StageId,
    work: impl FnOnce() -> Result<T, E>,
) -> Result<T, E> {
    let start = web_time::Instant::now();
    let output = work()?;
    observer.stage_completed(stage, start.elapsed());
    Ok(output)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn stage_indices_are_unique_and_dense() {
        let mut seen = [false; StageId::ALL.len()];
        for stage in StageId::ALL {
            assert!(!seen[stage.index()], "duplicate index for {stage}");
            seen[stage.index()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn counter_counts_per_stage() {
        let counter = StageCounter::new();
        timed(&counter, StageId::EdgeDetect, || ());
        timed(&counter, StageId::EdgeDetect, || ());
        timed(&counter, StageId::Grade, || ());
        assert_eq!(counter.count(StageId::EdgeDetect), 2);
        assert_eq!(counter.count(StageId::Grade), 1);
        assert_eq!(counter.count(StageId::Decode), 0);
    }

    #[test]
    fn failed_stage_does_not_report() {
        let counter = StageCounter::new();
        let result: Result<(), &str> = timed_result(&counter, StageId::Decode, || Err("nope"));
        assert!(result.is_err());
        assert_eq!(counter.count(StageId::Decode), 0);
    }

    #[test]
    fn recorder_keeps_completion_order_and_reports() {
        let recorder = TimingRecorder::new();
        recorder.stage_completed(StageId::Decode, Duration::from_millis(3));
        recorder.stage_completed(StageId::Encode, Duration::from_millis(1));
        let stages: Vec<StageId> = recorder.timings().iter().map(|t| t.stage).collect();
        assert_eq!(stages, vec![StageId::Decode, StageId::Encode]);
        let report = recorder.report();
        assert!(report.contains("decode"));
        assert!(report.contains("4.000ms"));
    }

    #[test]
    fn timing_serializes_duration_as_seconds() {
        let timing = StageTiming {
            stage: StageId::EdgeDetect,
            duration: Duration::from_millis(1500),
        };
        let json = serde_json::to_string(&timing).unwrap();
        assert_eq!(json, r#"{"stage":"edge_detect","duration":1.5}"#);
        let back: StageTiming = serde_json::from_str(&json).unwrap();
        assert_eq!(back, timing);
    }
}
