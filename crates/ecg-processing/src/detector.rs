//! Adaptive-threshold beat detection
//!
//! The detector scans a derivative-amplified copy of the conditioned lead:
//! QRS band-shaping pair, then a boxcar integration of the rectified first
//! difference. A candidate peak opens a confirmation window; only a
//! locally-larger peak restarts the candidacy. Confirmed candidates are
//! relocated onto the conditioned signal, classified, and recorded as
//! strictly increasing beat markers. One rescan with a reset threshold
//! recovers from long silent gaps.

use crate::config::DetectorConfig;
use crate::filters::{derivative, integrator, qrs_highpass, qrs_lowpass};
use ecg_core::{BeatKind, BeatList, BeatMarker, EcgResult};
use num_traits::clamp;
use tracing::debug;

/// Everything one detection pass produces for a lead.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Confirmed beats, strictly increasing
    pub beats: BeatList,
    /// QRS annotation waveform: 1.0 inside the window after each beat
    pub annotation: Vec<f64>,
    /// The derivative-amplified signal the threshold ran on
    pub detection_signal: Vec<f64>,
}

/// Scan state: searching for a candidate, or holding one through its
/// confirmation window.
#[derive(Debug, Clone, Copy)]
enum ScanState {
    Searching,
    Refractory { peak: usize, height: f64 },
}

/// Running peak-height history driving threshold recalibration.
///
/// Short-run averages over the recalibration interval set the new
/// threshold; the all-run average clamps it so a burst of small peaks
/// cannot collapse the threshold, nor a burst of artifacts inflate it.
#[derive(Debug, Clone)]
struct PeakHistory {
    recent: Vec<f64>,
    interval: usize,
    fraction: f64,
    floor: f64,
    total_sum: f64,
    total_count: usize,
}

impl PeakHistory {
    fn new(config: &DetectorConfig) -> Self {
        PeakHistory {
            recent: Vec::with_capacity(config.recalibration_interval),
            interval: config.recalibration_interval,
            fraction: config.recalibration_fraction,
            floor: config.threshold_min,
            total_sum: 0.0,
            total_count: 0,
        }
    }

    /// Record a confirmed peak height; returns the new base threshold when
    /// a recalibration interval completes.
    fn record(&mut self, height: f64) -> Option<f64> {
        self.recent.push(height);
        self.total_sum += height;
        self.total_count += 1;

        if self.recent.len() < self.interval {
            return None;
        }

        let short_avg = self.recent.iter().sum::<f64>() / self.recent.len() as f64;
        let long_avg = self.total_sum / self.total_count as f64;
        self.recent.clear();

        let lo = self.floor.max(0.25 * long_avg);
        let hi = (4.0 * long_avg).max(lo);
        Some(clamp(self.fraction * short_avg, lo, hi))
    }
}

/// Per-run beat detector; construct a fresh instance for every lead.
#[derive(Debug, Clone)]
pub struct BeatDetector {
    config: DetectorConfig,
}

impl BeatDetector {
    pub fn new(config: DetectorConfig) -> Self {
        BeatDetector { config }
    }

    /// Build the derivative-amplified detection signal.
    fn detection_signal(&self, signal: &[f64]) -> Vec<f64> {
        let mut lowpass = qrs_lowpass();
        let mut highpass = qrs_highpass();
        let mut diff = derivative();
        let mut boxcar = integrator();

        signal
            .iter()
            .map(|&x| {
                let band = highpass.process(lowpass.process(x));
                boxcar.process(diff.process(band).abs())
            })
            .collect()
    }

    /// Relocate a candidate onto the conditioned signal: the largest
    /// positive excursion wins, falling back to the deepest negative one.
    fn relocate(&self, signal: &[f64], peak: usize) -> Option<(usize, f64, BeatKind)> {
        let w = self.config.relocation_window;
        let start = peak.saturating_sub(w);
        let end = (peak + w + 1).min(signal.len());
        if start >= end {
            return None;
        }

        let window = &signal[start..end];
        let (max_off, &max_val) = window
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
        if max_val > 0.0 {
            return Some((start + max_off, max_val, BeatKind::Normal));
        }

        let (min_off, &min_val) = window
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
        Some((start + min_off, min_val, BeatKind::Suspect))
    }

    /// Scan one conditioned lead and report its confirmed beats.
    pub fn detect(&self, signal: &[f64]) -> EcgResult<Detection> {
        let cfg = &self.config;
        let det = self.detection_signal(signal);
        let mut beats = BeatList::new();
        let mut annotation = vec![0.0; signal.len()];
        let mut history = PeakHistory::new(cfg);

        let mut base_threshold = cfg.threshold_min;
        let mut threshold = base_threshold;
        let mut state = ScanState::Searching;
        let mut gap_origin = 0usize;
        let mut retry_used = false;

        let mut i = 0;
        while i < det.len() {
            match state {
                ScanState::Searching => {
                    if det[i] > threshold {
                        threshold = det[i];
                        state = ScanState::Refractory { peak: i, height: det[i] };
                    } else if i - gap_origin >= cfg.long_gap && !retry_used {
                        // One rescan of the silent region with the
                        // threshold dropped back to its minimum
                        retry_used = true;
                        base_threshold = cfg.threshold_min;
                        threshold = base_threshold;
                        debug!(from = gap_origin, at = i, "long gap, rescanning once");
                        i = gap_origin;
                        gap_origin = i;
                    }
                }
                ScanState::Refractory { peak, height } => {
                    if i - peak >= cfg.confirm_window {
                        if height > cfg.noise_floor {
                            self.confirm(
                                signal,
                                peak,
                                &mut beats,
                                &mut annotation,
                            );
                            if let Some(new_base) = history.record(height) {
                                base_threshold = new_base;
                                debug!(threshold = base_threshold, "threshold recalibrated");
                            }
                            gap_origin = i;
                        }
                        threshold = base_threshold;
                        state = ScanState::Searching;
                    } else if det[i] > threshold {
                        // Only a locally-larger peak restarts the candidacy
                        threshold = det[i];
                        state = ScanState::Refractory { peak: i, height: det[i] };
                    }
                }
            }
            i += 1;
        }

        debug!(beats = beats.len(), samples = signal.len(), "lead scan complete");
        Ok(Detection { beats, annotation, detection_signal: det })
    }

    fn confirm(
        &self,
        signal: &[f64],
        peak: usize,
        beats: &mut BeatList,
        annotation: &mut [f64],
    ) {
        let Some((index, amplitude, kind)) = self.relocate(signal, peak) else {
            return;
        };
        if amplitude.abs() < self.config.amplitude_floor {
            return;
        }
        if beats.push(BeatMarker { index, kind }) {
            let end = (index + self.config.annotation_window).min(annotation.len());
            for slot in &mut annotation[index..end] {
                *slot = 1.0;
            }
        }
    }
}
