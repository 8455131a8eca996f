//! Analysis orchestration: capture bytes in, clinical report out
//!
//! Sequences the pipeline per lead: decode, condition, derive, detect on
//! both primary leads, reconcile, classify morphology on the authoritative
//! lead, extract features, and assemble the result vector. Each run
//! constructs fresh filter/detector/classifier instances; nothing is
//! shared between runs.

use crate::config::AnalysisConfig;
use crate::decoder::PacketDecoder;
use crate::detector::{BeatDetector, Detection};
use crate::features::FeatureExtractor;
use crate::filters::FilterCascade;
use crate::morphology::{extended_template, MorphologyClassifier};
use crate::synthesis::attach_derived_leads;
use ecg_core::{
    AnalysisReport, BeatList, EcgError, EcgResult, LeadId, LeadSet, ResultVector, UNMEASURED,
};
use tracing::{debug, warn};

/// RR interval statistics from the authoritative lead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RrStats {
    /// Mean of the trimmed intervals in sample ticks
    pub mean_ticks: f64,
    /// Mean with each trimmed interval doubled before summation; at the
    /// device's 2 ms tick this is the interval in milliseconds
    pub mean_ms: f64,
}

/// Outlier-trimmed RR mean: the single largest and single smallest
/// intervals are discarded, then every remaining interval is doubled
/// before summation. Needs at least three intervals.
pub fn rr_statistics(beats: &BeatList) -> Option<RrStats> {
    let mut intervals = beats.intervals();
    if intervals.len() < 3 {
        return None;
    }
    intervals.sort_unstable();
    let trimmed = &intervals[1..intervals.len() - 1];

    let doubled_sum: f64 = trimmed.iter().map(|&i| (2 * i) as f64).sum();
    let mean_ms = doubled_sum / trimmed.len() as f64;
    let mean_ticks =
        trimmed.iter().map(|&i| i as f64).sum::<f64>() / trimmed.len() as f64;
    Some(RrStats { mean_ticks, mean_ms })
}

/// One-shot analyzer over a complete capture buffer.
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> EcgResult<Self> {
        config.validate()?;
        Ok(Analyzer { config })
    }

    /// Run the full analysis over a capture buffer.
    pub fn analyze(&self, capture: &[u8]) -> EcgResult<AnalysisReport> {
        let decoder = PacketDecoder::new(self.config.sampling_rate_hz);
        let (mut leads, _stats) = decoder.decode(capture)?;
        if leads.is_empty() {
            return Err(EcgError::EmptyCapture);
        }

        self.condition(&mut leads)?;
        attach_derived_leads(&mut leads);

        let detection_i = self.detect(&leads, LeadId::I);
        let detection_ii = self.detect(&leads, LeadId::II);
        debug!(
            lead_i = detection_i.beats.len(),
            lead_ii = detection_ii.beats.len(),
            "primary leads scanned"
        );

        if detection_i.beats.is_empty() && detection_ii.beats.is_empty() {
            return Err(EcgError::NoBeats);
        }
        if detection_i.beats.len() < self.config.min_beats {
            return Err(EcgError::TooFewBeats {
                lead: LeadId::I,
                detected: detection_i.beats.len(),
                required: self.config.min_beats,
            });
        }
        if detection_ii.beats.len() < self.config.min_beats {
            return Err(EcgError::TooFewBeats {
                lead: LeadId::II,
                detected: detection_ii.beats.len(),
                required: self.config.min_beats,
            });
        }

        // The lead with more confirmed beats is authoritative; ties favor
        // lead II
        let (analysis_lead, detection) = if detection_i.beats.len() > detection_ii.beats.len() {
            (LeadId::I, detection_i)
        } else {
            (LeadId::II, detection_ii)
        };
        let rr = rr_statistics(&detection.beats);

        let series = leads
            .series(analysis_lead)
            .map(|s| s.to_vec())
            .unwrap_or_default();
        let mut classifier = MorphologyClassifier::new(self.config.morphology.clone());
        classifier.classify(&series, detection.beats.markers());
        classifier.validate_shapes();
        let template = classifier
            .dominant()
            .ok_or(EcgError::NoDominantMorphology)?;
        debug!(beats = template.count, "dominant morphology selected");

        // Orthogonal projection: the same beat windows averaged on aVF
        let ortho = leads
            .series(LeadId::AVF)
            .and_then(|avf| {
                extended_template(avf, detection.beats.markers(), self.config.morphology.extended_len)
            })
            .unwrap_or_else(|| vec![0.0; self.config.morphology.extended_len]);

        let extractor = FeatureExtractor::new();
        let fiducials = extractor.locate(&template.extended);
        let intervals = extractor.intervals(&fiducials, rr.map(|r| r.mean_ms));
        let axes = extractor.axes(&fiducials, &template.extended, &ortho);

        let mut values = ResultVector::unmeasured();
        values.p_duration_ms = intervals.p_duration_ms.unwrap_or(UNMEASURED);
        values.pr_interval_ms = intervals.pr_interval_ms.unwrap_or(UNMEASURED);
        values.qrs_duration_ms = intervals.qrs_duration_ms.unwrap_or(UNMEASURED);
        values.qt_interval_ms = intervals.qt_interval_ms.unwrap_or(UNMEASURED);
        values.qtc_interval_ms = intervals.qtc_interval_ms.unwrap_or(UNMEASURED);
        values.p_axis_deg = axes.p_deg.map(f64::from).unwrap_or(UNMEASURED);
        values.qrs_axis_deg = axes.qrs_deg.map(f64::from).unwrap_or(UNMEASURED);
        values.t_axis_deg = axes.t_deg.map(f64::from).unwrap_or(UNMEASURED);
        if let Some(rr) = rr {
            values.rr_interval_ms = rr.mean_ms;
            if rr.mean_ms > 0.0 {
                values.heart_rate_bpm = 60_000.0 / rr.mean_ms;
            }
        }

        let mut report = AnalysisReport::new(values, analysis_lead, leads);
        report.beat_indices = detection.beats.indices();
        report.annotation = detection.annotation;
        Ok(report)
    }

    /// Overwrite every captured lead with its conditioned version, each
    /// lead through a fresh filter cascade.
    fn condition(&self, leads: &mut LeadSet) -> EcgResult<()> {
        for lead in LeadId::CAPTURED {
            let Some(series) = leads.series(lead).map(|s| s.to_vec()) else {
                continue;
            };
            let mut cascade =
                FilterCascade::conditioning(self.config.baseline, self.config.powerline);
            leads.replace_captured(lead, cascade.apply(&series))?;
        }
        Ok(())
    }

    /// Detect beats on one lead; internal detector faults are downgraded
    /// to an empty beat list for that lead.
    fn detect(&self, leads: &LeadSet, lead: LeadId) -> Detection {
        let Some(series) = leads.series(lead) else {
            return empty_detection();
        };
        let detector = BeatDetector::new(self.config.detector.clone());
        match detector.detect(series) {
            Ok(detection) => detection,
            Err(error) => {
                warn!(%lead, %error, "detection fault, treating lead as beat-free");
                empty_detection()
            }
        }
    }
}

fn empty_detection() -> Detection {
    Detection {
        beats: BeatList::new(),
        annotation: Vec::new(),
        detection_signal: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecg_core::{BeatKind, BeatMarker};

    fn beats_at(indices: &[usize]) -> BeatList {
        let mut beats = BeatList::new();
        for &index in indices {
            beats.push(BeatMarker { index, kind: BeatKind::Normal });
        }
        beats
    }

    #[test]
    fn test_rr_trims_single_outliers() {
        // Intervals: 400, 400, 1000 (artifact), 100 (artifact), 400
        let beats = beats_at(&[0, 400, 800, 1800, 1900, 2300]);
        let rr = rr_statistics(&beats).unwrap();

        assert_eq!(rr.mean_ticks, 400.0);
        assert_eq!(rr.mean_ms, 800.0);
    }

    #[test]
    fn test_rr_doubling_is_exactly_twice_the_plain_mean() {
        let beats = beats_at(&[0, 410, 830, 1240, 1650, 2070]);
        let rr = rr_statistics(&beats).unwrap();
        assert_eq!(rr.mean_ms, 2.0 * rr.mean_ticks);
    }

    #[test]
    fn test_rr_needs_three_intervals() {
        assert!(rr_statistics(&beats_at(&[0, 400])).is_none());
        assert!(rr_statistics(&beats_at(&[0, 400, 800])).is_none());
        assert!(rr_statistics(&beats_at(&[0, 400, 800, 1200])).is_some());
    }

    #[test]
    fn test_empty_capture_is_fatal() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let error = analyzer.analyze(&[]).unwrap_err();
        assert_eq!(error, EcgError::EmptyCapture);
        assert_eq!(error.status_code(), -200);
    }

    #[test]
    fn test_garbage_capture_is_fatal() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let error = analyzer.analyze(&[0x55; 4096]).unwrap_err();
        assert_eq!(error.status_code(), -200);
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let mut config = AnalysisConfig::default();
        config.min_beats = 0;
        assert!(Analyzer::new(config).is_err());
    }
}
