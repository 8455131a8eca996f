//! Clinical result vector and the assembled analysis report

use crate::lead::{LeadId, LeadSet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel stored in any `ResultVector` field that could not be computed.
///
/// A zeroed field means "unmeasured", never "measured as zero"; all real
/// measurements here are strictly positive or carry a meaningful sign
/// (axes). On any non-zero analysis status the whole vector is undefined.
pub const UNMEASURED: f64 = 0.0;

/// Fixed set of clinical measurements produced by one analysis run.
///
/// Write-once: assembled by the orchestrator and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultVector {
    /// P-wave duration in ms
    pub p_duration_ms: f64,
    /// PR interval in ms
    pub pr_interval_ms: f64,
    /// QRS complex duration in ms
    pub qrs_duration_ms: f64,
    /// QT interval in ms
    pub qt_interval_ms: f64,
    /// Bazett-corrected QT in ms
    pub qtc_interval_ms: f64,
    /// P-wave frontal-plane axis in degrees
    pub p_axis_deg: f64,
    /// QRS frontal-plane axis in degrees
    pub qrs_axis_deg: f64,
    /// T-wave frontal-plane axis in degrees
    pub t_axis_deg: f64,
    /// Mean RR interval in ms (outlier-trimmed)
    pub rr_interval_ms: f64,
    /// Heart rate in beats per minute
    pub heart_rate_bpm: f64,
}

impl ResultVector {
    /// Vector with every field at the unmeasured sentinel.
    pub fn unmeasured() -> Self {
        ResultVector {
            p_duration_ms: UNMEASURED,
            pr_interval_ms: UNMEASURED,
            qrs_duration_ms: UNMEASURED,
            qt_interval_ms: UNMEASURED,
            qtc_interval_ms: UNMEASURED,
            p_axis_deg: UNMEASURED,
            qrs_axis_deg: UNMEASURED,
            t_axis_deg: UNMEASURED,
            rr_interval_ms: UNMEASURED,
            heart_rate_bpm: UNMEASURED,
        }
    }

    /// Fixed-order export for the presentation layer:
    /// [P dur, PR, QRS, QT, QTcB, P axis, QRS axis, T axis, RR, HR].
    pub fn as_array(&self) -> [f64; 10] {
        [
            self.p_duration_ms,
            self.pr_interval_ms,
            self.qrs_duration_ms,
            self.qt_interval_ms,
            self.qtc_interval_ms,
            self.p_axis_deg,
            self.qrs_axis_deg,
            self.t_axis_deg,
            self.rr_interval_ms,
            self.heart_rate_bpm,
        ]
    }
}

impl Default for ResultVector {
    fn default() -> Self {
        Self::unmeasured()
    }
}

/// Everything one analysis run hands to the presentation layer.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Unique identifier for this analysis run
    pub id: Uuid,
    /// 0 on success (fatal runs return an error instead of a report)
    pub status: i32,
    /// Clinical measurements
    pub values: ResultVector,
    /// Lead chosen as authoritative for RR and axis purposes
    pub analysis_lead: LeadId,
    /// Per-lead waveforms (captured + derived) for plotting
    pub waveforms: LeadSet,
    /// Beat peak indices on the authoritative lead
    pub beat_indices: Vec<usize>,
    /// QRS annotation waveform for the authoritative lead
    pub annotation: Vec<f64>,
}

impl AnalysisReport {
    pub fn new(values: ResultVector, analysis_lead: LeadId, waveforms: LeadSet) -> Self {
        AnalysisReport {
            id: Uuid::new_v4(),
            status: 0,
            values,
            analysis_lead,
            waveforms,
            beat_indices: Vec::new(),
            annotation: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmeasured_defaults() {
        let vector = ResultVector::default();
        assert!(vector.as_array().iter().all(|v| *v == UNMEASURED));
    }

    #[test]
    fn test_export_order() {
        let mut vector = ResultVector::unmeasured();
        vector.qrs_duration_ms = 96.0;
        vector.heart_rate_bpm = 72.0;

        let array = vector.as_array();
        assert_eq!(array[2], 96.0);
        assert_eq!(array[9], 72.0);
    }
}
