//! Lead identifiers and the per-lead sample container

use crate::error::{EcgError, EcgResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard 12-lead identifiers.
///
/// The glove captures eight channels directly (I, II, V1..V6); the four
/// remaining limb leads are linear combinations of I and II computed after
/// decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadId {
    I,
    II,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    III,
    AVR,
    AVL,
    AVF,
}

impl LeadId {
    /// Channel order as emitted by the device, one per sub-frame slot.
    pub const CAPTURED: [LeadId; 8] = [
        LeadId::I,
        LeadId::II,
        LeadId::V1,
        LeadId::V2,
        LeadId::V3,
        LeadId::V4,
        LeadId::V5,
        LeadId::V6,
    ];

    /// Leads derived from I and II rather than captured.
    pub const DERIVED: [LeadId; 4] = [LeadId::III, LeadId::AVR, LeadId::AVL, LeadId::AVF];

    /// Device channel index for captured leads.
    pub fn channel(&self) -> Option<usize> {
        LeadId::CAPTURED.iter().position(|l| l == self)
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LeadId::I => "I",
            LeadId::II => "II",
            LeadId::V1 => "V1",
            LeadId::V2 => "V2",
            LeadId::V3 => "V3",
            LeadId::V4 => "V4",
            LeadId::V5 => "V5",
            LeadId::V6 => "V6",
            LeadId::III => "III",
            LeadId::AVR => "aVR",
            LeadId::AVL => "aVL",
            LeadId::AVF => "aVF",
        };
        write!(f, "{}", name)
    }
}

/// Container for one capture's per-lead sample series.
///
/// Captured series are appended during decode and never mutated afterwards;
/// derived leads are attached once by the synthesizer. Samples are stored
/// as `f64` so downstream filters accumulate without integer drift, but
/// decoded values stay in the signed 16-bit range.
#[derive(Debug, Clone)]
pub struct LeadSet {
    /// Unique identifier for this capture
    pub id: Uuid,
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    captured: [Vec<f64>; 8],
    derived: Vec<(LeadId, Vec<f64>)>,
}

impl LeadSet {
    /// Create an empty lead set for one analysis run.
    pub fn new(sampling_rate: f64) -> Self {
        LeadSet {
            id: Uuid::new_v4(),
            sampling_rate,
            captured: Default::default(),
            derived: Vec::new(),
        }
    }

    /// Append one decoded sample to a captured channel.
    pub fn push_sample(&mut self, channel: usize, value: f64) {
        if let Some(series) = self.captured.get_mut(channel) {
            series.push(value);
        }
    }

    /// Samples for a lead, captured or derived.
    pub fn series(&self, lead: LeadId) -> Option<&[f64]> {
        if let Some(ch) = lead.channel() {
            return Some(&self.captured[ch]);
        }
        self.derived
            .iter()
            .find(|(id, _)| *id == lead)
            .map(|(_, s)| s.as_slice())
    }

    /// Attach a derived lead series, replacing any previous one.
    pub fn attach_derived(&mut self, lead: LeadId, series: Vec<f64>) {
        self.derived.retain(|(id, _)| *id != lead);
        self.derived.push((lead, series));
    }

    /// Overwrite a captured series after an in-place filter pass.
    pub fn replace_captured(&mut self, lead: LeadId, series: Vec<f64>) -> EcgResult<()> {
        let ch = lead.channel().ok_or_else(|| EcgError::InvalidConfig {
            message: format!("lead {} is not a captured channel", lead),
        })?;
        self.captured[ch] = series;
        Ok(())
    }

    /// Trim the two limb-lead series to a common length.
    ///
    /// A truncated trailing packet can leave the channels one sub-frame
    /// apart; derived-lead arithmetic needs equal lengths.
    pub fn trim_primary(&mut self) {
        let len = self.captured[0].len().min(self.captured[1].len());
        self.captured[0].truncate(len);
        self.captured[1].truncate(len);
    }

    /// Total samples decoded across all captured channels.
    pub fn total_samples(&self) -> usize {
        self.captured.iter().map(|s| s.len()).sum()
    }

    /// True if no captured channel holds any samples.
    pub fn is_empty(&self) -> bool {
        self.captured.iter().all(|s| s.is_empty())
    }

    /// All lead series in presentation order (captured then derived).
    pub fn all_series(&self) -> Vec<(LeadId, &[f64])> {
        let mut out: Vec<(LeadId, &[f64])> = LeadId::CAPTURED
            .iter()
            .enumerate()
            .map(|(ch, id)| (*id, self.captured[ch].as_slice()))
            .collect();
        for (id, s) in &self.derived {
            out.push((*id, s.as_slice()));
        }
        out
    }

    /// Capture duration in seconds, judged from the longest channel.
    pub fn duration(&self) -> f64 {
        let longest = self.captured.iter().map(|s| s.len()).max().unwrap_or(0);
        longest as f64 / self.sampling_rate
    }
}
