//! Beat markers produced by the detector

use serde::{Deserialize, Serialize};

/// Classification of a confirmed beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeatKind {
    /// Beat confirmed above the noise floor with a clean relocation
    Normal,
    /// Beat confirmed but with a weak or negative-excursion peak
    Suspect,
}

/// One detected beat: sample index of the relocated peak plus its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatMarker {
    /// Sample index of the beat's peak in the filtered series
    pub index: usize,
    /// Normal vs suspect classification
    pub kind: BeatKind,
}

/// Append-only, strictly increasing sequence of beat markers.
#[derive(Debug, Clone, Default)]
pub struct BeatList {
    markers: Vec<BeatMarker>,
}

impl BeatList {
    pub fn new() -> Self {
        BeatList { markers: Vec::new() }
    }

    /// Append a marker; out-of-order indices are rejected so the sequence
    /// stays strictly increasing.
    pub fn push(&mut self, marker: BeatMarker) -> bool {
        if let Some(last) = self.markers.last() {
            if marker.index <= last.index {
                return false;
            }
        }
        self.markers.push(marker);
        true
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn markers(&self) -> &[BeatMarker] {
        &self.markers
    }

    /// Peak indices only, for interval arithmetic.
    pub fn indices(&self) -> Vec<usize> {
        self.markers.iter().map(|m| m.index).collect()
    }

    /// Consecutive peak-to-peak intervals in samples.
    pub fn intervals(&self) -> Vec<usize> {
        self.markers
            .windows(2)
            .map(|w| w[1].index - w[0].index)
            .collect()
    }
}
