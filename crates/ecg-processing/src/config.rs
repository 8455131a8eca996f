//! Analysis configuration
//!
//! All tunables for one analysis run, serializable for profile storage.
//! A fresh pipeline is constructed from the configuration per run; nothing
//! here is shared between concurrent analyses.

use crate::filters::{BaselineCutoff, PowerlineFreq};
use ecg_core::{EcgError, EcgResult};
use serde::{Deserialize, Serialize};

/// Beat detector tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Starting (and floor) value of the adaptive threshold
    pub threshold_min: f64,
    /// Samples a candidate must survive unchallenged before confirmation
    pub confirm_window: usize,
    /// Minimum detection-signal height for a confirmed candidate
    pub noise_floor: f64,
    /// Half-width of the raw-signal window searched for the true peak
    pub relocation_window: usize,
    /// Minimum relocated raw amplitude; weaker beats are discarded
    pub amplitude_floor: f64,
    /// Recalibrate the threshold after this many candidate peaks
    pub recalibration_interval: usize,
    /// Threshold as a fraction of the short-run peak average
    pub recalibration_fraction: f64,
    /// Samples without a confirmed beat before the single rescan retry
    pub long_gap: usize,
    /// QRS annotation window after each confirmed beat
    pub annotation_window: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            threshold_min: 20.0,
            confirm_window: 100,
            noise_floor: 50.0,
            relocation_window: 100,
            amplitude_floor: 60.0,
            recalibration_interval: 8,
            recalibration_fraction: 0.5,
            long_gap: 1500,
            annotation_window: 25,
        }
    }
}

/// Morphology classifier tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MorphologyConfig {
    /// Pearson correlation required to join an existing class
    pub correlation_threshold: f64,
    /// Maximum number of shape classes
    pub max_classes: usize,
    /// Single-beat template window length in samples
    pub template_len: usize,
    /// Extended template window length for interval measurement
    pub extended_len: usize,
    /// Shape validation: |max| must sit within this of the window center
    pub center_tolerance: usize,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        MorphologyConfig {
            correlation_threshold: 0.85,
            max_classes: 8,
            template_len: 200,
            extended_len: 400,
            center_tolerance: 20,
        }
    }
}

/// Complete configuration for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Device sampling rate in Hz
    pub sampling_rate_hz: f64,
    /// Baseline-removal cutoff
    pub baseline: BaselineCutoff,
    /// Powerline notch selection
    pub powerline: PowerlineFreq,
    /// Minimum confirmed beats per primary lead
    pub min_beats: usize,
    /// Beat detector tunables
    pub detector: DetectorConfig,
    /// Morphology classifier tunables
    pub morphology: MorphologyConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            sampling_rate_hz: 500.0,
            baseline: BaselineCutoff::Hz05,
            powerline: PowerlineFreq::Hz60,
            min_beats: 4,
            detector: DetectorConfig::default(),
            morphology: MorphologyConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Default profile for 50 Hz mains regions.
    pub fn mains_50hz() -> Self {
        AnalysisConfig {
            powerline: PowerlineFreq::Hz50,
            ..Default::default()
        }
    }

    /// Validate the configuration before constructing a pipeline.
    pub fn validate(&self) -> EcgResult<()> {
        if self.sampling_rate_hz <= 0.0 {
            return Err(EcgError::InvalidConfig {
                message: "sampling rate must be positive".to_string(),
            });
        }
        if self.min_beats == 0 {
            return Err(EcgError::InvalidConfig {
                message: "minimum beat count must be at least 1".to_string(),
            });
        }
        if self.detector.confirm_window == 0 || self.detector.threshold_min <= 0.0 {
            return Err(EcgError::InvalidConfig {
                message: "detector window and threshold must be positive".to_string(),
            });
        }
        if self.detector.recalibration_interval == 0 {
            return Err(EcgError::InvalidConfig {
                message: "recalibration interval must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.morphology.correlation_threshold) {
            return Err(EcgError::InvalidConfig {
                message: "correlation threshold must lie in [0, 1]".to_string(),
            });
        }
        if self.morphology.template_len == 0
            || self.morphology.template_len > self.morphology.extended_len
        {
            return Err(EcgError::InvalidConfig {
                message: "template window must be nonzero and within the extended window"
                    .to_string(),
            });
        }
        if self.morphology.max_classes == 0 {
            return Err(EcgError::InvalidConfig {
                message: "at least one morphology class is required".to_string(),
            });
        }
        Ok(())
    }

    /// Export configuration to JSON.
    pub fn to_json(&self) -> EcgResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EcgError::InvalidConfig {
            message: format!("failed to serialize configuration: {}", e),
        })
    }

    /// Import configuration from JSON.
    pub fn from_json(json: &str) -> EcgResult<Self> {
        let config: AnalysisConfig =
            serde_json::from_str(json).map_err(|e| EcgError::InvalidConfig {
                message: format!("failed to deserialize configuration: {}", e),
            })?;
        config.validate()?;
        Ok(config)
    }
}
