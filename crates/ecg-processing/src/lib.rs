//! ECG-Processing: analytic pipeline for glove captures
//!
//! Packet decoding, filter conditioning, beat detection, morphology
//! classification, feature extraction and the analysis orchestrator.

pub mod analysis;
pub mod coefficients;
pub mod config;
pub mod decoder;
pub mod detector;
pub mod features;
pub mod filters;
pub mod morphology;
pub mod quality;
pub mod synthesis;

pub use analysis::{rr_statistics, Analyzer, RrStats};
pub use config::{AnalysisConfig, DetectorConfig, MorphologyConfig};
pub use decoder::{DecodeStats, PacketDecoder};
pub use detector::{BeatDetector, Detection};
pub use features::{AxisSet, FeatureExtractor, Fiducials, IntervalSet, WavePoint, MS_PER_TICK};
pub use filters::{BaselineCutoff, DirectFormFilter, FilterCascade, PowerlineFreq};
pub use morphology::{DominantTemplate, MorphologyClassifier};
pub use quality::{LeadQuality, QualityAnalyzer, QualitySummary, WeightProfile};
pub use synthesis::{attach_derived_leads, derive_leads, DerivedLeads};
