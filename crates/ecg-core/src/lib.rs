//! ECG-Core: Foundation types for ECG glove analysis
//!
//! Lead containers, beat markers, result vectors and the shared error type.

pub mod beat;
pub mod error;
pub mod lead;
pub mod report;

pub use beat::{BeatKind, BeatList, BeatMarker};
pub use error::{EcgError, EcgResult};
pub use lead::{LeadId, LeadSet};
pub use report::{AnalysisReport, ResultVector, UNMEASURED};
