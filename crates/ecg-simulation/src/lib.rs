//! ECG-Simulation: synthetic ECG generation and capture encoding
//!
//! Realistic PQRST synthesis plus the inverse of the packet decoder, used
//! by tests and development tooling.

pub mod capture;
pub mod ecg_simulator;

pub use capture::CaptureEncoder;
pub use ecg_simulator::{EcgSimulator, SimulatorConfig, CHANNEL_GAINS};
