//! Synthetic ECG generation with realistic PQRST morphology
//!
//! Gaussian-pulse beat synthesis with heart-rate variability, baseline
//! wander, Gaussian noise and optional powerline interference. Amplitudes
//! are in device units so encoded captures round-trip through the decoder.

use ecg_core::{EcgError, EcgResult};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Configuration for ECG synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Base heart rate in BPM
    pub heart_rate_bpm: f64,
    /// R-peak amplitude in device units
    pub amplitude: f64,
    /// Enable respiratory heart-rate variability
    pub enable_hrv: bool,
    /// HRV magnitude as a fraction of the RR interval
    pub hrv_magnitude: f64,
    /// Baseline wander amplitude in device units
    pub baseline_wander: f64,
    /// Gaussian noise standard deviation in device units
    pub noise_std: f64,
    /// Powerline interference: (frequency Hz, amplitude), if any
    pub powerline: Option<(f64, f64)>,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            sampling_rate: 500.0,
            heart_rate_bpm: 72.0,
            amplitude: 3000.0,
            enable_hrv: true,
            hrv_magnitude: 0.02,
            baseline_wander: 20.0,
            noise_std: 8.0,
            powerline: Some((60.0, 25.0)),
            seed: 0x0EC6,
        }
    }
}

/// Per-wave timing and relative amplitude of one beat, in seconds relative
/// to the R peak.
#[derive(Debug, Clone, Copy)]
struct WavePulse {
    position: f64,
    sigma: f64,
    relative_amplitude: f64,
}

const PQRST: [WavePulse; 5] = [
    // P wave
    WavePulse { position: -0.170, sigma: 0.025, relative_amplitude: 0.12 },
    // Q wave
    WavePulse { position: -0.040, sigma: 0.008, relative_amplitude: -0.10 },
    // R wave
    WavePulse { position: 0.0, sigma: 0.012, relative_amplitude: 1.0 },
    // S wave
    WavePulse { position: 0.036, sigma: 0.008, relative_amplitude: -0.15 },
    // T wave
    WavePulse { position: 0.250, sigma: 0.060, relative_amplitude: 0.30 },
];

/// Relative gain of each captured channel (I, II, V1..V6); lead II carries
/// the full amplitude.
pub const CHANNEL_GAINS: [f64; 8] = [0.6, 1.0, 0.35, 0.5, 0.75, 0.9, 0.8, 0.7];

/// Synthetic ECG generator.
pub struct EcgSimulator {
    config: SimulatorConfig,
    rng: rand::rngs::StdRng,
    noise: Normal<f64>,
}

impl EcgSimulator {
    pub fn new(config: SimulatorConfig) -> EcgResult<Self> {
        if config.sampling_rate <= 0.0 || config.heart_rate_bpm <= 0.0 {
            return Err(EcgError::Simulation {
                message: "sampling rate and heart rate must be positive".to_string(),
            });
        }
        let noise = Normal::new(0.0, config.noise_std.max(f64::MIN_POSITIVE)).map_err(|e| {
            EcgError::Simulation {
                message: format!("failed to create noise distribution: {}", e),
            }
        })?;
        let rng = rand::rngs::StdRng::seed_from_u64(config.seed);
        Ok(EcgSimulator { config, rng, noise })
    }

    fn gaussian_pulse(t: f64, center: f64, sigma: f64, amplitude: f64) -> f64 {
        let u = (t - center) / sigma;
        amplitude * (-0.5 * u * u).exp()
    }

    /// R-peak times over the requested duration, with HRV applied.
    fn beat_times(&mut self, duration: f64) -> Vec<f64> {
        let base_rr = 60.0 / self.config.heart_rate_bpm;
        let mut times = Vec::new();
        let mut t = 0.4; // lead-in before the first beat
        while t < duration {
            times.push(t);
            let mut rr = base_rr;
            if self.config.enable_hrv {
                // Respiratory modulation plus a little beat jitter
                rr *= 1.0 + self.config.hrv_magnitude * (2.0 * std::f64::consts::PI * 0.25 * t).sin();
                rr *= 1.0 + 0.005 * self.rng.gen_range(-1.0..1.0);
            }
            t += rr;
        }
        times
    }

    /// Generate one lead at unit gain over `duration` seconds.
    pub fn generate(&mut self, duration: f64) -> EcgResult<Vec<f64>> {
        let n = (duration * self.config.sampling_rate) as usize;
        let dt = 1.0 / self.config.sampling_rate;
        let beats = self.beat_times(duration);

        let mut signal = vec![0.0; n];
        for &beat in &beats {
            for wave in &PQRST {
                let center = beat + wave.position;
                let lo = ((center - 5.0 * wave.sigma) / dt).floor().max(0.0) as usize;
                let hi = (((center + 5.0 * wave.sigma) / dt).ceil() as usize).min(n);
                for (k, slot) in signal.iter_mut().enumerate().take(hi).skip(lo) {
                    *slot += Self::gaussian_pulse(
                        k as f64 * dt,
                        center,
                        wave.sigma,
                        wave.relative_amplitude * self.config.amplitude,
                    );
                }
            }
        }

        for (k, slot) in signal.iter_mut().enumerate() {
            let t = k as f64 * dt;
            *slot += self.config.baseline_wander
                * (2.0 * std::f64::consts::PI * 0.15 * t).sin();
            if let Some((freq, amp)) = self.config.powerline {
                *slot += amp * (2.0 * std::f64::consts::PI * freq * t).sin();
            }
            if self.config.noise_std > 0.0 {
                *slot += self.noise.sample(&mut self.rng);
            }
        }

        Ok(signal)
    }

    /// Generate all eight captured channels as scaled copies of one beat
    /// train, quantized to device integer units.
    pub fn generate_channels(&mut self, duration: f64) -> EcgResult<[Vec<i16>; 8]> {
        let base = self.generate(duration)?;
        let mut channels: [Vec<i16>; 8] = Default::default();
        for (ch, gain) in CHANNEL_GAINS.iter().enumerate() {
            channels[ch] = base
                .iter()
                .map(|&v| (v * gain).clamp(i16::MIN as f64, i16::MAX as f64) as i16)
                .collect();
        }
        Ok(channels)
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }
}
