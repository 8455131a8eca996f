//! Per-lead signal quality assessment
//!
//! Spectral screening of each lead for the usual acquisition problems:
//! muscle artifact, poor electrode contact, powerline pickup, baseline
//! drift and low SNR. Scores are advisory for the presentation layer and
//! never gate the analysis pipeline.

use ecg_core::{LeadId, LeadSet};
use num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Quality flags and measurements for a single lead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadQuality {
    pub muscle_artifact: bool,
    pub bad_electrode_contact: bool,
    pub powerline_interference: bool,
    pub baseline_drift: bool,
    pub low_snr: bool,
    /// Estimated signal-to-noise ratio in dB
    pub snr_db: f64,
    /// Peak-to-peak amplitude
    pub qrs_amplitude: f64,
}

impl LeadQuality {
    /// Quality score in [0, 1] from weighted deductions.
    pub fn score(&self) -> f64 {
        let mut score: f64 = 1.0;
        if self.muscle_artifact {
            score -= 0.3;
        }
        if self.bad_electrode_contact {
            score -= 0.4;
        }
        if self.powerline_interference {
            score -= 0.2;
        }
        if self.baseline_drift {
            score -= 0.2;
        }
        if self.low_snr {
            score -= 0.3;
        }
        score.max(0.0)
    }

    /// Short description of the lead's problems, if any.
    pub fn problems(&self) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if self.bad_electrode_contact {
            problems.push("poor electrode contact");
        }
        if self.muscle_artifact {
            problems.push("muscle movement interference");
        }
        if self.powerline_interference {
            problems.push("electrical interference");
        }
        if self.baseline_drift {
            problems.push("baseline wandering");
        }
        if self.low_snr {
            problems.push("low signal quality");
        }
        problems
    }
}

/// Quality of every lead plus the weighted overall score.
#[derive(Debug, Clone, Default)]
pub struct QualitySummary {
    pub per_lead: Vec<(LeadId, LeadQuality)>,
    /// Weighted average of per-lead scores
    pub overall: f64,
    /// Human-readable problem lines for leads scoring under 0.8
    pub problem_summary: Vec<String>,
}

/// Lead weighting profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightProfile {
    /// Standard clinical reading weights
    Clinical,
    /// Ambulance triage weights (lead II emphasized)
    Ambulance,
}

const CLINICAL_WEIGHTS: [(LeadId, f64); 12] = [
    (LeadId::I, 0.07),
    (LeadId::II, 0.12),
    (LeadId::III, 0.06),
    (LeadId::AVR, 0.04),
    (LeadId::AVL, 0.06),
    (LeadId::AVF, 0.09),
    (LeadId::V1, 0.10),
    (LeadId::V2, 0.10),
    (LeadId::V3, 0.10),
    (LeadId::V4, 0.08),
    (LeadId::V5, 0.09),
    (LeadId::V6, 0.09),
];

const AMBULANCE_WEIGHTS: [(LeadId, f64); 12] = [
    (LeadId::I, 0.06),
    (LeadId::II, 0.20),
    (LeadId::III, 0.07),
    (LeadId::AVR, 0.03),
    (LeadId::AVL, 0.05),
    (LeadId::AVF, 0.10),
    (LeadId::V1, 0.12),
    (LeadId::V2, 0.10),
    (LeadId::V3, 0.08),
    (LeadId::V4, 0.07),
    (LeadId::V5, 0.06),
    (LeadId::V6, 0.06),
];

const DEFAULT_WEIGHT: f64 = 0.08;

/// Per-run quality analyzer.
pub struct QualityAnalyzer {
    sampling_rate: f64,
    profile: WeightProfile,
    planner: FftPlanner<f64>,
}

impl QualityAnalyzer {
    pub fn new(sampling_rate: f64, profile: WeightProfile) -> Self {
        QualityAnalyzer {
            sampling_rate,
            profile,
            planner: FftPlanner::new(),
        }
    }

    fn weight(&self, lead: LeadId) -> f64 {
        let table = match self.profile {
            WeightProfile::Clinical => &CLINICAL_WEIGHTS,
            WeightProfile::Ambulance => &AMBULANCE_WEIGHTS,
        };
        table
            .iter()
            .find(|(id, _)| *id == lead)
            .map(|(_, w)| *w)
            .unwrap_or(DEFAULT_WEIGHT)
    }

    /// One-sided power spectrum (DC excluded) of a mean-centered signal.
    fn power_spectrum(&mut self, signal: &[f64]) -> (Vec<f64>, f64) {
        let n = signal.len();
        let mean = signal.iter().sum::<f64>() / n as f64;
        let fft_size = n.next_power_of_two();
        let fft = self.planner.plan_fft_forward(fft_size);

        let mut buffer: Vec<Complex<f64>> =
            signal.iter().map(|&x| Complex::new(x - mean, 0.0)).collect();
        buffer.resize(fft_size, Complex::new(0.0, 0.0));
        fft.process(&mut buffer);

        let spectrum: Vec<f64> = buffer[1..fft_size / 2].iter().map(|c| c.norm_sqr()).collect();
        let resolution = self.sampling_rate / fft_size as f64;
        (spectrum, resolution)
    }

    /// Analyze one lead's signal.
    pub fn analyze_lead(&mut self, signal: &[f64]) -> LeadQuality {
        let mut quality = LeadQuality::default();
        if signal.len() < 64 {
            return quality;
        }

        let n = signal.len();
        let (spectrum, resolution) = self.power_spectrum(signal);
        let band = |lo: f64, hi: f64| -> f64 {
            spectrum
                .iter()
                .enumerate()
                .filter(|(k, _)| {
                    let f = (*k + 1) as f64 * resolution;
                    f > lo && f < hi
                })
                .map(|(_, p)| p)
                .sum()
        };
        let total: f64 = spectrum.iter().sum();

        let min = signal.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = signal.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        quality.qrs_amplitude = max - min;

        if total > 0.0 {
            // Muscle artifact: high-frequency energy excluding the mains band
            let hf = band(40.0, 100.0) - band(49.0, 51.0);
            if hf / total > 0.1 {
                quality.muscle_artifact = true;
            }

            let low_freq = band(0.01, 0.5);
            if low_freq / total > 0.2 {
                quality.bad_electrode_contact = true;
            }
            if low_freq / total > 0.1 {
                quality.baseline_drift = true;
            }

            let mains = band(49.0, 51.0) + band(59.0, 61.0);
            if mains / total > 0.05 {
                quality.powerline_interference = true;
            }
        }

        // SNR: compare peak-to-peak amplitude against out-of-band power
        let fft_size = n.next_power_of_two() as f64;
        let in_band = band(0.5, 40.0);
        let noise_mean_sq = 2.0 * (total - in_band) / (fft_size * n as f64);
        let snr = 10.0
            * ((quality.qrs_amplitude * quality.qrs_amplitude) / (noise_mean_sq + 1e-10)).log10();
        quality.snr_db = snr;
        if snr < 10.0 {
            quality.low_snr = true;
        }

        quality
    }

    /// Analyze every non-empty lead and compute the weighted overall score.
    pub fn analyze_all(&mut self, leads: &LeadSet) -> QualitySummary {
        let mut summary = QualitySummary::default();
        let series: Vec<(LeadId, Vec<f64>)> = leads
            .all_series()
            .into_iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(id, s)| (id, s.to_vec()))
            .collect();

        for (lead, signal) in series {
            let quality = self.analyze_lead(&signal);
            let score = quality.score();
            summary.overall += score * self.weight(lead);

            if score < 0.8 {
                let problems = quality.problems();
                if !problems.is_empty() {
                    summary
                        .problem_summary
                        .push(format!("Lead {}: {}", lead, problems.join(", ")));
                }
            }
            summary.per_lead.push((lead, quality));
        }

        debug!(
            leads = summary.per_lead.len(),
            overall = summary.overall,
            "quality assessed"
        );
        summary
    }
}
