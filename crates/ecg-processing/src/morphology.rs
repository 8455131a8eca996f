//! Online morphology clustering of detected beats
//!
//! Each confirmed beat contributes a fixed peak-centered window. A beat
//! joins the first existing class whose running-average waveform correlates
//! with it above the configured threshold, otherwise it opens a new class
//! up to the class limit; later unmatched beats are dropped. A parallel
//! extended window is accumulated per class for interval measurement.
//! Classes whose averaged peak drifts away from the window center are
//! zeroed by shape validation before the dominant template is chosen.

use crate::config::MorphologyConfig;
use ecg_core::BeatMarker;
use tracing::debug;

/// One shape class: accumulating sums plus a beat count.
#[derive(Debug, Clone)]
pub struct MorphologyClass {
    sum: Vec<f64>,
    extended_sum: Vec<f64>,
    count: usize,
}

impl MorphologyClass {
    fn new(template_len: usize, extended_len: usize) -> Self {
        MorphologyClass {
            sum: vec![0.0; template_len],
            extended_sum: vec![0.0; extended_len],
            count: 0,
        }
    }

    fn add(&mut self, window: &[f64], extended: &[f64]) {
        for (acc, &x) in self.sum.iter_mut().zip(window) {
            *acc += x;
        }
        for (acc, &x) in self.extended_sum.iter_mut().zip(extended) {
            *acc += x;
        }
        self.count += 1;
    }

    fn zero(&mut self) {
        self.sum.iter_mut().for_each(|x| *x = 0.0);
        self.extended_sum.iter_mut().for_each(|x| *x = 0.0);
        self.count = 0;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Running-average template waveform.
    pub fn average(&self) -> Vec<f64> {
        average_of(&self.sum, self.count)
    }

    /// Running-average extended waveform.
    pub fn extended_average(&self) -> Vec<f64> {
        average_of(&self.extended_sum, self.count)
    }
}

fn average_of(sum: &[f64], count: usize) -> Vec<f64> {
    if count == 0 {
        return vec![0.0; sum.len()];
    }
    sum.iter().map(|&x| x / count as f64).collect()
}

/// The dominant class's waveforms, handed to feature extraction.
#[derive(Debug, Clone)]
pub struct DominantTemplate {
    /// Peak-centered average beat
    pub average: Vec<f64>,
    /// Wider average window for interval measurement
    pub extended: Vec<f64>,
    /// Beats accumulated into the class
    pub count: usize,
}

/// Per-run morphology classifier.
pub struct MorphologyClassifier {
    config: MorphologyConfig,
    classes: Vec<MorphologyClass>,
    dropped: usize,
}

impl MorphologyClassifier {
    pub fn new(config: MorphologyConfig) -> Self {
        MorphologyClassifier {
            config,
            classes: Vec::new(),
            dropped: 0,
        }
    }

    /// Assign every beat to a class; beats too close to the series edges
    /// for a full window are skipped.
    pub fn classify(&mut self, signal: &[f64], beats: &[BeatMarker]) {
        for beat in beats {
            let Some(window) = centered_window(signal, beat.index, self.config.template_len)
            else {
                continue;
            };
            let Some(extended) = centered_window(signal, beat.index, self.config.extended_len)
            else {
                continue;
            };

            let matched = self.classes.iter_mut().find(|class| {
                class.count() > 0
                    && pearson(&class.average(), window) > self.config.correlation_threshold
            });

            if let Some(class) = matched {
                class.add(window, extended);
            } else if self.classes.len() < self.config.max_classes {
                let mut class =
                    MorphologyClass::new(self.config.template_len, self.config.extended_len);
                class.add(window, extended);
                self.classes.push(class);
            } else {
                self.dropped += 1;
            }
        }
        debug!(
            classes = self.classes.len(),
            dropped = self.dropped,
            "beats classified"
        );
    }

    /// Zero every class whose averaged absolute maximum falls outside the
    /// center tolerance; noise clusters fail this.
    pub fn validate_shapes(&mut self) {
        let center = self.config.template_len / 2;
        let tolerance = self.config.center_tolerance;
        for class in &mut self.classes {
            if class.count() == 0 {
                continue;
            }
            let average = class.average();
            let peak = average
                .iter()
                .enumerate()
                .max_by(|a, b| {
                    a.1.abs()
                        .partial_cmp(&b.1.abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i)
                .unwrap_or(center);
            if peak.abs_diff(center) > tolerance {
                debug!(peak, center, "class rejected by shape validation");
                class.zero();
            }
        }
    }

    /// Classes ranked by descending beat count.
    pub fn ranked(&self) -> Vec<&MorphologyClass> {
        let mut ranked: Vec<&MorphologyClass> = self.classes.iter().collect();
        ranked.sort_by(|a, b| b.count().cmp(&a.count()));
        ranked
    }

    /// The highest-count valid class, if any survived validation.
    pub fn dominant(&self) -> Option<DominantTemplate> {
        let best = self.ranked().into_iter().find(|c| c.count() > 0)?;
        Some(DominantTemplate {
            average: best.average(),
            extended: best.extended_average(),
            count: best.count(),
        })
    }

    /// Beats dropped after the class limit was reached.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Peak-centered window of `len` samples, or `None` near the edges.
fn centered_window(signal: &[f64], center: usize, len: usize) -> Option<&[f64]> {
    let half = len / 2;
    let start = center.checked_sub(half)?;
    let end = start + len;
    signal.get(start..end)
}

/// Average an extended window over every beat of a series.
///
/// Used to project the dominant class's beat positions onto a derived lead
/// for axis measurement.
pub fn extended_template(
    signal: &[f64],
    beats: &[BeatMarker],
    extended_len: usize,
) -> Option<Vec<f64>> {
    let mut sum = vec![0.0; extended_len];
    let mut count = 0usize;
    for beat in beats {
        if let Some(window) = centered_window(signal, beat.index, extended_len) {
            for (acc, &x) in sum.iter_mut().zip(window) {
                *acc += x;
            }
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    Some(average_of(&sum, count))
}

/// Pearson correlation of two equal-length windows, each centered on its
/// own mean. Returns 0 when either window has no variance.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for k in 0..n {
        let da = a[k] - mean_a;
        let db = b[k] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecg_core::BeatKind;

    fn marker(index: usize) -> BeatMarker {
        BeatMarker { index, kind: BeatKind::Normal }
    }

    fn add_bump(signal: &mut [f64], center: usize, amplitude: f64, half_width: usize) {
        for off in 0..=half_width {
            let value = amplitude * (1.0 - off as f64 / (half_width + 1) as f64);
            if center + off < signal.len() {
                signal[center + off] += value;
            }
            if off > 0 && center >= off {
                signal[center - off] += value;
            }
        }
    }

    #[test]
    fn test_identical_beats_form_one_class() {
        let mut signal = vec![0.0; 2400];
        let centers = [400usize, 900, 1400, 1900];
        for &c in &centers {
            add_bump(&mut signal, c, 1000.0, 8);
        }
        let beats: Vec<BeatMarker> = centers.iter().map(|&c| marker(c)).collect();

        let mut classifier = MorphologyClassifier::new(MorphologyConfig::default());
        classifier.classify(&signal, &beats);

        let dominant = classifier.dominant().unwrap();
        assert_eq!(dominant.count, 4);

        // Average of identical windows reproduces the window
        let expected = centered_window(&signal, 400, 200).unwrap();
        for (avg, exp) in dominant.average.iter().zip(expected) {
            assert!((avg - exp).abs() < 1e-9);
        }
    }

    #[test]
    fn test_anticorrelated_beats_form_two_classes() {
        let mut signal = vec![0.0; 1600];
        add_bump(&mut signal, 400, 1000.0, 8);
        add_bump(&mut signal, 1000, -1000.0, 8);

        let mut classifier = MorphologyClassifier::new(MorphologyConfig::default());
        classifier.classify(&signal, &[marker(400), marker(1000)]);

        assert_eq!(classifier.ranked().len(), 2);
    }

    #[test]
    fn test_class_limit_drops_overflow() {
        let mut config = MorphologyConfig::default();
        config.max_classes = 1;

        let mut signal = vec![0.0; 1600];
        add_bump(&mut signal, 400, 1000.0, 8);
        add_bump(&mut signal, 1000, -1000.0, 8);

        let mut classifier = MorphologyClassifier::new(config);
        classifier.classify(&signal, &[marker(400), marker(1000)]);

        assert_eq!(classifier.ranked().len(), 1);
        assert_eq!(classifier.dropped(), 1);
    }

    #[test]
    fn test_shape_validation_zeroes_off_center_class() {
        let mut signal = vec![0.0; 1200];
        // Peak sits 50 samples after the marker, outside the tolerance
        add_bump(&mut signal, 550, 1000.0, 8);

        let mut classifier = MorphologyClassifier::new(MorphologyConfig::default());
        classifier.classify(&signal, &[marker(500)]);
        assert!(classifier.dominant().is_some());

        classifier.validate_shapes();
        assert!(classifier.dominant().is_none());
    }

    #[test]
    fn test_edge_beats_are_skipped() {
        let mut signal = vec![0.0; 600];
        add_bump(&mut signal, 50, 1000.0, 8);

        let mut classifier = MorphologyClassifier::new(MorphologyConfig::default());
        classifier.classify(&signal, &[marker(50)]);
        assert!(classifier.dominant().is_none());
    }

    #[test]
    fn test_dominant_is_highest_count() {
        let mut signal = vec![0.0; 3000];
        for &c in &[400usize, 900, 1400] {
            add_bump(&mut signal, c, 1000.0, 8);
        }
        add_bump(&mut signal, 2200, -1000.0, 8);

        let beats: Vec<BeatMarker> =
            [400usize, 900, 1400, 2200].iter().map(|&c| marker(c)).collect();
        let mut classifier = MorphologyClassifier::new(MorphologyConfig::default());
        classifier.classify(&signal, &beats);
        classifier.validate_shapes();

        let dominant = classifier.dominant().unwrap();
        assert_eq!(dominant.count, 3);
        // The dominant class is the positive-bump shape
        assert!(dominant.average[100] > 0.0);
    }

    #[test]
    fn test_pearson_bounds() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);

        let inverted: Vec<f64> = a.iter().map(|x| -x).collect();
        assert!((pearson(&a, &inverted) + 1.0).abs() < 1e-12);

        let flat = [5.0; 4];
        assert_eq!(pearson(&a, &flat), 0.0);
    }

    #[test]
    fn test_extended_template_projection() {
        let mut signal = vec![0.0; 2000];
        for &c in &[500usize, 1000, 1500] {
            add_bump(&mut signal, c, 600.0, 8);
        }
        let beats: Vec<BeatMarker> = [500usize, 1000, 1500].iter().map(|&c| marker(c)).collect();

        let template = extended_template(&signal, &beats, 400).unwrap();
        assert_eq!(template.len(), 400);
        // Bump apex lands at the window center
        assert!((template[200] - 600.0).abs() < 1e-9);
    }
}
