//! Frequency-band instrument scoring.
//!
//! Each instrument owns a closed frequency interval; its base score is the
//! mean STFT magnitude over that interval. A few regional instruments get
//! extra score from bespoke rules (see [`Thresholds`]).

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::thresholds::Thresholds;
use crate::audio::analysis::spectral_centroid_in;
use crate::audio::stft::Spectrogram;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrequencyBandSpec {
    pub name: &'static str,
    pub low_hz: f32,
    pub high_hz: f32,
}

const fn band(name: &'static str, low_hz: f32, high_hz: f32) -> FrequencyBandSpec {
    FrequencyBandSpec {
        name,
        low_hz,
        high_hz,
    }
}

/// Declaration order breaks score ties.
pub static INSTRUMENT_BANDS: [FrequencyBandSpec; 19] = [
    band("bass", 20.0, 250.0),
    band("kick_drum", 20.0, 100.0),
    band("snare_drum", 100.0, 300.0),
    band("hi_hat", 2000.0, 15000.0),
    band("guitar", 80.0, 2000.0),
    band("electric_guitar", 80.0, 5000.0),
    band("piano", 27.0, 4186.0),
    band("violin", 196.0, 2637.0),
    band("cello", 65.0, 987.0),
    band("trumpet", 165.0, 1175.0),
    band("saxophone", 110.0, 880.0),
    band("synthesizer", 20.0, 20000.0),
    band("vocals", 85.0, 255.0),
    band("kemenche", 200.0, 3000.0),
    band("tulum", 100.0, 2000.0),
    band("davul", 50.0, 500.0),
    band("zurna", 500.0, 4000.0),
    band("baglama", 80.0, 2000.0),
    band("accordion", 100.0, 3000.0),
];

/// Narrower sub-bands the boost rules listen to.
pub const KEMENCHE_CORE: FrequencyBandSpec = band("kemenche", 800.0, 2500.0);
pub const TULUM_CORE: FrequencyBandSpec = band("tulum", 400.0, 1800.0);
pub const ZURNA_CORE: FrequencyBandSpec = band("zurna", 1500.0, 5000.0);
pub const DAVUL_CORE: FrequencyBandSpec = band("davul", 50.0, 300.0);

/// Window-level cues some boost rules are gated on.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpectralCues {
    /// Mean spectral centroid (Hz)
    pub spectral_centroid: f32,
    pub onset_count: usize,
}

/// Instrument name to score, kept in band-table order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstrumentScores {
    entries: Vec<(&'static str, f32)>,
}

impl InstrumentScores {
    pub fn get(&self, name: &str) -> f32 {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map_or(0.0, |(_, s)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn mean(&self) -> f32 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.entries.iter().map(|(_, s)| s).sum::<f32>() / self.entries.len() as f32
    }

    fn add(&mut self, name: &'static str, amount: f32) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, s)) => *s += amount,
            None => self.entries.push((name, amount)),
        }
    }

    /// Highest scores first, ties in table order, at most `top_n`, each above `floor`.
    pub fn ranked(&self, top_n: usize, floor: f32) -> Vec<(&'static str, f32)> {
        let mut sorted = self.entries.clone();
        // Stable sort keeps table order among equal scores
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
        sorted
            .into_iter()
            .take(top_n)
            .filter(|(_, s)| *s > floor)
            .collect()
    }
}

impl FromIterator<(&'static str, f32)> for InstrumentScores {
    fn from_iter<I: IntoIterator<Item = (&'static str, f32)>>(iter: I) -> Self {
        let mut scores = InstrumentScores::default();
        for (name, score) in iter {
            scores.add(name, score);
        }
        scores
    }
}

impl Serialize for InstrumentScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, score) in &self.entries {
            map.serialize_entry(name, score)?;
        }
        map.end()
    }
}

/// Mean magnitude per band, in table order. Bands with no bins below
/// Nyquist are left out.
pub fn base_scores(spec: &Spectrogram) -> InstrumentScores {
    INSTRUMENT_BANDS
        .iter()
        .filter_map(|b| {
            let bins = spec.bins_between(b.low_hz, b.high_hz);
            spec.mean_over(&bins).map(|e| (b.name, e))
        })
        .collect()
}

/// Base scores plus the regional boost rules.
pub fn score_instruments(
    spec: &Spectrogram,
    cues: &SpectralCues,
    thresholds: &Thresholds,
) -> InstrumentScores {
    let mut scores = base_scores(spec);
    let mean_energy = scores.mean();
    log::debug!("Mean band energy: {:.4}", mean_energy);

    let core_energy = |core: &FrequencyBandSpec| -> Option<(Vec<usize>, f32)> {
        let bins = spec.bins_between(core.low_hz, core.high_hz);
        let e = spec.mean_over(&bins)?;
        Some((bins, e))
    };

    let k = &thresholds.kemenche;
    if k.enabled {
        if let Some((_, energy)) = core_energy(&KEMENCHE_CORE) {
            let bright = cues.spectral_centroid > k.bright_centroid_hz;
            let violin = scores.get("violin");
            let violin_detected = k.violin_assist && violin > thresholds.detection_floor;
            if energy > mean_energy * k.energy_ratio
                || (energy > mean_energy * k.bright_energy_ratio && bright)
                || violin_detected
            {
                scores.add(KEMENCHE_CORE.name, energy * k.gain);
                if violin_detected && energy > violin {
                    scores.add(KEMENCHE_CORE.name, energy * k.violin_gain);
                }
                log::debug!("Kemenche boost: core={:.4}, violin={:.4}", energy, violin);
            }
        }
    }

    let t = &thresholds.tulum;
    if t.enabled {
        if let Some((bins, energy)) = core_energy(&TULUM_CORE) {
            let steady = spec.variance_over(&bins) < spec.total_variance() * t.variance_ratio;
            if energy > mean_energy * t.energy_ratio && steady {
                scores.add(TULUM_CORE.name, energy * t.gain);
                log::debug!("Tulum boost: core={:.4}", energy);
            }
        }
    }

    let z = &thresholds.zurna;
    if z.enabled {
        if let Some((_, energy)) = core_energy(&ZURNA_CORE) {
            if energy > mean_energy * z.energy_ratio {
                scores.add(ZURNA_CORE.name, energy * z.gain);
                log::debug!("Zurna boost: core={:.4}", energy);
            }
        }
    }

    let d = &thresholds.davul;
    if d.enabled {
        if let Some((_, energy)) = core_energy(&DAVUL_CORE) {
            if energy > mean_energy * d.energy_ratio && cues.onset_count > d.min_onsets {
                scores.add(DAVUL_CORE.name, energy * d.gain);
                log::debug!("Davul boost: core={:.4}, onsets={}", energy, cues.onset_count);
            }
        }
    }

    scores
}

/// Frame-wise centroid inside the kemenche core band; used by the
/// detailed analyzer to tell vibrato from a clean line.
pub fn kemenche_centroid_track(spec: &Spectrogram) -> Vec<f32> {
    let bins = spec.bins_between(KEMENCHE_CORE.low_hz, KEMENCHE_CORE.high_hz);
    if bins.is_empty() {
        return Vec::new();
    }
    spectral_centroid_in(spec, &bins)
        .into_iter()
        .filter(|&c| c > 0.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 22050;
    const FFT: usize = 2048;

    /// Spectrogram whose cell at (bin frequency, frame) is `level(freq, frame)`.
    fn painted(
        sample_rate: u32,
        frames: usize,
        level: impl Fn(f32, usize) -> f32,
    ) -> Spectrogram {
        let bins = FFT / 2 + 1;
        let frequencies: Vec<f32> = (0..bins)
            .map(|k| k as f32 * sample_rate as f32 / FFT as f32)
            .collect();
        let magnitudes = frequencies
            .iter()
            .map(|&f| (0..frames).map(|t| level(f, t)).collect())
            .collect();
        Spectrogram {
            magnitudes,
            frequencies,
            sample_rate,
            hop_size: 512,
        }
    }

    /// Spectrogram with `level` in every bin inside `[low, high]` and zero elsewhere.
    fn shaped(sample_rate: u32, frames: usize, low: f32, high: f32, level: f32) -> Spectrogram {
        painted(sample_rate, frames, |f, _| {
            if f >= low && f <= high {
                level
            } else {
                0.0
            }
        })
    }

    fn without_violin_assist() -> Thresholds {
        let mut t = Thresholds::basic();
        t.kemenche.violin_assist = false;
        t
    }

    fn names(ranked: &[(&'static str, f32)]) -> Vec<&'static str> {
        ranked.iter().map(|(n, _)| *n).collect()
    }

    #[test]
    fn silent_spectrum_scores_zero() {
        let spec = shaped(SR, 50, 0.0, 0.0, 0.0);
        let scores = score_instruments(
            &spec,
            &SpectralCues {
                spectral_centroid: 0.0,
                onset_count: 50,
            },
            &Thresholds::basic(),
        );
        assert_eq!(scores.iter().count(), INSTRUMENT_BANDS.len());
        assert!(scores.iter().all(|(_, s)| s == 0.0));
        assert!(scores.ranked(6, 0.1).is_empty());
    }

    #[test]
    fn low_band_energy_boosts_davul() {
        let spec = shaped(SR, 50, 50.0, 300.0, 1.0);
        let cues = SpectralCues {
            spectral_centroid: 175.0,
            onset_count: 20,
        };
        let boosted = score_instruments(&spec, &cues, &Thresholds::basic());
        let base = base_scores(&spec);
        assert!((boosted.get("davul") - (base.get("davul") + 0.7)).abs() < 1e-4);

        let top = names(&boosted.ranked(6, 0.1));
        assert_eq!(top[0], "davul");
        assert!(top.contains(&"snare_drum"));
    }

    #[test]
    fn davul_needs_rhythmic_activity() {
        let spec = shaped(SR, 50, 50.0, 300.0, 1.0);
        let cues = SpectralCues {
            spectral_centroid: 175.0,
            onset_count: 10,
        };
        let scores = score_instruments(&spec, &cues, &Thresholds::basic());
        assert_eq!(scores.get("davul"), base_scores(&spec).get("davul"));
    }

    #[test]
    fn energy_outside_all_bands_detects_nothing() {
        // 48 kHz leaves room above the widest band
        let spec = shaped(48000, 50, 21000.0, 23000.0, 1.0);
        let scores = score_instruments(
            &spec,
            &SpectralCues {
                spectral_centroid: 22000.0,
                onset_count: 30,
            },
            &Thresholds::basic(),
        );
        assert!(scores.ranked(6, 0.1).is_empty());
    }

    #[test]
    fn bright_mid_band_boosts_kemenche() {
        let spec = shaped(SR, 50, 800.0, 2500.0, 1.0);
        let cues = SpectralCues {
            spectral_centroid: 1650.0,
            onset_count: 0,
        };
        let scores = score_instruments(&spec, &cues, &Thresholds::basic());
        let base = base_scores(&spec);
        // Saturated core outweighs violin, so the assisted gain stacks on top
        assert!((scores.get("kemenche") - (base.get("kemenche") + 1.5)).abs() < 1e-4);
        assert_eq!(names(&scores.ranked(8, 0.1))[0], "kemenche");
    }

    #[test]
    fn moderate_kemenche_core_needs_bright_centroid() {
        // Core sits at about 1.07x the band mean: above the bright ratio, below the plain one
        let spec = painted(SR, 50, |f, _| if (800.0..=2500.0).contains(&f) { 1.1 } else { 1.0 });
        let base = base_scores(&spec).get("kemenche");
        let thresholds = without_violin_assist();

        let bright = SpectralCues {
            spectral_centroid: 2500.0,
            onset_count: 0,
        };
        let scores = score_instruments(&spec, &bright, &thresholds);
        assert!((scores.get("kemenche") - (base + 1.1)).abs() < 1e-4);

        let dark = SpectralCues {
            spectral_centroid: 1500.0,
            onset_count: 0,
        };
        let scores = score_instruments(&spec, &dark, &thresholds);
        assert_eq!(scores.get("kemenche"), base);
    }

    #[test]
    fn audible_violin_alone_triggers_kemenche() {
        let cues = SpectralCues {
            spectral_centroid: 1500.0,
            onset_count: 0,
        };

        // Flat spectrum: core equals the mean, so only the violin cue can fire
        let flat = painted(SR, 50, |_, _| 1.0);
        let base = base_scores(&flat).get("kemenche");
        let assisted = score_instruments(&flat, &cues, &Thresholds::basic());
        // Core does not exceed violin, so no second gain
        assert!((assisted.get("kemenche") - (base + 1.0)).abs() < 1e-4);
        let unassisted = score_instruments(&flat, &cues, &without_violin_assist());
        assert_eq!(unassisted.get("kemenche"), base);

        let quiet = painted(SR, 50, |_, _| 0.05);
        let scores = score_instruments(&quiet, &cues, &Thresholds::basic());
        assert_eq!(scores.get("kemenche"), base_scores(&quiet).get("kemenche"));
    }

    #[test]
    fn fluctuating_tulum_core_is_not_boosted() {
        let spec = painted(SR, 50, |f, t| {
            if (400.0..=1800.0).contains(&f) && t % 2 == 0 {
                4.0
            } else {
                0.0
            }
        });
        let base = base_scores(&spec).get("tulum");
        let scores = score_instruments(&spec, &SpectralCues::default(), &Thresholds::basic());
        assert_eq!(scores.get("tulum"), base);
    }

    #[test]
    fn detailed_profile_skips_zurna() {
        let spec = shaped(SR, 50, 1500.0, 5000.0, 1.0);
        let cues = SpectralCues::default();
        let basic = score_instruments(&spec, &cues, &Thresholds::basic());
        let detailed = score_instruments(&spec, &cues, &Thresholds::detailed());
        let base = base_scores(&spec).get("zurna");
        assert!(basic.get("zurna") > base);
        assert_eq!(detailed.get("zurna"), base);
    }

    #[test]
    fn steady_drone_boosts_tulum() {
        let spec = shaped(SR, 50, 400.0, 1800.0, 1.0);
        let scores = score_instruments(&spec, &SpectralCues::default(), &Thresholds::detailed());
        let base = base_scores(&spec).get("tulum");
        assert!((scores.get("tulum") - (base + 0.6)).abs() < 1e-4);
    }

    #[test]
    fn ranking_is_descending_and_ties_follow_table() {
        let scores: InstrumentScores = [
            ("bass", 0.5),
            ("kick_drum", 0.9),
            ("snare_drum", 0.5),
            ("hi_hat", 0.05),
            ("guitar", 0.9),
        ]
        .into_iter()
        .collect();
        let ranked = scores.ranked(6, 0.1);
        assert_eq!(
            names(&ranked),
            vec!["kick_drum", "guitar", "bass", "snare_drum"]
        );
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
        assert!(ranked.iter().all(|(_, s)| *s > 0.1));
        assert_eq!(names(&scores.ranked(2, 0.1)), vec!["kick_drum", "guitar"]);
    }

    #[test]
    fn scores_serialize_as_ordered_map() {
        let scores: InstrumentScores = [("bass", 0.5), ("davul", 1.0)].into_iter().collect();
        assert_eq!(
            serde_json::to_string(&scores).unwrap(),
            r#"{"bass":0.5,"davul":1.0}"#
        );
    }
}
