//! Detailed analysis path.
//!
//! Extends the basic features with key and mode, melodic contour, a rough
//! rhythm profile, dynamics over the window, spectral character and a set of
//! regional-folk characteristics. The style labels are heuristics.

use serde::Serialize;
use std::fmt;

use crate::analyzer::{EnergyLevel, Overrides};
use crate::audio::analysis::{extract, mean, variance};
use crate::audio::decode::AudioBuffer;
use crate::audio::features::{Mode, PitchClass, SpectralFeatures};
use crate::audio::source::{load_window, AudioSource, WindowRequest};
use crate::audio::stft::{Spectrogram, FFT_SIZE, HOP_SIZE};
use crate::audio::tonal::estimate_key;
use crate::classify::bands::{kemenche_centroid_track, TULUM_CORE};
use crate::classify::genre::{REGIONAL_GENRE, UNKNOWN_GENRE};
use crate::classify::{score_instruments, InstrumentScores, SpectralCues, Thresholds};
use crate::error::Result;

/// Instruments kept in the detailed result.
pub const DETAILED_TOP_N: usize = 8;

/// Pitch search range for the melodic contour (Hz)
const PITCH_MIN_HZ: f32 = 150.0;
const PITCH_MAX_HZ: f32 = 4000.0;
const PITCH_MAGNITUDE_FLOOR: f32 = 0.1;

/// Centroid variance (Hz²) above which the kemenche line counts as vibrato
const VIBRATO_VARIANCE: f32 = 50_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MelodicDirection {
    Ascending,
    Descending,
    Stable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TimeSignature {
    #[serde(rename = "4/4")]
    FourFour,
    #[serde(rename = "unknown")]
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RhythmicComplexity {
    Low,
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyContour {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Brightness {
    Bright,
    Medium,
    Dark,
}

macro_rules! label_display {
    ($ty:ty { $($variant:ident => $label:expr),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $(Self::$variant => $label),+
                })
            }
        }
    };
}

label_display!(MelodicDirection {
    Ascending => "ascending",
    Descending => "descending",
    Stable => "stable",
});
label_display!(TimeSignature {
    FourFour => "4/4",
    Unknown => "unknown",
});
label_display!(RhythmicComplexity {
    Low => "low",
    Medium => "medium",
    High => "high",
});
label_display!(EnergyContour {
    Increasing => "increasing",
    Decreasing => "decreasing",
    Stable => "stable",
});
label_display!(Brightness {
    Bright => "bright",
    Medium => "medium",
    Dark => "dark",
});

#[derive(Clone, Debug, Serialize)]
pub struct MelodicProfile {
    pub key: PitchClass,
    pub mode: Mode,
    pub key_confidence: f32,
    pub melodic_direction: MelodicDirection,
    pub chroma_mean: [f32; 12],
}

#[derive(Clone, Debug, Serialize)]
pub struct RhythmProfile {
    pub time_signature: TimeSignature,
    pub rhythmic_complexity: RhythmicComplexity,
    /// Onsets per second
    pub onset_density: f32,
    pub groove_type: &'static str,
    pub beat_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct DynamicsProfile {
    pub dynamic_range: f32,
    pub avg_rms: f32,
    pub energy_level: EnergyLevel,
    pub energy_contour: EnergyContour,
    pub energy_beginning: f32,
    pub energy_middle: f32,
    pub energy_end: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct SpectralProfile {
    pub harmonic_ratio: f32,
    pub spectral_centroid: f32,
    pub spectral_rolloff: f32,
    pub zero_crossing_rate: f32,
    pub brightness: Brightness,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RegionalCharacteristics {
    pub has_kemenche: bool,
    pub has_tulum: bool,
    pub has_davul: bool,
    pub kemenche_style: Option<&'static str>,
    pub tulum_style: Option<&'static str>,
    pub rhythm_style: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct DetailedAnalysis {
    pub tempo: u32,
    pub melodic: MelodicProfile,
    pub rhythm: RhythmProfile,
    pub dynamics: DynamicsProfile,
    pub spectral: SpectralProfile,
    pub instruments: Vec<String>,
    pub instrument_scores: InstrumentScores,
    pub regional: RegionalCharacteristics,
    pub estimated_genre: String,
    pub genre_confidence: f32,
    pub duration: f32,
}

impl DetailedAnalysis {
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        overrides.apply(&mut self.instruments, &mut self.estimated_genre);
    }
}

/// Load the window with the usual retries and run the detailed analysis.
pub fn analyze(
    source: &dyn AudioSource,
    request: WindowRequest,
    thresholds: &Thresholds,
) -> Result<DetailedAnalysis> {
    let buffer = load_window(source, request)?;
    Ok(analyze_buffer(&buffer, thresholds))
}

pub fn analyze_buffer(buffer: &AudioBuffer, thresholds: &Thresholds) -> DetailedAnalysis {
    let (spec, features) = extract(buffer);

    let melodic = melodic_profile(&spec, &features);
    log::info!(
        "Melodic: key {} {} (confidence {:.2}), {}",
        melodic.key,
        melodic.mode,
        melodic.key_confidence,
        melodic.melodic_direction
    );

    let rhythm = rhythm_profile(&features);
    log::info!(
        "Rhythm: {}, {} complexity, {}",
        rhythm.time_signature,
        rhythm.rhythmic_complexity,
        rhythm.groove_type
    );

    let dynamics = dynamics_profile(&features.rms);
    log::info!(
        "Dynamics: {} energy, range {:.3}, {}",
        dynamics.energy_level,
        dynamics.dynamic_range,
        dynamics.energy_contour
    );

    let spectral = spectral_profile(&features);
    log::info!(
        "Spectral: {}, harmonic {:.2}, centroid {:.0}Hz",
        spectral.brightness,
        spectral.harmonic_ratio,
        spectral.spectral_centroid
    );

    let cues = SpectralCues {
        spectral_centroid: features.spectral_centroid,
        onset_count: features.onset_count(),
    };
    let scores = score_instruments(&spec, &cues, thresholds);
    let ranked = scores.ranked(DETAILED_TOP_N, thresholds.detection_floor);
    for (i, (name, score)) in ranked.iter().enumerate() {
        log::info!("  {}. {}: {:.3}", i + 1, name, score);
    }
    let instruments: Vec<String> = ranked.iter().map(|(n, _)| n.to_string()).collect();

    let regional = regional_characteristics(&spec, &scores, features.tempo, thresholds.detection_floor);
    let (genre, genre_confidence) = estimate_genre(&regional, &instruments);
    log::info!("Estimated genre: {} (confidence {:.2})", genre, genre_confidence);

    DetailedAnalysis {
        tempo: features.tempo,
        melodic,
        rhythm,
        dynamics,
        spectral,
        instruments,
        instrument_scores: scores,
        regional,
        estimated_genre: genre.to_string(),
        genre_confidence,
        duration: buffer.duration(),
    }
}

fn melodic_profile(spec: &Spectrogram, features: &SpectralFeatures) -> MelodicProfile {
    let key = estimate_key(&features.chroma_mean);
    MelodicProfile {
        key: key.key,
        mode: key.mode,
        key_confidence: key.confidence,
        melodic_direction: melodic_direction(&dominant_pitches(spec)),
        chroma_mean: features.chroma_mean,
    }
}

/// Frequency of the strongest bin in the pitch range, for every frame where it is loud enough.
pub fn dominant_pitches(spec: &Spectrogram) -> Vec<f32> {
    let bins = spec.bins_between(PITCH_MIN_HZ, PITCH_MAX_HZ);
    if bins.is_empty() {
        return Vec::new();
    }
    (0..spec.num_frames())
        .filter_map(|t| {
            let peak = bins
                .iter()
                .copied()
                .max_by(|&a, &b| spec.magnitudes[a][t].total_cmp(&spec.magnitudes[b][t]))?;
            (spec.magnitudes[peak][t] > PITCH_MAGNITUDE_FLOOR).then(|| spec.frequencies[peak])
        })
        .collect()
}

pub fn melodic_direction(pitches: &[f32]) -> MelodicDirection {
    if pitches.len() <= 10 {
        return MelodicDirection::Stable;
    }
    let steps = (pitches.len() - 1) as f32;
    let rising = pitches.windows(2).filter(|w| w[1] > w[0]).count() as f32 / steps;
    let falling = pitches.windows(2).filter(|w| w[1] < w[0]).count() as f32 / steps;
    if rising > 0.4 {
        MelodicDirection::Ascending
    } else if falling > 0.4 {
        MelodicDirection::Descending
    } else {
        MelodicDirection::Stable
    }
}

fn rhythm_profile(features: &SpectralFeatures) -> RhythmProfile {
    // RMS frames start at the hop; STFT frames are centred on it
    let lag = FFT_SIZE / (2 * HOP_SIZE);
    let beat_energies: Vec<f32> = if features.rms.is_empty() {
        Vec::new()
    } else {
        features
            .beats
            .iter()
            .map(|&b| features.rms[b.saturating_sub(lag).min(features.rms.len() - 1)])
            .collect()
    };

    let onset_density = if features.duration > 0.0 {
        features.onset_count() as f32 / features.duration
    } else {
        0.0
    };
    let rhythmic_complexity = complexity(onset_density);

    RhythmProfile {
        time_signature: time_signature(&beat_energies),
        rhythmic_complexity,
        onset_density,
        groove_type: groove(features.tempo, rhythmic_complexity),
        beat_count: features.beats.len(),
    }
}

/// Accent check over complete bars of four: the downbeat must be clearly
/// louder than the second beat. Too few beats defaults to 4/4.
pub fn time_signature(beat_energies: &[f32]) -> TimeSignature {
    if beat_energies.len() <= 4 {
        return TimeSignature::FourFour;
    }
    let bars: Vec<&[f32]> = beat_energies.chunks_exact(4).collect();
    let avg = |pos: usize| bars.iter().map(|bar| bar[pos]).sum::<f32>() / bars.len() as f32;
    if avg(0) > avg(1) * 1.2 {
        TimeSignature::FourFour
    } else {
        TimeSignature::Unknown
    }
}

pub fn complexity(onset_density: f32) -> RhythmicComplexity {
    if onset_density > 3.0 {
        RhythmicComplexity::High
    } else if onset_density > 1.5 {
        RhythmicComplexity::Medium
    } else {
        RhythmicComplexity::Low
    }
}

pub fn groove(tempo: u32, complexity: RhythmicComplexity) -> &'static str {
    match (tempo, complexity) {
        (80..=120, RhythmicComplexity::High) => "energetic, driving",
        (80..=120, _) => "steady, traditional",
        _ => "variable",
    }
}

pub fn dynamics_profile(rms: &[f32]) -> DynamicsProfile {
    let max = rms.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let min = rms.iter().copied().fold(f32::INFINITY, f32::min);
    let dynamic_range = if rms.is_empty() { 0.0 } else { max - min };
    let avg_rms = mean(rms);

    let third = rms.len() / 3;
    let beginning = mean(&rms[..third]);
    let middle = mean(&rms[third..2 * third]);
    let end = mean(&rms[2 * third..]);

    let energy_contour = if third == 0 {
        // Too few frames to split into thirds
        EnergyContour::Stable
    } else if end > beginning * 1.2 {
        EnergyContour::Increasing
    } else if beginning > end * 1.2 {
        EnergyContour::Decreasing
    } else {
        EnergyContour::Stable
    };

    DynamicsProfile {
        dynamic_range,
        avg_rms,
        energy_level: EnergyLevel::from_rms(avg_rms),
        energy_contour,
        energy_beginning: beginning,
        energy_middle: middle,
        energy_end: end,
    }
}

fn spectral_profile(features: &SpectralFeatures) -> SpectralProfile {
    SpectralProfile {
        harmonic_ratio: features.harmonic_ratio,
        spectral_centroid: features.spectral_centroid,
        spectral_rolloff: features.spectral_rolloff,
        zero_crossing_rate: features.zero_crossing_rate,
        brightness: brightness(features.spectral_centroid),
    }
}

pub fn brightness(centroid_hz: f32) -> Brightness {
    if centroid_hz > 3000.0 {
        Brightness::Bright
    } else if centroid_hz > 2000.0 {
        Brightness::Medium
    } else {
        Brightness::Dark
    }
}

pub fn regional_characteristics(
    spec: &Spectrogram,
    scores: &InstrumentScores,
    tempo: u32,
    floor: f32,
) -> RegionalCharacteristics {
    let has_kemenche = scores.get("kemenche") > floor;
    let has_tulum = scores.get("tulum") > floor;
    let has_davul = scores.get("davul") > floor;

    let kemenche_style = has_kemenche.then(|| {
        let track = kemenche_centroid_track(spec);
        if track.len() <= 10 {
            "melodic"
        } else if variance(&track) > VIBRATO_VARIANCE {
            "with vibrato, expressive"
        } else {
            "melodic, clear"
        }
    });

    let tulum_style = if has_tulum {
        let bins = spec.bins_between(TULUM_CORE.low_hz, TULUM_CORE.high_hz);
        (!bins.is_empty()).then(|| {
            let all: Vec<usize> = (0..spec.num_bins()).collect();
            let band = variance(&frame_means(spec, &bins));
            let overall = variance(&frame_means(spec, &all));
            if band < overall * 0.5 {
                "sustained, drone-like"
            } else {
                "melodic, dynamic"
            }
        })
    } else {
        None
    };

    let rhythm_style = match tempo {
        85..=110 if has_davul => "traditional Karadeniz rhythm, strong beat, driving",
        85..=110 => "moderate tempo, steady",
        _ => "variable tempo",
    };

    RegionalCharacteristics {
        has_kemenche,
        has_tulum,
        has_davul,
        kemenche_style,
        tulum_style,
        rhythm_style,
    }
}

/// Mean magnitude of the given bins, per frame.
fn frame_means(spec: &Spectrogram, bins: &[usize]) -> Vec<f32> {
    (0..spec.num_frames())
        .map(|t| bins.iter().map(|&b| spec.magnitudes[b][t]).sum::<f32>() / bins.len() as f32)
        .collect()
}

/// Kemenche or tulum means the regional genre; baglama means Turkish folk.
pub fn estimate_genre(
    regional: &RegionalCharacteristics,
    instruments: &[String],
) -> (&'static str, f32) {
    if regional.has_kemenche || regional.has_tulum {
        (REGIONAL_GENRE, 0.9)
    } else if instruments.iter().any(|i| i == "baglama") {
        ("turkish_folk", 0.7)
    } else {
        (UNKNOWN_GENRE, 0.5)
    }
}
