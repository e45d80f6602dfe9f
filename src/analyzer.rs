//! Basic analysis path: one window in, one [`AnalysisResult`] out.

use serde::Serialize;
use std::fmt;

use crate::audio::analysis::extract;
use crate::audio::decode::AudioBuffer;
use crate::audio::features::PitchClass;
use crate::audio::source::{load_window, plan_window, AudioSource, WindowRequest};
use crate::classify::{genre, score_instruments, InstrumentScores, SpectralCues, Thresholds};
use crate::error::Result;

/// Instruments kept in the basic result.
pub const BASIC_TOP_N: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

impl EnergyLevel {
    /// Classify mean linear RMS.
    pub fn from_rms(mean_rms: f32) -> Self {
        if mean_rms > 0.1 {
            EnergyLevel::High
        } else if mean_rms > 0.05 {
            EnergyLevel::Medium
        } else {
            EnergyLevel::Low
        }
    }
}

impl fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnergyLevel::Low => f.write_str("low"),
            EnergyLevel::Medium => f.write_str("medium"),
            EnergyLevel::High => f.write_str("high"),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisResult {
    pub tempo: u32,
    pub key: PitchClass,
    /// Ranked, strongest first
    pub instruments: Vec<String>,
    pub instrument_scores: InstrumentScores,
    pub estimated_genre: String,
    pub energy_level: EnergyLevel,
    pub bass_prominent: bool,
    /// Length of the analysed window (s)
    pub duration: f32,
}

impl AnalysisResult {
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        overrides.apply(&mut self.instruments, &mut self.estimated_genre);
    }
}

/// Caller-forced corrections. Nothing here is validated.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub instruments: Vec<String>,
    pub genre: Option<String>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty() && self.genre.is_none()
    }

    /// Prepend forced instruments (dropping their detected duplicates) and
    /// replace the genre. The genre is not re-estimated.
    pub fn apply(&self, instruments: &mut Vec<String>, genre: &mut String) {
        if self.is_empty() {
            return;
        }
        if !self.instruments.is_empty() {
            log::info!("Manual instruments override: {}", self.instruments.join(", "));
            let detected = std::mem::take(instruments);
            *instruments = self.instruments.clone();
            instruments.extend(
                detected
                    .into_iter()
                    .filter(|i| !self.instruments.contains(i)),
            );
        }
        if let Some(ref forced) = self.genre {
            log::info!("Manual genre override: {}", forced);
            *genre = forced.clone();
        }
    }
}

/// Analyse an already loaded window.
pub fn analyze_buffer(buffer: &AudioBuffer, thresholds: &Thresholds) -> AnalysisResult {
    let (spec, features) = extract(buffer);

    let cues = SpectralCues {
        spectral_centroid: features.spectral_centroid,
        onset_count: features.onset_count(),
    };
    let scores = score_instruments(&spec, &cues, thresholds);
    let instruments: Vec<String> = scores
        .ranked(BASIC_TOP_N, thresholds.detection_floor)
        .into_iter()
        .map(|(name, _)| name.to_string())
        .collect();

    let estimated_genre = genre::classify(features.tempo, &instruments).to_string();
    let bass_prominent = scores.get("bass") + scores.get("kick_drum") > scores.mean();
    let energy_level = EnergyLevel::from_rms(features.mean_rms());

    log::info!(
        "Detected: [{}], genre={}, energy={}",
        instruments.join(", "),
        estimated_genre,
        energy_level
    );

    AnalysisResult {
        tempo: features.tempo,
        key: features.key,
        instruments,
        instrument_scores: scores,
        estimated_genre,
        energy_level,
        bass_prominent,
        duration: buffer.duration(),
    }
}

/// Plan the window against the source length, load it with retries and analyse it.
pub fn analyze(
    source: &dyn AudioSource,
    request: WindowRequest,
    thresholds: &Thresholds,
) -> Result<AnalysisResult> {
    let request = match source.total_duration() {
        Some(total) => {
            let planned = plan_window(request, total);
            log::info!(
                "Total duration: {:.1}s, analyzing {:.1}s from {:.1}s",
                total,
                planned.duration,
                planned.offset
            );
            planned
        }
        None => request,
    };
    let buffer = load_window(source, request)?;
    Ok(analyze_buffer(&buffer, thresholds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth::{chord, silence, sine};

    fn request() -> WindowRequest {
        WindowRequest {
            offset: 5.0,
            duration: 90.0,
            fallback_duration: 30.0,
        }
    }

    #[test]
    fn energy_thresholds() {
        assert_eq!(EnergyLevel::from_rms(0.2), EnergyLevel::High);
        assert_eq!(EnergyLevel::from_rms(0.1), EnergyLevel::Medium);
        assert_eq!(EnergyLevel::from_rms(0.06), EnergyLevel::Medium);
        assert_eq!(EnergyLevel::from_rms(0.05), EnergyLevel::Low);
        assert_eq!(EnergyLevel::from_rms(0.0), EnergyLevel::Low);
    }

    #[test]
    fn silence_is_uninformative() {
        let result = analyze_buffer(&silence(22050, 5.0), &Thresholds::basic());
        assert!(result.instruments.is_empty());
        assert!(result.instrument_scores.iter().all(|(_, s)| s == 0.0));
        assert_eq!(result.estimated_genre, "unknown");
        assert_eq!(result.energy_level, EnergyLevel::Low);
        assert!(!result.bass_prominent);
        assert_eq!(result.key, PitchClass::C);
        assert_eq!(result.tempo, 120);
    }

    #[test]
    fn loud_tone_is_high_energy() {
        let buf = AudioBuffer::new(sine(440.0, 22050, 4.0, 0.8), 22050);
        let result = analyze_buffer(&buf, &Thresholds::basic());
        assert_eq!(result.energy_level, EnergyLevel::High);
        assert_eq!(result.key, PitchClass::A);
        assert!(result.instruments.len() <= BASIC_TOP_N);
        assert!(!result.instruments.is_empty());
    }

    #[test]
    fn low_chord_makes_bass_prominent() {
        let buf = AudioBuffer::new(chord(&[55.0, 82.4, 110.0], 22050, 4.0), 22050);
        let result = analyze_buffer(&buf, &Thresholds::basic());
        assert!(result.bass_prominent);
        assert!(result.instruments.iter().any(|i| i == "bass"));
        assert!(result.instruments.iter().any(|i| i == "kick_drum"));
    }

    #[test]
    fn short_source_falls_back_to_its_start() {
        let buf = AudioBuffer::new(sine(440.0, 8000, 12.0, 0.5), 8000);
        let result = analyze(&buf, request(), &Thresholds::basic()).unwrap();
        // 12s track leaves less than 10s after skip and tail margin
        assert!((result.duration - 12.0).abs() < 1e-3);
    }

    #[test]
    fn long_source_uses_planned_window() {
        let buf = AudioBuffer::new(vec![0.1; 8000 * 40], 8000);
        let result = analyze(&buf, request(), &Thresholds::basic()).unwrap();
        // min(90, 40 - 5 - 5)
        assert!((result.duration - 30.0).abs() < 1e-3);
    }

    #[test]
    fn empty_source_is_a_hard_failure() {
        let buf = AudioBuffer::new(Vec::new(), 8000);
        assert!(analyze(&buf, request(), &Thresholds::basic()).is_err());
    }

    #[test]
    fn overrides_prepend_and_dedupe() {
        let mut instruments = vec!["bass".to_string(), "kemenche".to_string(), "piano".to_string()];
        let mut genre = "rock".to_string();
        let overrides = Overrides {
            instruments: vec!["kemenche".into(), "tulum".into()],
            genre: Some("karadeniz".into()),
        };
        overrides.apply(&mut instruments, &mut genre);
        assert_eq!(instruments, vec!["kemenche", "tulum", "bass", "piano"]);
        assert_eq!(genre, "karadeniz");
    }

    #[test]
    fn unknown_override_tokens_pass_through() {
        let mut instruments = vec!["bass".to_string()];
        let mut genre = "pop".to_string();
        let overrides = Overrides {
            instruments: vec!["kemenceh".into()],
            genre: None,
        };
        overrides.apply(&mut instruments, &mut genre);
        assert_eq!(instruments, vec!["kemenceh", "bass"]);
        assert_eq!(genre, "pop");
        assert!(!overrides.is_empty());
        assert!(Overrides::default().is_empty());
    }

    #[test]
    fn empty_overrides_leave_result_alone() {
        let mut instruments = vec!["bass".to_string(), "bass".to_string()];
        let mut genre = "rock".to_string();
        Overrides::default().apply(&mut instruments, &mut genre);
        assert_eq!(instruments, vec!["bass", "bass"]);
        assert_eq!(genre, "rock");
    }
}
