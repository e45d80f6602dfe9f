use serde::Serialize;
use std::fmt;

/// The twelve pitch-class labels, `C` first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PitchClass {
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C#")]
    CSharp,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D#")]
    DSharp,
    #[serde(rename = "E")]
    E,
    #[serde(rename = "F")]
    F,
    #[serde(rename = "F#")]
    FSharp,
    #[serde(rename = "G")]
    G,
    #[serde(rename = "G#")]
    GSharp,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A#")]
    ASharp,
    #[serde(rename = "B")]
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Index modulo 12, so any integer maps into the table.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    pub fn label(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Major => f.write_str("major"),
            Mode::Minor => f.write_str("minor"),
        }
    }
}

/// Key picked by template matching against the 24 major/minor profiles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct KeyEstimate {
    pub key: PitchClass,
    pub mode: Mode,
    /// Pearson correlation of the winning profile
    pub confidence: f32,
}

/// Window-level features produced by the extractor.
#[derive(Clone, Debug)]
pub struct SpectralFeatures {
    /// Rounded, always >= 1
    pub tempo: u32,
    /// Chroma averaged over time (0.0-1.0 per class)
    pub chroma_mean: [f32; 12],
    pub key: PitchClass,
    /// Harmonic / (harmonic + percussive) energy
    pub harmonic_ratio: f32,
    /// Mean spectral centroid (Hz)
    pub spectral_centroid: f32,
    /// Mean 85% rolloff frequency (Hz)
    pub spectral_rolloff: f32,
    pub zero_crossing_rate: f32,
    /// Frame indices of detected onsets
    pub onsets: Vec<usize>,
    /// Frame indices of tracked beats
    pub beats: Vec<usize>,
    /// Per-frame RMS energy (linear)
    pub rms: Vec<f32>,
    pub duration: f32,
}

impl SpectralFeatures {
    pub fn onset_count(&self) -> usize {
        self.onsets.len()
    }

    pub fn mean_rms(&self) -> f32 {
        if self.rms.is_empty() {
            return 0.0;
        }
        self.rms.iter().sum::<f32>() / self.rms.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_class_wraps() {
        assert_eq!(PitchClass::from_index(0), PitchClass::C);
        assert_eq!(PitchClass::from_index(9), PitchClass::A);
        assert_eq!(PitchClass::from_index(13), PitchClass::CSharp);
    }

    #[test]
    fn labels_serialize_as_note_names() {
        let json = serde_json::to_string(&PitchClass::FSharp).unwrap();
        assert_eq!(json, "\"F#\"");
        assert_eq!(PitchClass::ASharp.to_string(), "A#");
        assert_eq!(serde_json::to_string(&Mode::Minor).unwrap(), "\"minor\"");
    }
}
