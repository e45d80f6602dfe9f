//! Chroma and key estimation.

use super::features::{KeyEstimate, Mode, PitchClass};
use super::stft::Spectrogram;

/// Krumhansl-Kessler probe-tone profiles, tonic first.
const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];
const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Bins below this are too coarse to resolve a semitone.
const MIN_CHROMA_HZ: f32 = 32.0;

/// Pitch class of a frequency, C = 0.
fn pitch_class_of(freq: f32) -> usize {
    let midi = 69.0 + 12.0 * (freq / 440.0).log2();
    (midi.round() as i64).rem_euclid(12) as usize
}

/// Per-frame chroma (power folded onto 12 classes), each frame scaled to max 1.
pub fn chroma(spec: &Spectrogram) -> Vec<[f32; 12]> {
    let nyquist = spec.sample_rate as f32 / 2.0;
    let classes: Vec<Option<usize>> = spec
        .frequencies
        .iter()
        .map(|&f| (f >= MIN_CHROMA_HZ && f < nyquist).then(|| pitch_class_of(f)))
        .collect();

    (0..spec.num_frames())
        .map(|t| {
            let mut frame = [0.0f32; 12];
            for (bin, class) in classes.iter().enumerate() {
                if let Some(pc) = class {
                    let m = spec.magnitudes[bin][t];
                    frame[*pc] += m * m;
                }
            }
            let peak = frame.iter().copied().fold(0.0f32, f32::max);
            if peak > 0.0 {
                for v in frame.iter_mut() {
                    *v /= peak;
                }
            }
            frame
        })
        .collect()
}

pub fn mean_chroma(frames: &[[f32; 12]]) -> [f32; 12] {
    let mut mean = [0.0f32; 12];
    if frames.is_empty() {
        return mean;
    }
    for frame in frames {
        for (m, v) in mean.iter_mut().zip(frame) {
            *m += v;
        }
    }
    for m in mean.iter_mut() {
        *m /= frames.len() as f32;
    }
    mean
}

/// Strongest pitch class. Ties go to the lower index, so silence reads as C.
pub fn strongest_pitch_class(chroma_mean: &[f32; 12]) -> PitchClass {
    let mut best = 0;
    for (i, &v) in chroma_mean.iter().enumerate() {
        if v > chroma_mean[best] {
            best = i;
        }
    }
    PitchClass::from_index(best)
}

/// Correlate against all 24 rotated profiles and keep the best.
///
/// Major is tried before minor for each tonic and only a strictly higher
/// correlation replaces the current best. A constant chroma vector has no
/// defined correlation and falls back to the strongest class, major, 0.0.
pub fn estimate_key(chroma_mean: &[f32; 12]) -> KeyEstimate {
    let mut best: Option<KeyEstimate> = None;

    for tonic in 0..12 {
        for (mode, profile) in [(Mode::Major, &MAJOR_PROFILE), (Mode::Minor, &MINOR_PROFILE)] {
            let rotated: [f32; 12] = std::array::from_fn(|j| profile[(j + 12 - tonic) % 12]);
            let Some(r) = pearson(chroma_mean, &rotated) else {
                continue;
            };
            if best.map_or(true, |b| r > b.confidence) {
                best = Some(KeyEstimate {
                    key: PitchClass::from_index(tonic),
                    mode,
                    confidence: r,
                });
            }
        }
    }

    best.unwrap_or(KeyEstimate {
        key: strongest_pitch_class(chroma_mean),
        mode: Mode::Major,
        confidence: 0.0,
    })
}

fn pearson(a: &[f32; 12], b: &[f32; 12]) -> Option<f32> {
    let mean_a = a.iter().sum::<f32>() / 12.0;
    let mean_b = b.iter().sum::<f32>() / 12.0;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    let denom = (var_a * var_b).sqrt();
    if denom < 1e-12 {
        return None;
    }
    Some(cov / denom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth::{chord, sine};

    fn chroma_of(samples: &[f32], sr: u32) -> [f32; 12] {
        let spec = Spectrogram::compute(samples, sr);
        mean_chroma(&chroma(&spec))
    }

    #[test]
    fn pitch_classes_of_reference_tones() {
        assert_eq!(pitch_class_of(440.0), 9);
        assert_eq!(pitch_class_of(261.63), 0);
        assert_eq!(pitch_class_of(880.0), 9);
        assert_eq!(pitch_class_of(30.87), 11);
    }

    #[test]
    fn a440_reads_as_a() {
        let sr = 22050;
        let c = chroma_of(&sine(440.0, sr, 2.0, 0.5), sr);
        assert_eq!(strongest_pitch_class(&c), PitchClass::A);
    }

    #[test]
    fn silence_reads_as_c() {
        let c = chroma_of(&vec![0.0; 22050], 22050);
        assert_eq!(strongest_pitch_class(&c), PitchClass::C);
        let k = estimate_key(&c);
        assert_eq!(k.key, PitchClass::C);
        assert_eq!(k.confidence, 0.0);
    }

    #[test]
    fn profile_vector_matches_itself() {
        let k = estimate_key(&MAJOR_PROFILE);
        assert_eq!(k.key, PitchClass::C);
        assert_eq!(k.mode, Mode::Major);
        assert!((k.confidence - 1.0).abs() < 1e-4);

        let rotated: [f32; 12] = std::array::from_fn(|j| MINOR_PROFILE[(j + 12 - 9) % 12]);
        let k = estimate_key(&rotated);
        assert_eq!(k.key, PitchClass::A);
        assert_eq!(k.mode, Mode::Minor);
    }

    #[test]
    fn g_major_scale_is_g_major() {
        // G A B C D E F#
        let scale = [392.0, 440.0, 493.88, 523.25, 587.33, 659.25, 739.99];
        let sr = 22050;
        let mut samples = Vec::new();
        // Stress the tonic by repeating it
        for f in scale.iter().chain([392.0, 392.0, 587.33].iter()) {
            samples.extend(sine(*f, sr, 0.5, 0.5));
        }
        let k = estimate_key(&chroma_of(&samples, sr));
        assert_eq!(k.key, PitchClass::G);
        assert_eq!(k.mode, Mode::Major);
    }

    #[test]
    fn chord_energy_lands_on_its_notes() {
        let sr = 22050;
        let c = chroma_of(&chord(&[261.63, 329.63, 392.0], sr, 2.0), sr);
        let strongest = strongest_pitch_class(&c);
        assert!(matches!(strongest, PitchClass::C | PitchClass::E | PitchClass::G));
        assert!(c[1] < c[0] && c[6] < c[7]);
    }
}
