use super::decode::AudioBuffer;
use super::features::SpectralFeatures;
use super::rhythm;
use super::stft::{Spectrogram, FFT_SIZE, HOP_SIZE};
use super::tonal;

/// Median filter length for the harmonic/percussive split (frames and bins)
const HPSS_KERNEL: usize = 31;
const ROLLOFF_PERCENT: f32 = 0.85;

/// Run every window-level feature over one analysis window.
///
/// The spectrogram is returned alongside the features so the instrument
/// estimator can reuse it.
pub fn extract(buffer: &AudioBuffer) -> (Spectrogram, SpectralFeatures) {
    let samples = buffer.samples();
    let sr = buffer.sample_rate();

    log::info!("Pass 1: STFT ({:.1}s @ {}Hz)...", buffer.duration(), sr);
    let spec = Spectrogram::compute(samples, sr);
    let frame_rate = spec.frame_rate();

    log::info!("Pass 2: Rhythm ({} frames)...", spec.num_frames());
    let onset_envelope = rhythm::onset_envelope(&spec);
    let tempo_raw = rhythm::estimate_tempo(&onset_envelope, frame_rate);
    let tempo = (tempo_raw.round() as u32).max(1);
    let onsets = rhythm::detect_onsets(&onset_envelope, frame_rate);
    let beats = rhythm::track_beats(&onset_envelope, frame_rate, tempo_raw);

    log::info!("Pass 3: Tonal & timbre...");
    let chroma_mean = tonal::mean_chroma(&tonal::chroma(&spec));
    let key = tonal::strongest_pitch_class(&chroma_mean);
    let spectral_centroid = mean(&spectral_centroid(&spec));
    let spectral_rolloff = mean(&spectral_rolloff(&spec, ROLLOFF_PERCENT));
    let harmonic_ratio = harmonic_ratio(&spec);
    let rms = rms_frames(samples);
    let zero_crossing_rate = mean(&zero_crossing_rates(samples));

    log::info!(
        "Features: tempo={} BPM, key={}, onsets={}, centroid={:.0}Hz, harmonic={:.2}",
        tempo,
        key,
        onsets.len(),
        spectral_centroid,
        harmonic_ratio
    );

    let features = SpectralFeatures {
        tempo,
        chroma_mean,
        key,
        harmonic_ratio,
        spectral_centroid,
        spectral_rolloff,
        zero_crossing_rate,
        onsets,
        beats,
        rms,
        duration: buffer.duration(),
    };

    (spec, features)
}

pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

pub fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32
}

/// Energy-weighted mean frequency per frame. Silent frames give 0.
pub fn spectral_centroid(spec: &Spectrogram) -> Vec<f32> {
    spectral_centroid_in(spec, &(0..spec.num_bins()).collect::<Vec<_>>())
}

/// Centroid restricted to the given bins.
pub fn spectral_centroid_in(spec: &Spectrogram, bins: &[usize]) -> Vec<f32> {
    (0..spec.num_frames())
        .map(|t| {
            let total: f32 = bins.iter().map(|&b| spec.magnitudes[b][t]).sum();
            if total <= 1e-10 {
                return 0.0;
            }
            bins.iter()
                .map(|&b| spec.frequencies[b] * spec.magnitudes[b][t])
                .sum::<f32>()
                / total
        })
        .collect()
}

/// Frequency below which `percent` of each frame's magnitude lies.
pub fn spectral_rolloff(spec: &Spectrogram, percent: f32) -> Vec<f32> {
    (0..spec.num_frames())
        .map(|t| {
            let total: f32 = spec.magnitudes.iter().map(|row| row[t]).sum();
            if total <= 1e-10 {
                return 0.0;
            }
            let target = total * percent;
            let mut acc = 0.0;
            for (bin, row) in spec.magnitudes.iter().enumerate() {
                acc += row[t];
                if acc >= target {
                    return spec.frequencies[bin];
                }
            }
            spec.frequencies.last().copied().unwrap_or(0.0)
        })
        .collect()
}

/// Share of spectral energy in the harmonic component.
///
/// Median filtering along time keeps sustained partials, along frequency
/// keeps broadband transients; soft masks split each cell between them.
/// Returns 0.5 when there is no energy at all.
pub fn harmonic_ratio(spec: &Spectrogram) -> f32 {
    let bins = spec.num_bins();
    let frames = spec.num_frames();
    if bins == 0 || frames == 0 {
        return 0.5;
    }

    let half = HPSS_KERNEL / 2;
    let mut scratch: Vec<f32> = Vec::with_capacity(HPSS_KERNEL);

    let harmonic: Vec<Vec<f32>> = spec
        .magnitudes
        .iter()
        .map(|row| {
            (0..frames)
                .map(|t| {
                    let lo = t.saturating_sub(half);
                    let hi = (t + half + 1).min(frames);
                    median(&row[lo..hi], &mut scratch)
                })
                .collect()
        })
        .collect();

    let mut column: Vec<f32> = vec![0.0; bins];
    let mut harmonic_energy = 0.0f64;
    let mut percussive_energy = 0.0f64;

    for t in 0..frames {
        for (b, slot) in column.iter_mut().enumerate() {
            *slot = spec.magnitudes[b][t];
        }
        for b in 0..bins {
            let lo = b.saturating_sub(half);
            let hi = (b + half + 1).min(bins);
            let p = median(&column[lo..hi], &mut scratch);
            let h = harmonic[b][t];
            let s = column[b];

            let (h2, p2) = (h * h, p * p);
            let denom = h2 + p2;
            if denom <= 0.0 {
                continue;
            }
            let hs = (h2 / denom) * s;
            let ps = (p2 / denom) * s;
            harmonic_energy += (hs * hs) as f64;
            percussive_energy += (ps * ps) as f64;
        }
    }

    let total = harmonic_energy + percussive_energy;
    if total <= 0.0 {
        return 0.5;
    }
    (harmonic_energy / total) as f32
}

fn median(values: &[f32], scratch: &mut Vec<f32>) -> f32 {
    scratch.clear();
    scratch.extend_from_slice(values);
    let mid = scratch.len() / 2;
    let (_, m, _) = scratch.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *m
}

/// RMS per STFT-sized frame, one value per hop.
pub fn rms_frames(samples: &[f32]) -> Vec<f32> {
    frames_of(samples)
        .map(|frame| (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt())
        .collect()
}

/// Fraction of adjacent sample pairs that change sign, per frame.
pub fn zero_crossing_rates(samples: &[f32]) -> Vec<f32> {
    frames_of(samples)
        .map(|frame| {
            let crossings = frame
                .windows(2)
                .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
                .count();
            crossings as f32 / frame.len() as f32
        })
        .collect()
}

fn frames_of(samples: &[f32]) -> impl Iterator<Item = &[f32]> {
    let count = if samples.is_empty() {
        0
    } else if samples.len() <= FFT_SIZE {
        1
    } else {
        1 + (samples.len() - FFT_SIZE) / HOP_SIZE
    };
    (0..count).map(move |i| {
        let start = i * HOP_SIZE;
        &samples[start..(start + FFT_SIZE).min(samples.len())]
    })
}
