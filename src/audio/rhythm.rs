//! Onset envelope, onset picking, tempo and beat tracking.
//!
//! Tempo is a single global estimate per window: autocorrelation of the
//! onset envelope, weighted by a log-normal prior around 120 BPM.

use super::stft::Spectrogram;

/// Used when the envelope carries no periodicity at all.
pub const DEFAULT_TEMPO: f32 = 120.0;

const MIN_BPM: f32 = 60.0;
const MAX_BPM: f32 = 200.0;
const PRIOR_CENTER_BPM: f32 = 120.0;
/// Width of the tempo prior in octaves
const PRIOR_OCTAVES: f32 = 1.0;

/// Positive spectral flux per frame. Frame 0 is always 0.
pub fn onset_envelope(spec: &Spectrogram) -> Vec<f32> {
    let frames = spec.num_frames();
    let mut envelope = vec![0.0f32; frames];
    for (t, slot) in envelope.iter_mut().enumerate().skip(1) {
        *slot = spec
            .magnitudes
            .iter()
            .map(|row| (row[t] - row[t - 1]).max(0.0))
            .sum();
    }
    envelope
}

/// Estimate tempo in BPM from an onset envelope sampled at `frame_rate` Hz.
pub fn estimate_tempo(envelope: &[f32], frame_rate: f32) -> f32 {
    let autocorr = autocorrelate(envelope);
    if autocorr.is_empty() {
        return DEFAULT_TEMPO;
    }

    let min_lag = ((60.0 / MAX_BPM * frame_rate).floor() as usize).max(1);
    let max_lag = ((60.0 / MIN_BPM * frame_rate).ceil() as usize).min(autocorr.len() - 1);
    if min_lag >= max_lag {
        return DEFAULT_TEMPO;
    }

    let weighted = |lag: usize| -> f32 { autocorr[lag] * tempo_prior(60.0 * frame_rate / lag as f32) };

    let mut best_lag = min_lag;
    let mut best = weighted(min_lag);
    for lag in min_lag + 1..=max_lag {
        let w = weighted(lag);
        if w > best {
            best = w;
            best_lag = lag;
        }
    }

    if best <= 0.0 {
        return DEFAULT_TEMPO;
    }

    // Parabolic interpolation around the peak
    let mut lag = best_lag as f32;
    if best_lag > min_lag && best_lag < max_lag {
        let a = weighted(best_lag - 1);
        let c = weighted(best_lag + 1);
        let denom = a - 2.0 * best + c;
        if denom.abs() > f32::EPSILON {
            let delta = 0.5 * (a - c) / denom;
            if delta.abs() < 1.0 {
                lag += delta;
            }
        }
    }

    60.0 * frame_rate / lag
}

fn tempo_prior(bpm: f32) -> f32 {
    let octaves = (bpm / PRIOR_CENTER_BPM).log2() / PRIOR_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

/// Mean-removed autocorrelation normalised by lag-0 energy.
/// Flat or empty input yields an empty vector.
fn autocorrelate(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    if n < 2 {
        return Vec::new();
    }

    let mean: f32 = signal.iter().sum::<f32>() / n as f32;
    let centered: Vec<f32> = signal.iter().map(|&x| x - mean).collect();
    let energy: f32 = centered.iter().map(|&x| x * x).sum();
    if energy < f32::EPSILON {
        return Vec::new();
    }

    (0..n)
        .map(|lag| {
            centered[..n - lag]
                .iter()
                .zip(&centered[lag..])
                .map(|(a, b)| a * b)
                .sum::<f32>()
                / energy
        })
        .collect()
}

/// Peak-pick the normalised envelope.
///
/// A frame is an onset when it is the local maximum over the preceding 30 ms,
/// exceeds the local mean over +-100 ms by 0.07, and lies more than 30 ms
/// after the previous onset.
pub fn detect_onsets(envelope: &[f32], frame_rate: f32) -> Vec<usize> {
    let peak = envelope.iter().copied().fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return Vec::new();
    }
    let norm: Vec<f32> = envelope.iter().map(|&x| x / peak).collect();

    let frames = |secs: f32| (secs * frame_rate).round() as usize;
    let pre_max = frames(0.03);
    let post_max = 1;
    let pre_avg = frames(0.1);
    let post_avg = frames(0.1) + 1;
    let wait = frames(0.03);
    let delta = 0.07;

    let n = norm.len();
    let mut onsets: Vec<usize> = Vec::new();
    for i in 0..n {
        let x = norm[i];
        if x <= 0.0 {
            continue;
        }

        let max_start = i.saturating_sub(pre_max);
        let max_end = (i + post_max).min(n);
        let local_max = norm[max_start..max_end].iter().copied().fold(0.0f32, f32::max);
        if x < local_max {
            continue;
        }

        let avg_start = i.saturating_sub(pre_avg);
        let avg_end = (i + post_avg).min(n);
        let local_mean =
            norm[avg_start..avg_end].iter().sum::<f32>() / (avg_end - avg_start) as f32;
        if x < local_mean + delta {
            continue;
        }

        if onsets.last().map_or(true, |&last| i - last > wait) {
            onsets.push(i);
        }
    }

    onsets
}

/// Place beats one period apart, each snapped to the strongest envelope
/// frame within 10% of the period around its predicted position. An
/// envelope without any onset strength has no beats.
pub fn track_beats(envelope: &[f32], frame_rate: f32, bpm: f32) -> Vec<usize> {
    if bpm <= 0.0 || envelope.iter().all(|&v| v <= 0.0) {
        return Vec::new();
    }
    let period = 60.0 * frame_rate / bpm;
    if period < 1.0 {
        return Vec::new();
    }

    let first_span = (period.ceil() as usize).min(envelope.len());
    let start = argmax(&envelope[..first_span]);

    let tolerance = ((period * 0.1).round() as usize).max(1);
    let mut beats = vec![start];
    let mut predicted = start as f32;

    loop {
        predicted += period;
        let center = predicted.round() as usize;
        let lo = center.saturating_sub(tolerance);
        if lo >= envelope.len() {
            break;
        }
        let hi = (center + tolerance + 1).min(envelope.len());
        let beat = lo + argmax(&envelope[lo..hi]);
        if beat <= beats[beats.len() - 1] {
            continue;
        }
        beats.push(beat);
        // Re-anchor on the snapped position so drift does not accumulate
        predicted = beat as f32;
    }

    beats
}

/// First index of the maximum. Empty input yields 0.
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
