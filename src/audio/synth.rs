//! Synthetic signals for tests.

use std::f32::consts::PI;

use super::decode::AudioBuffer;

pub fn sine(freq: f32, sample_rate: u32, seconds: f32, amplitude: f32) -> Vec<f32> {
    let n = (sample_rate as f32 * seconds) as usize;
    (0..n)
        .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Equal-amplitude sum of sines, scaled so the peak stays below 1.
pub fn chord(freqs: &[f32], sample_rate: u32, seconds: f32) -> Vec<f32> {
    let n = (sample_rate as f32 * seconds) as usize;
    let scale = 0.9 / freqs.len().max(1) as f32;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            freqs.iter().map(|f| (2.0 * PI * f * t).sin()).sum::<f32>() * scale
        })
        .collect()
}

/// 10 ms decaying 1 kHz clicks at the given tempo.
pub fn click_track(bpm: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * seconds) as usize;
    let samples_per_beat = (sample_rate as f32 * 60.0 / bpm) as usize;
    let click_len = (sample_rate as f32 * 0.01) as usize;

    let mut samples = vec![0.0f32; num_samples];
    let mut pos = 0;
    while pos < num_samples {
        for i in 0..click_len.min(num_samples - pos) {
            let envelope = (-5.0 * i as f32 / click_len as f32).exp();
            let t = i as f32 / sample_rate as f32;
            samples[pos + i] = envelope * (2.0 * PI * 1000.0 * t).sin() * 0.8;
        }
        pos += samples_per_beat;
    }
    samples
}

pub fn silence(sample_rate: u32, seconds: f32) -> AudioBuffer {
    AudioBuffer::new(vec![0.0; (sample_rate as f32 * seconds) as usize], sample_rate)
}
