use rustfft::{num_complex::Complex, FftPlanner};

pub const FFT_SIZE: usize = 2048;
pub const HOP_SIZE: usize = 512;

/// Magnitude spectrogram: `magnitudes[bin][frame]`.
#[derive(Clone, Debug)]
pub struct Spectrogram {
    pub magnitudes: Vec<Vec<f32>>,
    /// Centre frequency of each bin (Hz)
    pub frequencies: Vec<f32>,
    pub sample_rate: u32,
    pub hop_size: usize,
}

impl Spectrogram {
    /// Centred STFT with a Hann window; the signal is zero padded by half a frame on both sides.
    pub fn compute(samples: &[f32], sample_rate: u32) -> Self {
        Self::with_params(samples, sample_rate, FFT_SIZE, HOP_SIZE)
    }

    pub fn with_params(samples: &[f32], sample_rate: u32, fft_size: usize, hop_size: usize) -> Self {
        let num_bins = fft_size / 2 + 1;
        let frequencies: Vec<f32> = (0..num_bins)
            .map(|k| k as f32 * sample_rate as f32 / fft_size as f32)
            .collect();

        if samples.is_empty() {
            return Self {
                magnitudes: vec![Vec::new(); num_bins],
                frequencies,
                sample_rate,
                hop_size,
            };
        }

        let num_frames = 1 + samples.len() / hop_size;
        let pad = fft_size / 2;
        let hann = hann_window(fft_size);

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);

        let mut magnitudes = vec![vec![0.0f32; num_frames]; num_bins];
        let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_size];

        for frame in 0..num_frames {
            let center = frame * hop_size;
            for (i, slot) in buffer.iter_mut().enumerate() {
                // Position in the unpadded signal
                let sample = (center + i)
                    .checked_sub(pad)
                    .and_then(|idx| samples.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(sample * hann[i], 0.0);
            }
            fft.process(&mut buffer);

            for (bin, row) in magnitudes.iter_mut().enumerate() {
                row[frame] = buffer[bin].norm();
            }
        }

        Self {
            magnitudes,
            frequencies,
            sample_rate,
            hop_size,
        }
    }

    pub fn num_bins(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn num_frames(&self) -> usize {
        self.magnitudes.first().map_or(0, |row| row.len())
    }

    /// Frames per second of the time axis.
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.hop_size as f32
    }

    /// Indices of bins whose centre frequency lies in `[low_hz, high_hz]`.
    pub fn bins_between(&self, low_hz: f32, high_hz: f32) -> Vec<usize> {
        self.frequencies
            .iter()
            .enumerate()
            .filter(|(_, &f)| f >= low_hz && f <= high_hz)
            .map(|(i, _)| i)
            .collect()
    }

    /// Mean magnitude over every cell of the given rows. `None` if the mask is empty.
    pub fn mean_over(&self, bins: &[usize]) -> Option<f32> {
        let frames = self.num_frames();
        if bins.is_empty() || frames == 0 {
            return None;
        }
        let sum: f64 = bins
            .iter()
            .map(|&b| self.magnitudes[b].iter().map(|&m| m as f64).sum::<f64>())
            .sum();
        Some((sum / (bins.len() * frames) as f64) as f32)
    }

    /// Population variance over every cell of the given rows.
    pub fn variance_over(&self, bins: &[usize]) -> f32 {
        let Some(mean) = self.mean_over(bins) else {
            return 0.0;
        };
        let mean = mean as f64;
        let n = (bins.len() * self.num_frames()) as f64;
        let ss: f64 = bins
            .iter()
            .map(|&b| {
                self.magnitudes[b]
                    .iter()
                    .map(|&m| (m as f64 - mean).powi(2))
                    .sum::<f64>()
            })
            .sum();
        (ss / n) as f32
    }

    /// Variance over the whole matrix.
    pub fn total_variance(&self) -> f32 {
        let all: Vec<usize> = (0..self.num_bins()).collect();
        self.variance_over(&all)
    }
}

pub fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}
