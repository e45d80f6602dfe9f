use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AnalysisError;

/// Decoded mono waveform. Never mutated after construction.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Cut `[offset, offset + duration)` out of the buffer.
    ///
    /// A window that runs past the end is shortened to what is available.
    /// `None` means "to the end". Fails when nothing would be left.
    pub fn window(&self, offset: f32, duration: Option<f32>) -> crate::error::Result<AudioBuffer> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate(self.sample_rate));
        }
        if self.samples.is_empty() {
            return Err(AnalysisError::EmptyAudio);
        }

        let sr = self.sample_rate as f32;
        let start = (offset.max(0.0) * sr) as usize;
        let end = match duration {
            Some(d) => start.saturating_add((d.max(0.0) * sr) as usize),
            None => self.samples.len(),
        }
        .min(self.samples.len());

        if start >= end {
            return Err(AnalysisError::WindowOutOfRange {
                offset,
                duration: duration.unwrap_or(0.0),
                total: self.duration(),
            });
        }

        Ok(AudioBuffer {
            samples: self.samples[start..end].to_vec(),
            sample_rate: self.sample_rate,
        })
    }
}

/// Decode any container symphonia can probe into a mono buffer.
///
/// Multi-channel frames are averaged. Packets the codec rejects are skipped.
pub fn decode_audio(path: &Path) -> Result<AudioBuffer> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut reader = symphonia::default::get_probe()
        .format(&hint, stream, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?
        .format;

    let (track_id, params) = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .map(|t| (t.id, t.codec_params.clone()))
        .context("No audio tracks found")?;

    let sample_rate = params.sample_rate.context("Unknown sample rate")?;
    let channels = params.channels.map_or(1, |c| c.count()).max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut mono = Vec::new();
    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(err)) => {
                log::debug!("Skipping undecodable packet: {}", err);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let mut interleaved = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        interleaved.copy_interleaved_ref(decoded);
        downmix_into(&mut mono, interleaved.samples(), channels);
    }

    let buffer = AudioBuffer::new(mono, sample_rate);
    log::info!(
        "Decoded {}: {} samples at {}Hz ({:.1}s, {} channel(s) mixed down)",
        path.display(),
        buffer.samples().len(),
        sample_rate,
        buffer.duration(),
        channels
    );
    Ok(buffer)
}

/// Average interleaved frames of `channels` samples onto `out`.
fn downmix_into(out: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    if channels == 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(seconds: usize, sr: u32) -> AudioBuffer {
        let n = seconds * sr as usize;
        AudioBuffer::new((0..n).map(|i| i as f32 / n as f32).collect(), sr)
    }

    #[test]
    fn window_inside_buffer() {
        let buf = ramp(10, 100);
        let w = buf.window(2.0, Some(3.0)).unwrap();
        assert_eq!(w.samples().len(), 300);
        assert_eq!(w.sample_rate(), 100);
        assert!((w.duration() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn window_past_end_is_shortened() {
        let buf = ramp(10, 100);
        let w = buf.window(8.0, Some(30.0)).unwrap();
        assert!((w.duration() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn window_to_end_when_unbounded() {
        let buf = ramp(4, 100);
        let w = buf.window(1.0, None).unwrap();
        assert_eq!(w.samples().len(), 300);
    }

    #[test]
    fn window_offset_beyond_end_fails() {
        let buf = ramp(4, 100);
        assert!(matches!(
            buf.window(5.0, Some(1.0)),
            Err(AnalysisError::WindowOutOfRange { .. })
        ));
    }

    #[test]
    fn empty_buffer_has_no_windows() {
        let buf = AudioBuffer::new(Vec::new(), 44100);
        assert!(matches!(buf.window(0.0, None), Err(AnalysisError::EmptyAudio)));
    }

    #[test]
    fn stereo_frames_are_averaged() {
        let mut out = vec![0.25];
        downmix_into(&mut out, &[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2);
        assert_eq!(out, vec![0.25, 0.5, 0.5, 0.0]);
    }
}
