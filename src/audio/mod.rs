pub mod analysis;
pub mod decode;
pub mod features;
pub mod rhythm;
pub mod source;
pub mod stft;
pub mod tonal;

#[cfg(test)]
pub mod synth;
