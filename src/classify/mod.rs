pub mod bands;
pub mod genre;
pub mod thresholds;

pub use bands::{score_instruments, InstrumentScores, SpectralCues};
pub use thresholds::Thresholds;
