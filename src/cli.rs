use clap::Parser;
use std::path::PathBuf;

use crate::prompt::Similarity;

#[derive(Parser, Debug)]
#[command(
    name = "tunescribe",
    about = "Describe a piece of music as a text prompt for a music generation model"
)]
pub struct Cli {
    /// Input audio files (WAV, MP3, FLAC, OGG, AAC)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Config file (defaults to ./tunescribe.toml or the user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seconds to skip at the start of each track
    #[arg(long, default_value_t = 5.0)]
    pub skip: f32,

    /// Seconds to analyse [default: 90, or 120 with --detailed]
    #[arg(short, long)]
    pub duration: Option<f32>,

    /// Window length of the last loading retry
    #[arg(long, default_value_t = 30.0)]
    pub fallback_duration: f32,

    /// Run the detailed analysis (key and mode, rhythm, dynamics, regional style)
    #[arg(long)]
    pub detailed: bool,

    /// Also survey this many consecutive segments per track
    #[arg(long, default_value_t = 0)]
    pub segments: usize,

    /// How closely the prompt should follow the reference
    #[arg(short, long, value_enum, default_value_t = Similarity::High)]
    pub similarity: Similarity,

    /// Force instruments to the front of the list (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub instruments: Vec<String>,

    /// Force the genre label
    #[arg(long)]
    pub genre: Option<String>,

    /// Save all results as a JSON array
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Print the analysis without a prompt
    #[arg(long)]
    pub analyze_only: bool,
}
