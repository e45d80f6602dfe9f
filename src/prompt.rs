//! Render analysis results as a text prompt for a music generation model.
//!
//! Clauses are collected in a fixed order and joined with ", ". There is no
//! length limit.

use clap::ValueEnum;
use serde::Deserialize;

use crate::analyzer::{AnalysisResult, EnergyLevel};
use crate::classify::genre::{REGIONAL_GENRE, UNKNOWN_GENRE};
use crate::detailed::DetailedAnalysis;

/// How closely the generated piece should follow the reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Similarity {
    #[default]
    High,
    Medium,
    Low,
}

const REGIONAL_TITLE: &str = "Turkish Black Sea music (Karadeniz müziği)";
const MAX_BASIC_INSTRUMENTS: usize = 5;
const MAX_DETAILED_INSTRUMENTS: usize = 6;

/// Prompt for a basic analysis.
pub fn render(result: &AnalysisResult, similarity: Similarity) -> String {
    let has = |name: &str| result.instruments.iter().any(|i| i == name);
    let genre = result.estimated_genre.as_str();

    if genre == REGIONAL_GENRE {
        return render_regional(result.tempo, &has, similarity);
    }

    let mut parts: Vec<String> = Vec::new();

    if has("kemenche") || has("tulum") || genre.to_lowercase().contains(REGIONAL_GENRE) {
        parts.push(REGIONAL_TITLE.into());
        parts.push("traditional Karadeniz style".into());
        parts.push("energetic, rhythmic, folk music".into());
    } else {
        parts.push(genre_clause(genre));
    }

    let names = spoken_instruments(&result.instruments);
    if !names.is_empty() {
        parts.push(names.join(", "));
    }

    parts.push(format!("{} BPM", result.tempo));
    parts.push(
        match result.energy_level {
            EnergyLevel::High => "energetic, powerful, driving",
            EnergyLevel::Low => "calm, relaxed, mellow",
            EnergyLevel::Medium => "moderate energy",
        }
        .into(),
    );
    if result.bass_prominent {
        parts.push("strong bass, deep bass line, prominent low end".into());
    }
    parts.push(format!("key of {}", result.key));

    if has("saxophone") && matches!(genre, "blues" | "jazz") {
        parts.push("melodic, emotional".into());
    }
    match similarity {
        Similarity::High => parts.push("similar style, matching tempo and energy".into()),
        Similarity::Medium => parts.push("inspired by, similar vibe and mood".into()),
        Similarity::Low => {}
    }
    parts.push("modern production, professional quality".into());

    parts.join(", ")
}

/// Fixed template used when the genre is the regional one.
fn render_regional(tempo: u32, has: &dyn Fn(&str) -> bool, similarity: Similarity) -> String {
    let mut parts: Vec<String> = vec![REGIONAL_TITLE.into()];
    for (name, gloss) in [
        ("kemenche", "kemenche (Karadeniz kemençesi)"),
        ("tulum", "tulum (Karadeniz bagpipe)"),
        ("davul", "davul (drum)"),
        ("zurna", "zurna"),
    ] {
        if has(name) {
            parts.push(gloss.into());
        }
    }
    parts.push(format!("{} BPM", tempo));
    parts.push("traditional Turkish Black Sea style, energetic, rhythmic, folk music".into());
    parts.push("melodic, emotional, regional Turkish music".into());
    if similarity == Similarity::High {
        parts.push("authentic Karadeniz sound, traditional arrangement".into());
    }
    parts.join(", ")
}

fn genre_clause(genre: &str) -> String {
    match genre {
        UNKNOWN_GENRE => "music".into(),
        "turkish_folk" => "Turkish folk music".into(),
        "turkish_pop" => "Turkish pop music".into(),
        other => format!("{} music", other),
    }
}

/// Instrument names as they read in a prompt: drum parts collapse into one
/// "drums", vocals are left out, at most five names.
fn spoken_instruments(instruments: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut seen_drums = false;
    for inst in instruments {
        match inst.as_str() {
            "kick_drum" | "snare_drum" | "hi_hat" => {
                if !seen_drums {
                    names.push("drums".into());
                    seen_drums = true;
                }
            }
            "kemenche" => names.push("kemenche (Karadeniz kemençesi)".into()),
            "tulum" => names.push("tulum (Karadeniz tulumu)".into()),
            "baglama" => names.push("bağlama (saz)".into()),
            "vocals" => {}
            other => names.push(other.replace('_', " ")),
        }
        if names.len() >= MAX_BASIC_INSTRUMENTS {
            break;
        }
    }
    names
}

fn detailed_gloss(instrument: &str) -> &str {
    match instrument {
        "kemenche" => "kemenche (Karadeniz kemençesi, traditional 3-string fiddle)",
        "tulum" => "tulum (Karadeniz bagpipe, traditional wind instrument)",
        "davul" => "davul (traditional Turkish drum)",
        "zurna" => "zurna (traditional Turkish wind instrument)",
        "baglama" => "bağlama (saz, traditional Turkish string instrument)",
        "bass" => "bass guitar",
        "electric_guitar" => "electric guitar",
        other => other,
    }
}

/// Prompt for a detailed analysis.
pub fn render_detailed(analysis: &DetailedAnalysis) -> String {
    let mut parts: Vec<String> = Vec::new();

    match analysis.estimated_genre.as_str() {
        REGIONAL_GENRE => {
            parts.push("Turkish Black Sea folk music, Karadeniz müziği".into());
            parts.push("authentic traditional Karadeniz style".into());
        }
        "turkish_folk" => parts.push("Turkish folk music".into()),
        other => parts.push(format!("{} music", other)),
    }

    let glossed: Vec<&str> = analysis
        .instruments
        .iter()
        .take(MAX_DETAILED_INSTRUMENTS)
        .map(|i| detailed_gloss(i))
        .collect();
    if !glossed.is_empty() {
        parts.push(glossed.join(", "));
    }

    let regional = &analysis.regional;
    if let (true, Some(style)) = (regional.has_kemenche, regional.kemenche_style) {
        parts.push(format!("kemenche {}", style));
    }
    if let (true, Some(style)) = (regional.has_tulum, regional.tulum_style) {
        parts.push(format!("tulum {}", style));
    }
    if !regional.rhythm_style.is_empty() {
        parts.push(regional.rhythm_style.into());
    }

    parts.push(format!("{} BPM", analysis.tempo));

    let rhythm = &analysis.rhythm;
    parts.push(format!("time signature {}", rhythm.time_signature));
    parts.push(format!("{} rhythmic complexity", rhythm.rhythmic_complexity));
    parts.push(rhythm.groove_type.into());

    let melodic = &analysis.melodic;
    parts.push(format!("key of {} {}", melodic.key, melodic.mode));
    parts.push(format!("{} melodic contour", melodic.melodic_direction));

    parts.push(format!("{} energy", analysis.dynamics.energy_level));
    parts.push(format!("{} energy contour", analysis.dynamics.energy_contour));

    parts.push(format!("{} timbre", analysis.spectral.brightness));
    parts.push(
        if analysis.spectral.harmonic_ratio > 0.6 {
            "harmonic, melodic"
        } else {
            "percussive, rhythmic"
        }
        .into(),
    );

    parts.extend(
        [
            "professional production",
            "clear instrument separation",
            "balanced mix",
            "authentic sound",
        ]
        .map(String::from),
    );

    parts.join(", ")
}
