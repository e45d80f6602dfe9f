mod analyzer;
mod audio;
mod classify;
mod cli;
mod config;
mod detailed;
mod error;
mod prompt;
mod survey;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};

use analyzer::{AnalysisResult, Overrides};
use audio::source::{FileSource, WindowRequest};
use classify::Thresholds;
use cli::Cli;
use detailed::DetailedAnalysis;
use prompt::Similarity;
use survey::SegmentSurvey;

#[derive(Serialize)]
#[serde(untagged)]
enum Analysis {
    Basic(AnalysisResult),
    Detailed(DetailedAnalysis),
}

#[derive(Serialize)]
struct Report {
    input: PathBuf,
    analysis: Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    survey: Option<SegmentSurvey>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect tunescribe.toml / global config
    let mut thresholds = Thresholds::basic();
    let config_path = cli.config.clone().or_else(config::find_config);
    if let Some(ref path) = config_path {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.skip == config::default_skip() { cli.skip = cfg.analysis.skip; }
            if cli.duration.is_none() {
                cli.duration = Some(if cli.detailed {
                    cfg.analysis.detailed_duration
                } else {
                    cfg.analysis.duration
                });
            }
            if cli.fallback_duration == config::default_fallback_duration() {
                cli.fallback_duration = cfg.analysis.fallback_duration;
            }
            if cli.segments == 0 { cli.segments = cfg.analysis.segments; }
            if cli.similarity == Similarity::High { cli.similarity = cfg.prompt.similarity; }
            if cli.instruments.is_empty() { cli.instruments = cfg.prompt.instruments; }
            if cli.genre.is_none() { cli.genre = cfg.prompt.genre; }
            thresholds = cfg.thresholds;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }
    if cli.detailed {
        thresholds = Thresholds::detailed();
    }

    let overrides = Overrides {
        instruments: cli
            .instruments
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        genre: cli.genre.clone(),
    };

    log::info!("tunescribe - music analysis to text prompt");
    log::info!(
        "Mode: {}, skip {:.1}s, {} input(s)",
        if cli.detailed { "detailed" } else { "basic" },
        cli.skip,
        cli.inputs.len()
    );

    let pb = if cli.inputs.len() > 1 {
        let pb = ProgressBar::new(cli.inputs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta} remaining)")?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut reports = Vec::with_capacity(cli.inputs.len());
    let mut failed = 0usize;

    for input in &cli.inputs {
        match process(input, &cli, &thresholds, &overrides) {
            Ok(report) => {
                match pb {
                    Some(ref pb) => pb.suspend(|| print_report(&report)),
                    None => print_report(&report),
                }
                reports.push(report);
            }
            Err(err) => {
                log::error!("{}: {:#}", input.display(), err);
                failed += 1;
            }
        }
        if let Some(ref pb) = pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = pb {
        pb.finish();
    }

    if let Some(ref path) = cli.json {
        let json = serde_json::to_string_pretty(&reports)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Saved {} result(s) to {}", reports.len(), path.display());
    }

    if failed > 0 {
        anyhow::bail!("{} of {} input(s) failed", failed, cli.inputs.len());
    }
    Ok(())
}

fn process(input: &Path, cli: &Cli, thresholds: &Thresholds, overrides: &Overrides) -> Result<Report> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("Decoding {}...", input.display());
    let source = FileSource::open(input)?;

    let duration = cli.duration.unwrap_or(if cli.detailed {
        config::default_detailed_duration()
    } else {
        config::default_duration()
    });
    let request = WindowRequest {
        offset: cli.skip,
        duration,
        fallback_duration: cli.fallback_duration,
    };

    let (analysis, prompt) = if cli.detailed {
        let mut result = detailed::analyze(&source, request, thresholds)
            .context("Detailed analysis failed")?;
        result.apply_overrides(overrides);
        let prompt = prompt::render_detailed(&result);
        (Analysis::Detailed(result), prompt)
    } else {
        let mut result =
            analyzer::analyze(&source, request, thresholds).context("Analysis failed")?;
        result.apply_overrides(overrides);
        let prompt = prompt::render(&result, cli.similarity);
        (Analysis::Basic(result), prompt)
    };

    let survey = if cli.segments > 0 {
        Some(
            survey::survey(&source, cli.skip, cli.segments, thresholds.detection_floor)
                .context("Segment survey failed")?,
        )
    } else {
        None
    };

    Ok(Report {
        input: input.to_path_buf(),
        analysis,
        prompt: (!cli.analyze_only).then_some(prompt),
        survey,
    })
}

fn print_report(report: &Report) {
    println!("\n{}", report.input.display());
    match report.analysis {
        Analysis::Basic(ref a) => {
            println!("  Tempo:        {} BPM", a.tempo);
            println!("  Key:          {}", a.key);
            println!("  Genre:        {}", a.estimated_genre);
            println!("  Instruments:  {}", a.instruments.join(", "));
            println!("  Energy:       {}", a.energy_level);
            println!("  Bass:         {}", if a.bass_prominent { "prominent" } else { "-" });
            println!("  Duration:     {:.1}s", a.duration);
        }
        Analysis::Detailed(ref a) => {
            println!("  Tempo:        {} BPM", a.tempo);
            println!(
                "  Key:          {} {} (confidence {:.2})",
                a.melodic.key, a.melodic.mode, a.melodic.key_confidence
            );
            println!("  Melody:       {}", a.melodic.melodic_direction);
            println!(
                "  Rhythm:       {}, {} complexity, {}",
                a.rhythm.time_signature, a.rhythm.rhythmic_complexity, a.rhythm.groove_type
            );
            println!(
                "  Dynamics:     {} energy, {} contour, range {:.3}",
                a.dynamics.energy_level, a.dynamics.energy_contour, a.dynamics.dynamic_range
            );
            println!(
                "  Timbre:       {}, harmonic ratio {:.2}",
                a.spectral.brightness, a.spectral.harmonic_ratio
            );
            println!("  Instruments:  {}", a.instruments.join(", "));
            if let Some(style) = a.regional.kemenche_style {
                println!("  Kemenche:     {}", style);
            }
            if let Some(style) = a.regional.tulum_style {
                println!("  Tulum:        {}", style);
            }
            println!("  Rhythm style: {}", a.regional.rhythm_style);
            println!(
                "  Genre:        {} (confidence {:.2})",
                a.estimated_genre, a.genre_confidence
            );
            println!("  Duration:     {:.1}s", a.duration);
        }
    }
    if let Some(ref s) = report.survey {
        println!(
            "  Survey:       {} segment(s), {} BPM, {}",
            s.segments,
            s.tempo,
            s.instruments.join(", ")
        );
    }
    if let Some(ref prompt) = report.prompt {
        println!("\nPrompt: {}", prompt);
    }
}
