//! Multi-segment survey: vote on instruments and average tempo over
//! consecutive windows of one track.

use serde::Serialize;

use crate::audio::analysis::extract;
use crate::audio::rhythm::DEFAULT_TEMPO;
use crate::audio::source::AudioSource;
use crate::classify::bands::base_scores;
use crate::error::Result;

/// Longest segment examined (s).
const MAX_SEGMENT: f32 = 30.0;
const SURVEY_TOP_N: usize = 6;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SegmentSurvey {
    /// Most frequent first
    pub instruments: Vec<String>,
    pub tempo: u32,
    /// Segments that loaded and were analysed
    pub segments: usize,
}

/// Survey `count` segments starting `skip` seconds in.
///
/// A segment that fails to load is skipped. Only the base band score is
/// used per segment (no regional boosts), thresholded at `floor`.
pub fn survey(source: &dyn AudioSource, skip: f32, count: usize, floor: f32) -> Result<SegmentSurvey> {
    let total = match source.total_duration() {
        Some(total) => total,
        None => source.load(0.0, None)?.duration(),
    };
    let count = count.max(1);
    let segment = MAX_SEGMENT.min((total - skip) / count as f32);
    log::info!(
        "Surveying {} segments of {:.1}s from {}",
        count,
        segment,
        source.name()
    );

    // (name, votes) in first-seen order
    let mut votes: Vec<(&'static str, usize)> = Vec::new();
    let mut tempos: Vec<u32> = Vec::new();

    for i in 0..count {
        let offset = skip + i as f32 * segment;
        if segment <= 0.0 || offset + segment > total {
            break;
        }
        let buffer = match source.load(offset, Some(segment)) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("Segment {} at {:.1}s skipped: {}", i + 1, offset, e);
                continue;
            }
        };

        let (spec, features) = extract(&buffer);
        tempos.push(features.tempo);
        for (name, score) in base_scores(&spec).iter() {
            if score <= floor {
                continue;
            }
            match votes.iter_mut().find(|(n, _)| *n == name) {
                Some((_, v)) => *v += 1,
                None => votes.push((name, 1)),
            }
        }
        log::debug!("Segment {}: tempo {}", i + 1, features.tempo);
    }

    // Stable sort keeps first-seen order among equal counts
    votes.sort_by(|a, b| b.1.cmp(&a.1));
    let instruments = votes
        .into_iter()
        .take(SURVEY_TOP_N)
        .map(|(name, _)| name.to_string())
        .collect();

    let tempo = if tempos.is_empty() {
        DEFAULT_TEMPO as u32
    } else {
        (tempos.iter().map(|&t| t as f32).sum::<f32>() / tempos.len() as f32).round() as u32
    };

    Ok(SegmentSurvey {
        instruments,
        tempo,
        segments: tempos.len(),
    })
}
