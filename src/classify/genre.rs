//! Rule-based genre estimate from tempo and detected instruments.
//!
//! The regional (Karadeniz) rule is checked first and pre-empts the
//! general table whenever one of its instruments is present.

pub const REGIONAL_GENRE: &str = "karadeniz";
pub const UNKNOWN_GENRE: &str = "unknown";

/// How a cue recognizes an instrument name.
#[derive(Clone, Copy, Debug)]
pub enum InstrumentMatch {
    AnyOf(&'static [&'static str]),
    Contains(&'static str),
}

impl InstrumentMatch {
    pub fn matches(&self, instrument: &str) -> bool {
        match self {
            InstrumentMatch::AnyOf(names) => names.iter().any(|n| *n == instrument),
            InstrumentMatch::Contains(fragment) => instrument.contains(fragment),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GenreCue {
    pub matcher: InstrumentMatch,
    pub weight: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct GenreRule {
    pub genre: &'static str,
    /// Inclusive tempo range that earns the tempo bonus
    pub tempo_min: u32,
    pub tempo_max: u32,
    pub cues: &'static [GenreCue],
}

const TEMPO_BONUS: u32 = 2;

const fn cue(matcher: InstrumentMatch, weight: u32) -> GenreCue {
    GenreCue { matcher, weight }
}

const GUITARS: InstrumentMatch = InstrumentMatch::Contains("guitar");
const DRUMS: InstrumentMatch =
    InstrumentMatch::AnyOf(&["kick_drum", "snare_drum", "hi_hat", "drums"]);
const STRINGS: InstrumentMatch = InstrumentMatch::AnyOf(&["violin", "cello"]);

const fn only(name: &'static [&'static str]) -> InstrumentMatch {
    InstrumentMatch::AnyOf(name)
}

/// Regional instruments, regional tempo range and the score that confirms it.
pub const REGIONAL_RULE: GenreRule = GenreRule {
    genre: REGIONAL_GENRE,
    tempo_min: 80,
    tempo_max: 140,
    cues: &[
        cue(only(&["kemenche"]), 3),
        cue(only(&["tulum"]), 2),
        cue(only(&["davul"]), 1),
        cue(only(&["zurna"]), 1),
    ],
};
const REGIONAL_THRESHOLD: u32 = 3;

/// Declaration order breaks score ties.
pub static GENRE_RULES: [GenreRule; 7] = [
    GenreRule {
        genre: "rock",
        tempo_min: 120,
        tempo_max: 180,
        cues: &[cue(only(&["bass"]), 1), cue(GUITARS, 1), cue(DRUMS, 1)],
    },
    GenreRule {
        genre: "pop",
        tempo_min: 100,
        tempo_max: 140,
        cues: &[cue(only(&["bass"]), 1), cue(only(&["synthesizer"]), 1)],
    },
    GenreRule {
        genre: "jazz",
        tempo_min: 60,
        tempo_max: 200,
        cues: &[cue(only(&["piano"]), 1), cue(only(&["saxophone"]), 1)],
    },
    GenreRule {
        genre: "electronic",
        tempo_min: 120,
        tempo_max: 150,
        cues: &[
            cue(only(&["bass"]), 1),
            cue(only(&["synthesizer"]), 1),
            cue(DRUMS, 1),
        ],
    },
    GenreRule {
        genre: "classical",
        tempo_min: 40,
        tempo_max: 200,
        cues: &[cue(STRINGS, 1), cue(only(&["piano"]), 1)],
    },
    GenreRule {
        genre: "blues",
        tempo_min: 60,
        tempo_max: 120,
        cues: &[cue(GUITARS, 1), cue(only(&["bass"]), 1)],
    },
    GenreRule {
        genre: "turkish_folk",
        tempo_min: 70,
        tempo_max: 130,
        cues: &[cue(only(&["baglama"]), 2), cue(only(&["davul"]), 1)],
    },
];

impl GenreRule {
    /// Tempo bonus plus the weight of every cue matched by at least one instrument.
    pub fn score<S: AsRef<str>>(&self, tempo: u32, instruments: &[S]) -> u32 {
        let tempo_score = if (self.tempo_min..=self.tempo_max).contains(&tempo) {
            TEMPO_BONUS
        } else {
            0
        };
        let cue_score: u32 = self
            .cues
            .iter()
            .filter(|c| instruments.iter().any(|i| c.matcher.matches(i.as_ref())))
            .map(|c| c.weight)
            .sum();
        tempo_score + cue_score
    }

    fn any_cue_present<S: AsRef<str>>(&self, instruments: &[S]) -> bool {
        self.cues
            .iter()
            .any(|c| instruments.iter().any(|i| c.matcher.matches(i.as_ref())))
    }
}

/// Score of the general table, in declaration order.
pub fn score_table<S: AsRef<str>>(tempo: u32, instruments: &[S]) -> Vec<(&'static str, u32)> {
    GENRE_RULES
        .iter()
        .map(|rule| (rule.genre, rule.score(tempo, instruments)))
        .collect()
}

/// Estimate a genre label.
///
/// With no instruments at all the result is always "unknown".
pub fn classify<S: AsRef<str>>(tempo: u32, instruments: &[S]) -> &'static str {
    if instruments.is_empty() {
        return UNKNOWN_GENRE;
    }

    if REGIONAL_RULE.any_cue_present(instruments) {
        let score = REGIONAL_RULE.score(tempo, instruments);
        log::debug!("Regional score: {}", score);
        if score >= REGIONAL_THRESHOLD {
            return REGIONAL_GENRE;
        }
    }

    let mut best = UNKNOWN_GENRE;
    let mut best_score = 0;
    for (genre, score) in score_table(tempo, instruments) {
        // Strict comparison keeps the earlier rule on ties
        if score > best_score {
            best = genre;
            best_score = score;
        }
    }
    log::debug!("Genre table winner: {} ({})", best, best_score);
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regional_instruments_at_regional_tempo() {
        assert_eq!(classify(95, &["kemenche", "davul"]), "karadeniz");
        assert_eq!(classify(200, &["kemenche"]), "karadeniz");
        assert_eq!(classify(100, &["tulum"]), "karadeniz");
    }

    #[test]
    fn regional_rule_pre_empts_table() {
        // Rock would score 5 here
        assert_eq!(
            classify(150, &["kemenche", "electric_guitar", "bass", "snare_drum"]),
            "karadeniz"
        );
    }

    #[test]
    fn weak_regional_evidence_falls_through() {
        // davul alone scores 1 regionally; rock, jazz, electronic and classical all
        // score 2 on tempo and rock is declared first
        assert_eq!(classify(150, &["davul"]), "rock");
    }

    #[test]
    fn rock_band_at_rock_tempo() {
        assert_eq!(
            classify(150, &["electric_guitar", "bass", "snare_drum"]),
            "rock"
        );
    }

    #[test]
    fn ties_go_to_first_declared() {
        // pop: 2 + bass; electronic: 2 + bass; rock: 2 + bass; rock comes first
        assert_eq!(classify(130, &["bass"]), "rock");
        // pop and electronic both reach 4; pop is declared first
        assert_eq!(classify(130, &["bass", "synthesizer"]), "pop");
    }

    #[test]
    fn cues_only_count_once() {
        let rule = &GENRE_RULES[0];
        assert_eq!(
            rule.score(100, &["kick_drum", "snare_drum", "hi_hat"]),
            1
        );
    }

    #[test]
    fn no_instruments_is_unknown() {
        let empty: [&str; 0] = [];
        assert_eq!(classify(120, &empty), "unknown");
    }

    #[test]
    fn nothing_scores_is_unknown() {
        // Outside every tempo range and no cue matches
        assert_eq!(classify(250, &["accordion"]), "unknown");
    }

    #[test]
    fn baglama_reads_as_turkish_folk() {
        assert_eq!(classify(100, &["baglama", "piano"]), "turkish_folk");
    }
}
