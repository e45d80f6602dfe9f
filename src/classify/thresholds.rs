//! Tunable constants of the instrument boost rules.
//!
//! Every multiplier is relative to the global mean band energy. The basic
//! profile is the default; the detailed analyzer uses a stricter kemenche
//! rule and skips zurna.

use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Scores at or below this never make the ranked list
    pub detection_floor: f32,
    pub kemenche: KemencheRule,
    pub tulum: TulumRule,
    pub zurna: ZurnaRule,
    pub davul: DavulRule,
}

/// Bowed, bright, sustained tone.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct KemencheRule {
    pub enabled: bool,
    /// Fires on its own above this ratio
    pub energy_ratio: f32,
    /// Fires above this ratio when the spectrum is bright
    pub bright_energy_ratio: f32,
    /// Mean spectral centroid that counts as bright (Hz)
    pub bright_centroid_hz: f32,
    pub gain: f32,
    /// Also fire when the violin band is itself detected
    pub violin_assist: bool,
    /// Extra gain when assisted and the core band outweighs violin
    pub violin_gain: f32,
}

/// Sustained drone: loud and steady.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TulumRule {
    pub enabled: bool,
    pub energy_ratio: f32,
    /// Band variance must stay below this fraction of the whole spectrogram's
    pub variance_ratio: f32,
    pub gain: f32,
}

/// Sharp, high wind instrument.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ZurnaRule {
    pub enabled: bool,
    pub energy_ratio: f32,
    pub gain: f32,
}

/// Low drum, gated on rhythmic activity.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DavulRule {
    pub enabled: bool,
    pub energy_ratio: f32,
    /// Strictly more onsets than this are required
    pub min_onsets: usize,
    pub gain: f32,
}

impl Thresholds {
    pub fn basic() -> Self {
        Self::default()
    }

    pub fn detailed() -> Self {
        Self {
            kemenche: KemencheRule {
                energy_ratio: 1.3,
                bright_energy_ratio: 1.1,
                gain: 0.8,
                violin_assist: false,
                ..KemencheRule::default()
            },
            zurna: ZurnaRule {
                enabled: false,
                ..ZurnaRule::default()
            },
            ..Self::default()
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            detection_floor: 0.1,
            kemenche: KemencheRule::default(),
            tulum: TulumRule::default(),
            zurna: ZurnaRule::default(),
            davul: DavulRule::default(),
        }
    }
}

impl Default for KemencheRule {
    fn default() -> Self {
        Self {
            enabled: true,
            energy_ratio: 1.2,
            bright_energy_ratio: 1.0,
            bright_centroid_hz: 2000.0,
            gain: 1.0,
            violin_assist: true,
            violin_gain: 0.5,
        }
    }
}

impl Default for TulumRule {
    fn default() -> Self {
        Self {
            enabled: true,
            energy_ratio: 1.2,
            variance_ratio: 0.8,
            gain: 0.6,
        }
    }
}

impl Default for ZurnaRule {
    fn default() -> Self {
        Self {
            enabled: true,
            energy_ratio: 1.4,
            gain: 0.5,
        }
    }
}

impl Default for DavulRule {
    fn default() -> Self {
        Self {
            enabled: true,
            energy_ratio: 1.1,
            min_onsets: 10,
            gain: 0.7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_table_keeps_other_defaults() {
        let t: Thresholds = toml::from_str(
            r#"
            detection_floor = 0.2
            [zurna]
            energy_ratio = 1.6
            "#,
        )
        .unwrap();
        assert_eq!(t.detection_floor, 0.2);
        assert_eq!(t.zurna.energy_ratio, 1.6);
        assert_eq!(t.zurna.gain, 0.5);
        assert_eq!(t.kemenche, KemencheRule::default());
    }

    #[test]
    fn detailed_profile_differs_where_expected() {
        let d = Thresholds::detailed();
        assert_eq!(d.kemenche.energy_ratio, 1.3);
        assert!(!d.kemenche.violin_assist);
        assert!(!d.zurna.enabled);
        assert_eq!(d.tulum, TulumRule::default());
        assert_eq!(d.davul, DavulRule::default());
    }
}
