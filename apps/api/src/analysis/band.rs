use serde::Serialize;

/// Three-band classification shared by every score-rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

impl ScoreBand {
    pub fn hex(&self) -> &'static str {
        match self {
            ScoreBand::High => "#38a169",
            ScoreBand::Medium => "#ecc94b",
            ScoreBand::Low => "#e53e3e",
        }
    }
}

/// score > 75 → high, 50 ≤ score ≤ 75 → medium, otherwise low.
pub fn color_band(score: f64) -> ScoreBand {
    if score > 75.0 {
        ScoreBand::High
    } else if score >= 50.0 {
        ScoreBand::Medium
    } else {
        ScoreBand::Low
    }
}
