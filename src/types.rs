use serde::{Deserialize, Serialize};

/// Final risk bucket for an analyzed message. Pure function of the integer score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Safe,
    MediumRisk,
    HighRisk,
}

impl Verdict {
    pub fn from_score(score: i32) -> Self {
        if score >= 6 {
            Verdict::HighRisk
        } else if score >= 3 {
            Verdict::MediumRisk
        } else {
            Verdict::Safe
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::HighRisk => "High risk: phishing detected",
            Verdict::MediumRisk => "Medium risk: be careful",
            Verdict::Safe => "Looks safe",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Verdict::HighRisk => "high",
            Verdict::MediumRisk => "medium",
            Verdict::Safe => "safe",
        }
    }
}

/// Per-request scoring result. Lives for one request only.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub score: i32,
    pub reasons: Vec<String>,
    pub probability: f64,
}
