//! Structured feedback returned by the inference capability.
//!
//! Wire format uses camelCase keys (`overallScore`, `toneAndStyle`, `ATS`) so
//! stored records stay readable by any other client of the same platform
//! namespace. Scores are bounded 0–100 by the instruction template; the types
//! keep them as `u8` so out-of-range payloads fail at parse time.

use serde::{Deserialize, Serialize};

/// Full feedback report for one analyzed resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub overall_score: u8,
    pub tone_and_style: Category,
    pub content: Category,
    pub structure: Category,
    pub skills: Category,
    #[serde(rename = "ATS")]
    pub ats: AtsFeedback,
}

/// One scored dimension with its improvement tips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub score: u8,
    pub tips: Vec<Tip>,
}

/// ATS compatibility section. Same shape as `Category` on the wire today, but
/// kept separate so the two can diverge without a breaking change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtsFeedback {
    pub score: u8,
    pub tips: Vec<Tip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Good,
    Improve,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feedback_uses_camel_case_and_ats_keys() {
        let feedback = Feedback {
            overall_score: 72,
            tone_and_style: Category { score: 70, tips: vec![] },
            content: Category { score: 75, tips: vec![] },
            structure: Category { score: 68, tips: vec![] },
            skills: Category { score: 80, tips: vec![] },
            ats: AtsFeedback { score: 65, tips: vec![] },
        };

        let value = serde_json::to_value(&feedback).unwrap();
        assert_eq!(value["overallScore"], json!(72));
        assert_eq!(value["toneAndStyle"]["score"], json!(70));
        assert_eq!(value["ATS"]["score"], json!(65));
    }

    #[test]
    fn test_tip_kind_serializes_lowercase() {
        let tip = Tip {
            kind: TipKind::Improve,
            tip: "Quantify impact".to_string(),
            explanation: "Numbers make bullets credible".to_string(),
        };

        let value = serde_json::to_value(&tip).unwrap();
        assert_eq!(value["type"], json!("improve"));
    }

    #[test]
    fn test_out_of_range_score_is_rejected() {
        let raw = json!({ "score": 300, "tips": [] });
        assert!(serde_json::from_value::<Category>(raw).is_err());
    }
}
