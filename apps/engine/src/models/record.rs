//! The durable unit of work: one submitted resume and its analysis outcome.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::feedback::Feedback;

/// Record-store key for an analysis record.
pub fn record_key(id: Uuid) -> String {
    format!("record:{id}")
}

/// Persisted state of one analysis, keyed `record:<id>` in the record store.
///
/// Written twice under the same key: once as a `Pending` stub before inference
/// (the first durability point) and once as `Complete` after the feedback has
/// been parsed. A `Pending` record found later is in-flight or abandoned;
/// abandoned stubs are left in place rather than garbage-collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub resume_blob_path: String,
    pub image_blob_path: String,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,

    #[serde(flatten)]
    pub outcome: AnalysisOutcome,
}

/// Outcome as a tagged union with an explicit `status` discriminant, so that
/// "no feedback yet" is a distinct state rather than an empty field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AnalysisOutcome {
    Pending,
    Complete { feedback: Feedback },
}

impl AnalysisRecord {
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, AnalysisOutcome::Complete { .. })
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        match &self.outcome {
            AnalysisOutcome::Pending => None,
            AnalysisOutcome::Complete { feedback } => Some(feedback),
        }
    }

    /// Consumes the record and returns the completed version with `feedback`
    /// attached. Identity and blob paths are unchanged.
    pub fn into_complete(self, feedback: Feedback) -> Self {
        Self {
            outcome: AnalysisOutcome::Complete { feedback },
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::feedback::{AtsFeedback, Category, Tip, TipKind};

    fn sample_feedback() -> Feedback {
        Feedback {
            overall_score: 81,
            tone_and_style: Category {
                score: 78,
                tips: vec![Tip {
                    kind: TipKind::Good,
                    tip: "Consistent voice".to_string(),
                    explanation: "Bullets read in the same active register".to_string(),
                }],
            },
            content: Category {
                score: 84,
                tips: vec![Tip {
                    kind: TipKind::Improve,
                    tip: "Add metrics".to_string(),
                    explanation: "Two bullets have no measurable outcome".to_string(),
                }],
            },
            structure: Category { score: 80, tips: vec![] },
            skills: Category { score: 83, tips: vec![] },
            ats: AtsFeedback {
                score: 77,
                tips: vec![Tip {
                    kind: TipKind::Improve,
                    tip: "Spell out acronyms".to_string(),
                    explanation: "Keyword scanners miss unexpanded terms".to_string(),
                }],
            },
        }
    }

    fn sample_record(outcome: AnalysisOutcome) -> AnalysisRecord {
        AnalysisRecord {
            id: Uuid::new_v4(),
            resume_blob_path: "uploads/resume.pdf".to_string(),
            image_blob_path: "uploads/resume.png".to_string(),
            company_name: "Acme".to_string(),
            job_title: "Engineer".to_string(),
            job_description: "Build things".to_string(),
            outcome,
        }
    }

    #[test]
    fn test_record_key_format() {
        let id = Uuid::new_v4();
        assert_eq!(record_key(id), format!("record:{id}"));
    }

    #[test]
    fn test_pending_record_serializes_status_discriminant() {
        let record = sample_record(AnalysisOutcome::Pending);
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["status"], "pending");
        assert_eq!(value["resumeBlobPath"], "uploads/resume.pdf");
        assert!(value.get("feedback").is_none());
    }

    #[test]
    fn test_complete_record_round_trips_identically() {
        let record = sample_record(AnalysisOutcome::Complete {
            feedback: sample_feedback(),
        });

        let json = serde_json::to_string(&record).unwrap();
        let restored: AnalysisRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, record);
        assert_eq!(restored.feedback().unwrap().overall_score, 81);
        assert_eq!(restored.feedback().unwrap().ats.tips.len(), 1);
    }

    #[test]
    fn test_into_complete_preserves_identity_and_paths() {
        let pending = sample_record(AnalysisOutcome::Pending);
        let id = pending.id;
        let completed = pending.into_complete(sample_feedback());

        assert!(completed.is_complete());
        assert_eq!(completed.id, id);
        assert_eq!(completed.resume_blob_path, "uploads/resume.pdf");
        assert_eq!(completed.image_blob_path, "uploads/resume.png");
    }
}
