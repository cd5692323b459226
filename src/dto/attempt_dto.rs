use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One answer choice as shown to the learner. Correctness flags never
/// appear in this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptOptionView {
    pub id: Uuid,
    pub text: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptQuestionView {
    pub id: Uuid,
    pub question: String,
    pub is_multi: bool,
    pub answers: Vec<AttemptOptionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStateResponse {
    pub attempt_id: Uuid,
    pub duration: i32,
    pub questions: Vec<AttemptQuestionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub questions: Vec<AttemptQuestionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetAnswerRequest {
    pub option_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAttemptResponse {
    pub exists: bool,
    pub has_time_left: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_used: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<Uuid>,
    pub duration: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationView {
    pub module_id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub total_questions: usize,
    pub correct_answers: usize,
    pub score_percent: f64,
    pub recommendations: Vec<RecommendationView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndAttemptResponse {
    pub score: ScoreReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_view_serializes_with_camel_case_keys() {
        let view = AttemptQuestionView {
            id: Uuid::new_v4(),
            question: "Pick one".to_string(),
            is_multi: false,
            answers: vec![AttemptOptionView {
                id: Uuid::new_v4(),
                text: "A".to_string(),
                selected: true,
            }],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("isMulti").is_some());
        assert!(json["answers"][0].get("selected").is_some());
    }

    #[test]
    fn check_response_omits_absent_fields() {
        let resp = CheckAttemptResponse {
            exists: false,
            has_time_left: false,
            time_used: None,
            time_remaining: None,
            attempt_id: None,
            duration: 10,
            score: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("hasTimeLeft").is_some());
        assert!(json.get("timeUsed").is_none());
        assert!(json.get("attemptId").is_none());
    }

    #[test]
    fn set_answer_request_reads_camel_case() {
        let id = Uuid::new_v4();
        let req: SetAnswerRequest =
            serde_json::from_value(serde_json::json!({ "optionId": id })).unwrap();
        assert_eq!(req.option_id, id);
    }
}
