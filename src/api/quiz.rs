//! Qualification and consistency test endpoints

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::client::{segment, ApiClient};
use crate::annotate::model::{EmotionType, PatientStatus};
use crate::core::error::Result;

/// What a qualification question asks for, with its reference answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuestionKind {
    /// Pick the discrete emotion
    Discrete { correct_answer: String },
    /// Rate valence
    Potency { correct_answer: f64 },
    /// Rate arousal
    Arousal { correct_answer: f64 },
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Discrete { .. } => "discrete",
            QuestionKind::Potency { .. } => "potency",
            QuestionKind::Arousal { .. } => "arousal",
        }
    }

    pub fn correct_answer(&self) -> Value {
        match self {
            QuestionKind::Discrete { correct_answer } => Value::from(correct_answer.clone()),
            QuestionKind::Potency { correct_answer } | QuestionKind::Arousal { correct_answer } => {
                Value::from(*correct_answer)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestQuestion {
    pub filename: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyQuestion {
    pub filename: String,
    #[serde(default)]
    pub base_name: Option<String>,
}

/// One graded answer as posted to `/api/test/submit`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    #[serde(rename = "type")]
    pub question_type: String,
    pub filename: String,
    pub user_answer: Value,
    pub correct_answer: Value,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestScore {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub correct_count: usize,
    #[serde(default)]
    pub total_questions: usize,
}

/// One consistency answer; the server stores it verbatim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyAnswer {
    pub filename: String,
    pub v_value: Option<f64>,
    pub a_value: Option<f64>,
    pub emotion_type: Option<EmotionType>,
    pub discrete_emotion: Option<String>,
    pub patient_status: Option<PatientStatus>,
}

#[derive(Debug, Deserialize)]
struct Questions<T> {
    #[serde(default = "Vec::new")]
    questions: Vec<T>,
}

#[derive(Debug, Serialize)]
struct Submission<'a, T> {
    username: &'a str,
    results: &'a [T],
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    message: Option<String>,
}

impl ApiClient {
    pub async fn test_questions(&self) -> Result<Vec<TestQuestion>> {
        let res: Questions<TestQuestion> = self.get("api/test/questions").await?;
        Ok(res.questions)
    }

    pub fn test_audio_url(&self, filename: &str) -> Result<Url> {
        self.resolve(&format!("api/test/audio/{}", segment(filename)))
    }

    pub async fn submit_test(&self, username: &str, results: &[TestResult]) -> Result<TestScore> {
        self.post("api/test/submit", &Submission { username, results })
            .await
    }

    pub async fn consistency_questions(&self) -> Result<Vec<ConsistencyQuestion>> {
        let res: Questions<ConsistencyQuestion> = self.get("api/consistency/questions").await?;
        Ok(res.questions)
    }

    pub fn consistency_audio_url(&self, filename: &str) -> Result<Url> {
        self.resolve(&format!("api/consistency/audio/{}", segment(filename)))
    }

    /// Store the answers; returns the server's confirmation text
    pub async fn submit_consistency(
        &self,
        username: &str,
        answers: &[ConsistencyAnswer],
    ) -> Result<Option<String>> {
        let res: Message = self
            .post(
                "api/consistency/submit",
                &Submission {
                    username,
                    results: answers,
                },
            )
            .await?;
        Ok(res.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_kinds_parse() {
        let questions: Vec<TestQuestion> = serde_json::from_str(
            r#"[
                {"filename": "愤怒-2.wav", "type": "discrete", "correct_answer": "愤怒", "folder": "discrete_emotions"},
                {"filename": "V负1-2.wav", "type": "potency", "correct_answer": -1.0, "folder": "potency"},
                {"filename": "A2-1.wav", "type": "arousal", "correct_answer": 2, "folder": "wake_up"}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            questions[0].kind,
            QuestionKind::Discrete {
                correct_answer: "愤怒".to_string()
            }
        );
        assert_eq!(questions[1].kind, QuestionKind::Potency { correct_answer: -1.0 });
        assert_eq!(questions[2].kind, QuestionKind::Arousal { correct_answer: 2.0 });
    }

    #[test]
    fn test_result_serializes_type_field() {
        let result = TestResult {
            question_type: "arousal".to_string(),
            filename: "A2-1.wav".to_string(),
            user_answer: Value::from(2.5),
            correct_answer: Value::from(2.0),
            is_correct: true,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "arousal");
        assert_eq!(json["user_answer"], 2.5);
    }
}
