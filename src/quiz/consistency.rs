//! Consistency test sequencer
//!
//! Answers are not graded here; the server compares them against the gold
//! standard later. A question counts as answered once it has a discrete
//! emotion. Sliders start at V=0, A=3.

use tracing::{debug, info, warn};

use crate::annotate::model::{EmotionType, PatientStatus};
use crate::api::admin::TestSettingFlag;
use crate::api::{ApiClient, ConsistencyAnswer, ConsistencyQuestion, TestSettingsUpdate};
use crate::core::config::{AnnotateConfig, SliderRange};
use crate::core::error::{Error, Result};

pub const DEFAULT_V: f64 = 0.0;
pub const DEFAULT_A: f64 = 3.0;
pub const INCOMPLETE_ALERT: &str = "Complete every annotation for this question first";

/// How a consistency session ended, or why it did not start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyOutcome {
    /// User is already flagged as done
    AlreadyCompleted,
    NoQuestions,
    Submitted { message: Option<String> },
}

pub struct ConsistencyTest {
    questions: Vec<ConsistencyQuestion>,
    saved: Vec<Option<ConsistencyAnswer>>,
    current: usize,
    draft: ConsistencyAnswer,
    emotions: Vec<String>,
    v_range: SliderRange,
    a_range: SliderRange,
}

impl ConsistencyTest {
    pub fn new(questions: Vec<ConsistencyQuestion>, config: &AnnotateConfig) -> Self {
        let mut test = Self {
            saved: vec![None; questions.len()],
            questions,
            current: 0,
            draft: ConsistencyAnswer::default(),
            emotions: config.discrete_emotions.clone(),
            v_range: config.v_range,
            a_range: config.a_range,
        };
        test.show(0);
        test
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&ConsistencyQuestion> {
        self.questions.get(self.current)
    }

    pub fn audio_url(&self, api: &ApiClient) -> Result<Option<url::Url>> {
        self.current_question()
            .map(|q| api.consistency_audio_url(&q.filename))
            .transpose()
    }

    /// The form as currently filled in
    pub fn draft(&self) -> &ConsistencyAnswer {
        &self.draft
    }

    pub fn emotions(&self) -> &[String] {
        &self.emotions
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.len()
    }

    pub fn set_v(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::validation(format!("'{}' is not a number", value)));
        }
        self.draft.v_value = Some(self.v_range.snap(value));
        Ok(())
    }

    pub fn set_a(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::validation(format!("'{}' is not a number", value)));
        }
        self.draft.a_value = Some(self.a_range.snap(value));
        Ok(())
    }

    pub fn set_discrete_emotion(&mut self, emotion: &str) -> Result<()> {
        let emotion = emotion.trim();
        let known = self
            .emotions
            .iter()
            .find(|e| e.eq_ignore_ascii_case(emotion))
            .ok_or_else(|| Error::validation(format!("Unknown emotion '{}'", emotion)))?;
        self.draft.discrete_emotion = Some(known.clone());
        Ok(())
    }

    pub fn set_emotion_type(&mut self, emotion_type: EmotionType) {
        self.draft.emotion_type = Some(emotion_type);
    }

    pub fn set_patient_status(&mut self, status: PatientStatus) {
        self.draft.patient_status = Some(status);
    }

    fn is_complete(answer: &ConsistencyAnswer) -> bool {
        answer.v_value.is_some()
            && answer.a_value.is_some()
            && answer
                .discrete_emotion
                .as_deref()
                .map_or(false, |s| !s.is_empty())
    }

    /// Load question `index` into the form: its saved answer, or defaults
    fn show(&mut self, index: usize) {
        let Some(question) = self.questions.get(index) else {
            return;
        };
        self.current = index;
        self.draft = match &self.saved[index] {
            Some(answer) => answer.clone(),
            None => ConsistencyAnswer {
                filename: question.filename.clone(),
                v_value: Some(DEFAULT_V),
                a_value: Some(DEFAULT_A),
                ..ConsistencyAnswer::default()
            },
        };
    }

    fn save_current(&mut self) {
        if let Some(slot) = self.saved.get_mut(self.current) {
            *slot = Some(self.draft.clone());
        }
    }

    /// Refuses while the current question has no discrete emotion
    pub fn next(&mut self) -> Result<bool> {
        if !Self::is_complete(&self.draft) {
            return Err(Error::validation(INCOMPLETE_ALERT));
        }
        self.save_current();
        if self.is_last() {
            return Ok(false);
        }
        self.show(self.current + 1);
        Ok(true)
    }

    /// Keeps whatever was entered, complete or not
    pub fn previous(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.save_current();
        self.show(self.current - 1);
        true
    }

    pub fn go_to(&mut self, index: usize) -> bool {
        if index >= self.len() {
            return false;
        }
        self.save_current();
        self.show(index);
        true
    }

    /// 1-based numbers of questions still missing a required field
    pub fn incomplete(&self) -> Vec<usize> {
        self.saved
            .iter()
            .enumerate()
            .filter(|(_, answer)| !answer.as_ref().map_or(false, Self::is_complete))
            .map(|(i, _)| i + 1)
            .collect()
    }

    /// Every answer, once all questions are complete
    pub fn answers(&mut self) -> Result<Vec<ConsistencyAnswer>> {
        if !Self::is_complete(&self.draft) {
            return Err(Error::validation(INCOMPLETE_ALERT));
        }
        self.save_current();
        let incomplete = self.incomplete();
        if !incomplete.is_empty() {
            let list = incomplete
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::validation(format!("These questions are not finished yet: {}", list)));
        }
        Ok(self.saved.iter().flatten().cloned().collect())
    }

    /// Post all answers, then flag the user as done. A failed flag update
    /// still counts as completed.
    pub async fn submit(&mut self, api: &ApiClient, username: &str) -> Result<ConsistencyOutcome> {
        let answers = self.answers()?;
        let message = api.submit_consistency(username, &answers).await?;
        info!(user = username, answers = answers.len(), "consistency test submitted");

        let update = TestSettingsUpdate::flag(username, TestSettingFlag::SkipConsistencyTest, true);
        if let Err(e) = api.set_user_test_settings(&update).await {
            warn!(user = username, error = %e, "could not flag consistency test as done");
        }
        Ok(ConsistencyOutcome::Submitted { message })
    }
}

pub enum Start {
    Ready(ConsistencyTest),
    Done(ConsistencyOutcome),
}

/// Check the user's flags and fetch the questions
pub async fn start(api: &ApiClient, username: &str, config: &AnnotateConfig) -> Result<Start> {
    match api.test_settings(username).await {
        Ok(settings) if settings.skip_consistency_test => {
            return Ok(Start::Done(ConsistencyOutcome::AlreadyCompleted));
        }
        Ok(_) => {}
        Err(e) => debug!(user = username, error = %e, "test settings unavailable, starting anyway"),
    }
    let questions = api.consistency_questions().await?;
    if questions.is_empty() {
        return Ok(Start::Done(ConsistencyOutcome::NoQuestions));
    }
    Ok(Start::Ready(ConsistencyTest::new(questions, config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(n: usize) -> Vec<ConsistencyQuestion> {
        (0..n)
            .map(|i| ConsistencyQuestion {
                filename: format!("q{}.wav", i),
                base_name: None,
            })
            .collect()
    }

    fn test(n: usize) -> ConsistencyTest {
        ConsistencyTest::new(questions(n), &AnnotateConfig::default())
    }

    #[test]
    fn test_draft_starts_at_defaults() {
        let t = test(3);
        assert_eq!(t.draft().filename, "q0.wav");
        assert_eq!(t.draft().v_value, Some(0.0));
        assert_eq!(t.draft().a_value, Some(3.0));
        assert_eq!(t.draft().discrete_emotion, None);
    }

    #[test]
    fn test_next_requires_discrete_emotion() {
        let mut t = test(3);
        assert!(t.next().is_err());
        assert_eq!(t.current_index(), 0);

        t.set_discrete_emotion("Joy").unwrap();
        assert!(t.next().unwrap());
        assert_eq!(t.current_index(), 1);
        assert!(t.set_discrete_emotion("nostalgia").is_err());
    }

    #[test]
    fn test_revisit_restores_answer() {
        let mut t = test(3);
        t.set_v(-1.5).unwrap();
        t.set_a(4.0).unwrap();
        t.set_discrete_emotion("fear").unwrap();
        t.set_patient_status(PatientStatus::Patient);
        t.next().unwrap();

        assert!(t.previous());
        assert_eq!(t.draft().v_value, Some(-1.5));
        assert_eq!(t.draft().a_value, Some(4.0));
        assert_eq!(t.draft().discrete_emotion.as_deref(), Some("fear"));
        assert_eq!(t.draft().patient_status, Some(PatientStatus::Patient));
    }

    #[test]
    fn test_previous_keeps_partial_answer() {
        let mut t = test(3);
        t.set_discrete_emotion("joy").unwrap();
        t.next().unwrap();
        t.set_v(2.0).unwrap();
        assert!(t.previous());
        assert!(t.go_to(1));
        assert_eq!(t.draft().v_value, Some(2.0));
        assert!(!t.go_to(5));
    }

    #[test]
    fn test_submit_lists_incomplete_questions() {
        let mut t = test(3);
        assert!(t.go_to(2));
        t.set_discrete_emotion("anger").unwrap();

        let err = t.answers().unwrap_err();
        assert!(err.to_string().ends_with("1, 2"), "{}", err);
        assert_eq!(t.incomplete(), vec![1, 2]);
    }

    #[test]
    fn test_answers_when_all_complete() {
        let mut t = test(2);
        t.set_discrete_emotion("anger").unwrap();
        t.next().unwrap();
        t.set_discrete_emotion("joy").unwrap();
        assert!(!t.next().unwrap());

        let answers = t.answers().unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[1].filename, "q1.wav");
        assert_eq!(answers[1].discrete_emotion.as_deref(), Some("joy"));
    }
}
