//! Qualification test sequencer
//!
//! Questions are answered in order; each answer is graded when submitted.
//! The test passes when overall accuracy reaches the configured threshold.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::admin::TestSettingFlag;
use crate::api::quiz::TestScore;
use crate::api::{ApiClient, QuestionKind, TestQuestion, TestResult, TestSettingsUpdate};
use crate::core::config::{Config, SliderRange};
use crate::core::error::{Error, Result};
use crate::core::prompt::Prompter;
use crate::session::UsernameStore;

pub const SKIP_PROMPT: &str = "Skip the qualification test and go straight to annotation? \
Make sure you are familiar with the annotation rules.";

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Choice(String),
    Value(f64),
}

impl Answer {
    fn to_value(&self) -> Value {
        match self {
            Answer::Choice(s) => Value::from(s.clone()),
            Answer::Value(v) => Value::from(*v),
        }
    }
}

/// Input shown for a question; V and A are never asked together
#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Choice { options: Vec<String> },
    Potency(SliderRange),
    Arousal(SliderRange),
}

/// Discrete answers must match exactly; V/A answers within `tolerance`
pub fn is_correct(kind: &QuestionKind, answer: &Answer, tolerance: f64) -> bool {
    match (kind, answer) {
        (QuestionKind::Discrete { correct_answer }, Answer::Choice(choice)) => choice == correct_answer,
        (QuestionKind::Potency { correct_answer }, Answer::Value(v))
        | (QuestionKind::Arousal { correct_answer }, Answer::Value(v)) => {
            // small epsilon so 0.5 off still counts after float rounding
            (v - correct_answer).abs() <= tolerance + 1e-9
        }
        _ => false,
    }
}

/// Rounded percentage; an empty denominator is 0
pub fn accuracy(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (correct as f64 / total as f64 * 100.0).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TestOutcome {
    pub correct: usize,
    pub total: usize,
    pub accuracy: u32,
    pub passed: bool,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    answer: Option<Answer>,
    /// `Some(correct)` once submitted
    graded: Option<bool>,
}

pub struct QualificationTest {
    questions: Vec<TestQuestion>,
    slots: Vec<Slot>,
    current: usize,
    options: Vec<String>,
    v_range: SliderRange,
    a_range: SliderRange,
    threshold: u32,
    tolerance: f64,
}

impl QualificationTest {
    pub fn new(questions: Vec<TestQuestion>, config: &Config) -> Self {
        let mut options = config.quiz.discrete_options.clone();
        for question in &questions {
            if let QuestionKind::Discrete { correct_answer } = &question.kind {
                if !options.contains(correct_answer) {
                    options.push(correct_answer.clone());
                }
            }
        }
        Self {
            slots: vec![Slot::default(); questions.len()],
            questions,
            current: 0,
            options,
            v_range: config.annotate.v_range,
            a_range: config.annotate.a_range,
            threshold: config.quiz.pass_threshold,
            tolerance: config.quiz.tolerance,
        }
    }

    /// No questions means there is nothing to take; the caller offers a skip
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&TestQuestion> {
        self.questions.get(self.current)
    }

    pub fn widget(&self) -> Option<Widget> {
        let question = self.current_question()?;
        Some(match question.kind {
            QuestionKind::Discrete { .. } => Widget::Choice {
                options: self.options.clone(),
            },
            QuestionKind::Potency { .. } => Widget::Potency(self.v_range),
            QuestionKind::Arousal { .. } => Widget::Arousal(self.a_range),
        })
    }

    pub fn answer(&self, index: usize) -> Option<&Answer> {
        self.slots.get(index).and_then(|s| s.answer.as_ref())
    }

    /// `Some(correct)` for a submitted question
    pub fn graded(&self, index: usize) -> Option<bool> {
        self.slots.get(index).and_then(|s| s.graded)
    }

    /// Record a selection for the current question
    pub fn select(&mut self, answer: Answer) -> Result<()> {
        let question = self
            .questions
            .get(self.current)
            .ok_or_else(|| Error::validation("No question to answer"))?;
        if self.slots[self.current].graded.is_some() {
            return Err(Error::validation("This answer was already submitted"));
        }
        let answer = match (&question.kind, answer) {
            (QuestionKind::Discrete { .. }, Answer::Choice(c)) => Answer::Choice(c.trim().to_string()),
            (QuestionKind::Potency { .. }, Answer::Value(v)) if v.is_finite() => {
                Answer::Value(self.v_range.snap(v))
            }
            (QuestionKind::Arousal { .. }, Answer::Value(v)) if v.is_finite() => {
                Answer::Value(self.a_range.snap(v))
            }
            (kind, _) => {
                return Err(Error::validation(format!(
                    "A {} question needs a {}",
                    kind.as_str(),
                    match kind {
                        QuestionKind::Discrete { .. } => "choice",
                        _ => "number",
                    }
                )))
            }
        };
        self.slots[self.current].answer = Some(answer);
        Ok(())
    }

    /// Grade the current selection. Returns whether it was correct.
    pub fn submit_answer(&mut self) -> Result<bool> {
        let question = self
            .questions
            .get(self.current)
            .ok_or_else(|| Error::validation("No question to answer"))?;
        let slot = &mut self.slots[self.current];
        if let Some(correct) = slot.graded {
            return Ok(correct);
        }
        let answer = slot
            .answer
            .as_ref()
            .ok_or_else(|| Error::validation("Choose an answer first"))?;
        let correct = is_correct(&question.kind, answer, self.tolerance);
        slot.graded = Some(correct);
        debug!(index = self.current, correct, "answer graded");
        Ok(correct)
    }

    /// Move on; only past a submitted question
    pub fn next(&mut self) -> bool {
        if self.graded(self.current).is_none() || self.current + 1 >= self.len() {
            return false;
        }
        self.current += 1;
        true
    }

    pub fn previous(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    pub fn correct_count(&self) -> usize {
        self.slots.iter().filter(|s| s.graded == Some(true)).count()
    }

    pub fn submitted_count(&self) -> usize {
        self.slots.iter().filter(|s| s.graded.is_some()).count()
    }

    /// Accuracy over the questions submitted so far
    pub fn running_accuracy(&self) -> u32 {
        accuracy(self.correct_count(), self.submitted_count())
    }

    pub fn is_finished(&self) -> bool {
        !self.is_empty() && self.submitted_count() == self.len()
    }

    /// 1-based numbers of questions not yet submitted
    pub fn unanswered(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.graded.is_none())
            .map(|(i, _)| i + 1)
            .collect()
    }

    pub fn outcome(&self) -> TestOutcome {
        let correct = self.correct_count();
        let total = self.len();
        let accuracy = accuracy(correct, total);
        TestOutcome {
            correct,
            total,
            accuracy,
            passed: total > 0 && accuracy >= self.threshold,
        }
    }

    /// Graded answers in the shape the server stores
    pub fn results(&self) -> Vec<TestResult> {
        self.questions
            .iter()
            .zip(&self.slots)
            .filter_map(|(q, slot)| {
                let answer = slot.answer.as_ref()?;
                Some(TestResult {
                    question_type: q.kind.as_str().to_string(),
                    filename: q.filename.clone(),
                    user_answer: answer.to_value(),
                    correct_answer: q.kind.correct_answer(),
                    is_correct: slot.graded?,
                })
            })
            .collect()
    }

    /// Start over with the same questions
    pub fn retake(&mut self) {
        self.slots = vec![Slot::default(); self.questions.len()];
        self.current = 0;
    }

    /// Post results; on a pass the user may skip the test from now on
    pub async fn finish(&self, api: &ApiClient, username: &str) -> Result<TestOutcome> {
        if !self.is_finished() {
            let missing = self
                .unanswered()
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::validation(format!("Questions not answered yet: {}", missing)));
        }
        let outcome = self.outcome();
        let score: TestScore = api.submit_test(username, &self.results()).await?;
        info!(
            user = username,
            accuracy = outcome.accuracy,
            server_score = score.score,
            passed = outcome.passed,
            "qualification test finished"
        );

        if outcome.passed {
            let update = TestSettingsUpdate::flag(username, TestSettingFlag::SkipTest, true);
            if let Err(e) = api.set_user_test_settings(&update).await {
                warn!(user = username, error = %e, "could not record the passed test");
            }
        }
        Ok(outcome)
    }

    /// Confirmed skip counts as a local pass
    pub fn skip(
        prompter: &mut dyn Prompter,
        store: &mut UsernameStore,
        username: &str,
    ) -> Result<bool> {
        if !prompter.confirm(SKIP_PROMPT)? {
            return Ok(false);
        }
        store.mark_passed(username);
        store.save()?;
        info!(user = username, "qualification test skipped");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompt::ScriptedPrompter;
    use tempfile::TempDir;

    fn discrete(name: &str, answer: &str) -> TestQuestion {
        TestQuestion {
            filename: name.to_string(),
            kind: QuestionKind::Discrete {
                correct_answer: answer.to_string(),
            },
        }
    }

    fn potency(name: &str, answer: f64) -> TestQuestion {
        TestQuestion {
            filename: name.to_string(),
            kind: QuestionKind::Potency {
                correct_answer: answer,
            },
        }
    }

    fn arousal(name: &str, answer: f64) -> TestQuestion {
        TestQuestion {
            filename: name.to_string(),
            kind: QuestionKind::Arousal {
                correct_answer: answer,
            },
        }
    }

    fn ten_questions() -> Vec<TestQuestion> {
        let mut questions = Vec::new();
        for i in 0..4 {
            questions.push(discrete(&format!("d{}.wav", i), if i % 2 == 0 { "anger" } else { "joy" }));
        }
        for i in 0..3 {
            questions.push(potency(&format!("v{}.wav", i), -1.0));
        }
        for i in 0..3 {
            questions.push(arousal(&format!("a{}.wav", i), 2.0));
        }
        questions
    }

    fn answer_all(test: &mut QualificationTest, wrong_at: Option<usize>) {
        for i in 0..test.len() {
            let kind = test.current_question().unwrap().kind.clone();
            let answer = match (kind, Some(i) == wrong_at) {
                (QuestionKind::Discrete { correct_answer }, false) => Answer::Choice(correct_answer),
                (QuestionKind::Discrete { .. }, true) => Answer::Choice("fear".to_string()),
                (QuestionKind::Potency { correct_answer }, wrong)
                | (QuestionKind::Arousal { correct_answer }, wrong) => {
                    Answer::Value(if wrong { correct_answer + 1.0 } else { correct_answer + 0.5 })
                }
            };
            test.select(answer).unwrap();
            test.submit_answer().unwrap();
            test.next();
        }
    }

    #[test]
    fn test_scoring_rules() {
        let d = QuestionKind::Discrete {
            correct_answer: "anger".to_string(),
        };
        assert!(is_correct(&d, &Answer::Choice("anger".to_string()), 0.5));
        assert!(!is_correct(&d, &Answer::Choice("Anger".to_string()), 0.5));

        let v = QuestionKind::Potency { correct_answer: -1.0 };
        assert!(is_correct(&v, &Answer::Value(-0.5), 0.5));
        assert!(is_correct(&v, &Answer::Value(-1.5), 0.5));
        assert!(!is_correct(&v, &Answer::Value(0.0), 0.5));
        assert!(!is_correct(&v, &Answer::Choice("x".to_string()), 0.5));
    }

    #[test]
    fn test_nine_of_ten_passes_at_threshold() {
        let mut test = QualificationTest::new(ten_questions(), &Config::default());
        answer_all(&mut test, Some(5));
        let outcome = test.outcome();
        assert_eq!(outcome.correct, 9);
        assert_eq!(outcome.accuracy, 90);
        assert!(outcome.passed);
        assert!(test.is_finished());
    }

    #[test]
    fn test_eight_of_ten_fails() {
        let mut test = QualificationTest::new(ten_questions(), &Config::default());
        answer_all(&mut test, Some(0));
        // one more wrong answer on top
        test.slots[9].graded = Some(false);
        assert_eq!(test.outcome().accuracy, 80);
        assert!(!test.outcome().passed);
    }

    #[test]
    fn test_widget_matches_question_type() {
        let test = QualificationTest::new(
            vec![discrete("d.wav", "anger"), potency("v.wav", 1.0)],
            &Config::default(),
        );
        match test.widget() {
            Some(Widget::Choice { options }) => assert!(options.contains(&"anger".to_string())),
            other => panic!("unexpected {:?}", other),
        }
        let mut test = test;
        test.select(Answer::Choice("anger".to_string())).unwrap();
        test.submit_answer().unwrap();
        assert!(test.next());
        assert!(matches!(test.widget(), Some(Widget::Potency(_))));
        assert!(test.select(Answer::Choice("anger".to_string())).is_err());
    }

    #[test]
    fn test_next_requires_submission_and_answers_persist() {
        let mut test = QualificationTest::new(ten_questions(), &Config::default());
        assert!(!test.next());
        assert!(test.submit_answer().is_err());

        test.select(Answer::Choice("anger".to_string())).unwrap();
        assert!(test.submit_answer().unwrap());
        assert!(test.select(Answer::Choice("joy".to_string())).is_err());
        assert!(test.next());
        assert!(test.previous());
        assert_eq!(test.answer(0), Some(&Answer::Choice("anger".to_string())));
        assert_eq!(test.graded(0), Some(true));
    }

    #[test]
    fn test_running_accuracy_counts_submitted_only() {
        let mut test = QualificationTest::new(ten_questions(), &Config::default());
        assert_eq!(test.running_accuracy(), 0);
        test.select(Answer::Choice("anger".to_string())).unwrap();
        test.submit_answer().unwrap();
        test.next();
        test.select(Answer::Choice("anger".to_string())).unwrap();
        test.submit_answer().unwrap();
        assert_eq!(test.running_accuracy(), 50);
    }

    #[test]
    fn test_retake_clears_answers() {
        let mut test = QualificationTest::new(ten_questions(), &Config::default());
        answer_all(&mut test, None);
        test.retake();
        assert_eq!(test.current_index(), 0);
        assert_eq!(test.submitted_count(), 0);
        assert_eq!(test.unanswered().len(), 10);
        assert!(test.results().is_empty());
    }

    #[test]
    fn test_results_shape() {
        let mut test = QualificationTest::new(vec![arousal("a.wav", 2.0)], &Config::default());
        test.select(Answer::Value(2.4)).unwrap();
        test.submit_answer().unwrap();
        let results = test.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].question_type, "arousal");
        assert_eq!(results[0].user_answer, Value::from(2.5));
        assert!(results[0].is_correct);
    }

    #[test]
    fn test_empty_question_list() {
        let test = QualificationTest::new(Vec::new(), &Config::default());
        assert!(test.is_empty());
        assert!(!test.is_finished());
        assert!(!test.outcome().passed);
        assert_eq!(test.widget(), None);
    }

    #[test]
    fn test_skip_marks_user_passed() {
        let dir = TempDir::new().unwrap();
        let mut store = UsernameStore::open_at(dir.path().join("session.json"));

        let mut no = ScriptedPrompter::always(false);
        assert!(!QualificationTest::skip(&mut no, &mut store, "alice").unwrap());
        assert!(!store.has_passed("alice"));

        let mut yes = ScriptedPrompter::always(true);
        assert!(QualificationTest::skip(&mut yes, &mut store, "alice").unwrap());
        assert!(UsernameStore::open_at(dir.path().join("session.json")).has_passed("alice"));
    }

    #[tokio::test]
    async fn test_finish_refuses_unanswered() {
        let api = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let test = QualificationTest::new(ten_questions(), &Config::default());
        let err = test.finish(&api, "alice").await.unwrap_err();
        assert!(err.to_string().contains("1, 2, 3"));
    }

    #[test]
    fn test_choice_grid_offers_distractors() {
        let test = QualificationTest::new(vec![discrete("愤怒-2.wav", "愤怒")], &Config::default());
        let Some(Widget::Choice { options }) = test.widget() else {
            panic!("expected a choice grid");
        };
        assert!(options.len() > 1);
        assert_eq!(options.iter().filter(|o| o.as_str() == "愤怒").count(), 1);

        // answers outside the configured labels are still offered
        let test = QualificationTest::new(vec![discrete("x.wav", "anger")], &Config::default());
        let Some(Widget::Choice { options }) = test.widget() else {
            panic!("expected a choice grid");
        };
        assert_eq!(options.last().map(String::as_str), Some("anger"));
        assert!(options.len() > 1);
    }
}
