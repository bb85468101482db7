//! VA / discrete annotation editor
//!
//! Holds the control state of the annotation form: two sliders, the
//! patient-status and emotion-type radios and the discrete-emotion picker.
//! Exactly one of the two modes is active and only its fields are editable.
//! Leaving a mode with unsaved edits asks for confirmation and discards that
//! mode's unsaved buffer.

use tokio::task::JoinHandle;
use tracing::debug;

use super::model::{Annotation, Completeness, EmotionType, PatientStatus};
use crate::api::ApiClient;
use crate::core::config::{AnnotateConfig, SliderRange};
use crate::core::error::{Error, Result};
use crate::core::prompt::Prompter;
use crate::core::request::{RequestTokens, Resource, Ticket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Va,
    Discrete,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Va => "VA",
            Mode::Discrete => "discrete",
        }
    }
}

/// A slider that may be untouched
#[derive(Debug, Clone, PartialEq)]
pub struct Slider {
    range: SliderRange,
    value: Option<f64>,
}

impl Slider {
    pub fn new(range: SliderRange) -> Self {
        Self { range, value: None }
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn range(&self) -> SliderRange {
        self.range
    }

    /// Snap and clamp, returning the stored value
    fn set(&mut self, value: f64) -> Result<f64> {
        if !value.is_finite() {
            return Err(Error::validation(format!("'{}' is not a number", value)));
        }
        let snapped = self.range.snap(value);
        self.value = Some(snapped);
        Ok(snapped)
    }

    fn restore(&mut self, value: Option<f64>) {
        self.value = value.filter(|v| v.is_finite()).map(|v| self.range.snap(v));
    }

    /// Two decimals, or `--` when untouched
    pub fn display(&self) -> String {
        match self.value {
            Some(v) => format!("{:.2}", v),
            None => "--".to_string(),
        }
    }
}

/// A saved-label fetch running in the background under a `Label` ticket
pub struct PendingLabel {
    ticket: Ticket,
    audio_file: String,
    handle: JoinHandle<Result<Option<Annotation>>>,
}

impl PendingLabel {
    /// Start fetching; any earlier label fetch is superseded and aborted
    pub fn spawn(
        api: &ApiClient,
        tokens: &RequestTokens,
        username: &str,
        speaker: &str,
        audio_file: &str,
    ) -> Self {
        let ticket = tokens.begin(Resource::Label);
        let api = api.clone();
        let (user, spk, file) = (
            username.to_string(),
            speaker.to_string(),
            audio_file.to_string(),
        );
        let handle = tokio::spawn(async move { api.get_label(&user, &spk, &file).await });
        tokens.attach(&ticket, handle.abort_handle());
        Self {
            ticket,
            audio_file: audio_file.to_string(),
            handle,
        }
    }
}

pub struct EmotionAnnotator {
    mode: Mode,
    v: Slider,
    a: Slider,
    emotion_type: Option<EmotionType>,
    discrete_emotion: Option<String>,
    patient_status: Option<PatientStatus>,
    emotions: Vec<String>,
    /// Last loaded or saved values, restored when a mode's edits are discarded
    baseline: Annotation,
    modified: bool,
}

impl EmotionAnnotator {
    pub fn new(config: &AnnotateConfig) -> Self {
        Self {
            mode: Mode::Va,
            v: Slider::new(config.v_range),
            a: Slider::new(config.a_range),
            emotion_type: None,
            discrete_emotion: None,
            patient_status: None,
            emotions: config.discrete_emotions.clone(),
            baseline: Annotation::default(),
            modified: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    pub fn v(&self) -> &Slider {
        &self.v
    }

    pub fn a(&self) -> &Slider {
        &self.a
    }

    pub fn emotion_type(&self) -> Option<EmotionType> {
        self.emotion_type
    }

    pub fn discrete_emotion(&self) -> Option<&str> {
        self.discrete_emotion.as_deref()
    }

    pub fn patient_status(&self) -> Option<PatientStatus> {
        self.patient_status
    }

    /// Discrete emotions offered by the picker
    pub fn emotions(&self) -> &[String] {
        &self.emotions
    }

    /// The picker is shown only for non-neutral clips
    pub fn discrete_picker_visible(&self) -> bool {
        self.emotion_type == Some(EmotionType::NonNeutral)
    }

    /// Fields belong to one mode; editing the other mode's fields is refused
    pub fn ensure_mode(&self, mode: Mode) -> Result<()> {
        if self.mode == mode {
            return Ok(());
        }
        Err(Error::validation(match mode {
            Mode::Va => "V and A can only be changed in VA mode (q to go back)",
            Mode::Discrete => "Continue to discrete mode first (q)",
        }))
    }

    pub fn set_v(&mut self, value: f64) -> Result<f64> {
        self.ensure_mode(Mode::Va)?;
        let value = self.v.set(value)?;
        self.modified = true;
        Ok(value)
    }

    pub fn set_a(&mut self, value: f64) -> Result<f64> {
        self.ensure_mode(Mode::Va)?;
        let value = self.a.set(value)?;
        self.modified = true;
        Ok(value)
    }

    pub fn set_patient_status(&mut self, status: PatientStatus) -> Result<()> {
        self.ensure_mode(Mode::Discrete)?;
        self.patient_status = Some(status);
        self.modified = true;
        Ok(())
    }

    /// Changing the emotion type always clears the discrete emotion
    pub fn set_emotion_type(&mut self, emotion_type: EmotionType) -> Result<()> {
        self.ensure_mode(Mode::Discrete)?;
        if self.emotion_type == Some(emotion_type) {
            return Ok(());
        }
        self.emotion_type = Some(emotion_type);
        self.discrete_emotion = None;
        self.modified = true;
        Ok(())
    }

    pub fn set_discrete_emotion(&mut self, emotion: &str) -> Result<()> {
        self.ensure_mode(Mode::Discrete)?;
        if !self.discrete_picker_visible() {
            return Err(Error::validation(
                "Choose 'non-neutral' before picking a discrete emotion",
            ));
        }
        let emotion = emotion.trim();
        let known = self
            .emotions
            .iter()
            .find(|e| e.eq_ignore_ascii_case(emotion))
            .ok_or_else(|| {
                Error::validation(format!(
                    "Unknown emotion '{}' (one of: {})",
                    emotion,
                    self.emotions.join(", ")
                ))
            })?;
        self.discrete_emotion = Some(known.clone());
        self.modified = true;
        Ok(())
    }

    /// Snapshot of the current control values
    pub fn current_annotation(&self) -> Annotation {
        Annotation {
            v_value: self.v.value(),
            a_value: self.a.value(),
            emotion_type: self.emotion_type,
            discrete_emotion: match self.emotion_type {
                Some(EmotionType::NonNeutral) => self.discrete_emotion.clone(),
                _ => None,
            },
            patient_status: self.patient_status,
        }
    }

    /// Completeness of the live controls
    pub fn completeness(&self) -> Completeness {
        Completeness::of(&self.current_annotation())
    }

    /// Populate every control from `label`; absent fields become unset
    pub fn apply_label(&mut self, label: &Annotation) {
        let label = label.clone().normalized();
        self.v.restore(label.v_value);
        self.a.restore(label.a_value);
        self.emotion_type = label.emotion_type;
        self.patient_status = label.patient_status;
        self.discrete_emotion = label.discrete_emotion.clone();
        self.baseline = self.current_annotation();
        self.modified = false;
    }

    /// Fetch the saved label for a clip and populate the controls
    pub async fn load_saved_label(
        &mut self,
        api: &ApiClient,
        tokens: &RequestTokens,
        username: &str,
        speaker: &str,
        audio_file: &str,
    ) -> Result<Option<Annotation>> {
        let pending = PendingLabel::spawn(api, tokens, username, speaker, audio_file);
        self.apply_pending(tokens, pending).await
    }

    /// Wait for a label fetch and populate the controls, unless a newer
    /// fetch has superseded it (`Err(Cancelled)`, controls untouched)
    pub async fn apply_pending(
        &mut self,
        tokens: &RequestTokens,
        pending: PendingLabel,
    ) -> Result<Option<Annotation>> {
        let PendingLabel {
            ticket,
            audio_file,
            handle,
        } = pending;
        let result = match handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                debug!(%audio_file, "label fetch aborted by a newer selection");
                return Err(Error::Cancelled);
            }
            Err(e) => {
                return Err(Error::Network {
                    message: format!("Label fetch for {} failed: {}", audio_file, e),
                })
            }
        };
        tokens.check(&ticket)?;
        tokens.finish(&ticket);
        let label = result?;

        match &label {
            Some(label) => self.apply_label(label),
            None => {
                debug!(%audio_file, "no saved label, clearing controls");
                self.apply_label(&Annotation::default());
            }
        }
        Ok(label)
    }

    /// Clear every control to unset and return to VA mode
    pub fn reset(&mut self) {
        self.v.restore(None);
        self.a.restore(None);
        self.emotion_type = None;
        self.discrete_emotion = None;
        self.patient_status = None;
        self.baseline = Annotation::default();
        self.mode = Mode::Va;
        self.modified = false;
    }

    /// The current values are now persisted
    pub fn mark_saved(&mut self) {
        self.baseline = self.current_annotation();
        self.modified = false;
    }

    /// VA → discrete. Returns `false` when the user keeps editing.
    pub fn continue_to_discrete(&mut self, prompter: &mut dyn Prompter) -> Result<bool> {
        if self.mode == Mode::Discrete {
            return Ok(true);
        }
        if self.modified
            && !prompter.confirm("VA annotation modified but not saved. Continue anyway? (save first to keep it)")?
        {
            return Ok(false);
        }
        self.discard_va_edits();
        self.mode = Mode::Discrete;
        Ok(true)
    }

    /// Discrete → VA. Returns `false` when the user keeps editing.
    pub fn back_to_va(&mut self, prompter: &mut dyn Prompter) -> Result<bool> {
        if self.mode == Mode::Va {
            return Ok(true);
        }
        if self.modified
            && !prompter.confirm("Discrete annotation not saved. Go back to VA anyway?")?
        {
            return Ok(false);
        }
        self.discard_discrete_edits();
        self.mode = Mode::Va;
        Ok(true)
    }

    fn discard_va_edits(&mut self) {
        if self.modified {
            self.v.restore(self.baseline.v_value);
            self.a.restore(self.baseline.a_value);
        }
        self.modified = false;
    }

    fn discard_discrete_edits(&mut self) {
        if self.modified {
            self.emotion_type = self.baseline.emotion_type;
            self.discrete_emotion = self.baseline.discrete_emotion.clone();
            self.patient_status = self.baseline.patient_status;
        }
        self.modified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompt::ScriptedPrompter;

    fn annotator() -> EmotionAnnotator {
        EmotionAnnotator::new(&AnnotateConfig::default())
    }

    fn discrete() -> EmotionAnnotator {
        let mut ann = annotator();
        ann.continue_to_discrete(&mut ScriptedPrompter::always(true))
            .unwrap();
        ann
    }

    #[test]
    fn test_starts_unset_in_va_mode() {
        let ann = annotator();
        assert_eq!(ann.mode(), Mode::Va);
        assert_eq!(ann.current_annotation(), Annotation::default());
        assert_eq!(ann.v().display(), "--");
        assert!(!ann.is_modified());
    }

    #[test]
    fn test_setters_mark_dirty_and_snap() {
        let mut ann = annotator();
        assert_eq!(ann.set_v(1.4).unwrap(), 1.5);
        assert!(ann.is_modified());
        assert_eq!(ann.set_a(9.0).unwrap(), 5.0);
        assert_eq!(ann.a().display(), "5.00");
        assert!(ann.set_v(f64::NAN).is_err());
    }

    #[test]
    fn test_neutral_switch_clears_discrete() {
        let mut ann = discrete();
        ann.set_emotion_type(EmotionType::NonNeutral).unwrap();
        ann.set_discrete_emotion("anger").unwrap();
        assert!(ann.discrete_picker_visible());

        ann.set_emotion_type(EmotionType::Neutral).unwrap();
        assert_eq!(ann.discrete_emotion(), None);
        assert!(!ann.discrete_picker_visible());
        assert_eq!(ann.current_annotation().discrete_emotion, None);
    }

    #[test]
    fn test_switch_to_non_neutral_clears_previous_pick() {
        let mut ann = discrete();
        ann.apply_label(&Annotation {
            emotion_type: Some(EmotionType::NonNeutral),
            discrete_emotion: Some("joy".to_string()),
            ..Default::default()
        });
        ann.set_emotion_type(EmotionType::Neutral).unwrap();
        ann.set_emotion_type(EmotionType::NonNeutral).unwrap();
        assert_eq!(ann.discrete_emotion(), None);
    }

    #[test]
    fn test_discrete_emotion_requires_non_neutral() {
        let mut ann = discrete();
        assert!(ann.set_discrete_emotion("anger").is_err());
        ann.set_emotion_type(EmotionType::NonNeutral).unwrap();
        assert!(ann.set_discrete_emotion("nostalgia").is_err());
        ann.set_discrete_emotion("Anger").unwrap();
        assert_eq!(ann.discrete_emotion(), Some("anger"));
    }

    #[test]
    fn test_apply_label_nulls_absent_fields() {
        let mut ann = annotator();
        ann.apply_label(&Annotation {
            v_value: Some(2.0),
            patient_status: Some(PatientStatus::Patient),
            ..Default::default()
        });
        ann.set_a(1.0).unwrap();

        ann.apply_label(&Annotation {
            a_value: Some(3.0),
            ..Default::default()
        });
        assert_eq!(ann.v().value(), None);
        assert_eq!(ann.a().value(), Some(3.0));
        assert_eq!(ann.patient_status(), None);
        assert!(!ann.is_modified());
    }

    #[test]
    fn test_completeness_is_live() {
        let mut ann = annotator();
        assert!(ann.completeness().is_empty());
        ann.set_v(0.0).unwrap();
        ann.set_a(3.0).unwrap();
        assert!(ann.completeness().has_va());
        ann.mark_saved();

        ann.continue_to_discrete(&mut ScriptedPrompter::always(false))
            .unwrap();
        ann.set_patient_status(PatientStatus::NonPatient).unwrap();
        ann.set_emotion_type(EmotionType::Neutral).unwrap();
        assert!(ann.completeness().has_va());
        assert!(ann.completeness().has_discrete());
    }

    #[test]
    fn test_continue_declined_keeps_mode() {
        let mut ann = annotator();
        ann.set_v(1.0).unwrap();
        let mut prompter = ScriptedPrompter::answers([false]);
        assert!(!ann.continue_to_discrete(&mut prompter).unwrap());
        assert_eq!(ann.mode(), Mode::Va);
        assert_eq!(ann.v().value(), Some(1.0));
        assert!(ann.is_modified());
    }

    #[test]
    fn test_continue_discards_only_unsaved_va_edits() {
        let mut ann = annotator();
        ann.apply_label(&Annotation {
            v_value: Some(-1.0),
            a_value: Some(2.0),
            emotion_type: Some(EmotionType::Neutral),
            patient_status: Some(PatientStatus::Patient),
            ..Default::default()
        });
        ann.set_v(1.5).unwrap();

        let mut prompter = ScriptedPrompter::answers([true]);
        assert!(ann.continue_to_discrete(&mut prompter).unwrap());
        assert_eq!(ann.mode(), Mode::Discrete);
        assert_eq!(ann.v().value(), Some(-1.0));
        assert_eq!(ann.emotion_type(), Some(EmotionType::Neutral));
        assert!(!ann.is_modified());
    }

    #[test]
    fn test_clean_switch_does_not_prompt() {
        let mut ann = annotator();
        let mut prompter = ScriptedPrompter::always(false);
        assert!(ann.continue_to_discrete(&mut prompter).unwrap());
        assert!(ann.back_to_va(&mut prompter).unwrap());
        assert_eq!(prompter.asked(), 0);
    }

    #[test]
    fn test_back_discards_discrete_edits() {
        let mut ann = annotator();
        let mut prompter = ScriptedPrompter::always(true);
        ann.continue_to_discrete(&mut prompter).unwrap();
        ann.set_emotion_type(EmotionType::NonNeutral).unwrap();
        ann.set_discrete_emotion("fear").unwrap();

        assert!(ann.back_to_va(&mut prompter).unwrap());
        assert_eq!(ann.emotion_type(), None);
        assert_eq!(ann.discrete_emotion(), None);
        assert_eq!(prompter.asked(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ann = annotator();
        let mut prompter = ScriptedPrompter::always(true);
        ann.set_v(1.0).unwrap();
        ann.continue_to_discrete(&mut prompter).unwrap();
        ann.set_patient_status(PatientStatus::Patient).unwrap();

        ann.reset();
        assert_eq!(ann.mode(), Mode::Va);
        assert_eq!(ann.current_annotation(), Annotation::default());
        assert!(!ann.is_modified());
    }

    #[test]
    fn test_fields_only_editable_in_their_mode() {
        let mut ann = annotator();
        assert!(ann.set_patient_status(PatientStatus::Patient).is_err());
        assert!(ann.set_emotion_type(EmotionType::Neutral).is_err());
        assert_eq!(ann.patient_status(), None);
        assert!(!ann.is_modified());

        let mut ann = discrete();
        assert!(ann.set_v(2.0).is_err());
        assert!(ann.set_a(4.0).is_err());
        assert_eq!(ann.v().value(), None);
        assert!(!ann.is_modified());
    }

    #[test]
    fn test_round_trip_through_discrete_keeps_va_clean() {
        let mut ann = annotator();
        ann.apply_label(&Annotation {
            v_value: Some(-1.0),
            a_value: Some(2.0),
            ..Default::default()
        });
        let mut prompter = ScriptedPrompter::always(true);
        ann.continue_to_discrete(&mut prompter).unwrap();
        let _ = ann.set_v(2.0);
        ann.set_patient_status(PatientStatus::Patient).unwrap();

        assert!(ann.back_to_va(&mut prompter).unwrap());
        assert_eq!(ann.v().value(), Some(-1.0));
        assert_eq!(ann.patient_status(), None);
        assert!(!ann.is_modified());
        assert_eq!(ann.current_annotation(), ann.baseline);
    }

    #[tokio::test]
    async fn test_superseded_label_fetch_leaves_controls_alone() {
        let api = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let tokens = RequestTokens::new();
        let mut ann = annotator();
        ann.apply_label(&Annotation {
            v_value: Some(1.0),
            ..Default::default()
        });

        let first = PendingLabel::spawn(&api, &tokens, "alice", "spk1", "a.wav");
        let second = PendingLabel::spawn(&api, &tokens, "alice", "spk1", "b.wav");

        assert!(matches!(
            ann.apply_pending(&tokens, first).await,
            Err(Error::Cancelled)
        ));
        assert_eq!(ann.v().value(), Some(1.0));

        // the current fetch reports its own failure
        let err = ann.apply_pending(&tokens, second).await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(ann.v().value(), Some(1.0));
    }
}
