//! Annotation workspace controller
//!
//! Composes the list, the annotator and the player, and runs the
//! save / next / previous / continue / back flows on top of them.

use tracing::{debug, info, warn};

use super::annotator::{EmotionAnnotator, Mode};
use super::audio_list::AudioListManager;
use super::keyboard::{Focus, Key, KeyboardHandler, Shortcut};
use super::player::{AudioPlayer, MediaBackend, PlaybackEvent};
use crate::api::LabelRecord;
use crate::core::context::AppContext;
use crate::core::error::{Error, Result};
use crate::core::prompt::Prompter;
use crate::core::request::InFlight;
use crate::output::banner::BannerBoard;

pub const UNSAVED_PROMPT: &str = "Current annotation not saved. Continue anyway?";
pub const FINISH_FIRST: &str = "Finish annotating the current clip before moving on";
const SAVING_LABEL: &str = "Saving...";

/// State of one save button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveButton {
    pub label: String,
    pub disabled: bool,
    pub saved: bool,
    pub visible: bool,
}

impl SaveButton {
    fn new(mode: Mode) -> Self {
        Self {
            label: save_label(mode, false).to_string(),
            disabled: true,
            saved: false,
            visible: mode == Mode::Va,
        }
    }
}

fn save_label(mode: Mode, saved: bool) -> &'static str {
    match (mode, saved) {
        (Mode::Va, false) => "Save VA (W)",
        (Mode::Va, true) => "Saved VA (W)",
        (Mode::Discrete, false) => "Save discrete (W)",
        (Mode::Discrete, true) => "Saved discrete (W)",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavButtons {
    pub previous_enabled: bool,
    pub next_enabled: bool,
}

pub struct EmotionLabelingApp<B: MediaBackend, P: Prompter> {
    ctx: AppContext,
    list: AudioListManager,
    annotator: EmotionAnnotator,
    player: AudioPlayer<B>,
    keyboard: KeyboardHandler,
    prompter: P,
    save_va: SaveButton,
    save_discrete: SaveButton,
    saving: InFlight,
    banners: BannerBoard,
}

impl<B: MediaBackend, P: Prompter> EmotionLabelingApp<B, P> {
    pub fn new(ctx: AppContext, backend: B, prompter: P) -> Self {
        let banners = BannerBoard::new(ctx.config.banner_ttl());
        Self {
            list: AudioListManager::new(ctx.clone()),
            annotator: EmotionAnnotator::new(&ctx.config.annotate),
            player: AudioPlayer::new(ctx.clone(), backend),
            keyboard: KeyboardHandler::new(),
            prompter,
            save_va: SaveButton::new(Mode::Va),
            save_discrete: SaveButton::new(Mode::Discrete),
            saving: InFlight::new(),
            banners,
            ctx,
        }
    }

    // ===== ACCESSORS =====

    pub fn username(&self) -> &str {
        self.ctx.username()
    }

    pub fn list(&self) -> &AudioListManager {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut AudioListManager {
        &mut self.list
    }

    pub fn annotator(&self) -> &EmotionAnnotator {
        &self.annotator
    }

    pub fn annotator_mut(&mut self) -> &mut EmotionAnnotator {
        &mut self.annotator
    }

    pub fn player(&self) -> &AudioPlayer<B> {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut AudioPlayer<B> {
        &mut self.player
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    pub fn prompter_mut(&mut self) -> &mut P {
        &mut self.prompter
    }

    pub fn banners(&self) -> &BannerBoard {
        &self.banners
    }

    pub fn banners_mut(&mut self) -> &mut BannerBoard {
        &mut self.banners
    }

    pub fn save_button(&self, mode: Mode) -> &SaveButton {
        match mode {
            Mode::Va => &self.save_va,
            Mode::Discrete => &self.save_discrete,
        }
    }

    fn save_button_mut(&mut self, mode: Mode) -> &mut SaveButton {
        match mode {
            Mode::Va => &mut self.save_va,
            Mode::Discrete => &mut self.save_discrete,
        }
    }

    /// Guard shared with the save control
    pub fn save_guard(&self) -> InFlight {
        self.saving.clone()
    }

    pub fn nav_buttons(&self) -> NavButtons {
        NavButtons {
            previous_enabled: self.list.previous_index().is_some(),
            next_enabled: self.list.current_index().is_some() && self.list.next_index().is_some(),
        }
    }

    // ===== LOADING =====

    /// Load the speaker list
    pub async fn init(&mut self) -> Result<()> {
        match self.list.init_speakers().await {
            Ok(speakers) => {
                info!(user = %self.ctx.username(), speakers = speakers.len(), "workspace ready");
                Ok(())
            }
            Err(e) => {
                self.banners.error("Loading speakers failed", &e);
                Err(e)
            }
        }
    }

    /// Switch speaker. Returns `false` when the switch was declined or failed.
    pub async fn select_speaker(&mut self, speaker: &str) -> Result<bool> {
        if !self.confirm_discard()? {
            return Ok(false);
        }
        if let Err(e) = self.list.select_speaker(speaker).await {
            warn!(speaker, error = %e, "speaker switch failed");
            self.banners.error("Loading the audio list failed", &e);
            return Ok(false);
        }
        self.player.stop();
        self.annotator.reset();
        self.refresh_save_buttons();
        Ok(true)
    }

    /// Select a clip from the list. Out-of-range indexes change nothing.
    pub async fn select_audio(&mut self, index: usize) -> Result<bool> {
        if index >= self.list.len() {
            debug!(index, len = self.list.len(), "ignoring out-of-range selection");
            return Ok(false);
        }
        if !self.confirm_discard()? {
            return Ok(false);
        }
        self.load_audio_file(index).await;
        Ok(true)
    }

    /// Load media, reset the form and populate it from the saved label
    pub async fn load_audio_file(&mut self, index: usize) {
        let Some(entry) = self.list.select_audio(index).cloned() else {
            return;
        };
        let speaker = self
            .list
            .current_speaker()
            .map(str::to_string)
            .unwrap_or_default();

        if let Err(e) = self.player.load_audio(&entry.path, &entry.file_name, &speaker) {
            warn!(file = %entry.file_name, error = %e, "could not load audio");
            self.banners.error("Loading audio failed", &e);
        }
        self.annotator.reset();

        if entry.labeled {
            let username = self.ctx.username().to_string();
            let loaded = self
                .annotator
                .load_saved_label(
                    &self.ctx.api,
                    &self.ctx.tokens,
                    &username,
                    &speaker,
                    &entry.file_name,
                )
                .await;
            match loaded {
                Ok(Some(_)) => debug!(file = %entry.file_name, "saved label applied"),
                Ok(None) => debug!(file = %entry.file_name, "clip marked labeled but no label stored"),
                Err(Error::Cancelled) => return,
                Err(e) => {
                    warn!(file = %entry.file_name, error = %e, "loading saved label failed");
                    self.banners.error("Loading the saved annotation failed", &e);
                }
            }
        }
        self.refresh_save_buttons();
    }

    // ===== SAVE =====

    /// Save the active mode. Failures are reported and leave the form retryable.
    pub async fn save(&mut self) -> Result<bool> {
        let Some(_guard) = self.saving.try_begin() else {
            debug!("save already in flight");
            return Ok(false);
        };
        let (Some(index), Some(entry)) = (self.list.current_index(), self.list.current_entry().cloned())
        else {
            self.banners.info("Select an audio file first");
            return Ok(false);
        };

        let mode = self.annotator.mode();
        let annotation = self.annotator.current_annotation();
        let record = LabelRecord {
            username: self.ctx.username().to_string(),
            speaker: self.list.current_speaker().unwrap_or_default().to_string(),
            audio_file: entry.file_name.clone(),
            annotation: annotation.clone(),
        };

        let previous = self.save_button(mode).clone();
        {
            let button = self.save_button_mut(mode);
            button.label = SAVING_LABEL.to_string();
            button.disabled = true;
        }

        match self.ctx.api.save_label(&record).await {
            Ok(()) => {
                let persisted = entry.annotation_completeness | annotation.completeness();
                self.list.update_audio_label_status(index, true, persisted);
                self.annotator.mark_saved();
                self.refresh_save_buttons();
                info!(file = %entry.file_name, mode = mode.label(), tags = ?persisted.tags(), "annotation saved");
                self.banners
                    .success(format!("Saved {} annotation for {}", mode.label(), entry.file_name));
                Ok(true)
            }
            Err(e) => {
                warn!(file = %entry.file_name, error = %e, "save failed");
                let button = self.save_button_mut(mode);
                button.label = previous.label;
                button.disabled = false;
                self.prompter
                    .alert(&format!("Saving the {} annotation failed, please retry", mode.label()));
                self.banners.error("Save failed", &e);
                Ok(false)
            }
        }
    }

    /// Recompute both save buttons from the persisted tags and the active mode
    pub fn refresh_save_buttons(&mut self) {
        let persisted = self.list.current_entry().map(|e| e.annotation_completeness);
        let mode = self.annotator.mode();
        for m in [Mode::Va, Mode::Discrete] {
            let saved = persisted.map_or(false, |tags| match m {
                Mode::Va => tags.has_va(),
                Mode::Discrete => tags.has_discrete(),
            });
            let button = self.save_button_mut(m);
            button.saved = saved;
            button.label = save_label(m, saved).to_string();
            button.disabled = persisted.is_none();
            button.visible = m == mode;
        }
    }

    // ===== NAVIGATION =====

    fn confirm_discard(&mut self) -> Result<bool> {
        if !self.annotator.is_modified() {
            return Ok(true);
        }
        let keep_going = self.prompter.confirm(UNSAVED_PROMPT)?;
        if !keep_going {
            debug!("navigation declined, unsaved edits kept");
        }
        Ok(keep_going)
    }

    /// Advance one clip, only past clips that have something saved
    pub async fn next(&mut self) -> Result<bool> {
        if !self.confirm_discard()? {
            return Ok(false);
        }
        if let Some(entry) = self.list.current_entry() {
            if !entry.annotation_completeness.allows_advance() {
                info!(file = %entry.file_name, "next refused, nothing saved yet");
                self.prompter.alert(FINISH_FIRST);
                return Ok(false);
            }
        }
        let Some(index) = self.list.next_index() else {
            debug!("already at the last clip");
            return Ok(false);
        };
        self.load_audio_file(index).await;
        Ok(true)
    }

    pub async fn previous(&mut self) -> Result<bool> {
        if !self.confirm_discard()? {
            return Ok(false);
        }
        let Some(index) = self.list.previous_index() else {
            debug!("already at the first clip");
            return Ok(false);
        };
        self.load_audio_file(index).await;
        Ok(true)
    }

    /// VA → discrete, or discrete → VA
    pub fn continue_or_back(&mut self) -> Result<bool> {
        let switched = match self.annotator.mode() {
            Mode::Va => self.annotator.continue_to_discrete(&mut self.prompter)?,
            Mode::Discrete => self.annotator.back_to_va(&mut self.prompter)?,
        };
        self.refresh_save_buttons();
        Ok(switched)
    }

    // ===== PLAYBACK & KEYS =====

    pub fn toggle_play_pause(&mut self) {
        if let Err(e) = self.player.toggle_play_pause() {
            warn!(error = %e, "playback failed");
            self.banners.error("Playback failed", &e);
        }
    }

    /// Forward player events; finished clips bump the play count
    pub fn poll_player(&mut self) -> Vec<PlaybackEvent> {
        self.player.handle_events()
    }

    pub async fn handle_shortcut(&mut self, shortcut: Shortcut) -> Result<()> {
        debug!(%shortcut, "shortcut");
        match shortcut {
            Shortcut::TogglePlayPause => self.toggle_play_pause(),
            Shortcut::Previous => {
                self.previous().await?;
            }
            Shortcut::Next => {
                self.next().await?;
            }
            Shortcut::Save => {
                self.save().await?;
            }
            Shortcut::ContinueOrBack => {
                self.continue_or_back()?;
            }
        }
        Ok(())
    }

    /// Run the shortcut bound to `key`, if focus allows one
    pub async fn handle_key(&mut self, key: Key, focus: Focus) -> Result<Option<Shortcut>> {
        let Some(shortcut) = self.keyboard.dispatch(key, focus) else {
            return Ok(None);
        };
        self.handle_shortcut(shortcut).await?;
        Ok(Some(shortcut))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::model::Completeness;
    use crate::annotate::player::RecordingBackend;
    use crate::api::{ApiClient, AudioEntry};
    use crate::core::config::Config;
    use crate::core::prompt::ScriptedPrompter;

    fn entry(name: &str, tags: Completeness) -> AudioEntry {
        AudioEntry {
            file_name: name.to_string(),
            path: format!("/api/audio/spk1/{}", name),
            // unlabeled keeps selection off the network
            labeled: false,
            annotation_completeness: tags,
        }
    }

    fn app(prompter: ScriptedPrompter) -> EmotionLabelingApp<RecordingBackend, ScriptedPrompter> {
        let api = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let ctx = AppContext::new(api, Config::default(), "alice");
        let mut app = EmotionLabelingApp::new(ctx, RecordingBackend::default(), prompter);
        app.list.set_entries(
            "spk1",
            vec![
                entry("a.wav", Completeness::empty()),
                entry("b.wav", Completeness::VA),
                entry("c.wav", Completeness::DISCRETE),
            ],
        );
        app
    }

    #[tokio::test]
    async fn test_next_refused_without_saved_annotation() {
        let mut app = app(ScriptedPrompter::always(true));
        app.select_audio(0).await.unwrap();

        assert!(!app.next().await.unwrap());
        assert_eq!(app.list().current_index(), Some(0));
        assert_eq!(app.prompter().transcript, vec![FINISH_FIRST.to_string()]);
    }

    #[tokio::test]
    async fn test_next_allowed_with_either_tag() {
        let mut app = app(ScriptedPrompter::always(true));
        app.select_audio(1).await.unwrap();
        assert!(app.next().await.unwrap());
        assert_eq!(app.list().current_index(), Some(2));

        // last clip: allowed by tags but nothing after it
        assert!(!app.next().await.unwrap());
        assert_eq!(app.list().current_index(), Some(2));
    }

    #[tokio::test]
    async fn test_next_ignores_live_form_state() {
        let mut app = app(ScriptedPrompter::always(true));
        app.select_audio(0).await.unwrap();
        app.annotator_mut().set_v(1.0).unwrap();
        app.annotator_mut().set_a(3.0).unwrap();

        assert!(!app.next().await.unwrap());
        assert_eq!(app.list().current_index(), Some(0));
    }

    #[tokio::test]
    async fn test_declined_discard_keeps_selection() {
        let mut app = app(ScriptedPrompter::always(false));
        app.select_audio(1).await.unwrap();
        app.annotator_mut().set_v(0.5).unwrap();

        assert!(!app.select_audio(2).await.unwrap());
        assert!(!app.previous().await.unwrap());
        assert_eq!(app.list().current_index(), Some(1));
        assert_eq!(app.annotator().v().value(), Some(0.5));
        assert_eq!(app.prompter().asked(), 2);
    }

    #[tokio::test]
    async fn test_selection_resets_form_to_va() {
        let mut app = app(ScriptedPrompter::always(true));
        app.select_audio(1).await.unwrap();
        app.continue_or_back().unwrap();
        assert_eq!(app.annotator().mode(), Mode::Discrete);

        app.select_audio(2).await.unwrap();
        assert_eq!(app.annotator().mode(), Mode::Va);
        assert!(!app.annotator().is_modified());
        assert_eq!(app.player().backend().loaded.len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_select_is_noop() {
        let mut app = app(ScriptedPrompter::always(true));
        app.select_audio(1).await.unwrap();
        assert!(!app.select_audio(3).await.unwrap());
        assert_eq!(app.list().current_index(), Some(1));
    }

    #[tokio::test]
    async fn test_save_buttons_follow_persisted_tags() {
        let mut app = app(ScriptedPrompter::always(true));
        assert!(app.save_button(Mode::Va).disabled);

        app.select_audio(1).await.unwrap();
        let va = app.save_button(Mode::Va);
        assert_eq!(va.label, "Saved VA (W)");
        assert!(va.saved && va.visible && !va.disabled);
        let discrete = app.save_button(Mode::Discrete);
        assert_eq!(discrete.label, "Save discrete (W)");
        assert!(!discrete.visible);

        app.continue_or_back().unwrap();
        assert!(app.save_button(Mode::Discrete).visible);
        assert!(!app.save_button(Mode::Va).visible);
    }

    #[tokio::test]
    async fn test_failed_save_restores_button() {
        let mut app = app(ScriptedPrompter::always(true));
        app.select_audio(0).await.unwrap();
        app.annotator_mut().set_v(1.0).unwrap();

        assert!(!app.save().await.unwrap());
        let button = app.save_button(Mode::Va);
        assert_eq!(button.label, "Save VA (W)");
        assert!(!button.disabled);
        assert!(app.annotator().is_modified());
        assert!(app.banners().current().map_or(false, |b| b.is_error()));
        assert!(app.prompter().transcript[0].contains("please retry"));
        assert!(app.list().entries()[0].annotation_completeness.is_empty());
    }

    #[tokio::test]
    async fn test_save_skipped_while_in_flight() {
        let mut app = app(ScriptedPrompter::always(true));
        app.select_audio(0).await.unwrap();
        let guard = app.save_guard();
        let _held = guard.try_begin().unwrap();

        assert!(!app.save().await.unwrap());
        assert!(app.prompter().transcript.is_empty());
    }

    #[tokio::test]
    async fn test_nav_buttons_at_boundaries() {
        let mut app = app(ScriptedPrompter::always(true));
        let nav = app.nav_buttons();
        assert!(!nav.previous_enabled && !nav.next_enabled);

        app.select_audio(0).await.unwrap();
        assert_eq!(
            app.nav_buttons(),
            NavButtons { previous_enabled: false, next_enabled: true }
        );
        app.select_audio(2).await.unwrap();
        assert_eq!(
            app.nav_buttons(),
            NavButtons { previous_enabled: true, next_enabled: false }
        );
    }

    #[tokio::test]
    async fn test_keys_ignored_while_typing() {
        let mut app = app(ScriptedPrompter::always(true));
        app.select_audio(1).await.unwrap();

        let handled = app.handle_key(Key::Char('r'), Focus::TextInput).await.unwrap();
        assert_eq!(handled, None);
        assert_eq!(app.list().current_index(), Some(1));

        let handled = app.handle_key(Key::Char('R'), Focus::Slider).await.unwrap();
        assert_eq!(handled, Some(Shortcut::Next));
        assert_eq!(app.list().current_index(), Some(2));
    }

    #[tokio::test]
    async fn test_space_toggles_playback() {
        let mut app = app(ScriptedPrompter::always(true));
        app.select_audio(0).await.unwrap();
        app.handle_key(Key::Space, Focus::None).await.unwrap();
        assert!(app.player().is_playing());
        app.handle_key(Key::Space, Focus::None).await.unwrap();
        assert!(!app.player().is_playing());
    }
}
