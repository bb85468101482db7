//! Speaker selector and clip list

use tracing::{debug, info};

use super::model::Completeness;
use crate::api::AudioEntry;
use crate::core::context::AppContext;
use crate::core::error::Result;
use crate::core::request::Resource;

/// How a list row is styled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStyle {
    /// Both VA and discrete saved
    Complete,
    /// VA saved, discrete missing
    VaOnly,
    Default,
}

impl ItemStyle {
    pub fn of(completeness: Completeness) -> Self {
        if completeness.has_va() && completeness.has_discrete() {
            ItemStyle::Complete
        } else if completeness.has_va() {
            ItemStyle::VaOnly
        } else {
            ItemStyle::Default
        }
    }
}

/// One rendered row
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem<'a> {
    pub index: usize,
    pub file_name: &'a str,
    pub style: ItemStyle,
    pub active: bool,
}

pub struct AudioListManager {
    ctx: AppContext,
    speakers: Vec<String>,
    current_speaker: Option<String>,
    entries: Vec<AudioEntry>,
    current: Option<usize>,
}

impl AudioListManager {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            speakers: Vec::new(),
            current_speaker: None,
            entries: Vec::new(),
            current: None,
        }
    }

    /// Fetch the speaker list. On failure the previous list is kept.
    pub async fn init_speakers(&mut self) -> Result<&[String]> {
        let speakers = self.ctx.api.speakers(self.ctx.username()).await?;
        debug!(count = speakers.len(), "speakers loaded");
        self.speakers = speakers;
        Ok(&self.speakers)
    }

    pub fn speakers(&self) -> &[String] {
        &self.speakers
    }

    pub fn current_speaker(&self) -> Option<&str> {
        self.current_speaker.as_deref()
    }

    /// Switch speaker; an empty name clears the list
    pub async fn select_speaker(&mut self, speaker: &str) -> Result<()> {
        let speaker = speaker.trim();
        if speaker.is_empty() {
            self.current_speaker = None;
            self.entries.clear();
            self.current = None;
            return Ok(());
        }
        self.load_audio_list(speaker).await?;
        self.current_speaker = Some(speaker.to_string());
        Ok(())
    }

    /// Replace the list with `speaker`'s clips and clear the selection
    pub async fn load_audio_list(&mut self, speaker: &str) -> Result<()> {
        let tokens = self.ctx.tokens.clone();
        let ticket = tokens.begin(Resource::AudioList);
        let entries = self.ctx.api.audio_list(self.ctx.username(), speaker).await?;
        tokens.check(&ticket)?;
        tokens.finish(&ticket);

        info!(speaker, clips = entries.len(), "audio list loaded");
        self.entries = entries;
        self.current = None;
        Ok(())
    }

    pub fn entries(&self) -> &[AudioEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_entry(&self) -> Option<&AudioEntry> {
        self.current.and_then(|i| self.entries.get(i))
    }

    /// Select by index; out-of-range indexes change nothing
    pub fn select_audio(&mut self, index: usize) -> Option<&AudioEntry> {
        if index >= self.entries.len() {
            debug!(index, len = self.entries.len(), "selection out of range");
            return None;
        }
        self.current = Some(index);
        self.entries.get(index)
    }

    /// Index after the current one, `None` at the end
    pub fn next_index(&self) -> Option<usize> {
        match self.current {
            Some(i) if i + 1 < self.entries.len() => Some(i + 1),
            None if !self.entries.is_empty() => Some(0),
            _ => None,
        }
    }

    /// Index before the current one, `None` at the start
    pub fn previous_index(&self) -> Option<usize> {
        match self.current {
            Some(i) if i > 0 => Some(i - 1),
            _ => None,
        }
    }

    pub fn next_audio(&mut self) -> Option<&AudioEntry> {
        let index = self.next_index()?;
        self.select_audio(index)
    }

    pub fn previous_audio(&mut self) -> Option<&AudioEntry> {
        let index = self.previous_index()?;
        self.select_audio(index)
    }

    /// Patch one entry after a save instead of refetching the list
    pub fn update_audio_label_status(
        &mut self,
        index: usize,
        labeled: bool,
        completeness: Completeness,
    ) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.labeled = labeled;
            entry.annotation_completeness = completeness;
        }
    }

    pub fn render(&self) -> Vec<ListItem<'_>> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| ListItem {
                index,
                file_name: &entry.file_name,
                style: ItemStyle::of(entry.annotation_completeness),
                active: self.current == Some(index),
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn set_entries(&mut self, speaker: &str, entries: Vec<AudioEntry>) {
        self.current_speaker = Some(speaker.to_string());
        self.entries = entries;
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::core::config::Config;

    fn entry(name: &str, tags: Completeness) -> AudioEntry {
        AudioEntry {
            file_name: name.to_string(),
            path: format!("/api/audio/spk1/{}", name),
            labeled: !tags.is_empty(),
            annotation_completeness: tags,
        }
    }

    fn manager() -> AudioListManager {
        let api = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let mut list = AudioListManager::new(AppContext::new(api, Config::default(), "alice"));
        list.set_entries(
            "spk1",
            vec![
                entry("a.wav", Completeness::VA | Completeness::DISCRETE),
                entry("b.wav", Completeness::VA),
                entry("c.wav", Completeness::empty()),
            ],
        );
        list
    }

    #[test]
    fn test_select_out_of_range_is_noop() {
        let mut list = manager();
        list.select_audio(1);
        assert!(list.select_audio(3).is_none());
        assert_eq!(list.current_index(), Some(1));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_boundaries_do_not_wrap() {
        let mut list = manager();
        list.select_audio(0);
        assert!(list.previous_audio().is_none());
        assert_eq!(list.current_index(), Some(0));

        list.select_audio(2);
        assert!(list.next_audio().is_none());
        assert_eq!(list.current_index(), Some(2));
    }

    #[test]
    fn test_render_styles() {
        let mut list = manager();
        list.select_audio(2);
        let items = list.render();
        assert_eq!(items[0].style, ItemStyle::Complete);
        assert_eq!(items[1].style, ItemStyle::VaOnly);
        assert_eq!(items[2].style, ItemStyle::Default);
        assert!(items[2].active);
        assert!(!items[0].active);
    }

    #[test]
    fn test_discrete_only_uses_default_style() {
        assert_eq!(ItemStyle::of(Completeness::DISCRETE), ItemStyle::Default);
    }

    #[test]
    fn test_update_label_status_in_place() {
        let mut list = manager();
        list.update_audio_label_status(2, true, Completeness::DISCRETE);
        assert!(list.entries()[2].labeled);
        assert!(list.entries()[2].annotation_completeness.has_discrete());

        list.update_audio_label_status(10, true, Completeness::VA);
        assert_eq!(list.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_speaker_fetch_keeps_state() {
        let mut list = manager();
        list.select_audio(1);
        assert!(list.init_speakers().await.is_err());
        assert_eq!(list.current_speaker(), Some("spk1"));
        assert_eq!(list.current_index(), Some(1));
    }
}
