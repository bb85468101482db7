//! Annotation endpoints: speakers, clip lists, labels and play counts

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::{segment, ApiClient};
use crate::annotate::model::{Annotation, Completeness};
use crate::core::error::{Error, Result};

/// One clip in a speaker's list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioEntry {
    pub file_name: String,
    /// Server-relative media URL, e.g. `/api/audio/<speaker>/<file>`
    pub path: String,
    #[serde(default)]
    pub labeled: bool,
    #[serde(default)]
    pub annotation_completeness: Completeness,
}

/// Body of `POST /api/save_label`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub username: String,
    pub speaker: String,
    pub audio_file: String,
    #[serde(flatten)]
    pub annotation: Annotation,
}

#[derive(Debug, Deserialize)]
struct LabelEnvelope {
    #[serde(default)]
    data: Option<Annotation>,
}

#[derive(Debug, Deserialize)]
struct PlayCount {
    #[serde(default)]
    play_count: u32,
}

#[derive(Debug, Serialize)]
struct PlayCountRequest<'a> {
    username: &'a str,
    speaker: &'a str,
    audio_file: &'a str,
}

#[derive(Debug, Deserialize)]
struct Ack {}

impl ApiClient {
    /// Speakers visible to `username`
    pub async fn speakers(&self, username: &str) -> Result<Vec<String>> {
        self.get(&format!("api/speakers/{}", segment(username))).await
    }

    /// Clips of one speaker with the user's completeness flags
    pub async fn audio_list(&self, username: &str, speaker: &str) -> Result<Vec<AudioEntry>> {
        self.get(&format!(
            "api/audio_list/{}/{}",
            segment(username),
            segment(speaker)
        ))
        .await
    }

    pub async fn save_label(&self, record: &LabelRecord) -> Result<()> {
        let record = LabelRecord {
            annotation: record.annotation.clone().normalized(),
            ..record.clone()
        };
        let _: Ack = self.post("api/save_label", &record).await?;
        Ok(())
    }

    /// The saved annotation, `None` when the user never labeled this clip
    pub async fn get_label(
        &self,
        username: &str,
        speaker: &str,
        audio_file: &str,
    ) -> Result<Option<Annotation>> {
        let path = format!(
            "api/get_label/{}/{}/{}",
            segment(username),
            segment(speaker),
            segment(audio_file)
        );
        match self.get::<LabelEnvelope>(&path).await {
            Ok(envelope) => Ok(envelope.data),
            Err(Error::Api { status: 404, .. }) => {
                debug!(audio_file, "no saved label");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Record one complete listen, returning the new count
    pub async fn save_play_count(
        &self,
        username: &str,
        speaker: &str,
        audio_file: &str,
    ) -> Result<u32> {
        let body = PlayCountRequest {
            username,
            speaker,
            audio_file,
        };
        let res: PlayCount = self.post("api/save_play_count", &body).await?;
        Ok(res.play_count)
    }

    pub async fn get_play_count(
        &self,
        username: &str,
        speaker: &str,
        audio_file: &str,
    ) -> Result<u32> {
        let res: PlayCount = self
            .get(&format!(
                "api/get_play_count/{}/{}/{}",
                segment(username),
                segment(speaker),
                segment(audio_file)
            ))
            .await?;
        Ok(res.play_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::model::{EmotionType, PatientStatus};

    #[test]
    fn test_audio_entry_defaults() {
        let entry: AudioEntry = serde_json::from_str(
            r#"{"file_name": "a.wav", "path": "/api/audio/spk1/a.wav", "labeled": false}"#,
        )
        .unwrap();
        assert!(entry.annotation_completeness.is_empty());
    }

    #[test]
    fn test_label_record_is_flat() {
        let record = LabelRecord {
            username: "alice".to_string(),
            speaker: "spk1".to_string(),
            audio_file: "a.wav".to_string(),
            annotation: Annotation {
                v_value: Some(1.5),
                a_value: Some(4.0),
                emotion_type: Some(EmotionType::NonNeutral),
                discrete_emotion: Some("anger".to_string()),
                patient_status: Some(PatientStatus::Patient),
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["v_value"], 1.5);
        assert_eq!(json["emotion_type"], "non-neutral");
        assert_eq!(json["patient_status"], "patient");
        assert!(json.get("annotation").is_none());
    }
}
