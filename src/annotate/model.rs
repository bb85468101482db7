//! Annotation data model and completeness derivation

use bitflags::bitflags;
use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmotionType {
    Neutral,
    NonNeutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatientStatus {
    Patient,
    NonPatient,
}

impl EmotionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionType::Neutral => "neutral",
            EmotionType::NonNeutral => "non-neutral",
        }
    }
}

impl PatientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Patient => "patient",
            PatientStatus::NonPatient => "non-patient",
        }
    }
}

impl fmt::Display for EmotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "neutral" | "n" => Ok(EmotionType::Neutral),
            "non-neutral" | "nonneutral" | "non_neutral" | "nn" => Ok(EmotionType::NonNeutral),
            other => Err(Error::validation(format!(
                "Unknown emotion type '{}' (expected neutral or non-neutral)",
                other
            ))),
        }
    }
}

impl FromStr for PatientStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "patient" | "p" => Ok(PatientStatus::Patient),
            "non-patient" | "nonpatient" | "non_patient" | "np" => Ok(PatientStatus::NonPatient),
            other => Err(Error::validation(format!(
                "Unknown patient status '{}' (expected patient or non-patient)",
                other
            ))),
        }
    }
}

/// One clip's annotation as stored by the server.
///
/// Unset fields serialise as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub v_value: Option<f64>,
    #[serde(default)]
    pub a_value: Option<f64>,
    #[serde(default)]
    pub emotion_type: Option<EmotionType>,
    #[serde(default)]
    pub discrete_emotion: Option<String>,
    #[serde(default)]
    pub patient_status: Option<PatientStatus>,
}

impl Annotation {
    /// Drop a discrete emotion that cannot apply (neutral or missing emotion type)
    pub fn normalized(mut self) -> Self {
        if self.emotion_type != Some(EmotionType::NonNeutral) {
            self.discrete_emotion = None;
        }
        if matches!(self.discrete_emotion.as_deref(), Some(s) if s.trim().is_empty()) {
            self.discrete_emotion = None;
        }
        self
    }

    pub fn completeness(&self) -> Completeness {
        Completeness::of(self)
    }
}

pub const TAG_VA: &str = "va_complete";
pub const TAG_DISCRETE: &str = "discrete_complete";
pub const TAG_NONE: &str = "none";

bitflags! {
    /// Completeness tags of one clip. The empty set is the `none` tag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Completeness: u8 {
        const VA = 0b01;
        const DISCRETE = 0b10;
    }
}

impl Completeness {
    /// Derive tags from an annotation.
    ///
    /// `va_complete` needs both V and A; `discrete_complete` needs patient
    /// status and emotion type, plus a discrete emotion when non-neutral.
    pub fn of(annotation: &Annotation) -> Self {
        let mut tags = Completeness::empty();

        let finite = |v: Option<f64>| v.map_or(false, f64::is_finite);
        if finite(annotation.v_value) && finite(annotation.a_value) {
            tags |= Completeness::VA;
        }

        let emotion_ok = match annotation.emotion_type {
            Some(EmotionType::Neutral) => true,
            Some(EmotionType::NonNeutral) => annotation
                .discrete_emotion
                .as_deref()
                .map_or(false, |s| !s.trim().is_empty()),
            None => false,
        };
        if annotation.patient_status.is_some() && emotion_ok {
            tags |= Completeness::DISCRETE;
        }

        tags
    }

    pub fn has_va(&self) -> bool {
        self.contains(Completeness::VA)
    }

    pub fn has_discrete(&self) -> bool {
        self.contains(Completeness::DISCRETE)
    }

    /// Whether the user may advance past a clip with these persisted tags
    pub fn allows_advance(&self) -> bool {
        !self.is_empty()
    }

    /// Wire representation: `["none"]` when empty
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags = Vec::with_capacity(2);
        if self.has_va() {
            tags.push(TAG_VA);
        }
        if self.has_discrete() {
            tags.push(TAG_DISCRETE);
        }
        if tags.is_empty() {
            tags.push(TAG_NONE);
        }
        tags
    }

    pub fn from_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Self {
        tags.into_iter().fold(Completeness::empty(), |acc, tag| match tag {
            TAG_VA => acc | Completeness::VA,
            TAG_DISCRETE => acc | Completeness::DISCRETE,
            _ => acc,
        })
    }
}

impl Serialize for Completeness {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let tags = self.tags();
        let mut seq = serializer.serialize_seq(Some(tags.len()))?;
        for tag in tags {
            seq.serialize_element(tag)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Completeness {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tags: Option<Vec<String>> = Option::deserialize(deserializer)?;
        Ok(tags
            .map(|tags| Completeness::from_tags(tags.iter().map(String::as_str)))
            .unwrap_or_default())
    }
}
