//! Annotation workspace
//!
//! - `model`: annotation values and completeness tags
//! - `annotator`: the VA / discrete form
//! - `audio_list`: speaker selection and clip list
//! - `player`: playback and play counts
//! - `keyboard`: shortcut dispatch
//! - `app`: the controller tying them together

pub mod annotator;
pub mod app;
pub mod audio_list;
pub mod keyboard;
pub mod model;
pub mod player;

pub use annotator::{EmotionAnnotator, Mode, PendingLabel};
pub use app::EmotionLabelingApp;
pub use audio_list::AudioListManager;
pub use keyboard::{Focus, Key, KeyboardHandler, Shortcut};
pub use model::{Annotation, Completeness, EmotionType, PatientStatus};
pub use player::{AudioPlayer, ExternalPlayer, MediaBackend, PlaybackEvent, RecordingBackend};
