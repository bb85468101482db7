//! Global shortcut dispatch
//!
//! Space toggles playback, `E`/`R` move between clips, `W` saves the active
//! mode and `Q` continues to discrete or goes back to VA. Shortcuts are
//! ignored while a text-like control has focus.

use std::fmt;

/// What currently has keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    None,
    /// Single-line text entry (text, password, email, search)
    TextInput,
    TextArea,
    Select,
    ContentEditable,
    /// Sliders and radios keep shortcuts active
    Slider,
    Radio,
}

impl Focus {
    pub fn accepts_typing(&self) -> bool {
        matches!(
            self,
            Focus::TextInput | Focus::TextArea | Focus::Select | Focus::ContentEditable
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Char(char),
}

impl Key {
    /// Parse one line of terminal input as a key; `"space"` or a lone blank
    /// means the space bar
    pub fn parse(input: &str) -> Option<Key> {
        if input == " " || input.trim().eq_ignore_ascii_case("space") {
            return Some(Key::Space);
        }
        let mut chars = input.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(Key::Char(c)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    TogglePlayPause,
    Previous,
    Next,
    Save,
    ContinueOrBack,
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Shortcut::TogglePlayPause => "play/pause",
            Shortcut::Previous => "previous",
            Shortcut::Next => "next",
            Shortcut::Save => "save",
            Shortcut::ContinueOrBack => "continue/back",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeyboardHandler;

impl KeyboardHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn dispatch(&self, key: Key, focus: Focus) -> Option<Shortcut> {
        if focus.accepts_typing() {
            return None;
        }
        match key {
            Key::Space => Some(Shortcut::TogglePlayPause),
            Key::Char(c) => match c.to_ascii_lowercase() {
                'e' => Some(Shortcut::Previous),
                'r' => Some(Shortcut::Next),
                'w' => Some(Shortcut::Save),
                'q' => Some(Shortcut::ContinueOrBack),
                _ => None,
            },
        }
    }

    pub fn help() -> &'static [(&'static str, Shortcut)] {
        &[
            ("space", Shortcut::TogglePlayPause),
            ("E", Shortcut::Previous),
            ("R", Shortcut::Next),
            ("W", Shortcut::Save),
            ("Q", Shortcut::ContinueOrBack),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_are_case_insensitive() {
        let kb = KeyboardHandler::new();
        assert_eq!(kb.dispatch(Key::Char('E'), Focus::None), Some(Shortcut::Previous));
        assert_eq!(kb.dispatch(Key::Char('r'), Focus::None), Some(Shortcut::Next));
        assert_eq!(kb.dispatch(Key::Char('W'), Focus::None), Some(Shortcut::Save));
        assert_eq!(kb.dispatch(Key::Char('q'), Focus::None), Some(Shortcut::ContinueOrBack));
        assert_eq!(kb.dispatch(Key::Char('x'), Focus::None), None);
    }

    #[test]
    fn test_typing_focus_suppresses_shortcuts() {
        let kb = KeyboardHandler::new();
        for focus in [Focus::TextInput, Focus::TextArea, Focus::Select, Focus::ContentEditable] {
            assert_eq!(kb.dispatch(Key::Space, focus), None);
            assert_eq!(kb.dispatch(Key::Char('r'), focus), None);
        }
    }

    #[test]
    fn test_slider_and_radio_focus_keep_shortcuts() {
        let kb = KeyboardHandler::new();
        assert_eq!(kb.dispatch(Key::Space, Focus::Slider), Some(Shortcut::TogglePlayPause));
        assert_eq!(kb.dispatch(Key::Char('w'), Focus::Radio), Some(Shortcut::Save));
    }

    #[test]
    fn test_parse() {
        assert_eq!(Key::parse(" "), Some(Key::Space));
        assert_eq!(Key::parse("SPACE"), Some(Key::Space));
        assert_eq!(Key::parse("r\n"), Some(Key::Char('r')));
        assert_eq!(Key::parse("v 1.5"), None);
        assert_eq!(Key::parse(""), None);
    }
}
