//! Inline text entry for the text tool.

use crate::input::Modifiers;
use crate::style::StyleConfig;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Keyboard key for text editing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "key", content = "text", rename_all = "kebab-case")]
pub enum TextKey {
    Character(String),
    Backspace,
    Enter,
    Escape,
}

impl TextKey {
    /// Map a key name as reported by a keyboard event (`"Enter"`, `"a"`, ...).
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name {
            "Enter" | "Return" => Some(TextKey::Enter),
            "Escape" | "Esc" => Some(TextKey::Escape),
            "Backspace" => Some(TextKey::Backspace),
            "Space" => Some(TextKey::Character(" ".to_string())),
            other if other.chars().count() == 1 => Some(TextKey::Character(other.to_string())),
            _ => None,
        }
    }
}

/// Result of handling a text editing event.
#[derive(Debug, Clone, PartialEq)]
pub enum TextEditResult {
    /// Event was handled, text may have changed.
    Handled,
    /// Entry confirmed with non-empty text; it should be committed.
    Confirmed { anchor: Point, text: String },
    /// Entry canceled, or confirmed empty. Nothing is committed.
    Dismissed,
}

/// An open text entry positioned at the gesture anchor.
#[derive(Debug, Clone)]
pub struct TextEntry {
    anchor: Point,
    text: String,
    /// Style captured when the entry was opened.
    style: StyleConfig,
}

impl TextEntry {
    pub fn new(anchor: Point, style: StyleConfig) -> Self {
        Self {
            anchor,
            text: String::new(),
            style,
        }
    }

    pub fn anchor(&self) -> Point {
        self.anchor
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    /// Append typed text (e.g. an IME commit or paste).
    pub fn insert(&mut self, text: &str) {
        // A single-line entry: line breaks are confirmation, not content.
        self.text.extend(text.chars().filter(|c| *c != '\n' && *c != '\r'));
    }

    /// Handle a key press. Characters typed with the action modifier held
    /// are shortcuts, not text.
    pub fn handle_key(&mut self, key: &TextKey, modifiers: Modifiers) -> TextEditResult {
        let action_mod = modifiers.action_mod();
        match key {
            TextKey::Character(text) => {
                if !action_mod {
                    self.insert(text);
                }
                TextEditResult::Handled
            }
            TextKey::Backspace => {
                if action_mod {
                    self.delete_word();
                } else {
                    self.text.pop();
                }
                TextEditResult::Handled
            }
            TextKey::Enter => self.confirm(),
            TextKey::Escape => TextEditResult::Dismissed,
        }
    }

    fn delete_word(&mut self) {
        let trimmed = self.text.trim_end().len();
        self.text.truncate(trimmed);
        let start = self
            .text
            .rfind(char::is_whitespace)
            .map(|i| i + self.text[i..].chars().next().map_or(1, char::len_utf8))
            .unwrap_or(0);
        self.text.truncate(start);
    }

    /// Confirm the entry. Whitespace-only text counts as empty.
    pub fn confirm(&self) -> TextEditResult {
        if self.text.trim().is_empty() {
            TextEditResult::Dismissed
        } else {
            TextEditResult::Confirmed {
                anchor: self.anchor,
                text: self.text.clone(),
            }
        }
    }
}
