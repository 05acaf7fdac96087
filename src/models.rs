use serde::{Deserialize, Serialize};

pub const BOOK_TITLE: &str = "Le Pilote du Danube";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(alias = "number")]
    pub id: u32,
    #[serde(alias = "original_title")]
    pub title: String,
    #[serde(alias = "modern_content", alias = "text")]
    pub content: String,
}

impl Chapter {
    /// First `max_chars` characters of the content on one line, followed by an ellipsis.
    pub fn preview(&self, max_chars: usize) -> String {
        let flat = self.content.split_whitespace().collect::<Vec<_>>().join(" ");
        let head: String = flat.chars().take(max_chars).collect();
        format!("{}...", head.trim_end())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Separator,
}

/// A slice of chapter text. Words are clickable, separators are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub kind: TokenKind,
}

impl Token<'_> {
    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }
}

/// Where the tooltip hangs from: horizontal centre and line of a word. Stored
/// in page coordinates and moved to terminal cells when drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnchorPosition {
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SelectionId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub id: SelectionId,
    pub word: String,
    pub anchor: AnchorPosition,
    pub translation: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Selection {
    pub fn new(id: SelectionId, word: String, anchor: AnchorPosition) -> Self {
        Self {
            id,
            word,
            anchor,
            translation: None,
            loading: true,
            error: None,
        }
    }

    /// Text shown under the "Ukrainian" label of the tooltip.
    pub fn display_text(&self) -> &str {
        if self.loading {
            "Translating..."
        } else if let Some(translation) = &self.translation {
            translation
        } else if let Some(error) = &self.error {
            error
        } else {
            "No translation found"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum WindowType {
    #[default]
    Library,
    Chapter,
    Help,
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageType {
    Info,
    Warning,
    Error,
}
