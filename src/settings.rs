use serde::{Deserialize, Serialize};

use crate::translation::DEFAULT_ENDPOINT;

pub const TTS_PRESET_LIST: &[&str] = &["edge-playback", "espeak-ng", "espeak", "say"];

pub const VOICE_PROVIDER_PRESETS: &[&str] = &["Google", "Neural", "Premium", "Enhanced"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub content_path: String,
    pub images_dir: String,
    pub translation_endpoint: String,
    pub source_lang: String,
    pub target_lang: String,
    pub request_timeout_secs: u64,
    pub auto_dismiss_ms: u64,
    pub preferred_tts_engine: Option<String>,
    pub tts_engine_args: Vec<String>,
    pub preferred_voice_providers: Vec<String>,
    pub mouse_support: bool,
    pub width: Option<usize>,
    pub show_top_bar: bool,
}

impl Settings {
    pub fn merge(&mut self, other: Self) {
        self.content_path = other.content_path;
        self.images_dir = other.images_dir;
        self.translation_endpoint = other.translation_endpoint;
        self.source_lang = other.source_lang;
        self.target_lang = other.target_lang;
        self.request_timeout_secs = other.request_timeout_secs;
        self.auto_dismiss_ms = other.auto_dismiss_ms;
        if other.preferred_tts_engine.is_some() {
            self.preferred_tts_engine = other.preferred_tts_engine;
        }
        if !other.tts_engine_args.is_empty() {
            self.tts_engine_args = other.tts_engine_args;
        }
        if !other.preferred_voice_providers.is_empty() {
            self.preferred_voice_providers = other.preferred_voice_providers;
        }
        self.mouse_support = other.mouse_support;
        self.width = other.width;
        self.show_top_bar = other.show_top_bar;
    }

    /// "fr|uk" as the endpoint expects it.
    pub fn langpair(&self) -> String {
        format!("{}|{}", self.source_lang, self.target_lang)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            content_path: "data/modern_chapters.json".to_string(),
            images_dir: "public/images".to_string(),
            translation_endpoint: DEFAULT_ENDPOINT.to_string(),
            source_lang: "fr".to_string(),
            target_lang: "uk".to_string(),
            request_timeout_secs: 10,
            auto_dismiss_ms: 1000,
            preferred_tts_engine: None,
            tts_engine_args: Vec::new(),
            preferred_voice_providers: VOICE_PROVIDER_PRESETS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            mouse_support: true,
            width: None,
            show_top_bar: true,
        }
    }
}

/// User-facing keymap as stored in `configuration.json`. Every character of
/// a value is bound to the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgDefaultKeymaps {
    pub scroll_up: String,
    pub scroll_down: String,
    pub page_up: String,
    pub page_down: String,
    pub beginning_of_ch: String,
    pub end_of_ch: String,
    pub next_chapter: String,
    pub prev_chapter: String,
    pub next_word: String,
    pub prev_word: String,
    pub lookup: String,
    pub speak: String,
    pub yank: String,
    pub close_tooltip: String,
    pub library: String,
    pub help: String,
    pub quit: String,
}

impl Default for CfgDefaultKeymaps {
    fn default() -> Self {
        Self {
            scroll_up: "k".to_string(),
            scroll_down: "j".to_string(),
            page_up: "h".to_string(),
            page_down: "l".to_string(),
            beginning_of_ch: "g".to_string(),
            end_of_ch: "G".to_string(),
            next_chapter: "L".to_string(),
            prev_chapter: "H".to_string(),
            next_word: "w".to_string(),
            prev_word: "b".to_string(),
            lookup: "t".to_string(),
            speak: "!".to_string(),
            yank: "y".to_string(),
            close_tooltip: "x".to_string(),
            library: "R".to_string(),
            help: "?".to_string(),
            quit: "q".to_string(),
        }
    }
}

impl CfgDefaultKeymaps {
    pub fn merge(&mut self, other: Self) {
        self.scroll_up = other.scroll_up;
        self.scroll_down = other.scroll_down;
        self.page_up = other.page_up;
        self.page_down = other.page_down;
        self.beginning_of_ch = other.beginning_of_ch;
        self.end_of_ch = other.end_of_ch;
        self.next_chapter = other.next_chapter;
        self.prev_chapter = other.prev_chapter;
        self.next_word = other.next_word;
        self.prev_word = other.prev_word;
        self.lookup = other.lookup;
        self.speak = other.speak;
        self.yank = other.yank;
        self.close_tooltip = other.close_tooltip;
        self.library = other.library;
        self.help = other.help;
        self.quit = other.quit;
    }
}

/// Resolved keymap the reader matches key presses against.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Keymap {
    pub scroll_up: Vec<char>,
    pub scroll_down: Vec<char>,
    pub page_up: Vec<char>,
    pub page_down: Vec<char>,
    pub beginning_of_ch: Vec<char>,
    pub end_of_ch: Vec<char>,
    pub next_chapter: Vec<char>,
    pub prev_chapter: Vec<char>,
    pub next_word: Vec<char>,
    pub prev_word: Vec<char>,
    pub lookup: Vec<char>,
    pub speak: Vec<char>,
    pub yank: Vec<char>,
    pub close_tooltip: Vec<char>,
    pub library: Vec<char>,
    pub help: Vec<char>,
    pub quit: Vec<char>,
}

impl From<&CfgDefaultKeymaps> for Keymap {
    fn from(user: &CfgDefaultKeymaps) -> Self {
        let keys = |value: &str| value.chars().filter(|c| !c.is_whitespace()).collect();
        Self {
            scroll_up: keys(&user.scroll_up),
            scroll_down: keys(&user.scroll_down),
            page_up: keys(&user.page_up),
            page_down: keys(&user.page_down),
            beginning_of_ch: keys(&user.beginning_of_ch),
            end_of_ch: keys(&user.end_of_ch),
            next_chapter: keys(&user.next_chapter),
            prev_chapter: keys(&user.prev_chapter),
            next_word: keys(&user.next_word),
            prev_word: keys(&user.prev_word),
            lookup: keys(&user.lookup),
            speak: keys(&user.speak),
            yank: keys(&user.yank),
            close_tooltip: keys(&user.close_tooltip),
            library: keys(&user.library),
            help: keys(&user.help),
            quit: keys(&user.quit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.content_path, "data/modern_chapters.json");
        assert_eq!(settings.images_dir, "public/images");
        assert_eq!(settings.translation_endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.langpair(), "fr|uk");
        assert_eq!(settings.request_timeout_secs, 10);
        assert_eq!(settings.auto_dismiss_ms, 1000);
        assert_eq!(settings.preferred_tts_engine, None);
        assert!(settings.tts_engine_args.is_empty());
        assert_eq!(
            settings.preferred_voice_providers,
            vec!["Google", "Neural", "Premium", "Enhanced"]
        );
        assert!(settings.mouse_support);
        assert!(settings.show_top_bar);
    }

    #[test]
    fn test_settings_serialization() {
        let settings = Settings::default();
        let serialized = serde_json::to_string(&settings).unwrap();
        let deserialized: Settings = serde_json::from_str(&serialized).unwrap();
        assert_eq!(settings, deserialized);
    }

    #[test]
    fn test_settings_missing_fields_fall_back_to_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"target_lang": "en", "auto_dismiss_ms": 2500}"#).unwrap();
        assert_eq!(settings.langpair(), "fr|en");
        assert_eq!(settings.auto_dismiss_ms, 2500);
        assert_eq!(settings.content_path, Settings::default().content_path);
    }

    #[test]
    fn test_settings_merge_overrides_plain_fields() {
        let mut base = Settings::default();
        let mut other = Settings::default();
        other.content_path = "/tmp/chapters.json".to_string();
        other.mouse_support = false;
        other.width = Some(72);
        other.preferred_tts_engine = Some("espeak-ng".to_string());

        base.merge(other.clone());

        assert_eq!(base.content_path, other.content_path);
        assert!(!base.mouse_support);
        assert_eq!(base.width, Some(72));
        assert_eq!(base.preferred_tts_engine.as_deref(), Some("espeak-ng"));
    }

    #[test]
    fn test_settings_merge_preserves_unset_speech_options() {
        let mut base = Settings::default();
        base.preferred_tts_engine = Some("say".to_string());
        base.tts_engine_args = vec!["-r".to_string(), "160".to_string()];

        let mut other = Settings::default();
        other.preferred_voice_providers.clear();
        base.merge(other);

        assert_eq!(base.preferred_tts_engine.as_deref(), Some("say"));
        assert_eq!(base.tts_engine_args, vec!["-r", "160"]);
        assert_eq!(base.preferred_voice_providers.len(), 4);
    }

    #[test]
    fn test_keymap_default_bindings() {
        let keymap = Keymap::from(&CfgDefaultKeymaps::default());
        assert_eq!(keymap.quit, vec!['q']);
        assert_eq!(keymap.next_chapter, vec!['L']);
        assert_eq!(keymap.lookup, vec!['t']);
        assert_eq!(keymap.speak, vec!['!']);
    }

    #[test]
    fn test_keymap_binds_every_character() {
        let mut user = CfgDefaultKeymaps::default();
        user.quit = "qQ".to_string();
        user.help = " ".to_string();
        let keymap = Keymap::from(&user);
        assert_eq!(keymap.quit, vec!['q', 'Q']);
        assert!(keymap.help.is_empty());
    }

    #[test]
    fn test_keymap_merge_and_serde_defaults() {
        let partial: CfgDefaultKeymaps = serde_json::from_str(r#"{"yank": "Y"}"#).unwrap();
        let mut keymaps = CfgDefaultKeymaps::default();
        keymaps.merge(partial);
        assert_eq!(keymaps.yank, "Y");
        assert_eq!(keymaps.quit, "q");
    }
}
