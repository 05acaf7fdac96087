use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::TranslationError;
use crate::logging;
use crate::models::SelectionId;
use crate::settings::Settings;

pub const DEFAULT_ENDPOINT: &str = "https://api.mymemory.translated.net/get";
pub const UNAVAILABLE_TEXT: &str = "Translation unavailable";
pub const NETWORK_ERROR_TEXT: &str = "Network error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Translated(String),
    /// The endpoint answered but had nothing usable. Shown inline, never cached.
    Unavailable,
}

impl Translation {
    pub fn text(&self) -> &str {
        match self {
            Translation::Translated(text) => text,
            Translation::Unavailable => UNAVAILABLE_TEXT,
        }
    }
}

/// Session cache keyed by the lower-cased word.
#[derive(Debug, Clone, Default)]
pub struct TranslationCache {
    entries: HashMap<String, String>,
}

impl TranslationCache {
    pub fn key(word: &str) -> String {
        word.trim().to_lowercase()
    }

    pub fn get(&self, word: &str) -> Option<&str> {
        self.entries.get(&Self::key(word)).map(String::as_str)
    }

    /// Last write wins when two lookups for the same key settle out of order.
    pub fn insert(&mut self, word: &str, translation: String) {
        self.entries.insert(Self::key(word), translation);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Deserialize)]
pub struct TranslationResponse {
    #[serde(rename = "responseData")]
    response_data: Option<ResponseData>,
    #[serde(rename = "responseStatus", default)]
    response_status: Value,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

impl TranslationResponse {
    /// The status field arrives as a number, or as a numeric string on some errors.
    pub fn status_code(&self) -> Option<u16> {
        match &self.response_status {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn into_translation(self) -> Translation {
        if self.status_code() != Some(200) {
            return Translation::Unavailable;
        }
        self.response_data
            .and_then(|data| data.translated_text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .map(Translation::Translated)
            .unwrap_or(Translation::Unavailable)
    }
}

pub trait TranslationEndpoint: Send + Sync {
    fn request(&self, word: &str) -> Result<TranslationResponse, TranslationError>;
}

/// The MyMemory `get` endpoint: `?q=<word>&langpair=<source>|<target>`.
pub struct MyMemoryEndpoint {
    client: reqwest::blocking::Client,
    base_url: String,
    langpair: String,
}

impl MyMemoryEndpoint {
    /// `langpair` is MyMemory's `<source>|<target>` pair, e.g. `fr|uk`.
    pub fn new(base_url: &str, langpair: &str, timeout: Duration) -> eyre::Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pilote/", env!("CARGO_PKG_VERSION")));
        if base_url.starts_with("http://127.0.0.1") || base_url.starts_with("http://localhost") {
            builder = builder.no_proxy();
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.to_string(),
            langpair: langpair.to_string(),
        })
    }
}

impl TranslationEndpoint for MyMemoryEndpoint {
    fn request(&self, word: &str) -> Result<TranslationResponse, TranslationError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", word), ("langpair", self.langpair.as_str())])
            .send()?;
        let parsed: TranslationResponse = response.json()?;
        Ok(parsed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub id: SelectionId,
    pub word: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationCompletion {
    pub id: SelectionId,
    pub word: String,
    pub result: Result<Translation, TranslationError>,
}

#[derive(Clone)]
pub struct TranslationClient {
    endpoint: Arc<dyn TranslationEndpoint>,
}

impl TranslationClient {
    pub fn new(endpoint: Arc<dyn TranslationEndpoint>) -> Self {
        Self { endpoint }
    }

    pub fn from_settings(settings: &Settings) -> eyre::Result<Self> {
        let endpoint = MyMemoryEndpoint::new(
            &settings.translation_endpoint,
            &settings.langpair(),
            Duration::from_secs(settings.request_timeout_secs),
        )?;
        Ok(Self::new(Arc::new(endpoint)))
    }

    /// Translate one word, answering from `cache` when possible.
    pub fn translate(
        &self,
        cache: &mut TranslationCache,
        word: &str,
    ) -> Result<Translation, TranslationError> {
        if let Some(hit) = cache.get(word) {
            return Ok(Translation::Translated(hit.to_string()));
        }
        let translation = self.fetch(word)?;
        if let Translation::Translated(text) = &translation {
            cache.insert(word, text.clone());
        }
        Ok(translation)
    }

    /// One round trip to the endpoint, bypassing the cache.
    pub fn fetch(&self, word: &str) -> Result<Translation, TranslationError> {
        let word = word.trim();
        logging::debug(format!("Requesting translation for '{word}'"));
        let response = self.endpoint.request(word)?;
        Ok(response.into_translation())
    }

    /// Run [`TranslationClient::fetch`] on a worker thread and post the result to `tx`.
    pub fn dispatch(&self, request: TranslationRequest, tx: Sender<TranslationCompletion>) {
        let client = self.clone();
        std::thread::spawn(move || {
            let result = client.fetch(&request.word);
            if let Err(err) = &result {
                logging::warn(format!("Translation of '{}' failed: {err}", request.word));
            }
            let _ = tx.send(TranslationCompletion {
                id: request.id,
                word: request.word,
                result,
            });
        });
    }
}
