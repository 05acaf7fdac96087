//! Word-lookup tooltip: which word is selected, where the popup hangs,
//! and when it goes away.
//!
//! The controller is driven entirely by the UI thread. Network completions
//! arrive tagged with the [`SelectionId`] they were issued for; anything that
//! does not match the live selection only feeds the cache.

use std::time::{Duration, Instant};

use crate::logging;
use crate::models::{AnchorPosition, Selection, SelectionId};
use crate::tokenizer;
use crate::translation::{
    NETWORK_ERROR_TEXT, Translation, TranslationCache, TranslationCompletion, TranslationRequest,
};

pub const DEFAULT_DISMISS_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TooltipState {
    Idle,
    /// A word is chosen and its translation is in flight.
    Selecting,
    /// The lookup settled and the tooltip is visible.
    Shown,
}

/// What a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Tooltip,
    Word,
    Elsewhere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle(u64);

/// Single-shot cancellable deadline, polled by the event loop.
#[derive(Debug, Default)]
pub struct DismissTimer {
    pending: Option<(TimerHandle, Instant)>,
    next_handle: u64,
}

impl DismissTimer {
    /// Arm the timer, replacing any deadline already set.
    pub fn schedule(&mut self, now: Instant, delay: Duration) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.pending = Some((handle, now + delay));
        handle
    }

    pub fn cancel(&mut self) -> Option<TimerHandle> {
        self.pending.take().map(|(handle, _)| handle)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.pending.is_some_and(|(_, deadline)| now >= deadline)
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending
            .map(|(_, deadline)| deadline.saturating_duration_since(now))
    }

    fn take_if_due(&mut self, now: Instant) -> Option<TimerHandle> {
        if self.is_due(now) { self.cancel() } else { None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupStart {
    /// Not a word; nothing changed.
    Ignored,
    /// Answered from the cache, the tooltip is already shown.
    Cached,
    /// The caller must dispatch this request and feed the result to `settle`.
    Fetch(TranslationRequest),
}

pub struct TooltipController {
    state: TooltipState,
    selection: Option<Selection>,
    cache: TranslationCache,
    timer: DismissTimer,
    dismiss_after: Duration,
    next_id: u64,
}

impl Default for TooltipController {
    fn default() -> Self {
        Self::new(DEFAULT_DISMISS_DELAY)
    }
}

impl TooltipController {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            state: TooltipState::Idle,
            selection: None,
            cache: TranslationCache::default(),
            timer: DismissTimer::default(),
            dismiss_after,
            next_id: 0,
        }
    }

    pub fn state(&self) -> TooltipState {
        self.state
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn timer(&self) -> &DismissTimer {
        &self.timer
    }

    /// Time until the auto-dismiss fires, if it is armed.
    pub fn poll_timeout(&self, now: Instant) -> Option<Duration> {
        self.timer.remaining(now)
    }

    /// Start a lookup for the clicked token, replacing any current selection.
    pub fn select_word(&mut self, token: &str, anchor: AnchorPosition, now: Instant) -> LookupStart {
        let word = token.trim();
        if !tokenizer::is_word(word) {
            return LookupStart::Ignored;
        }

        self.timer.cancel();
        self.next_id += 1;
        let id = SelectionId(self.next_id);
        self.selection = Some(Selection::new(id, word.to_string(), anchor));
        self.state = TooltipState::Selecting;

        if let Some(hit) = self.cache.get(word).map(str::to_string) {
            logging::debug(format!("Cache hit for '{word}'"));
            self.show(Translation::Translated(hit), now);
            return LookupStart::Cached;
        }

        LookupStart::Fetch(TranslationRequest {
            id,
            word: word.to_string(),
        })
    }

    /// Apply a finished lookup. Returns false when it belonged to an older selection.
    pub fn settle(&mut self, completion: TranslationCompletion, now: Instant) -> bool {
        if let Ok(Translation::Translated(text)) = &completion.result {
            self.cache.insert(&completion.word, text.clone());
        }

        let current = self.selection.as_ref().map(|s| s.id);
        if current != Some(completion.id) || self.state != TooltipState::Selecting {
            logging::debug(format!(
                "Discarding stale translation for '{}' ({:?})",
                completion.word, completion.id
            ));
            return false;
        }

        match completion.result {
            Ok(translation) => self.show(translation, now),
            Err(err) => {
                logging::warn(format!("Lookup failed: {err}"));
                if let Some(selection) = self.selection.as_mut() {
                    selection.loading = false;
                    selection.error = Some(NETWORK_ERROR_TEXT.to_string());
                }
                self.state = TooltipState::Shown;
            }
        }
        true
    }

    fn show(&mut self, translation: Translation, now: Instant) {
        if let Some(selection) = self.selection.as_mut() {
            selection.loading = false;
            selection.translation = Some(translation.text().to_string());
        }
        self.state = TooltipState::Shown;
        self.timer.schedule(now, self.dismiss_after);
    }

    /// Pointer-down anywhere on screen. Only presses outside the tooltip and
    /// outside every word dismiss.
    pub fn pointer_down(&mut self, hit: HitTarget) -> bool {
        if hit != HitTarget::Elsewhere || self.state == TooltipState::Idle {
            return false;
        }
        self.dismiss();
        true
    }

    pub fn close(&mut self) {
        self.dismiss();
    }

    /// Fire the auto-dismiss if it is due. Returns true when the tooltip closed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.timer.take_if_due(now).is_some() {
            self.dismiss();
            return true;
        }
        false
    }

    fn dismiss(&mut self) {
        self.timer.cancel();
        self.selection = None;
        self.state = TooltipState::Idle;
    }
}
