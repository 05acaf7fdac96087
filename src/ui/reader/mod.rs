use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use arboard::Clipboard;
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use textwrap::core::display_width;

use crate::cli::PREVIEW_CHARS;
use crate::config::Config;
use crate::content::{ChapterStore, Illustrations};
use crate::logging;
use crate::models::{BOOK_TITLE, Chapter, MessageType, Selection, WindowType};
use crate::speech::SpeechTrigger;
use crate::tooltip::{HitTarget, LookupStart, TooltipController, TooltipState};
use crate::translation::{TranslationClient, TranslationCompletion};
use crate::ui::board::Board;
use crate::ui::windows::{
    help::HelpWindow,
    library::{LibraryEntry, LibraryWindow},
    not_found::NotFoundWindow,
    tooltip::{TooltipAction, TooltipWindow},
};

const DEFAULT_TEXT_WIDTH: u16 = 80;
const MOUSE_SCROLL_LINES: isize = 3;
const MESSAGE_TTL: Duration = Duration::from_secs(3);
const LOOKUP_POLL: Duration = Duration::from_millis(50);
const IDLE_POLL: Duration = Duration::from_secs(60);

/// Everything the reader shows, owned by the UI thread.
pub struct ApplicationState {
    pub config: Config,
    pub store: ChapterStore,
    pub images: Illustrations,
    pub library: Vec<LibraryEntry>,
    pub tooltip: TooltipController,
    pub ui_state: UiState,
    pub should_quit: bool,
}

impl ApplicationState {
    pub fn new(config: Config, store: ChapterStore) -> Self {
        let images = Illustrations::new(&config.settings.images_dir);
        let library = store
            .chapters()
            .iter()
            .map(|chapter| LibraryEntry {
                id: chapter.id,
                title: chapter.title.clone(),
                preview: chapter.preview(PREVIEW_CHARS),
                has_image: images.resolve(chapter.id).is_some(),
            })
            .collect();
        let tooltip =
            TooltipController::new(Duration::from_millis(config.settings.auto_dismiss_ms));

        Self {
            config,
            store,
            images,
            library,
            tooltip,
            ui_state: UiState::new(),
            should_quit: false,
        }
    }

    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.ui_state
            .chapter_id
            .and_then(|id| self.store.get(id).ok())
    }

    /// Show chapter `id`, or the not-found screen when the store lacks it.
    pub fn open_chapter(&mut self, id: u32) {
        self.tooltip.close();
        self.ui_state.scroll = 0;
        self.ui_state.word_cursor = None;
        self.ui_state.selected_word = None;

        match self.store.get(id) {
            Ok(_) => {
                self.ui_state.chapter_id = Some(id);
                self.ui_state.missing_chapter = None;
                if let Some(pos) = self.library.iter().position(|entry| entry.id == id) {
                    self.ui_state.library_selected_index = pos;
                }
                self.ui_state.open_window(WindowType::Chapter);
                logging::info(format!("Opened chapter {id}"));
            }
            Err(err) => {
                logging::warn(err.to_string());
                self.ui_state.chapter_id = None;
                self.ui_state.missing_chapter = Some(id);
                self.ui_state.open_window(WindowType::NotFound);
            }
        }
    }

    pub fn open_library(&mut self) {
        self.tooltip.close();
        self.ui_state.open_window(WindowType::Library);
    }
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub active_window: WindowType,
    /// Window the help overlay returns to.
    pub previous_window: WindowType,
    pub chapter_id: Option<u32>,
    pub missing_chapter: Option<u32>,
    pub scroll: usize,
    pub word_cursor: Option<usize>,
    /// Board index of the word the tooltip belongs to.
    pub selected_word: Option<usize>,
    pub library_selected_index: usize,
    pub help_scroll_offset: u16,
    pub message: Option<String>,
    pub message_type: MessageType,
    pub message_time: Option<Instant>,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        Self {
            active_window: WindowType::Library,
            previous_window: WindowType::Library,
            chapter_id: None,
            missing_chapter: None,
            scroll: 0,
            word_cursor: None,
            selected_word: None,
            library_selected_index: 0,
            help_scroll_offset: 0,
            message: None,
            message_type: MessageType::Info,
            message_time: None,
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>, message_type: MessageType) {
        self.message = Some(message.into());
        self.message_type = message_type;
        self.message_time = Some(Instant::now());
    }

    pub fn clear_message(&mut self) {
        self.message = None;
        self.message_time = None;
    }

    pub fn message_expired(&self, now: Instant) -> bool {
        self.message_time
            .is_some_and(|t| now.saturating_duration_since(t) >= MESSAGE_TTL)
    }

    pub fn open_window(&mut self, window_type: WindowType) {
        if window_type == WindowType::Help {
            if self.active_window != WindowType::Help {
                self.previous_window = self.active_window.clone();
            }
            self.help_scroll_offset = 0;
        }
        self.active_window = window_type;
    }

    pub fn close_help(&mut self) {
        self.active_window = self.previous_window.clone();
    }
}

fn pressed(keys: &[char], key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char(c) if keys.contains(&c))
}

/// Main reader application struct
pub struct Reader {
    state: Rc<RefCell<ApplicationState>>,
    board: Board,
    clipboard: Option<Clipboard>,
    translator: TranslationClient,
    speech: SpeechTrigger,
    lookup_tx: Sender<TranslationCompletion>,
    lookup_rx: Receiver<TranslationCompletion>,
    frame_area: Rect,
    content_area: Rect,
}

impl Reader {
    pub fn new(config: Config, store: ChapterStore) -> eyre::Result<Self> {
        let translator = TranslationClient::from_settings(&config.settings)?;
        let speech = SpeechTrigger::from_settings(&config.settings);
        if !speech.is_available() {
            logging::info("No speech engine found, pronunciation disabled");
        }
        let clipboard = match Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(err) => {
                logging::warn(format!("Clipboard unavailable: {err}"));
                None
            }
        };
        Ok(Self::with_services(config, store, translator, speech, clipboard))
    }

    pub fn with_services(
        config: Config,
        store: ChapterStore,
        translator: TranslationClient,
        speech: SpeechTrigger,
        clipboard: Option<Clipboard>,
    ) -> Self {
        let (lookup_tx, lookup_rx) = mpsc::channel();
        Self {
            state: Rc::new(RefCell::new(ApplicationState::new(config, store))),
            board: Board::new(),
            clipboard,
            translator,
            speech,
            lookup_tx,
            lookup_rx,
            frame_area: Rect::default(),
            content_area: Rect::default(),
        }
    }

    /// Start on a chapter, or on the chapter list when none is given.
    pub fn open(&mut self, chapter: Option<u32>) {
        let mut state = self.state.borrow_mut();
        match chapter {
            Some(id) => state.open_chapter(id),
            None => state.open_library(),
        }
    }

    /// Run the main application loop
    pub fn run(&mut self) -> eyre::Result<()> {
        let mouse_support = self.state.borrow().config.settings.mouse_support;

        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
        if mouse_support {
            crossterm::execute!(io::stdout(), crossterm::event::EnableMouseCapture)?;
        }

        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        terminal.clear()?;
        terminal.hide_cursor()?;

        let result = self.event_loop(&mut terminal);

        self.speech.cancel();
        terminal.show_cursor()?;
        if mouse_support {
            crossterm::execute!(io::stdout(), crossterm::event::DisableMouseCapture)?;
        }
        crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
        crossterm::terminal::disable_raw_mode()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> eyre::Result<()> {
        loop {
            if self.state.borrow().should_quit {
                break;
            }

            self.tick(Instant::now());
            terminal.draw(|f| self.render(f))?;

            let timeout = self.poll_timeout(Instant::now());
            if !crossterm::event::poll(timeout)? {
                continue;
            }
            let event = crossterm::event::read()?;
            self.handle_event(event, Instant::now())?;
        }
        Ok(())
    }

    /// Drain finished lookups, fire the auto-dismiss and expire messages.
    pub fn tick(&mut self, now: Instant) {
        while let Ok(completion) = self.lookup_rx.try_recv() {
            self.state.borrow_mut().tooltip.settle(completion, now);
        }

        let mut state = self.state.borrow_mut();
        state.tooltip.tick(now);
        if state.ui_state.message_expired(now) {
            state.ui_state.clear_message();
        }
    }

    fn poll_timeout(&self, now: Instant) -> Duration {
        let state = self.state.borrow();
        let mut timeout = if state.tooltip.state() == TooltipState::Selecting {
            LOOKUP_POLL
        } else {
            IDLE_POLL
        };
        if let Some(remaining) = state.tooltip.poll_timeout(now) {
            timeout = timeout.min(remaining);
        }
        if let Some(shown_at) = state.ui_state.message_time {
            timeout = timeout.min(MESSAGE_TTL.saturating_sub(now.saturating_duration_since(shown_at)));
        }
        timeout
    }

    pub fn handle_event(&mut self, event: Event, now: Instant) -> eyre::Result<()> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key_event(key, now),
            Event::Mouse(mouse) => {
                self.handle_mouse_event(mouse, now);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent, now: Instant) -> eyre::Result<()> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.state.borrow_mut().should_quit = true;
            return Ok(());
        }

        let active_window = {
            let mut state = self.state.borrow_mut();
            if state.ui_state.message.is_some() {
                state.ui_state.clear_message();
            }
            state.ui_state.active_window.clone()
        };

        match active_window {
            WindowType::Library => self.handle_library_keys(key),
            WindowType::Chapter => self.handle_chapter_keys(key, now)?,
            WindowType::Help => self.handle_help_keys(key),
            WindowType::NotFound => self.handle_not_found_keys(key),
        }
        Ok(())
    }

    fn handle_chapter_keys(&mut self, key: KeyEvent, now: Instant) -> eyre::Result<()> {
        let keymap = self.state.borrow().config.keymap.clone();
        let page = self.content_area.height.saturating_sub(1).max(1) as isize;

        match key.code {
            KeyCode::Esc => {
                let mut state = self.state.borrow_mut();
                if state.tooltip.selection().is_some() {
                    state.tooltip.close();
                } else {
                    state.open_library();
                }
            }
            KeyCode::Up => self.scroll_by(-1),
            KeyCode::Down => self.scroll_by(1),
            KeyCode::PageUp | KeyCode::Left => self.scroll_by(-page),
            KeyCode::PageDown | KeyCode::Right | KeyCode::Char(' ') => self.scroll_by(page),
            KeyCode::Home => self.scroll_to(0),
            KeyCode::End => self.scroll_to(usize::MAX),
            KeyCode::Tab => self.move_word_cursor(1),
            KeyCode::BackTab => self.move_word_cursor(-1),
            KeyCode::Enter => self.lookup_at_cursor(now),
            _ if pressed(&keymap.quit, &key) => self.state.borrow_mut().should_quit = true,
            _ if pressed(&keymap.close_tooltip, &key) => self.state.borrow_mut().tooltip.close(),
            _ if pressed(&keymap.scroll_up, &key) => self.scroll_by(-1),
            _ if pressed(&keymap.scroll_down, &key) => self.scroll_by(1),
            _ if pressed(&keymap.page_up, &key) => self.scroll_by(-page),
            _ if pressed(&keymap.page_down, &key) => self.scroll_by(page),
            _ if pressed(&keymap.beginning_of_ch, &key) => self.scroll_to(0),
            _ if pressed(&keymap.end_of_ch, &key) => self.scroll_to(usize::MAX),
            _ if pressed(&keymap.next_chapter, &key) => self.goto_adjacent_chapter(true),
            _ if pressed(&keymap.prev_chapter, &key) => self.goto_adjacent_chapter(false),
            _ if pressed(&keymap.next_word, &key) => self.move_word_cursor(1),
            _ if pressed(&keymap.prev_word, &key) => self.move_word_cursor(-1),
            _ if pressed(&keymap.lookup, &key) => self.lookup_at_cursor(now),
            _ if pressed(&keymap.speak, &key) => self.speak_current(),
            _ if pressed(&keymap.yank, &key) => self.yank_translation()?,
            _ if pressed(&keymap.library, &key) => self.state.borrow_mut().open_library(),
            _ if pressed(&keymap.help, &key) => {
                self.state.borrow_mut().ui_state.open_window(WindowType::Help)
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_library_keys(&mut self, key: KeyEvent) {
        let mut state = self.state.borrow_mut();
        let keymap = state.config.keymap.clone();
        let len = state.library.len();
        let index = state.ui_state.library_selected_index;

        match key.code {
            KeyCode::Down => state.ui_state.library_selected_index = (index + 1).min(len.saturating_sub(1)),
            KeyCode::Up => state.ui_state.library_selected_index = index.saturating_sub(1),
            KeyCode::Home => state.ui_state.library_selected_index = 0,
            KeyCode::End => state.ui_state.library_selected_index = len.saturating_sub(1),
            KeyCode::Enter => {
                if let Some(id) = state.library.get(index).map(|entry| entry.id) {
                    state.open_chapter(id);
                }
            }
            _ if pressed(&keymap.quit, &key) => state.should_quit = true,
            _ if pressed(&keymap.scroll_down, &key) => {
                state.ui_state.library_selected_index = (index + 1).min(len.saturating_sub(1))
            }
            _ if pressed(&keymap.scroll_up, &key) => {
                state.ui_state.library_selected_index = index.saturating_sub(1)
            }
            _ if pressed(&keymap.beginning_of_ch, &key) => state.ui_state.library_selected_index = 0,
            _ if pressed(&keymap.end_of_ch, &key) => {
                state.ui_state.library_selected_index = len.saturating_sub(1)
            }
            _ if pressed(&keymap.help, &key) => state.ui_state.open_window(WindowType::Help),
            _ => {}
        }
    }

    fn handle_help_keys(&mut self, key: KeyEvent) {
        let mut state = self.state.borrow_mut();
        let max_offset = HelpWindow::max_scroll_offset(self.frame_area, state.config.keymap_user_dict());
        let keymap = state.config.keymap.clone();

        match key.code {
            KeyCode::Esc | KeyCode::Enter => state.ui_state.close_help(),
            KeyCode::Down => {
                state.ui_state.help_scroll_offset =
                    state.ui_state.help_scroll_offset.saturating_add(1).min(max_offset)
            }
            KeyCode::Up => {
                state.ui_state.help_scroll_offset = state.ui_state.help_scroll_offset.saturating_sub(1)
            }
            _ if pressed(&keymap.quit, &key) || pressed(&keymap.help, &key) => {
                state.ui_state.close_help()
            }
            _ if pressed(&keymap.scroll_down, &key) => {
                state.ui_state.help_scroll_offset =
                    state.ui_state.help_scroll_offset.saturating_add(1).min(max_offset)
            }
            _ if pressed(&keymap.scroll_up, &key) => {
                state.ui_state.help_scroll_offset = state.ui_state.help_scroll_offset.saturating_sub(1)
            }
            _ => {}
        }
    }

    fn handle_not_found_keys(&mut self, key: KeyEvent) {
        let mut state = self.state.borrow_mut();
        let keymap = state.config.keymap.clone();
        match key.code {
            KeyCode::Esc | KeyCode::Enter => state.open_library(),
            _ if pressed(&keymap.quit, &key) => state.should_quit = true,
            _ if pressed(&keymap.library, &key) => state.open_library(),
            _ => {}
        }
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent, now: Instant) {
        let (mouse_support, active_window) = {
            let state = self.state.borrow();
            (
                state.config.settings.mouse_support,
                state.ui_state.active_window.clone(),
            )
        };
        if !mouse_support || active_window != WindowType::Chapter {
            return;
        }

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.pointer_down(mouse.column, mouse.row, now),
            MouseEventKind::ScrollDown => self.scroll_by(MOUSE_SCROLL_LINES),
            MouseEventKind::ScrollUp => self.scroll_by(-MOUSE_SCROLL_LINES),
            _ => {}
        }
    }

    fn pointer_down(&mut self, x: u16, y: u16, now: Instant) {
        if let Some(selection) = self.visible_selection()
            && TooltipWindow::contains(self.frame_area, &selection, x, y)
        {
            match TooltipWindow::action_at(self.frame_area, &selection, x, y) {
                Some(TooltipAction::Speak) => self.speech.speak(&selection.word),
                Some(TooltipAction::Close) => self.state.borrow_mut().tooltip.close(),
                None => {
                    self.state.borrow_mut().tooltip.pointer_down(HitTarget::Tooltip);
                }
            }
            return;
        }

        let scroll = self.visible_scroll();
        match self.board.hit_test(self.content_area, scroll, x, y) {
            Some(idx) => {
                self.state.borrow_mut().tooltip.pointer_down(HitTarget::Word);
                self.lookup_word(idx, now);
            }
            None => {
                self.state.borrow_mut().tooltip.pointer_down(HitTarget::Elsewhere);
            }
        }
    }

    /// Select the word at `idx`, start its translation and pronounce it.
    fn lookup_word(&mut self, idx: usize, now: Instant) {
        let Some(word) = self.board.word(idx).map(|cell| cell.text.clone()) else {
            return;
        };
        let anchor = self.board.page_anchor(idx).unwrap_or_default();

        let outcome = {
            let mut state = self.state.borrow_mut();
            state.ui_state.word_cursor = Some(idx);
            let outcome = state.tooltip.select_word(&word, anchor, now);
            if outcome != LookupStart::Ignored {
                state.ui_state.selected_word = Some(idx);
            }
            outcome
        };
        match outcome {
            LookupStart::Ignored => return,
            LookupStart::Cached => {}
            LookupStart::Fetch(request) => self.translator.dispatch(request, self.lookup_tx.clone()),
        }
        self.speech.speak(&word);
    }

    /// The current selection with its anchor in terminal cells, following
    /// the word as the page scrolls or reflows. `None` while the word is
    /// off screen, which hides the tooltip without dismissing it.
    fn visible_selection(&self) -> Option<Selection> {
        let state = self.state.borrow();
        let selection = state.tooltip.selection()?;
        let scroll = self.visible_scroll();
        let anchor = match state.ui_state.selected_word {
            Some(idx) => self.board.anchor_for(idx, self.content_area, scroll)?,
            None => Board::to_screen(selection.anchor, self.content_area, scroll)?,
        };
        Some(Selection {
            anchor,
            ..selection.clone()
        })
    }

    fn lookup_at_cursor(&mut self, now: Instant) {
        let cursor = self.state.borrow().ui_state.word_cursor;
        if cursor.is_none() {
            self.move_word_cursor(0);
        }
        let cursor = self.state.borrow().ui_state.word_cursor;
        if let Some(idx) = cursor {
            self.lookup_word(idx, now);
        }
    }

    fn speak_current(&mut self) {
        let word = {
            let state = self.state.borrow();
            state
                .tooltip
                .selection()
                .map(|s| s.word.clone())
                .or_else(|| {
                    state
                        .ui_state
                        .word_cursor
                        .and_then(|idx| self.board.word(idx))
                        .map(|cell| cell.text.clone())
                })
        };
        let Some(word) = word else {
            return;
        };
        if !self.speech.is_available() {
            self.state
                .borrow_mut()
                .ui_state
                .set_message("No speech engine found", MessageType::Warning);
            return;
        }
        self.speech.speak(&word);
    }

    fn yank_translation(&mut self) -> eyre::Result<()> {
        let text = {
            let state = self.state.borrow();
            state.tooltip.selection().and_then(|s| {
                let translation = s.translation.as_ref().filter(|_| !s.loading)?;
                Some(format!("{}: {}", s.word, translation))
            })
        };
        let Some(text) = text else {
            self.state
                .borrow_mut()
                .ui_state
                .set_message("Nothing to copy yet", MessageType::Warning);
            return Ok(());
        };

        match self.clipboard.as_mut() {
            Some(clipboard) => {
                clipboard.set_text(text)?;
                self.state
                    .borrow_mut()
                    .ui_state
                    .set_message("Translation copied to clipboard", MessageType::Info);
            }
            None => self
                .state
                .borrow_mut()
                .ui_state
                .set_message("Clipboard unavailable", MessageType::Error),
        }
        Ok(())
    }

    fn goto_adjacent_chapter(&mut self, forward: bool) {
        let mut state = self.state.borrow_mut();
        let Some(current) = state.ui_state.chapter_id else {
            return;
        };
        let target = if forward {
            state.store.next_id(current)
        } else {
            state.store.prev_id(current)
        };
        match target {
            Some(id) => state.open_chapter(id),
            None if forward => state
                .ui_state
                .set_message("Already at the last chapter", MessageType::Info),
            None => state
                .ui_state
                .set_message("Already at the first chapter", MessageType::Info),
        }
    }

    fn max_scroll(&self) -> usize {
        self.board.max_scroll(self.content_area.height)
    }

    fn visible_scroll(&self) -> usize {
        self.state.borrow().ui_state.scroll.min(self.max_scroll())
    }

    fn scroll_by(&mut self, delta: isize) {
        let max = self.max_scroll() as isize;
        let mut state = self.state.borrow_mut();
        let target = (state.ui_state.scroll.min(max as usize) as isize + delta).clamp(0, max);
        state.ui_state.scroll = target as usize;
    }

    fn scroll_to(&mut self, row: usize) {
        let max = self.max_scroll();
        self.state.borrow_mut().ui_state.scroll = row.min(max);
    }

    /// Step the keyboard word cursor, scrolling to keep it on screen. A
    /// cursor that scrolled out of view restarts at the first visible word.
    fn move_word_cursor(&mut self, delta: isize) {
        let total = self.board.words().len();
        if total == 0 {
            return;
        }
        let area = self.content_area;
        let mut scroll = self.visible_scroll();
        let cursor = self.state.borrow().ui_state.word_cursor;

        let next = match cursor {
            Some(idx) if self.board.is_word_visible(idx, area, scroll) => {
                (idx as isize + delta).clamp(0, total as isize - 1) as usize
            }
            _ => self
                .board
                .first_visible_word(area, scroll)
                .or_else(|| self.board.words().iter().position(|w| w.line >= scroll))
                .unwrap_or(0),
        };

        if let Some(cell) = self.board.word(next) {
            let height = (area.height as usize).max(1);
            if cell.line < scroll {
                scroll = cell.line;
            } else if cell.line >= scroll + height {
                scroll = cell.line + 1 - height;
            }
        }

        let mut state = self.state.borrow_mut();
        state.ui_state.word_cursor = Some(next);
        state.ui_state.scroll = scroll;
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        self.frame_area = area;

        let state_rc = self.state.clone();
        let state = state_rc.borrow();
        let active = state.ui_state.active_window.clone();
        let base = if active == WindowType::Help {
            state.ui_state.previous_window.clone()
        } else {
            active.clone()
        };

        match base {
            WindowType::Chapter => self.render_chapter(frame, &state),
            _ => LibraryWindow::render(
                frame,
                area,
                &state.library,
                state.ui_state.library_selected_index,
            ),
        }

        if base == WindowType::NotFound
            && let Some(id) = state.ui_state.missing_chapter
        {
            NotFoundWindow::render(frame, area, id);
        }

        if base == WindowType::Chapter
            && let Some(selection) = self.visible_selection()
        {
            TooltipWindow::render(frame, &selection);
        }

        if active == WindowType::Help {
            HelpWindow::render(
                frame,
                area,
                state.config.keymap_user_dict(),
                state.ui_state.help_scroll_offset,
            );
        }

        if let Some(ref message) = state.ui_state.message {
            Self::render_message_static(frame, message, &state.ui_state.message_type);
        }
    }

    fn render_chapter(&mut self, frame: &mut Frame, state: &ApplicationState) {
        let Some(chapter) = state.current_chapter() else {
            return;
        };
        let frame_area = frame.area();
        let show_top_bar = state.config.settings.show_top_bar;

        let chunks = Layout::vertical([
            Constraint::Length(if show_top_bar { 1 } else { 0 }),
            Constraint::Length(if show_top_bar { 1 } else { 0 }),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame_area);

        if show_top_bar {
            let header = Self::build_header_line(
                BOOK_TITLE,
                Some(&format!("Chapter {}", chapter.id)),
                chunks[0].width,
            );
            frame.render_widget(
                Paragraph::new(Line::from(header)).style(Style::default().fg(Color::Gray)),
                chunks[0],
            );
        }

        let text_width = state
            .config
            .settings
            .width
            .map(|w| w.min(u16::MAX as usize) as u16)
            .unwrap_or(DEFAULT_TEXT_WIDTH)
            .min(chunks[2].width);
        let content_area = Rect {
            x: chunks[2].x + (chunks[2].width - text_width) / 2,
            y: chunks[2].y,
            width: text_width,
            height: chunks[2].height,
        };

        if !self.board.is_laid_out_for(chapter.id, text_width) {
            let illustration = state.images.resolve(chapter.id);
            self.board
                .layout(chapter, illustration.as_deref(), text_width);
        }
        self.content_area = content_area;

        let scroll = state.ui_state.scroll.min(self.max_scroll());
        let highlight = state.tooltip.selection().map(|s| s.word.as_str());
        self.board
            .render(frame, content_area, scroll, highlight, state.ui_state.word_cursor);

        let keys = state.config.keymap_user_dict();
        let previous = state
            .store
            .prev_id(chapter.id)
            .map(|_| format!("< {} Previous chapter", keys.prev_chapter));
        let next = state
            .store
            .next_id(chapter.id)
            .map(|_| format!("Next chapter {} >", keys.next_chapter));
        let footer = Self::build_footer_line(previous.as_deref(), next.as_deref(), chunks[3].width);
        frame.render_widget(
            Paragraph::new(Line::from(footer)).style(Style::default().fg(Color::DarkGray)),
            chunks[3],
        );
    }

    /// Title centred in the space left of `right_text`, which is flush right.
    fn build_header_line(title: &str, right_text: Option<&str>, width: u16) -> String {
        let width = width as usize;
        if width == 0 {
            return String::new();
        }
        let right_len = right_text.map(display_width).unwrap_or(0);
        let content_width = if right_len > 0 {
            width.saturating_sub(right_len + 1)
        } else {
            width
        };

        let title: String = title.chars().take(content_width).collect();
        let title_len = display_width(&title);
        let left_pad = content_width.saturating_sub(title_len) / 2;

        let mut line = " ".repeat(left_pad);
        line.push_str(&title);
        if let Some(right_text) = right_text {
            let used = left_pad + title_len;
            line.push_str(&" ".repeat(width.saturating_sub(used + right_len)));
            line.push_str(right_text);
        }
        line
    }

    fn build_footer_line(left: Option<&str>, right: Option<&str>, width: u16) -> String {
        let left = left.unwrap_or("");
        let right = right.unwrap_or("");
        let gap = (width as usize).saturating_sub(display_width(left) + display_width(right));
        format!("{left}{}{right}", " ".repeat(gap))
    }

    fn render_message_static(frame: &mut Frame, message: &str, message_type: &MessageType) {
        let color = match message_type {
            MessageType::Info => Color::Blue,
            MessageType::Warning => Color::Yellow,
            MessageType::Error => Color::Red,
        };

        let message_paragraph = Paragraph::new(message)
            .style(Style::default().fg(color))
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: true });

        let frame_area = frame.area();
        if frame_area.width < 5 || frame_area.height < 5 {
            return;
        }
        let area = Rect {
            x: frame_area.x + 2,
            y: frame_area.y + 2,
            width: frame_area.width - 4,
            height: 3,
        };

        frame.render_widget(Clear, area);
        frame.render_widget(message_paragraph, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::tests::{FakeEngine, Recording};
    use crate::translation::tests::FakeEndpoint;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    struct Harness {
        reader: Reader,
        endpoint: Arc<FakeEndpoint>,
        speech: Rc<RefCell<Recording>>,
        terminal: Terminal<TestBackend>,
        _dir: TempDir,
    }

    impl Harness {
        fn new(endpoint: FakeEndpoint) -> Self {
            Self::with_settings(endpoint, |_| {})
        }

        fn with_settings(endpoint: FakeEndpoint, tweak: impl FnOnce(&mut Config)) -> Self {
            Self::build(endpoint, "Bonjour, le monde!\n\nLe fleuve coule.", (80, 24), tweak)
        }

        fn build(
            endpoint: FakeEndpoint,
            content: &str,
            (width, height): (u16, u16),
            tweak: impl FnOnce(&mut Config),
        ) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut config = Config::load_from(dir.path().join("configuration.json")).unwrap();
            config.settings.auto_dismiss_ms = 60_000;
            config.settings.images_dir = dir.path().display().to_string();
            tweak(&mut config);

            let store = ChapterStore::new(
                (1..=3)
                    .map(|id| Chapter {
                        id,
                        title: format!("Chapitre {id}"),
                        content: content.to_string(),
                    })
                    .collect(),
            );
            let endpoint = Arc::new(endpoint);
            let (engine, speech) = FakeEngine::new(Vec::new());
            let reader = Reader::with_services(
                config,
                store,
                TranslationClient::new(endpoint.clone()),
                SpeechTrigger::new(Some(Box::new(engine)), Vec::new()),
                None,
            );
            Self {
                reader,
                endpoint,
                speech,
                terminal: Terminal::new(TestBackend::new(width, height)).unwrap(),
                _dir: dir,
            }
        }

        fn draw(&mut self) {
            let reader = &mut self.reader;
            self.terminal.draw(|f| reader.render(f)).unwrap();
        }

        fn screen(&self) -> String {
            self.terminal
                .backend()
                .buffer()
                .content()
                .iter()
                .map(|cell| cell.symbol())
                .collect()
        }

        fn key(&mut self, code: KeyCode) {
            self.reader
                .handle_event(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)), Instant::now())
                .unwrap();
        }

        fn click(&mut self, x: u16, y: u16) {
            let event = Event::Mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: x,
                row: y,
                modifiers: KeyModifiers::NONE,
            });
            self.reader.handle_event(event, Instant::now()).unwrap();
        }

        /// Screen cell of the `nth` word at the current scroll.
        fn word_cell(&self, nth: usize) -> (u16, u16) {
            let cell = &self.reader.board.words()[nth];
            let area = self.reader.content_area;
            let scroll = self.reader.visible_scroll();
            (area.x + cell.col, area.y + (cell.line - scroll) as u16)
        }

        fn tooltip_area(&self) -> Rect {
            let selection = self.reader.visible_selection().unwrap();
            TooltipWindow::area(self.reader.frame_area, &selection)
        }

        fn wait_for_lookup(&mut self) {
            for _ in 0..300 {
                self.reader.tick(Instant::now());
                if self.reader.state.borrow().tooltip.state() != TooltipState::Selecting {
                    return;
                }
                thread::sleep(Duration::from_millis(10));
            }
            panic!("lookup never settled");
        }

        fn state(&self) -> std::cell::Ref<'_, ApplicationState> {
            self.reader.state.borrow()
        }
    }

    #[test]
    fn test_starts_on_library() {
        let mut h = Harness::new(FakeEndpoint::ok("Привіт"));
        h.reader.open(None);
        h.draw();
        assert_eq!(h.state().ui_state.active_window, WindowType::Library);
        assert!(h.screen().contains("(3 chapters)"));
    }

    #[test]
    fn test_library_enter_opens_selected_chapter() {
        let mut h = Harness::new(FakeEndpoint::ok("Привіт"));
        h.reader.open(None);
        h.key(KeyCode::Down);
        h.key(KeyCode::Enter);
        assert_eq!(h.state().ui_state.active_window, WindowType::Chapter);
        assert_eq!(h.state().ui_state.chapter_id, Some(2));

        h.draw();
        let screen = h.screen();
        assert!(screen.contains("Chapter 2"));
        assert!(screen.contains("Chapitre 2"));
        assert!(screen.contains("Previous chapter"));
        assert!(screen.contains("Next chapter"));
    }

    #[test]
    fn test_click_on_word_translates_and_speaks() {
        let mut h = Harness::new(FakeEndpoint::ok("Привіт"));
        h.reader.open(Some(1));
        h.draw();

        let (x, y) = h.word_cell(0);
        h.click(x + 1, y);
        assert_eq!(h.state().tooltip.state(), TooltipState::Selecting);
        h.wait_for_lookup();

        {
            let state = h.state();
            let selection = state.tooltip.selection().unwrap();
            assert_eq!(selection.word, "Bonjour");
            assert_eq!(selection.translation.as_deref(), Some("Привіт"));
        }
        assert_eq!(h.reader.visible_selection().unwrap().anchor.y, y);
        assert_eq!(h.speech.borrow().spoken.len(), 1);
        assert_eq!(h.speech.borrow().spoken[0].text, "Bonjour");
        assert_eq!(h.endpoint.call_count(), 1);

        h.draw();
        let screen = h.screen();
        assert!(screen.contains("Ukrainian"));
        assert!(screen.contains("Привіт"));
    }

    #[test]
    fn test_same_word_any_case_is_fetched_once() {
        let mut h = Harness::new(FakeEndpoint::ok("the"));
        h.reader.open(Some(1));
        h.draw();

        // "le" in the first paragraph, "Le" opening the second.
        let (x, y) = h.word_cell(1);
        h.click(x, y);
        h.wait_for_lookup();
        h.key(KeyCode::Esc);

        let (x, y) = h.word_cell(3);
        h.click(x, y);
        assert_eq!(h.state().tooltip.state(), TooltipState::Shown);
        assert_eq!(h.state().tooltip.selection().unwrap().word, "Le");
        assert_eq!(h.endpoint.call_count(), 1);
        assert_eq!(h.speech.borrow().spoken.len(), 2);
    }

    #[test]
    fn test_click_outside_dismisses_and_tooltip_click_does_not() {
        let mut h = Harness::new(FakeEndpoint::ok("світ"));
        h.reader.open(Some(1));
        h.draw();

        let (x, y) = h.word_cell(2);
        h.click(x, y);
        h.wait_for_lookup();
        h.draw();

        let area = h.tooltip_area();
        h.click(area.x + 1, area.y + 1);
        assert!(h.state().tooltip.selection().is_some());

        h.click(0, 23);
        assert!(h.state().tooltip.selection().is_none());
        assert_eq!(h.state().tooltip.state(), TooltipState::Idle);
    }

    #[test]
    fn test_tooltip_buttons() {
        let mut h = Harness::new(FakeEndpoint::ok("світ"));
        h.reader.open(Some(1));
        h.draw();

        let (x, y) = h.word_cell(2);
        h.click(x, y);
        h.wait_for_lookup();
        let area = h.tooltip_area();
        let row = area.bottom() - 2;

        h.click(area.x + 3, row);
        assert_eq!(h.speech.borrow().spoken.len(), 2);
        assert!(h.state().tooltip.selection().is_some());

        h.click(area.x + 13, row);
        assert!(h.state().tooltip.selection().is_none());
    }

    #[test]
    fn test_tooltip_follows_its_word_when_scrolling() {
        let content = vec!["Le pilote du Danube descend le fleuve."; 40].join("\n\n");
        let mut h = Harness::build(FakeEndpoint::ok("з"), &content, (80, 12), |_| {});
        h.reader.open(Some(1));
        h.draw();

        // "du" in the third paragraph.
        let (x, y) = h.word_cell(16);
        h.click(x, y);
        h.wait_for_lookup();
        assert_eq!(h.reader.visible_selection().unwrap().anchor.y, y);

        let wheel = Event::Mouse(MouseEvent {
            kind: MouseEventKind::ScrollDown,
            column: x,
            row: y,
            modifiers: KeyModifiers::NONE,
        });
        h.reader.handle_event(wheel, Instant::now()).unwrap();
        h.draw();

        let (_, moved_y) = h.word_cell(16);
        assert_eq!(moved_y, y - 3);
        assert_eq!(h.reader.visible_selection().unwrap().anchor.y, moved_y);
        let label_row = h.tooltip_area().y + 2;
        let buffer = h.terminal.backend().buffer();
        let row: String = (0..80).map(|col| buffer[(col, label_row)].symbol()).collect();
        assert!(row.contains("Ukrainian"));

        h.key(KeyCode::End);
        h.draw();
        assert!(h.reader.visible_selection().is_none());
        assert_eq!(h.state().tooltip.state(), TooltipState::Shown);
        assert!(!h.screen().contains("Ukrainian"));

        h.key(KeyCode::Home);
        h.draw();
        assert_eq!(h.reader.visible_selection().unwrap().anchor.y, y);
        assert!(h.screen().contains("Ukrainian"));
    }

    #[test]
    fn test_lookup_key_without_cursor_starts_at_first_visible_word() {
        let mut h = Harness::new(FakeEndpoint::ok("Привіт"));
        h.reader.open(Some(1));
        h.draw();

        h.key(KeyCode::Char('t'));
        assert_eq!(h.state().ui_state.word_cursor, Some(0));
        assert_eq!(h.state().ui_state.selected_word, Some(0));
        h.wait_for_lookup();
        assert_eq!(h.state().tooltip.selection().unwrap().word, "Bonjour");
    }

    #[test]
    fn test_mouse_ignored_when_disabled() {
        let mut h = Harness::with_settings(FakeEndpoint::ok("світ"), |config| {
            config.settings.mouse_support = false;
        });
        h.reader.open(Some(1));
        h.draw();
        let (x, y) = h.word_cell(0);
        h.click(x, y);
        assert!(h.state().tooltip.selection().is_none());
        assert_eq!(h.endpoint.call_count(), 0);
    }

    #[test]
    fn test_keyboard_word_cursor_lookup() {
        let mut h = Harness::new(FakeEndpoint::ok("річка"));
        h.reader.open(Some(1));
        h.draw();

        h.key(KeyCode::Tab);
        assert_eq!(h.state().ui_state.word_cursor, Some(0));
        h.key(KeyCode::Char('w'));
        h.key(KeyCode::Char('w'));
        h.key(KeyCode::Char('w'));
        h.key(KeyCode::Char('w'));
        assert_eq!(h.state().ui_state.word_cursor, Some(4));
        h.key(KeyCode::Char('b'));
        h.key(KeyCode::Enter);
        h.wait_for_lookup();

        assert_eq!(h.state().tooltip.selection().unwrap().word, "Le");
        assert_eq!(h.endpoint.calls.lock().unwrap().as_slice(), ["Le"]);
    }

    #[test]
    fn test_network_error_is_shown_inline() {
        let mut h = Harness::new(FakeEndpoint::with_reply(|_| {
            Err(crate::error::TranslationError::Network("refused".to_string()))
        }));
        h.reader.open(Some(1));
        h.draw();

        let (x, y) = h.word_cell(0);
        h.click(x, y);
        h.wait_for_lookup();
        h.draw();
        assert!(h.screen().contains("Network error"));
        assert!(!h.state().tooltip.timer().is_pending());
    }

    #[test]
    fn test_chapter_navigation_is_bounded() {
        let mut h = Harness::new(FakeEndpoint::ok("x"));
        h.reader.open(Some(1));

        h.key(KeyCode::Char('H'));
        assert_eq!(h.state().ui_state.chapter_id, Some(1));
        assert_eq!(
            h.state().ui_state.message.as_deref(),
            Some("Already at the first chapter")
        );

        h.key(KeyCode::Char('L'));
        h.key(KeyCode::Char('L'));
        h.key(KeyCode::Char('L'));
        assert_eq!(h.state().ui_state.chapter_id, Some(3));
        assert_eq!(h.state().ui_state.library_selected_index, 2);
    }

    #[test]
    fn test_changing_chapter_dismisses_tooltip() {
        let mut h = Harness::new(FakeEndpoint::ok("світ"));
        h.reader.open(Some(1));
        h.draw();
        let (x, y) = h.word_cell(2);
        h.click(x, y);
        h.wait_for_lookup();

        h.key(KeyCode::Char('L'));
        assert!(h.state().tooltip.selection().is_none());
        assert_eq!(h.state().ui_state.word_cursor, None);
    }

    #[test]
    fn test_unknown_chapter_shows_not_found() {
        let mut h = Harness::new(FakeEndpoint::ok("x"));
        h.reader.open(Some(19));
        h.draw();
        assert_eq!(h.state().ui_state.active_window, WindowType::NotFound);
        assert!(h.screen().contains("Chapter 19 not found"));

        h.key(KeyCode::Enter);
        assert_eq!(h.state().ui_state.active_window, WindowType::Library);
    }

    #[test]
    fn test_help_returns_to_previous_window() {
        let mut h = Harness::new(FakeEndpoint::ok("x"));
        h.reader.open(Some(2));
        h.key(KeyCode::Char('?'));
        assert_eq!(h.state().ui_state.active_window, WindowType::Help);
        h.draw();
        assert!(h.screen().contains("Pronounce Word"));

        h.key(KeyCode::Esc);
        assert_eq!(h.state().ui_state.active_window, WindowType::Chapter);
    }

    #[test]
    fn test_yank_without_clipboard_reports_it() {
        let mut h = Harness::new(FakeEndpoint::ok("світ"));
        h.reader.open(Some(1));
        h.draw();

        h.key(KeyCode::Char('y'));
        assert_eq!(h.state().ui_state.message.as_deref(), Some("Nothing to copy yet"));

        let (x, y) = h.word_cell(2);
        h.click(x, y);
        h.wait_for_lookup();
        h.key(KeyCode::Char('y'));
        assert_eq!(h.state().ui_state.message.as_deref(), Some("Clipboard unavailable"));
    }

    #[test]
    fn test_quit_keys() {
        let mut h = Harness::new(FakeEndpoint::ok("x"));
        h.reader.open(None);
        h.key(KeyCode::Char('q'));
        assert!(h.state().should_quit);

        let mut h = Harness::new(FakeEndpoint::ok("x"));
        h.reader.open(Some(1));
        h.reader
            .handle_event(
                Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
                Instant::now(),
            )
            .unwrap();
        assert!(h.state().should_quit);
    }

    #[test]
    fn test_header_and_footer_lines() {
        let header = Reader::build_header_line("Title", Some("Chapter 3"), 30);
        assert_eq!(header.chars().count(), 30);
        assert!(header.ends_with("Chapter 3"));
        assert!(header.contains("Title"));

        let footer = Reader::build_footer_line(None, Some("Next >"), 20);
        assert_eq!(footer, format!("{}Next >", " ".repeat(14)));
    }

    #[test]
    fn test_message_expiry() {
        let mut ui = UiState::new();
        ui.set_message("hello", MessageType::Info);
        let shown = ui.message_time.unwrap();
        assert!(!ui.message_expired(shown + Duration::from_secs(2)));
        assert!(ui.message_expired(shown + Duration::from_secs(3)));
    }
}
