use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api::{ChatAnswer, QaClient, QaError};
use crate::config::Config;
use crate::message::{MessageKind, MessageStore};
use crate::turn::{self, PendingTurn};

/// Whether the backend health probe has completed, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Checking,
    Online,
    Offline,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub store: MessageStore,

    // Input line state
    pub input: String,
    pub input_cursor: usize, // char index, not byte index

    // Chat area state
    pub scroll: u16,
    pub chat_height: u16, // inner height of the chat area, set during render
    pub chat_width: u16,  // inner width, for wrap calculations

    // Animation state (0-2 for the typing dots)
    pub animation_frame: u8,

    // In-flight turn
    pub turn_task: Option<JoinHandle<Result<ChatAnswer, QaError>>>,
    pub pending_turn: Option<PendingTurn>,

    // Backend connectivity probe
    pub backend_status: BackendStatus,
    pub health_task: Option<JoinHandle<Result<(), QaError>>>,

    pub client: QaClient,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let client = QaClient::new(
            &config.base_url(),
            std::time::Duration::from_secs(config.timeout_secs()),
        );

        Self {
            should_quit: false,
            store: MessageStore::new_with_greeting(),
            input: String::new(),
            input_cursor: 0,
            scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            turn_task: None,
            pending_turn: None,
            backend_status: BackendStatus::Checking,
            health_task: None,
            client,
        }
    }

    pub fn turn_in_flight(&self) -> bool {
        self.turn_task.is_some()
    }

    /// Submits the current input as a new turn. Ignored while a turn is in
    /// flight (overlapping submissions are rejected, not queued) and for
    /// blank input.
    pub fn submit_input(&mut self) {
        if self.turn_in_flight() {
            return;
        }

        let Some(pending) = turn::begin(&mut self.store, &self.input) else {
            return;
        };

        let question = std::mem::take(&mut self.input);
        self.input_cursor = 0;
        self.pending_turn = Some(pending);

        info!("submitting question to QA backend");
        let client = self.client.clone();
        self.turn_task = Some(tokio::spawn(async move { client.ask(&question).await }));

        self.scroll_to_bottom();
    }

    /// Picks up a finished turn task. A panicked or aborted task still
    /// completes the turn, so the typing placeholder is always removed.
    pub async fn poll_turn(&mut self) {
        let finished = matches!(&self.turn_task, Some(task) if task.is_finished());
        if !finished {
            return;
        }

        let (Some(task), Some(pending)) = (self.turn_task.take(), self.pending_turn.take())
        else {
            return;
        };

        let result = match task.await {
            Ok(result) => result,
            Err(join_err) => {
                error!(%join_err, "turn task did not run to completion");
                Err(QaError::Unknown)
            }
        };

        turn::complete(&mut self.store, pending, result);
        self.scroll_to_bottom();
    }

    /// Kicks off the startup connectivity probe.
    pub fn spawn_health_probe(&mut self) {
        let client = self.client.clone();
        self.health_task = Some(tokio::spawn(async move { client.health().await }));
    }

    pub async fn poll_health(&mut self) {
        let finished = matches!(&self.health_task, Some(task) if task.is_finished());
        if !finished {
            return;
        }

        let Some(task) = self.health_task.take() else {
            return;
        };

        self.backend_status = match task.await {
            Ok(Ok(())) => {
                info!("QA backend is reachable");
                BackendStatus::Online
            }
            Ok(Err(err)) => {
                error!(error = %err, "QA backend health probe failed");
                BackendStatus::Offline
            }
            Err(_) => BackendStatus::Offline,
        };
    }

    /// Tick animation frame (called by Tick event). The dots animate exactly
    /// while a typing placeholder is in the store.
    pub fn tick_animation(&mut self) {
        if self.store.typing_count() > 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        let max_scroll = self.total_chat_lines().saturating_sub(self.chat_height);
        if self.scroll < max_scroll {
            self.scroll += 1;
        }
    }

    /// Scroll so the newest message (and the typing row) is visible.
    pub fn scroll_to_bottom(&mut self) {
        let visible = if self.chat_height > 0 { self.chat_height } else { 20 };
        let total = self.total_chat_lines();
        self.scroll = total.saturating_sub(visible);
    }

    /// Rendered line count of the whole history at the current chat width.
    /// Mirrors the layout in `ui::chat_lines`: a label line per message, the
    /// wrapped content (or one dots row for typing), and a trailing blank.
    pub fn total_chat_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total: u16 = 0;
        for msg in self.store.list() {
            total += 1; // label line
            match &msg.kind {
                MessageKind::Text(content) => {
                    for line in content.lines() {
                        let cells = display_width(line);
                        if cells == 0 {
                            total += 1;
                        } else {
                            total += ((cells / wrap_width) + 1) as u16;
                        }
                    }
                }
                MessageKind::Typing => total += 1,
            }
            total += 1; // blank line between messages
        }
        total
    }
}

/// Terminal cells a line occupies: CJK and other non-ASCII characters render
/// two cells wide, so a character count would undercount the wrapped rows.
fn display_width(line: &str) -> usize {
    line.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}
