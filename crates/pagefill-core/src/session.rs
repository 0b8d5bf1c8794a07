//! The editor session: one explicit context owning the document and every
//! component that acts on it.

use crate::command::{
    CommandInterpreter, CommandOutcome, CommandReport, CompletedCommand, PendingCommand, SuggestionError,
    SuggestionService,
};
use crate::config::EditorConfig;
use crate::document::EditorDocument;
use crate::export::{PageOptions, PdfRenderer, RenderError, RenderRequest};
use crate::interaction::{InteractionController, PointerId, PointerOutcome, PointerTarget};
use crate::schedule::{Duration, Instant};
use crate::storage::{LoadError, PersistEvent, PersistenceManager, Storage, StoredSnapshot};
use chrono::NaiveDate;
use kurbo::Point;
use std::sync::Arc;

/// Severity of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient message for the user (a toast, a status line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// Session context for one editor.
pub struct EditorSession<S: Storage> {
    document: EditorDocument,
    controller: InteractionController,
    persistence: PersistenceManager<S>,
    commands: CommandInterpreter,
    renderer: Option<Box<dyn PdfRenderer>>,
    notices: Vec<Notice>,
}

impl<S: Storage> EditorSession<S> {
    pub fn new(storage: Arc<S>, config: &EditorConfig) -> Self {
        let mut document = EditorDocument::with_container(config.container_size());
        document.set_snap_threshold(config.snap_threshold);

        let mut persistence = PersistenceManager::new(storage).with_key(config.storage_key.clone());
        persistence.set_delay(Duration::from_millis(config.autosave_delay_ms));

        Self {
            document,
            controller: InteractionController::new(),
            persistence,
            commands: CommandInterpreter::new(),
            renderer: None,
            notices: Vec::new(),
        }
    }

    pub fn document(&self) -> &EditorDocument {
        &self.document
    }

    /// Direct document access for toolbar and keyboard edits.
    pub fn document_mut(&mut self) -> &mut EditorDocument {
        &mut self.document
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut InteractionController {
        &mut self.controller
    }

    pub fn persistence(&self) -> &PersistenceManager<S> {
        &self.persistence
    }

    pub fn commands(&self) -> &CommandInterpreter {
        &self.commands
    }

    pub fn set_suggestion_service(&mut self, service: Option<Arc<dyn SuggestionService>>) {
        self.commands.set_service(service);
    }

    pub fn set_renderer(&mut self, renderer: Option<Box<dyn PdfRenderer>>) {
        self.renderer = renderer;
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Hand pending notices to the UI.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn pointer_down(&mut self, pointer: PointerId, target: PointerTarget, client: Point) -> PointerOutcome {
        self.controller.begin(&mut self.document, pointer, target, client)
    }

    pub fn pointer_move(&mut self, pointer: PointerId, client: Point) -> bool {
        self.controller.update(&mut self.document, pointer, client)
    }

    pub fn pointer_up(&mut self, pointer: PointerId) {
        self.controller.end(pointer);
    }

    /// Drive timers: pick up document changes and write a due autosave.
    /// Call from the event loop after handling input.
    pub async fn tick(&mut self, now: Instant) -> Option<PersistEvent> {
        self.persistence.observe(&self.document, now);
        let event = self.persistence.poll(&self.document, now).await;
        if let Some(PersistEvent::Failed(e)) = &event {
            self.notify(Notice::error(format!("Autosave failed: {}", e)));
        }
        event
    }

    /// Save now. Returns the written snapshot on success.
    pub async fn save(&mut self) -> Option<StoredSnapshot> {
        match self.persistence.explicit_save(&self.document).await {
            Ok(snapshot) => {
                self.notify(Notice::info(format!("Saved {}", snapshot.saved_at)));
                Some(snapshot)
            }
            Err(e) => {
                self.notify(Notice::error(format!("Save failed: {}", e)));
                None
            }
        }
    }

    /// Replace the document with the saved one. Returns true if loaded.
    pub async fn load(&mut self) -> bool {
        let result = self.persistence.load().await;
        match result {
            Ok(snapshot) => {
                let saved_at = snapshot.saved_at.clone();
                self.controller.cancel_all();
                self.document.apply_snapshot(snapshot);
                self.persistence.acknowledge(&self.document);
                self.notify(Notice::info(format!("Loaded document saved {}", saved_at)));
                true
            }
            Err(LoadError::Empty) => {
                self.notify(Notice::info("No saved data"));
                false
            }
            Err(e @ LoadError::Corrupted(_)) => {
                self.notify(Notice::error(e.to_string()));
                false
            }
            Err(e) => {
                self.notify(Notice::error(format!("Load failed: {}", e)));
                false
            }
        }
    }

    /// Clear the document and the saved slot. Callers confirm first.
    pub async fn reset(&mut self) -> bool {
        let result = self.persistence.reset(&mut self.document).await;
        match result {
            Ok(()) => {
                self.controller.cancel_all();
                true
            }
            Err(e) => {
                self.notify(Notice::error(format!("Reset could not clear saved data: {}", e)));
                false
            }
        }
    }

    /// Start a text command without waiting for the suggestion service.
    ///
    /// The session stays fully usable while the returned command is
    /// resolved; hand the result to [`finish_command`](Self::finish_command).
    /// Returns `None` for blank input.
    pub fn begin_command(&mut self, input: &str) -> Option<PendingCommand> {
        self.commands.start(&self.document, input)
    }

    /// Apply a resolved command and report the result as a notice. A result
    /// that outlived a reset or load is discarded.
    pub fn finish_command(&mut self, completed: CompletedCommand, today: NaiveDate) -> CommandOutcome {
        let report = self.commands.finish(&mut self.document, completed, today);
        self.report_command(report)
    }

    /// Run a text command start to finish.
    pub async fn run_command(&mut self, input: &str, today: NaiveDate) -> CommandOutcome {
        let Some(pending) = self.begin_command(input) else {
            return CommandOutcome::Empty;
        };
        let completed = pending.resolve().await;
        self.finish_command(completed, today)
    }

    fn report_command(&mut self, report: CommandReport) -> CommandOutcome {
        if let Some(reason) = &report.fallback {
            if !matches!(reason, SuggestionError::NotConfigured) {
                self.notify(Notice::info(format!("Suggestions unavailable, used built-in commands ({})", reason)));
            }
        }

        let notice = match &report.outcome {
            CommandOutcome::Suggested(_) => Some(Notice::info("Text added")),
            CommandOutcome::AutoFilled(ids) => Some(Notice::info(format!("Added {} fields", ids.len()))),
            CommandOutcome::StyleMatched(_) => Some(Notice::info("Style applied")),
            CommandOutcome::NothingFocused => Some(Notice::warning("Select a text field first")),
            CommandOutcome::Unrecognized => Some(Notice::info(
                "Supported commands: \"자동 채우기\" (auto fill), \"스타일 맞춰\" (match style)",
            )),
            CommandOutcome::Empty | CommandOutcome::Discarded => None,
        };
        if let Some(notice) = notice {
            self.notify(notice);
        }
        report.outcome
    }

    /// Render the page to PDF through the configured renderer.
    pub async fn export_pdf(&mut self, options: PageOptions) -> Result<Vec<u8>, RenderError> {
        if !self.document.has_background() {
            return Err(RenderError::NoDocument);
        }
        let Some(renderer) = &self.renderer else {
            return Err(RenderError::Unavailable("no renderer configured".to_string()));
        };

        let request = RenderRequest::new(&self.document, options);
        let result = renderer.render(&request).await;
        if let Err(e) = &result {
            log::error!("PDF export failed: {}", e);
            self.notify(Notice::error(format!("PDF export failed: {}", e)));
        }
        result
    }
}
