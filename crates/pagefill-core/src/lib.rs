//! Pagefill Core Library
//!
//! Platform-agnostic engine for placing styled text fields on a scanned
//! page: the document model, snapping, pointer gestures, persistence, text
//! commands and export.

pub mod amount;
pub mod annotation;
pub mod command;
pub mod config;
pub mod document;
pub mod export;
pub mod interaction;
pub mod schedule;
pub mod session;
pub mod snap;
pub mod stamp;
pub mod storage;

pub use amount::korean_amount;
pub use annotation::{AnnotationId, FontFamily, FontStyle, FontWeight, StylePatch, TextAlign, TextAnnotation};
pub use command::{
    CommandInterpreter, CommandOutcome, CompletedCommand, Directive, PendingCommand, SuggestionError,
    SuggestionService,
};
pub use config::{ConfigError, EditorConfig};
pub use document::EditorDocument;
pub use export::{
    Margin, PageOptions, PaperSize, PdfRenderer, RenderError, RenderRequest, compose_html, compose_page,
};
pub use interaction::{AnnotationPart, InteractionController, PointerOutcome, PointerTarget};
pub use session::{EditorSession, Notice, NoticeLevel};
pub use snap::{SNAP_THRESHOLD, SnapResult};
pub use stamp::stamp_data_url;
pub use storage::{PersistenceManager, PersistenceStatus, Storage, StorageError, StoredSnapshot};
