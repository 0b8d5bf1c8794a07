//! Short natural-language commands that edit the document.
//!
//! A command is first offered to an optional [`SuggestionService`]. When no
//! service is configured, or the service fails, the command falls back to a
//! fixed, ordered list of local [`CommandRule`]s.

use crate::amount::korean_amount;
use crate::annotation::{AnnotationId, FontFamily, FontWeight, StylePatch, TextAnnotation};
use crate::document::EditorDocument;
use crate::stamp::{SEAL_PLACEHOLDER, STAMP_COLOR};
use crate::storage::{BoxFuture, MaybeSendSync};
use chrono::NaiveDate;
use kurbo::Point;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Instruction sent alongside every command to the suggestion service.
pub const SUGGESTION_INSTRUCTION: &str = "You edit text fields placed on a scanned document. \
Reply with exactly one JSON object and nothing else: \
{\"action\":\"add_text\",\"content\":\"<text to insert>\"}";

pub const STATUS_ANALYZING: &str = "analyzing…";
pub const STATUS_APPLYING: &str = "applying…";

/// Where text from a suggestion is inserted.
pub const SUGGESTION_POSITION: Point = Point::new(40.0, 40.0);

/// Amount written by the auto-fill layout.
const AUTO_FILL_AMOUNT: u64 = 10_000;

/// Suggestion service failures. All of them route to the local rules.
#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("No suggestion service configured")]
    NotConfigured,
    #[error("Suggestion service unreachable: {0}")]
    Transport(String),
    #[error("Unusable suggestion: {0}")]
    InvalidResponse(String),
}

/// Parsed reply of the suggestion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Text to insert as a new annotation.
    pub content: String,
}

#[derive(Deserialize)]
struct RawDirective {
    action: Option<String>,
    content: Option<String>,
}

impl Directive {
    /// Parse a raw service reply. Surrounding prose and code fences are
    /// tolerated; the JSON object between the first `{` and the last `}` is
    /// what counts.
    pub fn parse(reply: &str) -> Result<Self, SuggestionError> {
        let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}')) else {
            return Err(SuggestionError::InvalidResponse("no JSON object in reply".to_string()));
        };
        if end < start {
            return Err(SuggestionError::InvalidResponse("no JSON object in reply".to_string()));
        }

        let raw: RawDirective = serde_json::from_str(&reply[start..=end])
            .map_err(|e| SuggestionError::InvalidResponse(e.to_string()))?;

        match (raw.action.as_deref(), raw.content) {
            (Some("add_text"), Some(content)) => Ok(Self { content }),
            (Some("add_text"), None) => {
                Err(SuggestionError::InvalidResponse("missing content".to_string()))
            }
            (action, _) => Err(SuggestionError::InvalidResponse(format!(
                "unsupported action {:?}",
                action
            ))),
        }
    }
}

/// External text-suggestion collaborator.
pub trait SuggestionService: MaybeSendSync {
    /// Ask for a directive for `command`, sending [`SUGGESTION_INSTRUCTION`] along.
    fn suggest<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<Directive, SuggestionError>>;
}

/// Locally recognized intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Insert the placeholder layout: name, date, item, amount, stamp.
    AutoFill,
    /// Restyle the focused annotation with [`matched_style`].
    MatchStyle,
}

/// A local rule: the intent fires when the trimmed, lowercased input
/// contains any of the keywords.
#[derive(Debug, Clone, Copy)]
pub struct CommandRule {
    pub intent: Intent,
    pub keywords: &'static [&'static str],
}

impl CommandRule {
    pub fn matches(&self, input: &str) -> bool {
        let input = input.trim().to_lowercase();
        self.keywords.iter().any(|k| input.contains(k))
    }
}

/// Evaluated top to bottom; the first match wins.
pub const RULES: &[CommandRule] = &[
    CommandRule {
        intent: Intent::AutoFill,
        keywords: &["자동 채우기", "자동채우기", "채워", "auto fill", "autofill", "fill"],
    },
    CommandRule {
        intent: Intent::MatchStyle,
        keywords: &["스타일 맞춰", "스타일 맞추기", "주변 스타일", "match style", "match surrounding"],
    },
];

/// Resolve a command against [`RULES`].
pub fn resolve_intent(input: &str) -> Option<Intent> {
    RULES.iter().find(|rule| rule.matches(input)).map(|rule| rule.intent)
}

/// Style applied by the match-style intent.
pub fn matched_style() -> StylePatch {
    StylePatch {
        font_family: Some(FontFamily::Serif),
        opacity: Some(0.92),
        color: Some("#1a1a1a".to_string()),
        letter_spacing: Some(0.2),
        line_height: Some(1.45),
        ..Default::default()
    }
}

/// What a command did.
#[derive(Debug)]
pub enum CommandOutcome {
    /// Suggestion text inserted and focused.
    Suggested(AnnotationId),
    /// Placeholder layout inserted.
    AutoFilled(Vec<AnnotationId>),
    StyleMatched(AnnotationId),
    /// Match-style requested with nothing focused.
    NothingFocused,
    /// Neither the service nor any rule understood the input.
    Unrecognized,
    /// Blank input.
    Empty,
    /// The document was reset or reloaded while the command was in flight.
    Discarded,
}

/// Result of running a command, including why the service was bypassed.
#[derive(Debug)]
pub struct CommandReport {
    pub outcome: CommandOutcome,
    /// Set when the local rules handled the command.
    pub fallback: Option<SuggestionError>,
}

/// Captured when a command starts; applying checks it is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTicket {
    epoch: u64,
}

/// A command whose suggestion call is in flight.
///
/// Owns its input and the call itself, so nothing in the session stays
/// borrowed while it is awaited.
pub struct PendingCommand {
    ticket: CommandTicket,
    input: String,
    suggestion: BoxFuture<'static, Result<Directive, SuggestionError>>,
}

impl PendingCommand {
    pub fn ticket(&self) -> CommandTicket {
        self.ticket
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Wait for the suggestion service.
    pub async fn resolve(self) -> CompletedCommand {
        let suggestion = self.suggestion.await;
        CompletedCommand {
            ticket: self.ticket,
            input: self.input,
            suggestion,
        }
    }
}

/// A command whose suggestion has arrived but is not applied yet.
pub struct CompletedCommand {
    ticket: CommandTicket,
    input: String,
    suggestion: Result<Directive, SuggestionError>,
}

/// Maps commands to document mutations.
pub struct CommandInterpreter {
    service: Option<Arc<dyn SuggestionService>>,
    status: Option<&'static str>,
}

impl Default for CommandInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandInterpreter {
    /// Interpreter using only local rules.
    pub fn new() -> Self {
        Self { service: None, status: None }
    }

    pub fn with_service(service: Arc<dyn SuggestionService>) -> Self {
        Self {
            service: Some(service),
            status: None,
        }
    }

    pub fn set_service(&mut self, service: Option<Arc<dyn SuggestionService>>) {
        self.service = service;
    }

    pub fn has_service(&self) -> bool {
        self.service.is_some()
    }

    /// Transient progress text for the UI, `None` when idle.
    pub fn status(&self) -> Option<&'static str> {
        self.status
    }

    /// Start a command: remember the document epoch and show progress.
    pub fn begin(&mut self, document: &EditorDocument) -> CommandTicket {
        self.status = Some(STATUS_ANALYZING);
        CommandTicket {
            epoch: document.epoch(),
        }
    }

    /// Ask the service, if any. The returned call holds its own handle on
    /// the service and borrows neither the interpreter nor the document.
    pub fn suggest(&self, input: &str) -> BoxFuture<'static, Result<Directive, SuggestionError>> {
        let Some(service) = self.service.clone() else {
            return Box::pin(async { Err(SuggestionError::NotConfigured) });
        };
        let input = input.to_string();
        Box::pin(async move { service.suggest(&input).await })
    }

    /// Begin a command and start its suggestion call. `None` for blank input.
    pub fn start(&mut self, document: &EditorDocument, input: &str) -> Option<PendingCommand> {
        if input.trim().is_empty() {
            return None;
        }
        let ticket = self.begin(document);
        Some(PendingCommand {
            ticket,
            input: input.to_string(),
            suggestion: self.suggest(input),
        })
    }

    /// Apply a command started with [`start`](Self::start).
    pub fn finish(
        &mut self,
        document: &mut EditorDocument,
        completed: CompletedCommand,
        today: NaiveDate,
    ) -> CommandReport {
        let CompletedCommand { ticket, input, suggestion } = completed;
        self.apply(document, ticket, &input, suggestion, today)
    }

    /// Apply a suggestion (or fall back to local rules) to the document.
    pub fn apply(
        &mut self,
        document: &mut EditorDocument,
        ticket: CommandTicket,
        input: &str,
        suggestion: Result<Directive, SuggestionError>,
        today: NaiveDate,
    ) -> CommandReport {
        if ticket.epoch != document.epoch() {
            log::info!("Discarding command result, document was replaced meanwhile");
            self.status = None;
            return CommandReport {
                outcome: CommandOutcome::Discarded,
                fallback: None,
            };
        }

        let report = match suggestion {
            Ok(directive) => {
                let annotation = TextAnnotation::new(SUGGESTION_POSITION).with_text(directive.content);
                let id = document.insert(annotation, true);
                CommandReport {
                    outcome: CommandOutcome::Suggested(id),
                    fallback: None,
                }
            }
            Err(reason) => {
                match &reason {
                    SuggestionError::NotConfigured => log::debug!("Using local command rules"),
                    other => log::warn!("Suggestion failed, using local rules: {}", other),
                }
                self.status = Some(STATUS_APPLYING);
                CommandReport {
                    outcome: self.apply_local(document, input, today),
                    fallback: Some(reason),
                }
            }
        };

        self.status = None;
        report
    }

    /// Run a command start to finish.
    pub async fn run(&mut self, document: &mut EditorDocument, input: &str, today: NaiveDate) -> CommandReport {
        let Some(pending) = self.start(document, input) else {
            return CommandReport {
                outcome: CommandOutcome::Empty,
                fallback: None,
            };
        };
        let completed = pending.resolve().await;
        self.finish(document, completed, today)
    }

    fn apply_local(&self, document: &mut EditorDocument, input: &str, today: NaiveDate) -> CommandOutcome {
        match resolve_intent(input) {
            Some(Intent::AutoFill) => CommandOutcome::AutoFilled(auto_fill(document, today)),
            Some(Intent::MatchStyle) => match document.focused() {
                Some(id) => {
                    document.update_style(id, &matched_style());
                    CommandOutcome::StyleMatched(id)
                }
                None => CommandOutcome::NothingFocused,
            },
            None => CommandOutcome::Unrecognized,
        }
    }
}

/// Insert the placeholder layout, positioned as fractions of the container.
fn auto_fill(document: &mut EditorDocument, today: NaiveDate) -> Vec<AnnotationId> {
    let container = document.container();
    let at = |fx: f64, fy: f64| Point::new(container.width * fx, container.height * fy);

    let stamp_style = StylePatch::default()
        .with_font_weight(FontWeight::Bold)
        .with_color(STAMP_COLOR);

    let layout = [
        TextAnnotation::new(at(0.10, 0.12)).with_text("성명: "),
        TextAnnotation::new(at(0.60, 0.12)).with_text(today.format("%Y-%m-%d").to_string()),
        TextAnnotation::new(at(0.10, 0.30)).with_text("품목: "),
        TextAnnotation::new(at(0.10, 0.45)).with_text(korean_amount(AUTO_FILL_AMOUNT)),
        TextAnnotation::new(at(0.70, 0.75)).with_text(SEAL_PLACEHOLDER).with_style(&stamp_style),
    ];

    let ids = layout
        .into_iter()
        .map(|annotation| document.insert(annotation, false))
        .collect();
    document.clear_focus();
    ids
}
