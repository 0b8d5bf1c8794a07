//! Render and suggestion services backed by external programs.
//!
//! Both adapters are blocking: their futures run the program to completion
//! on the polling thread before resolving. That suits the one-shot CLI,
//! which drives everything through `pollster`. An interactive front end
//! should use its own async transport instead.

use pagefill_core::command::SUGGESTION_INSTRUCTION;
use pagefill_core::storage::BoxFuture;
use pagefill_core::{Directive, PdfRenderer, RenderError, RenderRequest, SuggestionError, SuggestionService};
use std::io::Write;
use std::process::{Command, Stdio};

/// Run `argv` with `input` on stdin and collect stdout.
///
/// Blocks the calling thread until the program exits.
fn pipe_through(argv: &[String], input: &[u8]) -> Result<Vec<u8>, PipeError> {
    let (program, args) = argv.split_first().ok_or(PipeError::Spawn("empty command".to_string()))?;
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| PipeError::Spawn(format!("{}: {}", program, e)))?;

    // Programs may stream output before reading all of stdin.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_vec();
        std::thread::spawn(move || stdin.write_all(&input))
    });

    let output = child
        .wait_with_output()
        .map_err(|e| PipeError::Spawn(format!("{}: {}", program, e)))?;
    if let Some(Ok(Err(e))) = writer.map(|handle| handle.join()) {
        log::debug!("{} closed stdin early: {}", program, e);
    }
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipeError::Exit(format!("{} exited with {}: {}", program, output.status, stderr.trim())));
    }
    Ok(output.stdout)
}

enum PipeError {
    /// Could not start or talk to the program.
    Spawn(String),
    /// The program ran and reported failure.
    Exit(String),
}

/// Renders PDFs by piping the request JSON through a program.
///
/// Polling the render future blocks until the program exits.
pub struct ProcessRenderer {
    argv: Vec<String>,
}

impl ProcessRenderer {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl PdfRenderer for ProcessRenderer {
    fn render<'a>(&'a self, request: &'a RenderRequest) -> BoxFuture<'a, Result<Vec<u8>, RenderError>> {
        Box::pin(async move {
            let body = request.to_json().map_err(|e| RenderError::Failed(e.to_string()))?;
            match pipe_through(&self.argv, body.as_bytes()) {
                Ok(pdf) if pdf.is_empty() => Err(RenderError::Failed("renderer produced no output".to_string())),
                Ok(pdf) => Ok(pdf),
                Err(PipeError::Spawn(msg)) => Err(RenderError::Unavailable(msg)),
                Err(PipeError::Exit(msg)) => Err(RenderError::Failed(msg)),
            }
        })
    }
}

/// Asks a program for suggestions: instruction and command on stdin, the
/// directive on stdout.
///
/// Polling the suggestion future blocks until the program exits.
pub struct ProcessSuggestions {
    argv: Vec<String>,
}

impl ProcessSuggestions {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl SuggestionService for ProcessSuggestions {
    fn suggest<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<Directive, SuggestionError>> {
        Box::pin(async move {
            let prompt = format!("{}\n\n{}", SUGGESTION_INSTRUCTION, command);
            let reply = pipe_through(&self.argv, prompt.as_bytes()).map_err(|e| match e {
                PipeError::Spawn(msg) | PipeError::Exit(msg) => SuggestionError::Transport(msg),
            })?;
            Directive::parse(&String::from_utf8_lossy(&reply))
        })
    }
}
