//! Pagefill Application
//!
//! Command-line shell around an editor session. Each invocation loads the
//! saved document, applies one operation and saves it again.

mod cli;
mod collaborators;

pub use cli::{Cli, Commands};
pub use collaborators::{ProcessRenderer, ProcessSuggestions};

use anyhow::{Context, Result, bail};
use clap::Parser;
use kurbo::Point;
use pagefill_core::storage::{FileStorage, create_default_storage};
use pagefill_core::{
    CommandOutcome, EditorConfig, EditorSession, NoticeLevel, PageOptions, Storage, compose_page,
};
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

type Session = EditorSession<FileStorage>;

/// Parse `args` and run the selected subcommand.
pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    let config = match &cli.config {
        Some(path) => EditorConfig::from_path(path)?,
        None => EditorConfig::default(),
    };
    let storage = match &cli.data_dir {
        Some(dir) => Arc::new(FileStorage::new(dir.clone())?),
        None => create_default_storage()?,
    };
    log::debug!("Using data directory {}", storage.base_path().display());

    let mut session = EditorSession::new(storage, &config);
    let collaborators = &config.collaborators;
    if !collaborators.render_command.is_empty() {
        session.set_renderer(Some(Box::new(ProcessRenderer::new(collaborators.render_command.clone()))));
    }
    if !collaborators.suggest_command.is_empty() {
        session.set_suggestion_service(Some(Arc::new(ProcessSuggestions::new(
            collaborators.suggest_command.clone(),
        ))));
    }

    let result = pollster::block_on(execute(&mut session, cli.command));
    report_notices(&mut session);
    result
}

async fn execute(session: &mut Session, command: Commands) -> Result<()> {
    match command {
        Commands::Status { json } => {
            load_existing(session).await?;
            print_status(session, json)
        }
        Commands::Background { image } => {
            load_existing(session).await?;
            let mime = image_mime(&image)?;
            let bytes = std::fs::read(&image).with_context(|| format!("failed to read {}", image.display()))?;
            session.document_mut().set_background_from_bytes(mime, &bytes);
            save(session).await
        }
        Commands::Add { x, y, text } => {
            load_existing(session).await?;
            let document = session.document_mut();
            let id = document.create(Point::new(x, y));
            document.update_text(id, text);
            println!("{}", id);
            save(session).await
        }
        Commands::Command { text } => {
            load_existing(session).await?;
            let input = text.join(" ");
            let revision = session.document().revision();
            let today = chrono::Local::now().date_naive();
            let outcome = session.run_command(&input, today).await;
            log::debug!("Command outcome: {:?}", outcome);
            if let CommandOutcome::Suggested(id) | CommandOutcome::StyleMatched(id) = outcome {
                println!("{}", id);
            }
            if session.document().revision() != revision {
                save(session).await?;
            }
            Ok(())
        }
        Commands::Export { out, paper, landscape, margin, html, stamp } => {
            load_existing(session).await?;
            if html {
                std::fs::write(&out, compose_page(session.document(), stamp.as_deref()))
                    .with_context(|| format!("failed to write {}", out.display()))?;
                return Ok(());
            }
            let options = PageOptions {
                paper: paper.into(),
                landscape,
                margin: margin.into(),
                stamp,
            };
            let pdf = session.export_pdf(options).await?;
            std::fs::write(&out, pdf).with_context(|| format!("failed to write {}", out.display()))?;
            println!("{}", out.display());
            Ok(())
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("reset deletes every text field and the saved document; pass --yes to confirm");
            }
            load_existing(session).await?;
            if !session.reset().await {
                bail!("reset failed");
            }
            Ok(())
        }
    }
}

/// Load the saved document. A missing slot is a fresh start; a slot that
/// exists but cannot be read is an error, so it is never overwritten.
async fn load_existing(session: &mut Session) -> Result<()> {
    if session.load().await {
        return Ok(());
    }
    let key = session.persistence().key().to_string();
    if session.persistence().storage().exists(&key).await? {
        report_notices(session);
        bail!("saved document {} could not be loaded", key);
    }
    session.take_notices();
    Ok(())
}

async fn save(session: &mut Session) -> Result<()> {
    if session.save().await.is_none() {
        bail!("failed to save document");
    }
    Ok(())
}

fn report_notices(session: &mut Session) {
    for notice in session.take_notices() {
        match notice.level {
            NoticeLevel::Info => log::info!("{}", notice.message),
            NoticeLevel::Warning => eprintln!("warning: {}", notice.message),
            NoticeLevel::Error => eprintln!("error: {}", notice.message),
        }
    }
}

fn print_status(session: &Session, json: bool) -> Result<()> {
    let document = session.document();
    if json {
        let value = serde_json::json!({
            "background": document.has_background(),
            "savedAt": session.persistence().last_saved_at(),
            "fieldCount": document.len(),
            "texts": document.annotations(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("background: {}", if document.has_background() { "set" } else { "none" });
    println!("saved at:   {}", session.persistence().last_saved_at().unwrap_or("never"));
    println!("fields:     {}", document.len());
    for annotation in document.annotations() {
        println!(
            "  {} ({}, {}) {}x{} {:?}",
            annotation.id(),
            annotation.x,
            annotation.y,
            annotation.width,
            annotation.height,
            annotation.text
        );
    }
    Ok(())
}

fn image_mime(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    Ok(match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => bail!("unsupported image type: {}", path.display()),
    })
}
