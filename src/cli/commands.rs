use std::fmt::Write as _;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use time::format_description::well_known::Rfc3339;

use crate::app::{ItemSession, Notice, NoticeKind, PageState, PickedFile};
use crate::config::AppConfig;
use crate::item::ItemSummary;
use crate::media::{MediaKind, UploadStatus};
use crate::remote::{self, PlatformClient};

#[derive(Args, Debug, Clone)]
pub struct ItemArgs {
    /// Item id, or a widget URL carrying `#/item?id=<id>` in its fragment
    pub item: String,
}

#[derive(Args, Debug, Clone)]
pub struct ItemsArgs {
    /// Board identifier
    #[arg(long)]
    pub board: String,
    /// Only show items whose name contains this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,
    /// Page size override (defaults to [board].page_limit)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct SaveArgs {
    /// Item id or widget URL
    pub item: String,
    /// Hook number to compose with (1-based, as shown by `item`)
    #[arg(long)]
    pub hook: Option<usize>,
    /// Prompt number to compose with (1-based)
    #[arg(long)]
    pub prompt: Option<usize>,
    /// Override the composed preview with this exact text. If omitted and
    /// stdin is piped, the override is read from stdin instead.
    #[arg(long)]
    pub text: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// Item id or widget URL
    pub item: String,
    /// Image or video files to attach
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ClearMediaArgs {
    /// Item id or widget URL
    pub item: String,
}

pub async fn show_item<C: PlatformClient>(
    config: Arc<AppConfig>,
    client: &C,
    args: ItemArgs,
) -> Result<()> {
    let session = load_session(config, client, &args.item).await?;
    print!("{}", render_item(session.state()));
    Ok(())
}

pub async fn list_items<C: PlatformClient>(
    config: Arc<AppConfig>,
    client: &C,
    args: ItemsArgs,
) -> Result<()> {
    let limit = args.limit.unwrap_or(config.board.page_limit);
    let items = remote::fetch_board_items(client, &args.board, limit)
        .await
        .with_context(|| format!("listing items on board {}", args.board))?;
    print!("{}", render_item_list(&items, args.filter.as_deref()));
    Ok(())
}

pub async fn save_preview<C: PlatformClient>(
    config: Arc<AppConfig>,
    client: &C,
    args: SaveArgs,
) -> Result<()> {
    let mut session = load_session(config, client, &args.item).await?;

    if let Some(hook) = args.hook {
        let index = hook.checked_sub(1).context("hook numbers start at 1")?;
        if !session.state_mut().composer.select_hook(index) {
            bail!("hook #{hook} does not exist on this item");
        }
    }
    if let Some(prompt) = args.prompt {
        let index = prompt.checked_sub(1).context("prompt numbers start at 1")?;
        if !session.state_mut().composer.select_prompt(index) {
            bail!("prompt #{prompt} does not exist");
        }
    }

    let override_text = match args.text {
        Some(text) => Some(text),
        None => read_stdin()?,
    };
    if let Some(text) = override_text {
        session.state_mut().composer.edit_preview(text);
    }

    let saved = session.save_preview(client).await;
    report_notices(session.state_mut().take_notices());
    if !saved {
        bail!("preview not saved");
    }
    if let Some(at) = session.state().composer.saved_at() {
        if let Ok(stamp) = at.format(&Rfc3339) {
            println!("Saved at {stamp}");
        }
    }
    Ok(())
}

pub async fn upload_media<C: PlatformClient>(
    config: Arc<AppConfig>,
    client: &C,
    args: UploadArgs,
) -> Result<()> {
    let mut session = load_session(config, client, &args.item).await?;

    let mut picked = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_owned)
            .unwrap_or_else(|| path.display().to_string());
        picked.push(PickedFile {
            name,
            mime: None,
            source: path.display().to_string(),
            bytes,
        });
    }

    session.upload_files(client, picked).await;
    report_notices(session.state_mut().take_notices());

    let failed = session
        .state()
        .media
        .entries()
        .iter()
        .filter(|entry| matches!(entry.status, UploadStatus::Error { .. }))
        .count();
    if failed > 0 {
        bail!("{failed} upload(s) failed");
    }
    Ok(())
}

pub async fn clear_media<C: PlatformClient>(
    config: Arc<AppConfig>,
    client: &C,
    args: ClearMediaArgs,
) -> Result<()> {
    let mut session = load_session(config, client, &args.item).await?;
    let cleared = session.clear_media(client).await;
    report_notices(session.state_mut().take_notices());
    if !cleared {
        bail!("media column not cleared");
    }
    Ok(())
}

async fn load_session<C: PlatformClient>(
    config: Arc<AppConfig>,
    client: &C,
    item_ref: &str,
) -> Result<ItemSession> {
    let item_id = parse_item_ref(item_ref)?;
    let mut session = ItemSession::new(config.columns.clone());
    session.load(client, &item_id).await;
    if let Some(err) = &session.state().error {
        bail!("loading item {item_id}: {err}");
    }
    Ok(session)
}

/// Accept a bare item id or a widget URL whose fragment carries the id as
/// `#/item?id=<id>` (the widget's only addressable state).
fn parse_item_ref(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("empty item reference");
    }
    if let Some((_, fragment)) = raw.split_once('#') {
        let Some(id) = item_id_from_fragment(fragment) else {
            bail!("no item id in reference {raw}");
        };
        return Ok(id);
    }
    Ok(raw.to_string())
}

fn item_id_from_fragment(fragment: &str) -> Option<String> {
    let (_, query) = fragment.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == "id" && !value.is_empty()).then(|| value.to_string())
    })
}

fn render_item(state: &PageState) -> String {
    let mut out = String::new();
    let Some(item) = &state.item else {
        return out;
    };

    let _ = writeln!(out, "Item #{}: {}", item.id, item.name);
    if let Some(board) = &item.board {
        let _ = writeln!(out, "Board: {} (#{})", board.name, board.id);
    }

    let _ = writeln!(out, "\nPrompts:");
    for (index, prompt) in state.composer.prompts().iter().enumerate() {
        let marker = if index == state.composer.active_prompt() {
            '>'
        } else {
            ' '
        };
        let body = if prompt.trim().is_empty() {
            "(empty)".to_string()
        } else {
            first_line(prompt, 72)
        };
        let _ = writeln!(out, " {marker}[{}] {body}", index + 1);
    }

    let _ = writeln!(out, "\nHooks:");
    if state.composer.hooks().is_empty() {
        let _ = writeln!(out, "  (none found)");
    }
    for (index, hook) in state.composer.hooks().iter().enumerate() {
        let marker = if state.composer.active_hook() == Some(index) {
            '>'
        } else {
            ' '
        };
        let _ = writeln!(out, " {marker}#{} {}", index + 1, first_line(hook, 72));
    }

    let _ = writeln!(out, "\nPreview:");
    let preview = state.composer.effective_preview();
    if preview.is_empty() {
        let _ = writeln!(out, "  (empty)");
    } else {
        for line in preview.lines() {
            if line.is_empty() {
                let _ = writeln!(out);
            } else {
                let _ = writeln!(out, "  {line}");
            }
        }
    }

    let _ = writeln!(out, "\nMedia:");
    if state.media.is_empty() {
        let _ = writeln!(out, "  (no media attached)");
    }
    for entry in state.media.entries() {
        let kind = match entry.kind {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        };
        let status = match &entry.status {
            UploadStatus::Uploading => "uploading".to_string(),
            UploadStatus::Success => "ok".to_string(),
            UploadStatus::Error { message } => format!("failed: {message}"),
        };
        let _ = writeln!(out, "  [{kind}] {} ({status})", entry.name);
    }

    out
}

fn render_item_list(items: &[ItemSummary], filter: Option<&str>) -> String {
    let needle = filter.map(str::to_lowercase);
    let mut out = String::new();
    let mut shown = 0usize;
    for item in items {
        if let Some(needle) = &needle {
            if !item.name.to_lowercase().contains(needle) {
                continue;
            }
        }
        let _ = writeln!(out, "{:>12}  {}", item.id, item.name);
        shown += 1;
    }
    let _ = writeln!(out, "{shown} item(s)");
    out
}

fn first_line(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    let truncated: String = line.chars().take(max_chars).collect();
    format!("{truncated}...")
}

fn report_notices(notices: Vec<Notice>) {
    for notice in notices {
        match notice.kind {
            NoticeKind::Success => println!("{}", notice.message),
            NoticeKind::Error => eprintln!("{}", notice.message),
        }
    }
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("reading override text from stdin")?;
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}
