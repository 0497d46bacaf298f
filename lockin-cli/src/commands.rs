// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI command implementations

use chrono::{DateTime, Local, Utc};
use console::style;
use lockin_core::{
    Bootstrap, EntryKind, InitOutcome, LockInConfig, LockInResult, NotePath, NoteStore, ShareTarget,
};
use lockin_editor::{DirectoryNavigator, EditorSession, TimerSource, TokioTimers};
use lockin_prefs::SledPreferences;
use lockin_providers::{CommandShareTarget, LocalStore, LoggingShareTarget};
use std::sync::Arc;
use tabled::{Table, Tabled};
use tokio::io::AsyncReadExt;

pub struct Context {
    config: LockInConfig,
}

impl Context {
    pub fn new(config: LockInConfig) -> Self {
        Self { config }
    }

    fn store(&self) -> LockInResult<Arc<LocalStore>> {
        Ok(Arc::new(LocalStore::from_config(&self.config.storage)?))
    }

    fn store_sharing_with(&self, share: Arc<dyn ShareTarget>) -> LockInResult<Arc<LocalStore>> {
        Ok(Arc::new(LocalStore::from_config(&self.config.storage)?.with_share_target(share)))
    }

    fn bootstrap(&self) -> LockInResult<Bootstrap> {
        let prefs = SledPreferences::open(self.config.storage.preferences_dir()?)?;
        Ok(Bootstrap::new(self.store()?, Arc::new(prefs), &self.config.storage))
    }

    fn navigator(&self, store: Arc<LocalStore>) -> DirectoryNavigator {
        DirectoryNavigator::new(store, TokioTimers.scheduler(), self.config.navigator.clone())
    }

    /// Opens a note, failing instead of returning a session in error.
    async fn session(&self, store: Arc<LocalStore>, path: &str) -> LockInResult<EditorSession> {
        let session = EditorSession::new(
            NotePath::new(path),
            store,
            TokioTimers.scheduler(),
            self.config.editor.clone(),
        );
        session.load().await?;
        Ok(session)
    }
}

fn format_time(dt: Option<DateTime<Utc>>) -> String {
    dt.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_size(size: Option<u64>, human: bool) -> String {
    match size {
        Some(s) if human => bytesize::ByteSize(s).to_string(),
        Some(s) => s.to_string(),
        None => "-".to_string(),
    }
}

fn format_kind(kind: EntryKind) -> String {
    match kind {
        EntryKind::Directory => style("d").cyan().to_string(),
        EntryKind::File => "-".to_string(),
    }
}

fn report_status(nav: &DirectoryNavigator) {
    if let Some(status) = nav.status() {
        if status.is_error() {
            eprintln!("{}", style(status.text).red());
        } else {
            println!("{}", style(status.text).green());
        }
    }
}

#[derive(Tabled)]
struct LsEntry {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Name")]
    name: String,
}

pub async fn init(ctx: &Context) -> LockInResult<()> {
    let bootstrap = ctx.bootstrap()?;
    match bootstrap.initialize().await? {
        InitOutcome::Initialized => {
            println!("{} {}", style("Initialized").green(), ctx.config.storage.root_dir()?.display());
        }
        InitOutcome::AlreadyInitialized => println!("Already initialized"),
    }
    Ok(())
}

pub async fn reset(ctx: &Context) -> LockInResult<()> {
    ctx.bootstrap()?.reset().await?;
    println!("Initialization flag cleared; files were left in place");
    Ok(())
}

pub async fn ls(ctx: &Context, path: &str, long: bool, human: bool) -> LockInResult<()> {
    let nav = ctx.navigator(ctx.store()?);
    nav.navigate(path).await?;
    let entries = nav.entries();

    if entries.is_empty() {
        println!("(empty folder)");
        return Ok(());
    }

    if long {
        let rows: Vec<LsEntry> = entries
            .iter()
            .map(|e| LsEntry {
                kind: format_kind(e.kind),
                size: format_size(e.size, human),
                modified: format_time(e.modified_at),
                name: e.name.clone(),
            })
            .collect();
        println!("{}", Table::new(rows));
    } else {
        for entry in entries {
            match entry.kind {
                EntryKind::Directory => println!("{}/", style(&entry.name).cyan()),
                EntryKind::File => println!("{}", entry.name),
            }
        }
    }
    Ok(())
}

pub async fn cat(ctx: &Context, path: &str) -> LockInResult<()> {
    let store = ctx.store()?;
    let text = store.read_file(&NotePath::new(path)).await?;
    print!("{text}");
    Ok(())
}

pub async fn write(ctx: &Context, path: &str, text: Option<String>) -> LockInResult<()> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };
    let store = ctx.store()?;
    store.write_file(&NotePath::new(path), &text).await?;
    println!("Wrote {} ({})", path, bytesize::ByteSize(text.len() as u64));
    Ok(())
}

pub async fn append(ctx: &Context, path: &str, text: &str) -> LockInResult<()> {
    let session = ctx.session(ctx.store()?, path).await?;
    let mut content = session.content();
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(text);
    content.push('\n');

    session.set_content(content)?;
    session.close().await?;
    let stats = session.stats();
    println!("Appended to {} ({} lines)", path, stats.lines);
    Ok(())
}

pub async fn mkdir(ctx: &Context, paths: &[String]) -> LockInResult<()> {
    let store = ctx.store()?;
    for path in paths {
        store.create_directory(&NotePath::new(path)).await?;
        println!("Created {path}");
    }
    Ok(())
}

pub async fn rm(ctx: &Context, paths: &[String]) -> LockInResult<()> {
    let nav = ctx.navigator(ctx.store()?);
    for path in paths {
        nav.delete_entry(path.as_str()).await?;
        report_status(&nav);
    }
    Ok(())
}

pub async fn mv(ctx: &Context, source: &str, dest: &str) -> LockInResult<()> {
    let store = ctx.store()?;
    store.rename_entry(&NotePath::new(source), &NotePath::new(dest)).await?;
    println!("Moved {source} -> {dest}");
    Ok(())
}

pub async fn new_note(ctx: &Context, dir: &str, name: Option<&str>) -> LockInResult<()> {
    let nav = ctx.navigator(ctx.store()?);
    nav.navigate(dir).await?;
    let path = match name {
        Some(name) => {
            let id = nav.begin_create(EntryKind::File);
            nav.commit_pending(id, name).await?
        }
        None => nav.create_untitled_note().await?,
    };
    report_status(&nav);
    println!("{path}");
    Ok(())
}

pub async fn new_folder(ctx: &Context, dir: &str, name: Option<&str>) -> LockInResult<()> {
    let nav = ctx.navigator(ctx.store()?);
    nav.navigate(dir).await?;
    let path = match name {
        Some(name) => {
            let id = nav.begin_create(EntryKind::Directory);
            nav.commit_pending(id, name).await?
        }
        None => nav.create_untitled_folder().await?,
    };
    report_status(&nav);
    println!("{path}");
    Ok(())
}

pub async fn stats(ctx: &Context, path: &str) -> LockInResult<()> {
    let store = ctx.store()?;
    let size = store
        .stat(&NotePath::new(path))
        .await?
        .and_then(|e| e.size);
    let session = ctx.session(store, path).await?;
    let stats = session.stats();
    session.close().await?;

    println!("  Path:       {}", session.path());
    println!("  Characters: {}", stats.chars);
    println!("  Words:      {}", stats.words);
    println!("  Lines:      {}", stats.lines);
    if let Some(size) = size {
        println!("  Size:       {}", bytesize::ByteSize(size));
    }
    if let Some(markup) = session.markup() {
        println!(
            "  Markup:     {} drawing, {} writing strokes",
            markup.drawing_paths.len(),
            markup.writing_paths.len()
        );
    }
    Ok(())
}

pub async fn share(ctx: &Context, path: &str, program: Option<&str>, args: &[String]) -> LockInResult<()> {
    let target: Arc<dyn ShareTarget> = match program {
        Some(program) => Arc::new(args.iter().fold(CommandShareTarget::new(program), |t, a| t.arg(a))),
        None => Arc::new(LoggingShareTarget),
    };
    let session = ctx.session(ctx.store_sharing_with(target)?, path).await?;
    let result = session.share().await;
    session.close().await?;
    result?;
    println!("Shared {path}");
    Ok(())
}
