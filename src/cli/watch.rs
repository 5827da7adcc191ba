//! Watch command implementation.
//!
//! Hosts the input file as a live document and keeps it annotated:
//!
//! ```text
//! notify (input file) → reload body into live Tree (structural mutation)
//!                     → ChangeWatcher settles → annotate → render → write if changed
//! ```
//!
//! With `-o` equal to the input, the command's own write comes back as a
//! file event; it is recognized as the last published output and skipped.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use super::annotate::{annotate_tree, count_users};
use super::common::{
    build_annotator, describe, live_root, load_document, parse_document, write_output,
};
use crate::annotate::Annotator;
use crate::cli::AnnotateArgs;
use crate::config::TurnmarkConfig;
use crate::dom::{NodeId, ObserveOptions, Tree, render_html};
use crate::logger::{status_error, status_success, status_unchanged, status_warning};
use crate::utils::path::{normalize_path, same_file};
use crate::watcher::ChangeWatcher;
use crate::{debug, log};

/// Execute watch command
pub fn run_watch(args: &AnnotateArgs, config: &TurnmarkConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(watch_loop(args, config))
}

async fn watch_loop(args: &AnnotateArgs, config: &TurnmarkConfig) -> Result<()> {
    let mut session = Session::start(args, config)?;

    let (fs_tx, mut fs_rx) = mpsc::unbounded_channel();
    // Must stay alive for the whole loop
    let _fs_watcher = watch_input(&session.input, fs_tx)?;
    let mut shutdown = shutdown_signal()?;

    log!(
        "watch";
        "watching {} (settle {}ms), press Ctrl+C to stop",
        session.input.display(),
        config.watch.debounce_ms
    );

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            event = fs_rx.recv() => {
                if event.is_none() {
                    break;
                }
                // Editors emit several events per save
                while fs_rx.try_recv().is_ok() {}
                if let Err(e) = session.reload() {
                    status_error("reload failed", &format!("{e:#}"));
                }
            }
        }
    }

    session.stop();
    log!("watch"; "stopped");
    Ok(())
}

/// Resolve once on the first Ctrl+C.
fn shutdown_signal() -> Result<oneshot::Receiver<()>> {
    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));
    ctrlc::set_handler(move || {
        if let Some(tx) = tx.lock().take() {
            let _ = tx.send(());
        }
    })
    .map_err(|e| anyhow!("failed to set Ctrl+C handler: {}", e))?;
    Ok(rx)
}

/// Watch the input's directory and ping on changes to the input itself.
///
/// The directory is watched rather than the file so that editors replacing
/// the file by rename keep being picked up.
fn watch_input(input: &Path, tx: mpsc::UnboundedSender<()>) -> Result<RecommendedWatcher> {
    let dir = input
        .parent()
        .with_context(|| format!("{} has no parent directory", input.display()))?;
    let target = input.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if is_input_change(&event, &target) => {
            let _ = tx.send(());
        }
        Ok(_) => {}
        Err(e) => log!("watch"; "notify error: {}", e),
    })?;
    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", dir.display()))?;
    Ok(watcher)
}

/// Content-bearing event on `input`. Metadata-only and access events are ignored.
fn is_input_change(event: &Event, input: &Path) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any)
    );
    relevant && event.paths.iter().any(|path| path == input)
}

/// Where rendered documents go; remembers the last one published.
struct Sink {
    path: Option<PathBuf>,
    last: Arc<Mutex<Option<String>>>,
}

impl Sink {
    fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Publish `html` unless it is what was published last.
    fn publish(&self, html: &str) -> Result<bool> {
        let mut last = self.last.lock();
        if last.as_deref() == Some(html) {
            return Ok(false);
        }
        let written = write_output(self.path.as_deref(), html)?;
        *last = Some(html.to_string());
        Ok(written)
    }

    fn name(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| "stdout".to_string(), |path| path.display().to_string())
    }
}

/// Runs after every settled burst: annotate, render, publish.
fn react(annotator: &Annotator, sink: &Sink, tree: &mut Tree) {
    let report = annotate_tree(annotator, tree);
    let summary = describe(&report, count_users(annotator, tree));

    match sink.publish(&render_html(tree)) {
        Ok(true) => status_success(&format!("{summary}, wrote {}", sink.name())),
        Ok(false) => status_unchanged(&summary),
        Err(e) => status_error("failed to write output", &format!("{e:#}")),
    }
    if report.unlabeled > 0 {
        status_warning(&format!(
            "{} user turn(s) without a label were skipped",
            report.unlabeled
        ));
    }
}

/// Live document bound to an input file.
struct Session {
    input: PathBuf,
    config: TurnmarkConfig,
    doc: Arc<Mutex<Tree>>,
    root: NodeId,
    /// Last published output, shared with the reaction.
    published: Arc<Mutex<Option<String>>>,
    watcher: ChangeWatcher<Tree>,
}

impl Session {
    /// Load the input and start watching it; the first pass runs immediately.
    fn start(args: &AnnotateArgs, config: &TurnmarkConfig) -> Result<Self> {
        let input = normalize_path(&args.input);
        let annotator = build_annotator(config)?;
        let tree = load_document(&input, config)?;
        let root = live_root(&tree);
        let doc = Arc::new(Mutex::new(tree));

        let sink = Sink::new(args.output.as_deref().map(normalize_path));
        if let Some(output) = &sink.path
            && same_file(output, &input)
        {
            debug!("watch"; "writing in place, own writes are skipped on reload");
        }
        let published = Arc::clone(&sink.last);

        let options = ObserveOptions::structural().with_attributes(config.watch.attributes);
        let mut watcher =
            ChangeWatcher::new(Arc::clone(&doc), config.watch.debounce()).with_options(options);
        watcher.start(root, move |tree: &mut Tree| react(&annotator, &sink, tree))?;

        Ok(Self {
            input,
            config: config.clone(),
            doc,
            root,
            published,
            watcher,
        })
    }

    /// Replace the live region with the input's current content.
    ///
    /// Returns `false` when the file holds the last published output.
    fn reload(&self) -> Result<bool> {
        let html = fs::read_to_string(&self.input)
            .with_context(|| format!("failed to read {}", self.input.display()))?;
        if self.published.lock().as_deref() == Some(html.as_str()) {
            debug!("watch"; "input matches last output, skipping reload");
            return Ok(false);
        }

        let fresh = parse_document(&html, &self.config)?;
        let fresh_root = live_root(&fresh);

        let mut doc = self.doc.lock();
        let children: Vec<NodeId> = fresh
            .children(fresh_root)
            .iter()
            .filter_map(|&child| doc.import(&fresh, child))
            .collect();
        doc.set_prolog(fresh.prolog().map(str::to_string));
        doc.replace_children(self.root, children);

        debug!("watch"; "reloaded {}", self.input.display());
        Ok(true)
    }

    fn stop(&mut self) {
        self.watcher.stop();
    }
}
