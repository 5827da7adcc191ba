use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::sleep;

use super::*;
use crate::annotate::Annotator;
use crate::config::TurnmarkConfig;
use crate::dom::{Selector, Tree};

const DELAY: Duration = Duration::from_millis(200);
const ROLE_ATTR: &str = "data-message-author-role";

/// Shared `<html><body><main>` document; returns `(doc, body, main)`.
fn live_document(roles: &[&str]) -> (Arc<Mutex<Tree>>, NodeId, NodeId) {
    let mut tree = Tree::new();
    let html = tree.create_element("html");
    let body = tree.create_element("body");
    let main = tree.create_element("main");
    tree.append_child(tree.root(), html);
    tree.append_child(html, body);
    tree.append_child(body, main);
    for role in roles {
        append_turn(&mut tree, main, role);
    }
    (Arc::new(Mutex::new(tree)), body, main)
}

fn append_turn(tree: &mut Tree, parent: NodeId, role: &str) -> NodeId {
    let article = tree.create_element("article");
    let message = tree.create_element("div");
    if role != "none" {
        tree.set_attr(message, ROLE_ATTR, Some(role));
    }
    tree.append_child(article, message);
    tree.append_child(parent, article);
    article
}

/// Reaction that annotates `scope` and counts its invocations.
fn annotate_reaction(scope: NodeId) -> (Arc<AtomicUsize>, impl FnMut(&mut Tree) + Send + 'static) {
    let runs = Arc::new(AtomicUsize::new(0));
    let annotator = Annotator::from_config(&TurnmarkConfig::default()).unwrap();
    let counter = Arc::clone(&runs);
    let reaction = move |tree: &mut Tree| {
        counter.fetch_add(1, Ordering::SeqCst);
        annotator.run(tree, scope);
    };
    (runs, reaction)
}

fn labels(tree: &Tree, scope: NodeId) -> Vec<String> {
    tree.query_all(scope, &Selector::class("turn-counter-label"))
        .into_iter()
        .map(|label| tree.text_content(label))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_start_runs_reaction_immediately() {
    let (doc, body, _) = live_document(&["user", "assistant"]);
    let (runs, reaction) = annotate_reaction(body);

    let mut watcher = ChangeWatcher::new(Arc::clone(&doc), DELAY);
    watcher.start(body, reaction).unwrap();

    assert!(watcher.is_running());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(labels(&doc.lock(), body), ["Turn 1 of conversation"]);

    // The startup pass does not wake the watcher
    sleep(Duration::from_secs(1)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_burst_coalesces_into_one_pass() {
    let (doc, body, main) = live_document(&[]);
    let (runs, reaction) = annotate_reaction(body);
    let mut watcher = ChangeWatcher::new(Arc::clone(&doc), DELAY);
    watcher.start(body, reaction).unwrap();

    // Five appends, 10ms apart; the last lands at t=40ms
    for role in ["user", "assistant", "user", "assistant", "user"] {
        append_turn(&mut doc.lock(), main, role);
        sleep(Duration::from_millis(10)).await;
    }

    // t=200ms: still inside the window that started at t=40ms
    sleep(Duration::from_millis(150)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(
        labels(&doc.lock(), body),
        [
            "Turn 1 of conversation",
            "Turn 2 of conversation",
            "Turn 3 of conversation"
        ]
    );

    // The reaction's own edits do not re-trigger it
    sleep(Duration::from_secs(2)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_appended_turns_are_numbered_on() {
    let (doc, body, main) = live_document(&["user", "assistant", "user"]);
    let (runs, reaction) = annotate_reaction(body);
    let mut watcher = ChangeWatcher::new(Arc::clone(&doc), DELAY);
    watcher.start(body, reaction).unwrap();

    {
        let mut tree = doc.lock();
        append_turn(&mut tree, main, "assistant");
        append_turn(&mut tree, main, "user");
    }
    sleep(DELAY * 2).await;

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(
        labels(&doc.lock(), body),
        [
            "Turn 1 of conversation",
            "Turn 2 of conversation",
            "Turn 3 of conversation"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_late_marker_is_picked_up() {
    let (doc, body, main) = live_document(&[]);
    let (runs, reaction) = annotate_reaction(body);
    let mut watcher = ChangeWatcher::new(Arc::clone(&doc), DELAY);
    watcher.start(body, reaction).unwrap();

    // Container streams in first, its marker 50ms later
    let article = append_turn(&mut doc.lock(), main, "none");
    sleep(Duration::from_millis(50)).await;
    {
        let mut tree = doc.lock();
        let marker = tree.create_element("span");
        tree.set_attr(marker, ROLE_ATTR, Some("user"));
        tree.append_child(article, marker);
    }

    sleep(DELAY * 2).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    let tree = doc.lock();
    assert!(tree.has_class(article, "my-user-msg"));
    assert!(tree.turn_state(article).processed);
    assert_eq!(labels(&tree, body), ["Turn 1 of conversation"]);
}

#[tokio::test(start_paused = true)]
async fn test_role_set_on_existing_message() {
    let (doc, body, main) = live_document(&["user"]);
    let (runs, reaction) = annotate_reaction(body);
    let mut watcher = ChangeWatcher::new(Arc::clone(&doc), DELAY);
    watcher.start(body, reaction).unwrap();

    let article = append_turn(&mut doc.lock(), main, "none");
    sleep(Duration::from_millis(50)).await;
    {
        let mut tree = doc.lock();
        let message = tree.children(article)[0];
        tree.set_attr(message, ROLE_ATTR, Some("user"));
    }

    // The insertion alone arms the timer; the attribute lands before it fires
    sleep(DELAY).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    let tree = doc.lock();
    assert!(tree.has_class(article, "my-user-msg"));
    assert!(tree.turn_state(article).processed);
    assert_eq!(
        labels(&tree, body),
        ["Turn 1 of conversation", "Turn 2 of conversation"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_attribute_changes_ignored_by_default() {
    let (doc, body, main) = live_document(&["none"]);
    let (runs, reaction) = annotate_reaction(body);
    let mut watcher = ChangeWatcher::new(Arc::clone(&doc), DELAY);
    watcher.start(body, reaction).unwrap();

    {
        let mut tree = doc.lock();
        let message = tree.query_first(main, &Selector::tag("div")).unwrap();
        tree.set_attr(message, ROLE_ATTR, Some("user"));
    }
    sleep(DELAY * 2).await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(labels(&doc.lock(), body).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_attribute_changes_when_enabled() {
    let (doc, body, main) = live_document(&["none"]);
    let (runs, reaction) = annotate_reaction(body);
    let mut watcher = ChangeWatcher::new(Arc::clone(&doc), DELAY)
        .with_options(ObserveOptions::structural().with_attributes(true));
    watcher.start(body, reaction).unwrap();

    {
        let mut tree = doc.lock();
        let message = tree.query_first(main, &Selector::tag("div")).unwrap();
        tree.set_attr(message, ROLE_ATTR, Some("user"));
    }
    sleep(DELAY * 2).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(labels(&doc.lock(), body), ["Turn 1 of conversation"]);

    // Class and flag edits made by the pass itself stay quiet
    sleep(Duration::from_secs(2)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_changes_outside_root_ignored() {
    let (doc, _, main) = live_document(&[]);
    let (runs, reaction) = annotate_reaction(main);
    let mut watcher = ChangeWatcher::new(Arc::clone(&doc), DELAY);
    watcher.start(main, reaction).unwrap();

    {
        let mut tree = doc.lock();
        let body = tree.body().unwrap();
        let footer = tree.create_element("footer");
        tree.append_child(body, footer);
    }
    sleep(DELAY * 2).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_disconnects() {
    let (doc, body, main) = live_document(&[]);
    let (runs, reaction) = annotate_reaction(body);
    let mut watcher = ChangeWatcher::new(Arc::clone(&doc), DELAY);
    watcher.start(body, reaction).unwrap();

    assert!(watcher.stop());
    assert!(!watcher.is_running());
    assert!(!watcher.stop());

    append_turn(&mut doc.lock(), main, "user");
    sleep(DELAY * 2).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(labels(&doc.lock(), body).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_pass() {
    let (doc, body, main) = live_document(&[]);
    let (runs, reaction) = annotate_reaction(body);
    let mut watcher = ChangeWatcher::new(Arc::clone(&doc), DELAY);
    watcher.start(body, reaction).unwrap();

    append_turn(&mut doc.lock(), main, "user");
    sleep(Duration::from_millis(50)).await;
    watcher.stop();

    sleep(DELAY * 2).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop() {
    let (doc, body, main) = live_document(&["user"]);
    let (runs, reaction) = annotate_reaction(body);
    let mut watcher = ChangeWatcher::new(Arc::clone(&doc), DELAY);
    watcher.start(body, reaction).unwrap();
    watcher.stop();

    let (second_runs, reaction) = annotate_reaction(body);
    watcher.start(body, reaction).unwrap();
    append_turn(&mut doc.lock(), main, "user");
    sleep(DELAY * 2).await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(second_runs.load(Ordering::SeqCst), 2);
    assert_eq!(labels(&doc.lock(), body).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_rejected() {
    let (doc, body, _) = live_document(&[]);
    let mut watcher = ChangeWatcher::new(doc, DELAY);
    let (_, first) = annotate_reaction(body);
    let (second_runs, second) = annotate_reaction(body);

    watcher.start(body, first).unwrap();
    let err = watcher.start(body, second).unwrap_err();
    assert!(matches!(err, WatchError::AlreadyRunning));
    assert_eq!(second_runs.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_detached_root_rejected() {
    let (doc, body, _) = live_document(&[]);
    let orphan = doc.lock().create_element("section");
    let (runs, reaction) = annotate_reaction(body);

    let mut watcher = ChangeWatcher::new(doc, DELAY);
    let err = watcher.start(orphan, reaction).unwrap_err();
    assert!(matches!(err, WatchError::RootMissing));
    assert!(!watcher.is_running());
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_start_outside_runtime() {
    let (doc, body, _) = live_document(&[]);
    let (runs, reaction) = annotate_reaction(body);

    let mut watcher = ChangeWatcher::new(doc, DELAY);
    let err = watcher.start(body, reaction).unwrap_err();
    assert!(matches!(err, WatchError::NoRuntime));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}
