//! Gate behaviour against an in-memory browser.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use tokio::sync::Semaphore;

use pg_core::{
    Configuration, Engine, GateDecision, GateTarget, PlatformError, PopupGate, TabId, TabInfo,
    TabPlatform, WindowId,
};

#[derive(Default)]
struct FakeBrowser {
    tabs: RefCell<HashMap<TabId, String>>,
    active: RefCell<Option<TabId>>,
    closed_tabs: RefCell<Vec<TabId>>,
    closed_windows: RefCell<Vec<WindowId>>,
    refuse_close: bool,
    /// When set, each URL lookup and close waits for one permit.
    hold: Option<Rc<Semaphore>>,
}

impl FakeBrowser {
    fn with_tab(self, id: TabId, url: &str) -> Self {
        self.tabs.borrow_mut().insert(id, url.to_string());
        self
    }

    fn with_active(self, id: TabId) -> Self {
        *self.active.borrow_mut() = Some(id);
        self
    }

    fn held_by(mut self, release: &Rc<Semaphore>) -> Self {
        self.hold = Some(Rc::clone(release));
        self
    }

    async fn wait_for_release(&self) {
        if let Some(release) = &self.hold {
            release.acquire().await.expect("release semaphore closed").forget();
        }
    }
}

impl TabPlatform for FakeBrowser {
    async fn tab_url(&self, tab_id: TabId) -> Result<String, PlatformError> {
        self.wait_for_release().await;
        self.tabs
            .borrow()
            .get(&tab_id)
            .cloned()
            .ok_or(PlatformError::TabNotFound(tab_id))
    }

    async fn active_tab(&self) -> Result<Option<TabInfo>, PlatformError> {
        let active = *self.active.borrow();
        Ok(active.and_then(|id| {
            self.tabs.borrow().get(&id).map(|url| TabInfo {
                id,
                url: url.clone(),
            })
        }))
    }

    async fn close_tab(&self, tab_id: TabId) -> Result<(), PlatformError> {
        self.wait_for_release().await;
        if self.refuse_close {
            return Err(PlatformError::TabNotFound(tab_id));
        }
        self.closed_tabs.borrow_mut().push(tab_id);
        Ok(())
    }

    async fn close_window(&self, window_id: WindowId) -> Result<(), PlatformError> {
        if self.refuse_close {
            return Err(PlatformError::WindowNotFound(window_id));
        }
        self.closed_windows.borrow_mut().push(window_id);
        Ok(())
    }
}

fn config(aggressiveness: u8) -> Configuration {
    Configuration {
        whitelist: BTreeSet::from(["github.com".to_string()]),
        aggressiveness,
        ..Default::default()
    }
}

fn gate(config: Configuration, browser: FakeBrowser) -> PopupGate<FakeBrowser> {
    PopupGate::new(Rc::new(RefCell::new(Engine::with_config(config))), browser)
}

const NOW: i64 = 100_000;

#[tokio::test]
async fn first_popup_without_interaction_is_blocked() {
    let gate = gate(config(2), FakeBrowser::default().with_tab(1, "https://spam.example/"));
    let outcome = gate.on_tab_created(Some(1), 2, NOW).await;

    // 30 for no gesture + 20 for this attempt itself
    assert_eq!(outcome.score, 50.0);
    assert_eq!(outcome.decision, GateDecision::Blocked);
    assert_eq!(*gate.platform().closed_tabs.borrow(), vec![2]);
    assert_eq!(gate.engine().borrow().stats().total(), 1);
    assert_eq!(gate.engine().borrow().stats().count_for("spam.example"), 1);
}

#[tokio::test]
async fn recent_gesture_lets_single_popup_through() {
    let gate = gate(config(2), FakeBrowser::default().with_tab(1, "https://news.example/"));
    gate.engine().borrow_mut().user_interaction(1, NOW - 200);

    let outcome = gate.on_tab_created(Some(1), 2, NOW).await;
    assert_eq!(outcome.score, 20.0);
    assert_eq!(outcome.decision, GateDecision::Allowed);
    assert!(gate.platform().closed_tabs.borrow().is_empty());
}

#[tokio::test]
async fn burst_from_same_opener_is_blocked() {
    let gate = gate(config(1), FakeBrowser::default().with_tab(1, "https://news.example/"));
    gate.engine().borrow_mut().user_interaction(1, NOW);

    let first = gate.on_tab_created(Some(1), 2, NOW + 100).await;
    let second = gate.on_tab_created(Some(1), 3, NOW + 200).await;
    let third = gate.on_tab_created(Some(1), 4, NOW + 300).await;
    let fourth = gate.on_tab_created(Some(1), 5, NOW + 400).await;
    let fifth = gate.on_tab_created(Some(1), 6, NOW + 500).await;

    assert_eq!(first.score, 10.0);
    assert_eq!(second.score, 20.0);
    assert!(!third.blocked());
    assert!(!fourth.blocked());
    assert_eq!(fifth.score, 50.0);
    assert!(fifth.blocked());
    assert_eq!(gate.engine().borrow().attempts().timestamps(1).len(), 5);
}

#[tokio::test]
async fn whitelisted_opener_never_blocked() {
    let gate = gate(config(3), FakeBrowser::default().with_tab(1, "https://github.com/rust-lang"));
    for tab in 2..10 {
        let outcome = gate.on_tab_created(Some(1), tab, NOW).await;
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.decision, GateDecision::Allowed);
    }
}

#[tokio::test]
async fn tab_without_opener_is_skipped() {
    let gate = gate(config(3), FakeBrowser::default());
    let outcome = gate.on_tab_created(None, 9, NOW).await;
    assert_eq!(outcome.decision, GateDecision::Skipped);
    assert!(gate.engine().borrow().attempts().is_empty());
}

#[tokio::test]
async fn missing_opener_fails_open_but_counts_attempt() {
    let gate = gate(config(3), FakeBrowser::default());
    let outcome = gate.on_tab_created(Some(1), 2, NOW).await;
    assert_eq!(outcome.decision, GateDecision::Allowed);
    assert_eq!(outcome.opener, Some(1));
    assert_eq!(gate.engine().borrow().attempts().timestamps(1), &[NOW]);
}

#[tokio::test]
async fn close_failure_is_terminal() {
    let browser = FakeBrowser {
        refuse_close: true,
        ..Default::default()
    }
    .with_tab(1, "https://spam.example/");
    let gate = gate(config(3), browser);

    let outcome = gate.on_tab_created(Some(1), 2, NOW).await;
    assert_eq!(outcome.decision, GateDecision::BlockFailed);
    assert!(!outcome.blocked());
    assert_eq!(gate.engine().borrow().stats().total(), 0);
}

#[tokio::test]
async fn window_judged_against_active_tab() {
    let browser = FakeBrowser::default()
        .with_tab(1, "https://spam.example/")
        .with_active(1);
    let gate = gate(config(3), browser);

    // 30 * 1.5, no attempt is recorded for windows
    let outcome = gate.on_window_created(7, NOW).await;
    assert_eq!(outcome.target, GateTarget::Window(7));
    assert_eq!(outcome.score, 45.0);
    assert_eq!(outcome.decision, GateDecision::Allowed);
    assert!(gate.engine().borrow().attempts().is_empty());

    gate.engine().borrow_mut().record_attempt(1, NOW);
    let outcome = gate.on_window_created(8, NOW).await;
    assert_eq!(outcome.score, 75.0);
    assert!(outcome.blocked());
    assert_eq!(*gate.platform().closed_windows.borrow(), vec![8]);
}

#[tokio::test]
async fn window_without_active_tab_is_skipped() {
    let gate = gate(config(3), FakeBrowser::default());
    let outcome = gate.on_window_created(7, NOW).await;
    assert_eq!(outcome.decision, GateDecision::Skipped);
}

#[tokio::test]
async fn unloaded_settings_never_block() {
    let engine = Rc::new(RefCell::new(Engine::new()));
    let gate = PopupGate::new(engine, FakeBrowser::default().with_tab(1, "https://spam.example/"));
    for tab in 2..6 {
        let outcome = gate.on_tab_created(Some(1), tab, NOW).await;
        assert_eq!(outcome.score, 0.0);
    }
    assert!(gate.platform().closed_tabs.borrow().is_empty());
}

#[tokio::test]
async fn window_close_failure_is_terminal() {
    let browser = FakeBrowser {
        refuse_close: true,
        ..Default::default()
    }
    .with_tab(1, "https://spam.example/")
    .with_active(1);
    let gate = gate(config(3), browser);

    let outcome = gate.on_window_created(7, NOW).await;
    assert_eq!(outcome.score, 45.0);
    assert_eq!(outcome.decision, GateDecision::Allowed);

    gate.engine().borrow_mut().record_attempt(1, NOW);
    let outcome = gate.on_window_created(8, NOW).await;
    assert_eq!(outcome.score, 75.0);
    assert_eq!(outcome.decision, GateDecision::BlockFailed);
    assert!(gate.platform().closed_windows.borrow().is_empty());
    assert_eq!(gate.engine().borrow().stats().total(), 0);
}

#[tokio::test]
async fn gesture_arriving_during_url_lookup_is_scored() {
    let release = Rc::new(Semaphore::new(0));
    let browser = FakeBrowser::default()
        .with_tab(1, "https://news.example/")
        .held_by(&release);
    let gate = gate(config(2), browser);
    let engine = Rc::clone(gate.engine());

    let (outcome, ()) = tokio::join!(gate.on_tab_created(Some(1), 2, NOW), async {
        // the gate is parked on the URL lookup; the engine must be free
        engine.borrow_mut().user_interaction(1, NOW);
        release.add_permits(1);
    });

    // gesture landed before scoring: no +30, only the attempt itself
    assert_eq!(outcome.score, 20.0);
    assert_eq!(outcome.decision, GateDecision::Allowed);
    assert_eq!(engine.borrow().interactions().get(1).click_count, 1);
    assert_eq!(engine.borrow().attempts().timestamps(1), &[NOW]);
}

#[tokio::test]
async fn events_interleave_while_close_is_pending() {
    let release = Rc::new(Semaphore::new(0));
    let browser = FakeBrowser::default()
        .with_tab(1, "https://spam.example/")
        .with_tab(5, "https://other.example/")
        .held_by(&release);
    let gate = gate(config(3), browser);
    let engine = Rc::clone(gate.engine());

    let (first, second, ()) = tokio::join!(
        gate.on_tab_created(Some(1), 2, NOW),
        gate.on_tab_created(Some(5), 6, NOW),
        async {
            for _ in 0..4 {
                engine.borrow_mut().user_interaction(9, NOW);
                release.add_permits(1);
                tokio::task::yield_now().await;
            }
        }
    );

    // (30 + 20) * 1.5 for both openers, recorded independently
    assert_eq!(first.score, 75.0);
    assert_eq!(second.score, 75.0);
    assert!(first.blocked());
    assert!(second.blocked());
    assert_eq!(engine.borrow().stats().total(), 2);
    assert_eq!(engine.borrow().interactions().get(9).click_count, 4);
    let mut closed = gate.platform().closed_tabs.borrow().clone();
    closed.sort_unstable();
    assert_eq!(closed, vec![2, 6]);
}
