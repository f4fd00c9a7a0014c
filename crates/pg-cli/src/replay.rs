//! Event trace replay against an in-memory browser.
//!
//! A trace looks like:
//!
//! ```json
//! {
//!   "tabs": { "1": "https://streams.example/watch" },
//!   "active": 1,
//!   "events": [
//!     { "type": "interaction", "tab": 1, "time": 1000 },
//!     { "type": "signal", "tab": 1, "signal": "HIDDEN | FIXED" },
//!     { "type": "tabCreated", "opener": 1, "tab": 2, "time": 4000 },
//!     { "type": "windowCreated", "window": 9, "time": 4500 },
//!     { "type": "activate", "tab": 1 },
//!     { "type": "tabRemoved", "tab": 2 },
//!     { "type": "sweep", "time": 700000 }
//!   ]
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::rc::Rc;

use serde::Deserialize;

use pg_core::{
    Configuration, ElementSignal, Engine, GateOutcome, Millis, PlatformError, PopupGate, TabId,
    TabInfo, TabPlatform, WindowId,
};

/// URL given to tabs created during the replay.
const NEW_TAB_URL: &str = "about:blank";

#[derive(Debug, Deserialize)]
pub struct Trace {
    #[serde(default)]
    pub tabs: HashMap<TabId, String>,
    #[serde(default)]
    pub active: Option<TabId>,
    pub events: Vec<TraceEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TraceEvent {
    Interaction { tab: TabId, time: Millis },
    Signal { tab: TabId, signal: ElementSignal },
    TabCreated {
        #[serde(default)]
        opener: Option<TabId>,
        tab: TabId,
        time: Millis,
    },
    WindowCreated { window: WindowId, time: Millis },
    Activate { tab: TabId },
    TabRemoved { tab: TabId },
    Sweep { time: Millis },
}

#[derive(Debug, Default)]
pub struct SimBrowser {
    tabs: RefCell<HashMap<TabId, String>>,
    active: RefCell<Option<TabId>>,
}

impl SimBrowser {
    fn new(tabs: HashMap<TabId, String>, active: Option<TabId>) -> Self {
        Self {
            tabs: RefCell::new(tabs),
            active: RefCell::new(active),
        }
    }

    fn open(&self, tab_id: TabId) {
        self.tabs
            .borrow_mut()
            .entry(tab_id)
            .or_insert_with(|| NEW_TAB_URL.to_string());
    }

    fn close(&self, tab_id: TabId) -> bool {
        let removed = self.tabs.borrow_mut().remove(&tab_id).is_some();
        let mut active = self.active.borrow_mut();
        if *active == Some(tab_id) {
            *active = None;
        }
        removed
    }

    fn activate(&self, tab_id: TabId) {
        *self.active.borrow_mut() = Some(tab_id);
    }
}

impl TabPlatform for SimBrowser {
    async fn tab_url(&self, tab_id: TabId) -> Result<String, PlatformError> {
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
        if self.close(tab_id) {
            Ok(())
        } else {
            Err(PlatformError::TabNotFound(tab_id))
        }
    }

    async fn close_window(&self, _window_id: WindowId) -> Result<(), PlatformError> {
        Ok(())
    }
}

pub fn load_trace(path: &str) -> Result<Trace, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    serde_json::from_str(&content).map_err(|e| format!("Invalid trace '{}': {}", path, e))
}

/// Replay every event in order and collect the gate outcomes.
pub async fn replay(config: Configuration, trace: Trace) -> (Vec<GateOutcome>, Engine) {
    let engine = Rc::new(RefCell::new(Engine::with_config(config)));
    let gate = PopupGate::new(Rc::clone(&engine), SimBrowser::new(trace.tabs, trace.active));
    let mut outcomes = Vec::new();

    for (index, event) in trace.events.into_iter().enumerate() {
        log::debug!("event {}: {:?}", index, event);
        match event {
            TraceEvent::Interaction { tab, time } => {
                engine.borrow_mut().user_interaction(tab, time);
            }
            TraceEvent::Signal { tab, signal } => {
                engine.borrow_mut().suspicious_element_detected(tab, signal);
            }
            TraceEvent::TabCreated { opener, tab, time } => {
                gate.platform().open(tab);
                outcomes.push(gate.on_tab_created(opener, tab, time).await);
            }
            TraceEvent::WindowCreated { window, time } => {
                outcomes.push(gate.on_window_created(window, time).await);
            }
            TraceEvent::Activate { tab } => gate.platform().activate(tab),
            TraceEvent::TabRemoved { tab } => {
                gate.platform().close(tab);
                engine.borrow_mut().tab_removed(tab);
            }
            TraceEvent::Sweep { time } => {
                engine.borrow_mut().sweep(time);
            }
        }
    }

    drop(gate);
    let engine = match Rc::try_unwrap(engine) {
        Ok(engine) => engine.into_inner(),
        Err(shared) => std::mem::take(&mut *shared.borrow_mut()),
    };
    (outcomes, engine)
}

pub fn run_replay(config: Configuration, trace_path: &str, json: bool) -> Result<(), String> {
    let trace = load_trace(trace_path)?;
    let event_count = trace.events.len();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    let (outcomes, engine) = runtime.block_on(replay(config, trace));
    log::debug!("replay finished: {} outcomes", outcomes.len());

    for outcome in &outcomes {
        if json {
            let line = serde_json::to_string(outcome)
                .map_err(|e| format!("Failed to serialize outcome: {}", e))?;
            println!("{}", line);
        } else {
            let opener = outcome
                .opener
                .map_or_else(|| "-".to_string(), |id| id.to_string());
            println!(
                "{:<12} opener {:<6} score {:>6.1}  {:?}",
                outcome.target.to_string(),
                opener,
                outcome.score,
                outcome.decision
            );
        }
    }

    if !json {
        let stats = engine.stats();
        println!();
        println!("Replayed {} events, {} creation events", event_count, outcomes.len());
        println!("  Blocked:   {}", stats.total());
        for (host, count) in stats.top_hosts(5) {
            println!("    {:<30} {}", host, count);
        }
    }

    Ok(())
}
