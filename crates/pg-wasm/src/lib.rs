//! WebAssembly bindings for PopGuard
//!
//! The background page calls `init` once with an object of browser
//! callbacks, pushes settings with `apply_settings`, and forwards tab
//! events. Content scripts only need `evaluate_element` and
//! `evaluate_click_path`.

mod console;
mod element;
mod platform;

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use pg_core::{
    evaluate, evaluate_click_path as core_click_path, Configuration, ElementSignal, Engine,
    GateOutcome, GateTarget, Millis, PopupGate, ScoreContext, SignalFlags,
};
use pg_settings::parse_settings;

use crate::element::element_from_js;
use crate::platform::JsPlatform;

type Gate = PopupGate<JsPlatform>;

thread_local! {
    static GATE: RefCell<Option<Rc<Gate>>> = const { RefCell::new(None) };
}

fn current_gate() -> Option<Rc<Gate>> {
    GATE.with(|gate| gate.borrow().clone())
}

fn require_gate() -> Result<Rc<Gate>, JsValue> {
    current_gate().ok_or_else(|| JsValue::from_str("Not initialized. Call init() first."))
}

#[inline]
fn millis(time: f64) -> Millis {
    time as Millis
}

// =============================================================================
// Lifecycle
// =============================================================================

/// `platform` must provide `getTabUrl(tabId)`, `getActiveTab()`,
/// `removeTab(tabId)` and `removeWindow(windowId)`, each returning a
/// promise or a plain value.
#[wasm_bindgen]
pub fn init(platform: JsValue, now: f64) -> Result<(), JsValue> {
    if current_gate().is_some() {
        return Err(JsValue::from_str("Already initialized. Reload the extension to reinitialize."));
    }

    console::install();

    let platform = JsPlatform::from_js(&platform)?;
    let mut engine = Engine::new();
    engine.start_janitor(millis(now));
    engine.settings_mut().subscribe(|config, version| {
        log::info!(
            "settings v{} applied (blocking {}, aggressiveness {})",
            version,
            if config.blocking_enabled { "on" } else { "off" },
            config.aggressiveness
        );
    });
    let gate = Rc::new(PopupGate::new(Rc::new(RefCell::new(engine)), platform));

    GATE.with(|slot| *slot.borrow_mut() = Some(gate));
    log::info!("PopGuard engine initialized");
    Ok(())
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    current_gate().is_some()
}

/// Publish a new settings document (JSON). Returns the settings version.
#[wasm_bindgen]
pub fn apply_settings(settings_json: &str) -> Result<f64, JsValue> {
    let gate = require_gate()?;
    let config = parse_settings(settings_json)
        .map_err(|e| JsValue::from_str(&format!("Failed to load settings: {}", e)))?;
    let version = gate.engine().borrow_mut().apply_settings(config);
    Ok(version as f64)
}

// =============================================================================
// Inbound Events
// =============================================================================

#[wasm_bindgen]
pub fn user_interaction(tab_id: i32, time: f64) -> Result<(), JsValue> {
    let gate = require_gate()?;
    gate.engine().borrow_mut().user_interaction(tab_id, millis(time));
    Ok(())
}

/// `flags` is the bit set returned by `evaluate_element`. Returns whether
/// the signal was recorded; fewer than two flags are ignored.
#[wasm_bindgen]
pub fn suspicious_element_detected(tab_id: i32, flags: u8) -> Result<bool, JsValue> {
    let gate = require_gate()?;
    let signal = ElementSignal::new(SignalFlags::from_bits_truncate(flags));
    let recorded = gate.engine().borrow_mut().suspicious_element_detected(tab_id, signal);
    Ok(recorded)
}

#[wasm_bindgen]
pub fn tab_removed(tab_id: i32) -> Result<(), JsValue> {
    let gate = require_gate()?;
    gate.engine().borrow_mut().tab_removed(tab_id);
    Ok(())
}

/// Resolves to `{ target, id, opener, score, decision, blocked }`.
#[wasm_bindgen]
pub fn on_tab_created(opener_tab_id: Option<i32>, tab_id: i32, time: f64) -> js_sys::Promise {
    let gate = match require_gate() {
        Ok(gate) => gate,
        Err(e) => return js_sys::Promise::reject(&e),
    };
    wasm_bindgen_futures::future_to_promise(async move {
        let outcome = gate.on_tab_created(opener_tab_id, tab_id, millis(time)).await;
        Ok(outcome_to_js(&outcome))
    })
}

#[wasm_bindgen]
pub fn on_window_created(window_id: i32, time: f64) -> js_sys::Promise {
    let gate = match require_gate() {
        Ok(gate) => gate,
        Err(e) => return js_sys::Promise::reject(&e),
    };
    wasm_bindgen_futures::future_to_promise(async move {
        let outcome = gate.on_window_created(window_id, millis(time)).await;
        Ok(outcome_to_js(&outcome))
    })
}

// =============================================================================
// Queries
// =============================================================================

#[wasm_bindgen]
pub fn score(
    tab_id: i32,
    url: &str,
    is_play_button: bool,
    is_hidden: bool,
    now: f64,
) -> f64 {
    let gate = match current_gate() {
        Some(gate) => gate,
        None => return 0.0,
    };
    let ctx = ScoreContext { is_play_button, is_hidden };
    let score = gate.engine().borrow().score(tab_id, url, &ctx, millis(now));
    score
}

/// Run the janitor if its interval elapsed. Returns the sweep report or
/// `undefined`.
#[wasm_bindgen]
pub fn tick(now: f64) -> JsValue {
    let gate = match current_gate() {
        Some(gate) => gate,
        None => return JsValue::UNDEFINED,
    };
    let report = gate.engine().borrow_mut().tick(millis(now));
    match report {
        Some(report) => {
            let result = js_sys::Object::new();
            let _ = js_sys::Reflect::set(&result, &"timestampsRemoved".into(), &JsValue::from(report.timestamps_removed as u32));
            let _ = js_sys::Reflect::set(&result, &"openersRemaining".into(), &JsValue::from(report.openers_remaining as u32));
            let _ = js_sys::Reflect::set(&result, &"interactionsRemoved".into(), &JsValue::from(report.interactions_removed as u32));
            let _ = js_sys::Reflect::set(&result, &"interactionsRemaining".into(), &JsValue::from(report.interactions_remaining as u32));
            result.into()
        }
        None => JsValue::UNDEFINED,
    }
}

/// Interval the background page should call `tick` at, in ms.
#[wasm_bindgen]
pub fn janitor_interval_ms() -> f64 {
    match current_gate() {
        Some(gate) => {
            let interval = gate.engine().borrow().janitor().interval_ms();
            interval as f64
        }
        None => pg_core::types::JANITOR_INTERVAL_MS as f64,
    }
}

#[wasm_bindgen]
pub fn reset_stats() -> Result<(), JsValue> {
    let gate = require_gate()?;
    gate.engine().borrow_mut().reset_stats();
    Ok(())
}

/// `{ totalBlocked, topHosts: [{ host, count }] }`
#[wasm_bindgen]
pub fn get_stats(top: u32) -> JsValue {
    let result = js_sys::Object::new();
    let top_hosts = js_sys::Array::new();
    let mut total = 0u64;

    if let Some(gate) = current_gate() {
        let engine = gate.engine().borrow();
        let stats = engine.stats();
        total = stats.total();
        for (host, count) in stats.top_hosts(top as usize) {
            let entry = js_sys::Object::new();
            let _ = js_sys::Reflect::set(&entry, &"host".into(), &JsValue::from_str(host));
            let _ = js_sys::Reflect::set(&entry, &"count".into(), &JsValue::from(count as f64));
            top_hosts.push(&entry);
        }
    }

    let _ = js_sys::Reflect::set(&result, &"totalBlocked".into(), &JsValue::from(total as f64));
    let _ = js_sys::Reflect::set(&result, &"topHosts".into(), &top_hosts);
    result.into()
}

// =============================================================================
// Content Script Helpers
// =============================================================================

/// Evaluate one element snapshot. Returns the flag bits when the element
/// should be reported, `undefined` otherwise.
#[wasm_bindgen]
pub fn evaluate_element(element: JsValue, detect_play_buttons: bool) -> Option<u8> {
    let config = Configuration {
        detect_play_buttons,
        ..Default::default()
    };
    let el = element_from_js(&element);
    evaluate(&el, &config).map(|signal| signal.flags().bits())
}

/// Evaluate a click target followed by its ancestors. Returns the flag bits
/// of every reportable element, in path order.
#[wasm_bindgen]
pub fn evaluate_click_path(path: JsValue, detect_play_buttons: bool) -> Vec<u8> {
    let config = Configuration {
        detect_play_buttons,
        ..Default::default()
    };
    let elements: Vec<_> = js_sys::Array::from(&path)
        .iter()
        .map(|value| element_from_js(&value))
        .collect();
    core_click_path(elements.iter(), &config)
        .into_iter()
        .map(|signal| signal.flags().bits())
        .collect()
}

fn outcome_to_js(outcome: &GateOutcome) -> JsValue {
    let result = js_sys::Object::new();
    let (target, id) = match outcome.target {
        GateTarget::Tab(id) => ("tab", id),
        GateTarget::Window(id) => ("window", id),
    };
    let decision = match outcome.decision {
        pg_core::GateDecision::Allowed => "allowed",
        pg_core::GateDecision::Blocked => "blocked",
        pg_core::GateDecision::BlockFailed => "blockFailed",
        pg_core::GateDecision::Skipped => "skipped",
    };
    let opener = outcome.opener.map_or(JsValue::NULL, JsValue::from);

    let _ = js_sys::Reflect::set(&result, &"target".into(), &JsValue::from_str(target));
    let _ = js_sys::Reflect::set(&result, &"id".into(), &JsValue::from(id));
    let _ = js_sys::Reflect::set(&result, &"opener".into(), &opener);
    let _ = js_sys::Reflect::set(&result, &"score".into(), &JsValue::from(outcome.score));
    let _ = js_sys::Reflect::set(&result, &"decision".into(), &JsValue::from_str(decision));
    let _ = js_sys::Reflect::set(&result, &"blocked".into(), &JsValue::from(outcome.blocked()));
    result.into()
}
