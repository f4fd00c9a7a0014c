//! Element snapshots sent by the content script.
//!
//! The content script reads computed style and geometry from the live DOM
//! and passes a plain object:
//! `{ displayNone, visibilityHidden, opacity, hasLayoutBox, text, className,
//!    id, hasClickHandler, position, width, height, viewportWidth,
//!    viewportHeight, isBody }`.
//! Missing fields fall back to a visible, static, zero-sized element.

use wasm_bindgen::JsValue;
use pg_core::{ElementSnapshot, Position};

fn get(obj: &JsValue, key: &str) -> Option<JsValue> {
    js_sys::Reflect::get(obj, &JsValue::from_str(key))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

fn get_bool(obj: &JsValue, key: &str, default: bool) -> bool {
    get(obj, key).and_then(|v| v.as_bool()).unwrap_or(default)
}

fn get_f64(obj: &JsValue, key: &str, default: f64) -> f64 {
    get(obj, key).and_then(|v| v.as_f64()).unwrap_or(default)
}

fn get_string(obj: &JsValue, key: &str) -> String {
    get(obj, key).and_then(|v| v.as_string()).unwrap_or_default()
}

pub fn element_from_js(obj: &JsValue) -> ElementSnapshot {
    let defaults = ElementSnapshot::default();
    ElementSnapshot {
        display_none: get_bool(obj, "displayNone", defaults.display_none),
        visibility_hidden: get_bool(obj, "visibilityHidden", defaults.visibility_hidden),
        opacity: get_f64(obj, "opacity", defaults.opacity),
        has_layout_box: get_bool(obj, "hasLayoutBox", defaults.has_layout_box),
        text: get_string(obj, "text"),
        class_name: get_string(obj, "className"),
        id: get_string(obj, "id"),
        has_click_handler: get_bool(obj, "hasClickHandler", defaults.has_click_handler),
        position: Position::from_css(&get_string(obj, "position")),
        width: get_f64(obj, "width", defaults.width),
        height: get_f64(obj, "height", defaults.height),
        viewport_width: get_f64(obj, "viewportWidth", defaults.viewport_width),
        viewport_height: get_f64(obj, "viewportHeight", defaults.viewport_height),
        is_body: get_bool(obj, "isBody", defaults.is_body),
    }
}
