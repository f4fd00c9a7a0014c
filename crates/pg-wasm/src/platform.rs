//! Browser tab/window API backed by JS callbacks.

use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use pg_core::{PlatformError, TabId, TabInfo, TabPlatform, WindowId};

pub struct JsPlatform {
    get_tab_url: js_sys::Function,
    get_active_tab: js_sys::Function,
    remove_tab: js_sys::Function,
    remove_window: js_sys::Function,
}

fn callback(obj: &JsValue, name: &str) -> Result<js_sys::Function, JsValue> {
    js_sys::Reflect::get(obj, &JsValue::from_str(name))?
        .dyn_into::<js_sys::Function>()
        .map_err(|_| JsValue::from_str(&format!("platform.{} must be a function", name)))
}

fn js_error(value: JsValue) -> PlatformError {
    let message = value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value));
    PlatformError::Call(message)
}

/// Call `f`, awaiting the result if it is a promise.
async fn call(f: &js_sys::Function, arg: JsValue) -> Result<JsValue, PlatformError> {
    let ret = f.call1(&JsValue::NULL, &arg).map_err(js_error)?;
    JsFuture::from(js_sys::Promise::resolve(&ret))
        .await
        .map_err(js_error)
}

impl JsPlatform {
    pub fn from_js(obj: &JsValue) -> Result<Self, JsValue> {
        Ok(Self {
            get_tab_url: callback(obj, "getTabUrl")?,
            get_active_tab: callback(obj, "getActiveTab")?,
            remove_tab: callback(obj, "removeTab")?,
            remove_window: callback(obj, "removeWindow")?,
        })
    }
}

impl TabPlatform for JsPlatform {
    async fn tab_url(&self, tab_id: TabId) -> Result<String, PlatformError> {
        call(&self.get_tab_url, JsValue::from(tab_id))
            .await?
            .as_string()
            .ok_or(PlatformError::TabNotFound(tab_id))
    }

    async fn active_tab(&self) -> Result<Option<TabInfo>, PlatformError> {
        let tab = call(&self.get_active_tab, JsValue::UNDEFINED).await?;
        if tab.is_null() || tab.is_undefined() {
            return Ok(None);
        }
        let id = js_sys::Reflect::get(&tab, &"id".into())
            .ok()
            .and_then(|v| v.as_f64());
        let url = js_sys::Reflect::get(&tab, &"url".into())
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default();
        Ok(id.map(|id| TabInfo { id: id as TabId, url }))
    }

    async fn close_tab(&self, tab_id: TabId) -> Result<(), PlatformError> {
        call(&self.remove_tab, JsValue::from(tab_id)).await.map(|_| ())
    }

    async fn close_window(&self, window_id: WindowId) -> Result<(), PlatformError> {
        call(&self.remove_window, JsValue::from(window_id)).await.map(|_| ())
    }
}
