use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

use crate::error::{Result, ViewerError};

/// HTTP access to the feature server.
///
/// Futures are polled on the browser event loop, so they are not `Send`.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn get_text(&self, url: &str) -> Result<String>;

    async fn post_xml(&self, url: &str, body: &str) -> Result<String>;
}

/// Transport backed by the page's `wasmJsHelpers.fetchText` / `postXml`.
#[derive(Default, Clone, Copy)]
pub struct JsTransport;

impl Transport for JsTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        let promise = crate::fetch_text(url).map_err(js_error)?;
        let value = JsFuture::from(promise).await.map_err(js_error)?;
        text_of(value)
    }

    async fn post_xml(&self, url: &str, body: &str) -> Result<String> {
        let promise = crate::post_xml(url, body).map_err(js_error)?;
        let value = JsFuture::from(promise).await.map_err(js_error)?;
        text_of(value)
    }
}

fn text_of(value: JsValue) -> Result<String> {
    value
        .as_string()
        .ok_or_else(|| ViewerError::Transport("helper resolved with a non-string body".to_string()))
}

fn js_error(value: JsValue) -> ViewerError {
    let message = value
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(&value, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", value));
    ViewerError::Transport(message)
}
