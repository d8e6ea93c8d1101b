// In-memory doubles for the page-side seams.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use futures::channel::oneshot;
use geo_types::Rect;

use crate::attributes::{AttributeGrid, AttributeTable};
use crate::error::{Result, ViewerError};
use crate::feature::{extent_to_array, GeometryKind};
use crate::transport::Transport;
use crate::view::MapView;

enum Reply {
    Now(Result<String>),
    Later(oneshot::Receiver<Result<String>>),
}

/// Replays queued responses in order and records every request.
#[derive(Default)]
pub struct StubTransport {
    get_responses: RefCell<VecDeque<Reply>>,
    post_responses: RefCell<VecDeque<Result<String>>>,
    gets: RefCell<Vec<String>>,
    posts: RefCell<Vec<(String, String)>>,
}

impl StubTransport {
    pub fn respond_get(&self, response: Result<String>) {
        self.get_responses.borrow_mut().push_back(Reply::Now(response));
    }

    /// Queue a GET that stays pending until the returned sender is used.
    pub fn defer_get(&self) -> oneshot::Sender<Result<String>> {
        let (tx, rx) = oneshot::channel();
        self.get_responses.borrow_mut().push_back(Reply::Later(rx));
        tx
    }

    pub fn respond_post(&self, response: Result<String>) {
        self.post_responses.borrow_mut().push_back(response);
    }

    pub fn gets(&self) -> Vec<String> {
        self.gets.borrow().clone()
    }

    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.gets.borrow().len() + self.posts.borrow().len()
    }
}

impl Transport for StubTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.gets.borrow_mut().push(url.to_string());
        let reply = self.get_responses.borrow_mut().pop_front();
        match reply {
            Some(Reply::Now(response)) => response,
            Some(Reply::Later(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(ViewerError::Transport("GET abandoned".to_string()))),
            None => Err(ViewerError::Transport("no stubbed GET response".to_string())),
        }
    }

    async fn post_xml(&self, url: &str, body: &str) -> Result<String> {
        self.posts
            .borrow_mut()
            .push((url.to_string(), body.to_string()));
        self.post_responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ViewerError::Transport("no stubbed POST response".to_string())))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ViewCall {
    Visible(String, bool),
    Fit([f64; 4], u32),
    ActivateDraw(String, GeometryKind, String),
    DeactivateDraw,
    ShowFeatures(String, String),
}

#[derive(Default)]
pub struct RecordingView {
    calls: RefCell<Vec<ViewCall>>,
}

impl RecordingView {
    pub fn calls(&self) -> Vec<ViewCall> {
        self.calls.borrow().clone()
    }

    pub fn fit_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, ViewCall::Fit(..)))
            .count()
    }
}

impl MapView for RecordingView {
    fn set_layer_visible(&self, layer_id: &str, visible: bool) {
        self.calls
            .borrow_mut()
            .push(ViewCall::Visible(layer_id.to_string(), visible));
    }

    fn fit_extent(&self, extent: &Rect<f64>, duration_ms: u32) {
        self.calls
            .borrow_mut()
            .push(ViewCall::Fit(extent_to_array(extent), duration_ms));
    }

    fn activate_draw(&self, layer_id: &str, kind: GeometryKind, session_id: &str) {
        self.calls.borrow_mut().push(ViewCall::ActivateDraw(
            layer_id.to_string(),
            kind,
            session_id.to_string(),
        ));
    }

    fn deactivate_draw(&self) {
        self.calls.borrow_mut().push(ViewCall::DeactivateDraw);
    }

    fn show_features(&self, layer_id: &str, feature_collection: &str) {
        self.calls.borrow_mut().push(ViewCall::ShowFeatures(
            layer_id.to_string(),
            feature_collection.to_string(),
        ));
    }
}

#[derive(Default)]
pub struct RecordingGrid {
    tables: RefCell<Vec<AttributeTable>>,
    alerts: RefCell<Vec<String>>,
    hidden: Cell<usize>,
}

impl RecordingGrid {
    pub fn tables(&self) -> Vec<AttributeTable> {
        self.tables.borrow().clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.borrow().clone()
    }

    pub fn hidden(&self) -> usize {
        self.hidden.get()
    }
}

impl AttributeGrid for RecordingGrid {
    fn show_table(&self, table: &AttributeTable) {
        self.tables.borrow_mut().push(table.clone());
    }

    fn hide_table(&self) {
        self.hidden.set(self.hidden.get() + 1);
    }

    fn alert(&self, message: &str) {
        self.alerts.borrow_mut().push(message.to_string());
    }
}
