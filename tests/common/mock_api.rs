//! Recording `RemoteApi` for integration tests
//!
//! Dispatches succeed unless the action type is marked failing or an
//! outcome was scripted for the next call.

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;
use siteforce_offline::client::{ApiError, RemoteApi};
use siteforce_offline::shared::{ActionType, QueuedAction};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct RecordingApi {
    scripted: Mutex<VecDeque<Result<(), ApiError>>>,
    failing: Mutex<HashMap<ActionType, ApiError>>,
    calls: Mutex<Vec<QueuedAction>>,
    collections: Mutex<HashMap<String, Vec<Value>>>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, outcome: Result<(), ApiError>) {
        self.scripted.lock().unwrap().push_back(outcome);
    }

    /// Every dispatch of `action_type` fails with `error` until `recover`
    pub fn fail_type(&self, action_type: ActionType, error: ApiError) {
        self.failing.lock().unwrap().insert(action_type, error);
    }

    pub fn recover(&self, action_type: ActionType) {
        self.failing.lock().unwrap().remove(&action_type);
    }

    pub fn serve_collection(&self, domain: &str, records: Vec<Value>) {
        self.collections
            .lock()
            .unwrap()
            .insert(domain.to_string(), records);
    }

    pub fn calls(&self) -> Vec<QueuedAction> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl RemoteApi for RecordingApi {
    fn dispatch<'a>(&'a self, action: &'a QueuedAction) -> BoxFuture<'a, Result<(), ApiError>> {
        self.calls.lock().unwrap().push(action.clone());

        let outcome = match self.scripted.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => match self.failing.lock().unwrap().get(&action.action_type) {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            },
        };
        async move { outcome }.boxed()
    }

    fn fetch_collection<'a>(
        &'a self,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Value>, ApiError>> {
        let records = self.collections.lock().unwrap().get(domain).cloned();
        async move { records.ok_or_else(|| ApiError::status(404, "not found")) }.boxed()
    }
}
