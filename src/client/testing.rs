//! Test doubles shared by the unit tests.

use crate::client::api_client::RemoteApi;
use crate::client::error::ApiError;
use crate::shared::QueuedAction;
use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug)]
enum Outcome {
    Done(Result<(), ApiError>),
    Hang,
}

/// `RemoteApi` answering from a script; unscripted calls succeed
#[derive(Debug, Default)]
pub struct ScriptedApi {
    outcomes: Mutex<VecDeque<Outcome>>,
    dispatched: Mutex<Vec<QueuedAction>>,
    collections: Mutex<HashMap<String, Result<Vec<Value>, ApiError>>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next dispatch
    pub fn push_outcome(&self, outcome: Result<(), ApiError>) {
        self.outcomes.lock().unwrap().push_back(Outcome::Done(outcome));
    }

    /// The next dispatch never resolves
    pub fn push_hang(&self) {
        self.outcomes.lock().unwrap().push_back(Outcome::Hang);
    }

    pub fn set_collection(&self, domain: &str, response: Result<Vec<Value>, ApiError>) {
        self.collections
            .lock()
            .unwrap()
            .insert(domain.to_string(), response);
    }

    pub fn dispatched(&self) -> Vec<QueuedAction> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatched.lock().unwrap().len()
    }
}

impl RemoteApi for ScriptedApi {
    fn dispatch<'a>(&'a self, action: &'a QueuedAction) -> BoxFuture<'a, Result<(), ApiError>> {
        self.dispatched.lock().unwrap().push(action.clone());
        match self.outcomes.lock().unwrap().pop_front() {
            Some(Outcome::Hang) => futures_util::future::pending::<Result<(), ApiError>>().boxed(),
            Some(Outcome::Done(outcome)) => async move { outcome }.boxed(),
            None => async { Ok(()) }.boxed(),
        }
    }

    fn fetch_collection<'a>(
        &'a self,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Value>, ApiError>> {
        let response = self
            .collections
            .lock()
            .unwrap()
            .get(domain)
            .cloned()
            .unwrap_or_else(|| Err(ApiError::status(404, "")));
        async move { response }.boxed()
    }
}
