//! A transport whose requests are answered by the test.

use futures::channel::oneshot;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tether_changeset::{ChangeSet, SubmitResponse};
use tether_context::{
    DomainClient, EntityQuery, Invocation, InvokeResponse, QueryResponse, Reply,
};
use tether_core::RemoteFault;
use tether_operation::CancellationToken;

type Sender<T> = oneshot::Sender<Result<T, RemoteFault>>;

/// A request the context sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Query(EntityQuery),
    Submit(ChangeSet),
    Invoke(Invocation),
}

#[derive(Default)]
struct Outstanding {
    requests: Vec<Request>,
    queries: VecDeque<(Sender<QueryResponse>, CancellationToken)>,
    submits: VecDeque<(Sender<SubmitResponse>, CancellationToken)>,
    invokes: VecDeque<(Sender<InvokeResponse>, CancellationToken)>,
}

/// Records every request and keeps its reply channel until the test
/// answers it. Replies are answered oldest first.
#[derive(Default)]
pub struct MockClient {
    cancellable: bool,
    outstanding: Mutex<Outstanding>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client that reports support for cancellation.
    pub fn cancellable() -> Self {
        Self {
            cancellable: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.outstanding.lock().requests.clone()
    }

    /// The most recently submitted changeset.
    pub fn last_submit(&self) -> Option<ChangeSet> {
        self.outstanding
            .lock()
            .requests
            .iter()
            .rev()
            .find_map(|r| match r {
                Request::Submit(changeset) => Some(changeset.clone()),
                _ => None,
            })
    }

    /// Whether the oldest unanswered query was asked to cancel.
    pub fn query_canceled(&self) -> bool {
        self.outstanding
            .lock()
            .queries
            .front()
            .is_some_and(|(_, token)| token.is_canceled())
    }

    /// Answer the oldest query. Returns false when there was none or the
    /// context no longer listens.
    pub fn reply_query(&self, result: Result<QueryResponse, RemoteFault>) -> bool {
        let sender = self.outstanding.lock().queries.pop_front();
        sender.is_some_and(|(tx, _)| tx.send(result).is_ok())
    }

    pub fn reply_submit(&self, result: Result<SubmitResponse, RemoteFault>) -> bool {
        let sender = self.outstanding.lock().submits.pop_front();
        sender.is_some_and(|(tx, _)| tx.send(result).is_ok())
    }

    pub fn reply_invoke(&self, result: Result<InvokeResponse, RemoteFault>) -> bool {
        let sender = self.outstanding.lock().invokes.pop_front();
        sender.is_some_and(|(tx, _)| tx.send(result).is_ok())
    }

    /// Hand the oldest query's reply channel to the caller, for answering
    /// from another thread.
    pub fn take_query(&self) -> Option<oneshot::Sender<Result<QueryResponse, RemoteFault>>> {
        self.outstanding.lock().queries.pop_front().map(|(tx, _)| tx)
    }

    /// Drop every reply channel without answering.
    pub fn drop_all(&self) {
        let mut outstanding = self.outstanding.lock();
        outstanding.queries.clear();
        outstanding.submits.clear();
        outstanding.invokes.clear();
    }
}

impl DomainClient for MockClient {
    fn supports_cancellation(&self) -> bool {
        self.cancellable
    }

    fn query(&self, query: &EntityQuery, cancel: CancellationToken) -> Reply<QueryResponse> {
        let (tx, rx) = oneshot::channel();
        let mut outstanding = self.outstanding.lock();
        outstanding.requests.push(Request::Query(query.clone()));
        outstanding.queries.push_back((tx, cancel));
        rx
    }

    fn submit(&self, changeset: &ChangeSet, cancel: CancellationToken) -> Reply<SubmitResponse> {
        let (tx, rx) = oneshot::channel();
        let mut outstanding = self.outstanding.lock();
        outstanding.requests.push(Request::Submit(changeset.clone()));
        outstanding.submits.push_back((tx, cancel));
        rx
    }

    fn invoke(&self, invocation: &Invocation, cancel: CancellationToken) -> Reply<InvokeResponse> {
        let (tx, rx) = oneshot::channel();
        let mut outstanding = self.outstanding.lock();
        outstanding.requests.push(Request::Invoke(invocation.clone()));
        outstanding.invokes.push_back((tx, cancel));
        rx
    }
}
