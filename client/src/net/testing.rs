//! In-process transport and runtime doubles for driving the connection
//! lifecycle deterministically on a `LocalPool`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use futures::channel::mpsc;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::{self, LocalBoxFuture};
use futures::task::LocalSpawnExt;
use futures::{FutureExt, StreamExt};

use crate::config::ClientConfig;
use crate::net::error::TransportError;
use crate::net::transport::{Link, Runtime, Transport};

#[derive(Default)]
struct MockState {
    opens: Vec<String>,
    written: Rc<RefCell<Vec<String>>>,
    open_failures: VecDeque<TransportError>,
    peer: Option<mpsc::UnboundedSender<Result<String, TransportError>>>,
}

/// Transport whose links are fed and observed by the test.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    /// URLs passed to `open`, in order.
    pub fn opens(&self) -> Vec<String> {
        self.state.borrow().opens.clone()
    }

    /// Every text frame written to any link, in order.
    pub fn written(&self) -> Vec<String> {
        self.state.borrow().written.borrow().clone()
    }

    /// Written frames decoded as JSON values.
    pub fn written_json(&self) -> Vec<serde_json::Value> {
        self.written()
            .iter()
            .map(|text| serde_json::from_str(text).expect("written frame is json"))
            .collect()
    }

    /// Make the next `count` opens fail.
    pub fn fail_opens(&self, count: usize) {
        let mut state = self.state.borrow_mut();
        for _ in 0..count {
            state.open_failures.push_back(TransportError::Open("connection refused".to_owned()));
        }
    }

    /// Deliver `text` on the current link.
    pub fn inject(&self, text: &str) {
        let state = self.state.borrow();
        let peer = state.peer.as_ref().expect("a link is open");
        peer.unbounded_send(Ok(text.to_owned())).expect("link is alive");
    }

    /// Deliver a frame built from `value`.
    pub fn inject_json(&self, value: &serde_json::Value) {
        self.inject(&value.to_string());
    }

    /// Close the current link from the server side.
    pub fn drop_link(&self) {
        self.state.borrow_mut().peer = None;
    }

    /// Whether the last opened link is still held open by the client.
    pub fn link_open(&self) -> bool {
        self.state.borrow().peer.as_ref().is_some_and(|peer| !peer.is_closed())
    }
}

impl Transport for MockTransport {
    fn open(&self, url: &str) -> LocalBoxFuture<'static, Result<Link, TransportError>> {
        let mut state = self.state.borrow_mut();
        state.opens.push(url.to_owned());
        if let Some(err) = state.open_failures.pop_front() {
            return future::ready(Err(err)).boxed_local();
        }

        let (peer, inbound) = mpsc::unbounded();
        state.peer = Some(peer);
        let written = Rc::clone(&state.written);
        let sink = futures::sink::unfold(written, |written, text: String| async move {
            written.borrow_mut().push(text);
            Ok::<_, TransportError>(written)
        });
        future::ready(Ok(Link::new(Box::pin(sink), inbound.boxed_local()))).boxed_local()
    }
}

/// Runtime that spawns onto a `LocalPool` and resolves sleeps immediately.
#[derive(Clone)]
pub struct MockRuntime {
    spawner: LocalSpawner,
    sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl MockRuntime {
    pub fn new(spawner: LocalSpawner) -> Self {
        Self { spawner, sleeps: Rc::default() }
    }

    /// Backoff delays requested so far.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Runtime for MockRuntime {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.spawner.spawn_local(task).expect("pool accepts tasks");
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        self.sleeps.borrow_mut().push(duration);
        future::ready(()).boxed_local()
    }
}

/// Pool plus doubles wired together.
pub struct Harness {
    pub pool: LocalPool,
    pub transport: MockTransport,
    pub runtime: MockRuntime,
    pub config: ClientConfig,
}

impl Harness {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let runtime = MockRuntime::new(pool.spawner());
        Self {
            pool,
            transport: MockTransport::default(),
            runtime,
            config: ClientConfig::default(),
        }
    }

    pub fn transport(&self) -> Rc<dyn Transport> {
        Rc::new(self.transport.clone())
    }

    pub fn runtime(&self) -> Rc<dyn Runtime> {
        Rc::new(self.runtime.clone())
    }

    /// Run spawned tasks until none can make progress.
    pub fn run(&mut self) {
        self.pool.run_until_stalled();
    }
}
