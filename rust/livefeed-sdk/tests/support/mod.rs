//! Scripted in-memory transport for driving a `FeedClient` without sockets.

#![allow(dead_code)]

use async_trait::async_trait;
use livefeed_sdk::transport::{Connector, Transport};
use livefeed_sdk::{Endpoint, ErrorEvent};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Accept,
    Refuse,
    /// The connect call never completes.
    Hang,
}

enum Inbound {
    Frame(Vec<u8>),
    Fail(String),
}

struct Session {
    tx: Option<mpsc::UnboundedSender<Inbound>>,
    released: Arc<AtomicBool>,
    pings: Arc<AtomicUsize>,
}

struct ServerState {
    script: VecDeque<Plan>,
    fallback: Plan,
    attempts: Vec<Instant>,
    sessions: Vec<Session>,
}

#[derive(Clone)]
pub struct MockServer {
    state: Arc<Mutex<ServerState>>,
}

impl MockServer {
    /// Every connect attempt not covered by a script entry gets `fallback`.
    pub fn new(fallback: Plan) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState {
                script: VecDeque::new(),
                fallback,
                attempts: Vec::new(),
                sessions: Vec::new(),
            })),
        }
    }

    pub fn script(&self, plans: impl IntoIterator<Item = Plan>) {
        self.state.lock().unwrap().script.extend(plans);
    }

    pub fn set_fallback(&self, plan: Plan) {
        self.state.lock().unwrap().fallback = plan;
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector {
            state: self.state.clone(),
        }
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.state.lock().unwrap().attempts.clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.state.lock().unwrap().attempts.len()
    }

    /// Gaps between consecutive connect attempts.
    pub fn attempt_gaps(&self) -> Vec<Duration> {
        self.attempts()
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    /// Delivers a frame on the given session. False if the session is gone.
    pub fn push(&self, session: usize, frame: impl Into<Vec<u8>>) -> bool {
        self.send(session, Inbound::Frame(frame.into()))
    }

    /// Surfaces a transport error on the given session.
    pub fn fail(&self, session: usize, reason: &str) -> bool {
        self.send(session, Inbound::Fail(reason.to_string()))
    }

    /// Peer-side close: the transport reports end of stream.
    pub fn hang_up(&self, session: usize) {
        if let Some(s) = self.state.lock().unwrap().sessions.get_mut(session) {
            s.tx.take();
        }
    }

    /// True once the client closed or dropped its end of the session.
    pub fn is_released(&self, session: usize) -> bool {
        self.state
            .lock()
            .unwrap()
            .sessions
            .get(session)
            .map(|s| s.released.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn pings(&self, session: usize) -> usize {
        self.state
            .lock()
            .unwrap()
            .sessions
            .get(session)
            .map(|s| s.pings.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    fn send(&self, session: usize, inbound: Inbound) -> bool {
        let state = self.state.lock().unwrap();
        match state.sessions.get(session).and_then(|s| s.tx.as_ref()) {
            Some(tx) => tx.send(inbound).is_ok(),
            None => false,
        }
    }
}

pub struct MockConnector {
    state: Arc<Mutex<ServerState>>,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _endpoint: &Endpoint) -> anyhow::Result<Box<dyn Transport>> {
        let plan = {
            let mut state = self.state.lock().unwrap();
            state.attempts.push(Instant::now());
            state.script.pop_front().unwrap_or(state.fallback)
        };

        match plan {
            Plan::Refuse => anyhow::bail!("connection refused"),
            Plan::Hang => std::future::pending().await,
            Plan::Accept => {}
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let released = Arc::new(AtomicBool::new(false));
        let pings = Arc::new(AtomicUsize::new(0));
        self.state.lock().unwrap().sessions.push(Session {
            tx: Some(tx),
            released: released.clone(),
            pings: pings.clone(),
        });

        Ok(Box::new(MockTransport {
            rx,
            released,
            pings,
        }))
    }
}

struct MockTransport {
    rx: mpsc::UnboundedReceiver<Inbound>,
    released: Arc<AtomicBool>,
    pings: Arc<AtomicUsize>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn recv(&mut self) -> Option<anyhow::Result<Vec<u8>>> {
        match self.rx.recv().await? {
            Inbound::Frame(bytes) => Some(Ok(bytes)),
            Inbound::Fail(reason) => Some(Err(anyhow::anyhow!(reason))),
        }
    }

    async fn ping(&mut self) -> anyhow::Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) {
        self.released.store(true, Ordering::SeqCst);
        self.rx.close();
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Error observer that records every event.
#[derive(Clone, Default)]
pub struct ErrorLog {
    events: Arc<Mutex<Vec<ErrorEvent>>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observer(&self) -> impl Fn(&ErrorEvent) + Send + Sync + 'static {
        let events = self.events.clone();
        move |event: &ErrorEvent| events.lock().unwrap().push(event.clone())
    }

    pub fn events(&self) -> Vec<ErrorEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

/// Polls `condition` while letting (paused) time advance in small steps.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..20_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached in time");
}
