use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use wavelink_core::{DuplexChannel, DuplexTransport, TransportError};
use wavelink_domain::Credential;

use super::Journal;

type Inbound = Result<String, TransportError>;

/// How the next `open` call behaves
pub enum OpenScript {
    /// Accept and queue these frames before anything else is read
    Accept(Vec<String>),
    Fail(TransportError),
}

/// Server side of an accepted channel
pub struct ServerEnd {
    inbound: Option<mpsc::UnboundedSender<Inbound>>,
    pub credential: Credential,
}

impl ServerEnd {
    pub fn push(&self, frame: impl Into<String>) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(Ok(frame.into()));
        }
    }

    pub fn fail(&self, error: TransportError) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(Err(error));
        }
    }

    /// Close from the server side; the client sees end of stream
    pub fn close(&mut self) {
        self.inbound = None;
    }
}

/// In-memory transport recording every open and every frame sent.
pub struct FakeTransport {
    journal: Journal,
    script: Mutex<VecDeque<OpenScript>>,
    fail_by_default: Mutex<Option<TransportError>>,
    opens: Mutex<Vec<Instant>>,
    servers: Mutex<Vec<ServerEnd>>,
}

impl FakeTransport {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            journal,
            script: Mutex::new(VecDeque::new()),
            fail_by_default: Mutex::new(None),
            opens: Mutex::new(Vec::new()),
            servers: Mutex::new(Vec::new()),
        })
    }

    pub fn script(&self, step: OpenScript) {
        self.script.lock().push_back(step);
    }

    /// Fail every unscripted open with `error`
    pub fn fail_all(&self, error: TransportError) {
        *self.fail_by_default.lock() = Some(error);
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().len()
    }

    pub fn open_times(&self) -> Vec<Instant> {
        self.opens.lock().clone()
    }

    /// Close the most recently accepted channel from the server side
    pub fn drop_latest(&self) {
        if let Some(server) = self.servers.lock().last_mut() {
            server.close();
        }
    }

    pub fn with_latest<R>(&self, f: impl FnOnce(&ServerEnd) -> R) -> Option<R> {
        self.servers.lock().last().map(f)
    }

    pub fn accepted(&self) -> usize {
        self.servers.lock().len()
    }
}

#[async_trait]
impl DuplexTransport for FakeTransport {
    async fn open(&self, credential: &Credential) -> Result<Box<dyn DuplexChannel>, TransportError> {
        self.opens.lock().push(Instant::now());
        self.journal.lock().push(format!("open:{}", credential.access_token));

        let step = self.script.lock().pop_front();
        let preload = match step {
            Some(OpenScript::Accept(frames)) => frames,
            Some(OpenScript::Fail(error)) => return Err(error),
            None => match self.fail_by_default.lock().clone() {
                Some(error) => return Err(error),
                None => Vec::new(),
            },
        };

        let (tx, rx) = mpsc::unbounded_channel();
        for frame in preload {
            let _ = tx.send(Ok(frame));
        }
        self.servers.lock().push(ServerEnd { inbound: Some(tx), credential: credential.clone() });

        Ok(Box::new(FakeChannel { inbound: rx, journal: self.journal.clone() }))
    }
}

struct FakeChannel {
    inbound: mpsc::UnboundedReceiver<Inbound>,
    journal: Journal,
}

#[async_trait]
impl DuplexChannel for FakeChannel {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.journal.lock().push(format!("sent:{frame}"));
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<Result<String, TransportError>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        self.journal.lock().push("close".to_string());
        self.inbound.close();
    }
}
