use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use wavelink_common::{CommonError, CommonResult};
use wavelink_core::{ErrorRecord, ErrorReporter, RequestSender};
use wavelink_domain::{ApiRequest, ApiResponse, RequestFailure};

type Scripted = Result<ApiResponse, RequestFailure>;

/// Sender answering from a script; `200 {}` once the script runs out.
#[derive(Default)]
pub struct ScriptedSender {
    script: Mutex<VecDeque<(Duration, Scripted)>>,
    sent: Mutex<Vec<(Instant, ApiRequest)>>,
}

impl ScriptedSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16) -> Self {
        let outcome = if (200..300).contains(&status) {
            Ok(ApiResponse::new(status, serde_json::json!({"ok": true})))
        } else {
            Err(RequestFailure::status(status))
        };
        self.script.lock().push_back((Duration::ZERO, outcome));
        self
    }

    pub fn fail(self, failure: RequestFailure) -> Self {
        self.script.lock().push_back((Duration::ZERO, Err(failure)));
        self
    }

    /// Respond with `status` only after `delay`
    pub fn respond_after(self, delay: Duration, status: u16) -> Self {
        let outcome = Ok(ApiResponse::new(status, serde_json::Value::Null));
        self.script.lock().push_back((delay, outcome));
        self
    }

    pub fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().iter().map(|(_, request)| request.clone()).collect()
    }

    pub fn send_times(&self) -> Vec<Instant> {
        self.sent.lock().iter().map(|(at, _)| *at).collect()
    }
}

#[async_trait]
impl RequestSender for ScriptedSender {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RequestFailure> {
        self.sent.lock().push((Instant::now(), request));
        let next = self.script.lock().pop_front();
        match next {
            Some((delay, outcome)) => {
                tokio::time::sleep(delay).await;
                outcome
            }
            None => Ok(ApiResponse::new(200, serde_json::json!({}))),
        }
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub records: Mutex<Vec<ErrorRecord>>,
    pub fail: bool,
}

#[async_trait]
impl ErrorReporter for RecordingReporter {
    async fn report(&self, record: &ErrorRecord) -> CommonResult<()> {
        self.records.lock().push(record.clone());
        if self.fail {
            return Err(CommonError::backend("reporter", "collector down", true));
        }
        Ok(())
    }
}
