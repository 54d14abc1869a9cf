//! A local scripted model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use agenthub_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelReply, ModelRequest,
};
use tokio::time::sleep;

pub use preset::*;

const DEFAULT_DELAY: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub fn message(&self) -> &str {
        self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

struct ScriptStep {
    response: PresetResponse,
    failed_attempts: u64,
}

#[derive(Default)]
struct Script {
    steps: VecDeque<ScriptStep>,
    requests: Vec<ModelRequest>,
}

/// A local scripted model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond to each request. Responses are consumed in order,
/// one per successful request. If the script runs out of responses, an
/// error of kind [`ErrorKind::Other`] is returned.
///
/// Every answer, successful or not, arrives after a short delay so that
/// callers always observe a suspension point.
///
/// Clones share the same script, so a test can keep a clone around to
/// inspect the requests the model has received.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Appends a response to the script.
    #[inline]
    pub fn add_response(&self, preset: PresetResponse) {
        self.lock_script().steps.push_back(ScriptStep {
            response: preset,
            failed_attempts: 0,
        });
    }

    /// Sets how long each request takes.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far, including failed ones.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock_script().requests.clone()
    }

    /// Returns the number of responses that have not been consumed.
    pub fn remaining_responses(&self) -> usize {
        self.lock_script().steps.len()
    }

    fn lock_script(&self) -> MutexGuard<'_, Script> {
        // A panicking test thread may poison the lock, the script itself is
        // still consistent.
        self.script.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn next_response(&self, req: &ModelRequest) -> Result<PresetResponse, Error> {
        let mut script = self.lock_script();
        script.requests.push(req.clone());

        let exhausted = Error {
            message: "no enough steps",
            kind: ErrorKind::Other,
        };
        let Some(step) = script.steps.front_mut() else {
            return Err(exhausted);
        };
        let preset_failure = Error {
            message: "preset failure",
            kind: ErrorKind::RateLimitExceeded,
        };
        match step.response.failures {
            Some(0) => return Err(preset_failure),
            Some(failures) if step.failed_attempts < failures => {
                step.failed_attempts += 1;
                return Err(preset_failure);
            }
            _ => {}
        }

        let step = script.steps.pop_front().map(|step| step.response);
        step.ok_or(exhausted)
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelReply, Self::Error>> + Send + 'static
    {
        let reply = self.next_response(req).map(PresetResponse::into_reply);
        let delay = self.delay.unwrap_or(DEFAULT_DELAY);
        async move {
            sleep(delay).await;
            reply
        }
    }
}

#[cfg(test)]
mod tests {
    use agenthub_model::{ModelFinishReason, ModelMessage, ModelTool};
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_send_request() {
        let provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Hello, ".to_owned()),
            PresetEvent::MessageDelta("world!".to_owned()),
        ]));
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Sure, ".to_owned()),
            PresetEvent::MessageDelta("let me take a look.".to_owned()),
            PresetEvent::tool_call(
                "tool:1",
                "read_file",
                json!({ "path": "/todo.txt" }),
            ),
        ]));

        let mut req = ModelRequest {
            messages: vec![ModelMessage::user("Hi")],
            tools: vec![ModelTool {
                name: "read_file".to_owned(),
                description: "Reads a file".to_owned(),
                parameters: json!({ "type": "object" }),
            }],
            ..Default::default()
        };
        let reply = provider.send_request(&req).await.unwrap();
        assert_eq!(reply.text_content(), Some("Hello, world!"));
        assert!(reply.tool_calls.is_empty());
        assert_eq!(reply.finish_reason, ModelFinishReason::Stop);

        req.messages.push(ModelMessage::user("Check my todo"));
        let reply = provider.send_request(&req).await.unwrap();
        assert_eq!(reply.text_content(), Some("Sure, let me take a look."));
        assert_eq!(reply.tool_calls[0].name, "read_file");
        assert_eq!(reply.finish_reason, ModelFinishReason::ToolCalls);

        assert_eq!(provider.requests().len(), 2);
        assert_eq!(provider.requests()[1].messages.len(), 2);
        assert_eq!(provider.remaining_responses(), 0);
    }

    #[tokio::test]
    async fn test_script_exhausted() {
        let provider = TestModelProvider::default();
        let err = provider
            .send_request(&ModelRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.message(), "no enough steps");
    }

    #[tokio::test]
    async fn test_preset_failures() {
        let provider = TestModelProvider::default();
        provider.add_response(PresetResponse::text("ok").with_failures(2));

        for _ in 0..2 {
            let err = provider
                .send_request(&ModelRequest::default())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        }
        assert!(provider.send_request(&ModelRequest::default()).await.is_ok());
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay() {
        let mut provider = TestModelProvider::default();
        provider.set_delay(Duration::from_secs(5));
        provider.add_response(PresetResponse::text("late"));

        let started = tokio::time::Instant::now();
        provider.send_request(&ModelRequest::default()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
