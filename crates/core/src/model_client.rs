use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use agenthub_model::{
    ModelProvider, ModelProviderError, ModelReply, ModelRequest,
};
use backoff::ExponentialBackoff;
use tracing::Instrument;

type SendRequestResult = Result<ModelReply, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn = Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// How transient model failures are retried.
///
/// Delays grow exponentially with jitter between `initial_interval` and
/// `max_interval`. Only errors whose kind is transient are retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_interval: Duration,
    max_interval: Duration,
}

impl RetryPolicy {
    /// Creates a policy making at most `max_attempts` attempts in total.
    #[inline]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// A policy that gives up after the first failure.
    #[inline]
    pub fn none() -> Self {
        Self::new(1)
    }

    /// Sets the delay bounds between attempts.
    #[inline]
    pub fn with_intervals(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_interval = initial;
        self.max_interval = max.max(initial);
        self
    }

    /// Returns the maximum number of attempts.
    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            current_interval: self.initial_interval,
            max_interval: self.max_interval,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(60),
        }
    }
}

/// A wrapper around a model provider that maintains an execution
/// environment for the provider and provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    retry_policy: RetryPolicy,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!(
                        "sending {} message(s) with {} tool(s)",
                        req.messages.len(),
                        req.tools.len()
                    );
                    let result: SendRequestResult = match fut.await {
                        Ok(reply) => {
                            log_reply(&reply);
                            Ok(reply)
                        }
                        Err(err) => {
                            error!("got an error: {err:?}");
                            Err(Box::new(err))
                        }
                    };
                    result
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            retry_policy: RetryPolicy::default(),
        }
    }

    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Sends a request and returns the reply, retrying transient failures
    /// according to the retry policy.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. No further attempts are made once this
    /// operation is cancelled.
    pub async fn send_request(&self, req: ModelRequest) -> SendRequestResult {
        let max_attempts = self.retry_policy.max_attempts;
        let mut attempt = 0;
        backoff::future::retry(self.retry_policy.backoff(), || {
            attempt += 1;
            let current = attempt;
            let fut = (self.handler_fn)(req.clone());
            async move {
                fut.await.map_err(|err| {
                    if err.kind().is_transient() && current < max_attempts {
                        warn!(
                            "model request failed ({}), retrying \
                             (attempt {current}/{max_attempts}): {err}",
                            err.kind()
                        );
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .await
    }
}

#[inline]
fn log_reply(reply: &ModelReply) {
    match reply.usage {
        Some(usage) => debug!(
            "got a reply ({:?}) with {} tool call(s), {} tokens used",
            reply.finish_reason,
            reply.tool_calls.len(),
            usage.total()
        ),
        None => debug!(
            "got a reply ({:?}) with {} tool call(s)",
            reply.finish_reason,
            reply.tool_calls.len()
        ),
    }
}
