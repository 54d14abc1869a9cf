use std::error::Error;

use crate::error::ErrorKind;
use crate::reply::ModelReply;
use crate::request::ModelRequest;

/// The error type for a model provider.
///
/// The [`kind`](ModelProviderError::kind) decides how callers react to a
/// failure, for example whether the request is worth retrying.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// The oracle that decides what an agent does next.
///
/// A provider answers one [`ModelRequest`] with one [`ModelReply`]: the
/// assistant's text and the tool calls it wants to make. Callers send the
/// whole conversation with every request, so providers should behave like
/// stateless objects and be prepared for being dropped anytime.
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Sends a request to the model and waits for its complete reply.
    ///
    /// The returned future must not borrow from `self` or `req`, so that
    /// it can be moved to another task.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelReply, Self::Error>> + Send + 'static;
}
