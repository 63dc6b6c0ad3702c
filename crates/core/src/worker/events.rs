//! Lifecycle events dispatched by the host to the worker.

use std::fmt;
use std::future::Future;

use futures_util::future::{BoxFuture, try_join_all};

use super::Network;
use crate::Error;
use crate::http::{Request, Response};

/// Install signal with a completion-deferral handle.
///
/// Handlers hand long-running work to [`InstallEvent::wait_until`]; the host
/// treats the install as done only once [`InstallEvent::settle`] resolves.
#[derive(Default)]
pub struct InstallEvent<'a> {
    pending: Vec<BoxFuture<'a, Result<(), Error>>>,
}

impl<'a> InstallEvent<'a> {
    pub fn new() -> Self {
        Self { pending: Vec::new() }
    }

    /// Extend the event's lifetime until `work` completes.
    pub fn wait_until<F>(&mut self, work: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'a,
    {
        self.pending.push(Box::pin(work));
    }

    /// Number of deferred completions registered so far.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Resolve once every deferred completion resolves; reject on the first failure.
    pub async fn settle(self) -> Result<(), Error> {
        try_join_all(self.pending).await.map(|_| ())
    }
}

impl fmt::Debug for InstallEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallEvent").field("pending", &self.pending.len()).finish()
    }
}

/// Fetch signal for one intercepted request.
///
/// The response can be supplied at most once.
pub struct FetchEvent<'a> {
    request: Request,
    response: Option<BoxFuture<'a, Result<Response, Error>>>,
}

impl<'a> FetchEvent<'a> {
    pub fn new(request: Request) -> Self {
        Self { request, response: None }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Supply the eventual response for this request.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if a response was already supplied.
    pub fn respond_with<F>(&mut self, response: F) -> Result<(), Error>
    where
        F: Future<Output = Result<Response, Error>> + Send + 'a,
    {
        if self.response.is_some() {
            return Err(Error::InvalidState(format!("fetch event for {} already has a response", self.request.url)));
        }
        self.response = Some(Box::pin(response));
        Ok(())
    }

    /// Resolve the supplied response, or fetch from `network` if no handler responded.
    pub async fn into_response(self, network: &dyn Network) -> Result<Response, Error> {
        match self.response {
            Some(response) => response.await,
            None => network.fetch(&self.request).await,
        }
    }
}

impl fmt::Debug for FetchEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchEvent")
            .field("request", &self.request)
            .field("responded", &self.response.is_some())
            .finish()
    }
}
