//! Pluggable seams of the reconnection loop.

use crate::error::ReconnectError;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

/// Probe deciding whether the server is reachable.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> Result<(), ReconnectError>;
}

/// Re-establishes the logical session once the server is reachable.
#[async_trait]
pub trait Reconnector<T>: Send + Sync {
    async fn reconnect(&self) -> Result<T, ReconnectError>;
}

/// Adapts an async closure into a [`HealthCheck`].
pub struct FnHealthCheck<F> {
    f: F,
}

/// Wrap `f` as a health check.
pub fn health_check_fn<F, Fut>(f: F) -> FnHealthCheck<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ReconnectError>> + Send + 'static,
{
    FnHealthCheck { f }
}

#[async_trait]
impl<F, Fut> HealthCheck for FnHealthCheck<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ReconnectError>> + Send + 'static,
{
    async fn check(&self) -> Result<(), ReconnectError> {
        (self.f)().await
    }
}

/// Adapts an async closure into a [`Reconnector`].
pub struct FnReconnector<F, T> {
    f: F,
    _session: PhantomData<fn() -> T>,
}

/// Wrap `f` as a reconnector.
pub fn reconnector_fn<F, Fut, T>(f: F) -> FnReconnector<F, T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ReconnectError>> + Send + 'static,
    T: Send + 'static,
{
    FnReconnector {
        f,
        _session: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, T> Reconnector<T> for FnReconnector<F, T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ReconnectError>> + Send + 'static,
    T: Send + 'static,
{
    async fn reconnect(&self) -> Result<T, ReconnectError> {
        (self.f)().await
    }
}
