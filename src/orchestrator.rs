//! The orchestrator contract.
//!
//! The orchestrator owns everything the bridge does not: resolving what a
//! route means, validation, business logic. The bridge calls it once per
//! request through [`Orchestrator::handle`] and never looks inside.
//!
//! ```text
//! hyper request ──► Request ──normalize──► NormalizedRequest
//!                                                 │
//!                                     Orchestrator::handle(route, req)
//!                                                 │
//!            Ok(NormalizedResponse) ◄─────────────┴────────► Err(HandlerError)
//!                     │                                            │
//!      commands + status + body → Response         failure_response → Response
//! ```
//!
//! Any `async` closure taking `(Route, NormalizedRequest)` is an orchestrator,
//! which is handy in tests and small services. Larger frameworks implement
//! the trait on their own type.

use std::future::Future;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::normalized::{NormalizedRequest, NormalizedResponse};
use crate::router::Route;

/// Adapter-agnostic request handling, as seen from the bridge.
///
/// Shared across every connection task, hence `Send + Sync + 'static`.
#[async_trait]
pub trait Orchestrator: Send + Sync + 'static {
    async fn handle(
        &self,
        route: &Route,
        request: NormalizedRequest,
    ) -> Result<NormalizedResponse, HandlerError>;
}

#[async_trait]
impl<F, Fut> Orchestrator for F
where
    F: Fn(Route, NormalizedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<NormalizedResponse, HandlerError>> + Send + 'static,
{
    async fn handle(
        &self,
        route: &Route,
        request: NormalizedRequest,
    ) -> Result<NormalizedResponse, HandlerError> {
        (self)(route.clone(), request).await
    }
}
