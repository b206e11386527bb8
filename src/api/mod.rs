//! HTTP surface.
//!
//! Routes live under `/api/`. Processing triggers are guarded by the
//! bearer-secret middleware; everything else is open. Handlers push all
//! database and model work onto the blocking pool.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::serve;
pub use types::ApiContext;
