//! Runtime adapters: spawner and host integration.

pub mod hosted;
pub mod tokio_spawner;

pub use hosted::HostedQueue;
pub use tokio_spawner::TokioSpawner;
