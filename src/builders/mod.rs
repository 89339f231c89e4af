//! Builders to construct queue components from configuration.

pub mod queue_builder;

pub use queue_builder::BackgroundQueueBuilder;
