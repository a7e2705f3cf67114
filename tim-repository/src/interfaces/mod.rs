//! Interface definitions for the cluster provider.
//!
//! This module defines the abstract `ClusterProvider` trait that allows for
//! dependency injection of the cluster backend.

mod cluster_provider;

pub use cluster_provider::ClusterProvider;
