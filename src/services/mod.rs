pub mod admission;
pub mod backup;
pub mod content_source;
pub mod in_flight;
pub mod local_store;
pub mod media_store;
pub mod naming;
pub mod replication;
pub mod stats;
