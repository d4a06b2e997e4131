//! Remote object store interface and HTTP implementation

mod client;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{HttpRemoteStore, RemoteConfig};
pub use store::*;
