//! # Content Loader Adapter
//!
//! Content-addressed loader: guest code is published under the SHA3-256
//! digest of its package bytes, and a deployment payload loads whatever was
//! published under its digest. Stands in for the packaging subsystem in
//! tests and local tooling.

use crate::domain::services::sha3_256;
use crate::errors::DeployError;
use crate::ports::inbound::Contract;
use crate::ports::outbound::ContentLoader;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Loader keyed by package digest.
#[derive(Default)]
pub struct HashedContentLoader {
    packages: RwLock<HashMap<[u8; 32], Arc<dyn Contract>>>,
}

impl HashedContentLoader {
    /// Creates an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `code` as the implementation of `package`, returning its digest.
    pub fn publish(&self, package: &[u8], code: Arc<dyn Contract>) -> [u8; 32] {
        let digest = sha3_256(package);
        self.packages.write().insert(digest, code);
        digest
    }
}

impl ContentLoader for HashedContentLoader {
    fn load(&self, payload: &[u8]) -> Result<Arc<dyn Contract>, DeployError> {
        if payload.is_empty() {
            return Err(DeployError::InvalidPackage("empty payload".to_owned()));
        }
        let digest = sha3_256(payload);
        self.packages
            .read()
            .get(&digest)
            .cloned()
            .ok_or_else(|| DeployError::InvalidPackage(format!("unknown package {}", hex::encode(digest))))
    }
}
