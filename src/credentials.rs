//! Private-key selection for endpoint authentication.
//!
//! The key registry is built once from the endpoint list and consulted with
//! the endpoint alias at session-creation time; there is no session-scoped
//! global state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::EndpointConfig;

#[derive(Debug, Default)]
pub struct CredentialSelector {
    key_paths: HashMap<String, PathBuf>,
}

impl CredentialSelector {
    pub fn from_endpoints<'a>(endpoints: impl Iterator<Item = &'a EndpointConfig>) -> Self {
        let key_paths = endpoints
            .filter_map(|e| {
                e.private_key_path
                    .as_ref()
                    .map(|path| (e.alias.to_lowercase(), path.clone()))
            })
            .collect();
        Self { key_paths }
    }

    /// The private key registered for `alias`, if any. Endpoints configured
    /// with a password have no entry here.
    pub fn key_for(&self, alias: &str) -> Option<&Path> {
        self.key_paths.get(&alias.to_lowercase()).map(PathBuf::as_path)
    }
}
