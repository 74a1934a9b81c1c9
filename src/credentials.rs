//! Credential Manager: turns pasted key material into a warehouse client.
//!
//! Clients are memoized by the *exact* key text. Two keys that differ only in
//! whitespace are distinct cache entries; the cache never evicts.

use crate::{ClientHandle, ExplorerError, ExplorerResult, WarehouseConnector};

use serde::Deserialize;
use std::{collections::HashMap, fmt, fs, path::Path, sync::Arc};
use tracing::{debug, info, warn};

/// Token endpoint used when the key does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The only key type the explorer accepts.
pub const SERVICE_ACCOUNT_TYPE: &str = "service_account";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Parsed service-account key document.
///
/// Unknown fields (`client_id`, `auth_uri`, ...) are ignored.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub project_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

// Manual impl so the private key never lands in a log line.
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Parses and validates a key document.
    ///
    /// ### Errors
    /// `ExplorerError::Credential` carrying a readable cause for malformed JSON,
    /// missing fields, a non service-account key or empty identity fields.
    pub fn parse(key_text: &str) -> ExplorerResult<Self> {
        let key: ServiceAccountKey = serde_json::from_str(key_text)
            .map_err(|err| ExplorerError::Credential(err.to_string()))?;

        if key.key_type != SERVICE_ACCOUNT_TYPE {
            return Err(ExplorerError::Credential(format!(
                "expected key type '{SERVICE_ACCOUNT_TYPE}', found '{}'",
                key.key_type
            )));
        }

        for (field, value) in [
            ("project_id", &key.project_id),
            ("client_email", &key.client_email),
            ("private_key", &key.private_key),
        ] {
            if value.trim().is_empty() {
                return Err(ExplorerError::Credential(format!("field '{field}' is empty")));
            }
        }

        Ok(key)
    }
}

/// Validates key material and materializes clients, memoizing by raw key text.
pub struct CredentialManager {
    connector: Arc<dyn WarehouseConnector>,
    /// Raw key text -> client built from it. Unbounded.
    cache: HashMap<String, ClientHandle>,
}

impl CredentialManager {
    pub fn new(connector: Arc<dyn WarehouseConnector>) -> Self {
        CredentialManager {
            connector,
            cache: HashMap::new(),
        }
    }

    /// Returns the client for `key_text`, building it on first use.
    ///
    /// Identical input returns the very same handle (`Arc::ptr_eq`) without
    /// touching the connector again. Failures are not cached, so a rejected key
    /// can be retried once the underlying problem is fixed.
    ///
    /// ### Errors
    /// Always `ExplorerError::Credential`; nothing else escapes this boundary.
    pub fn validate_and_build(&mut self, key_text: &str) -> ExplorerResult<ClientHandle> {
        if key_text.trim().is_empty() {
            return Err(ExplorerError::Credential(
                "No key provided. Please paste your BigQuery key.".to_string(),
            ));
        }

        if let Some(client) = self.cache.get(key_text) {
            debug!("Credential cache hit for project '{}'", client.project_id());
            return Ok(Arc::clone(client));
        }

        let key = ServiceAccountKey::parse(key_text)?;

        let client = self.connector.connect(&key).map_err(|err| match err {
            ExplorerError::Credential(_) => err,
            other => {
                warn!("Client construction failed: {other}");
                ExplorerError::Credential(other.to_string())
            }
        })?;

        info!(
            "Built warehouse client for '{}' (project '{}')",
            key.client_email, key.project_id
        );

        self.cache.insert(key_text.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Number of distinct key texts with a cached client.
    pub fn cached_keys(&self) -> usize {
        self.cache.len()
    }
}

/// Reads key material from a file, for `--key-file` and the "Load key" menu.
pub fn read_key_file(path: &Path) -> ExplorerResult<String> {
    let text = fs::read_to_string(path)?;
    debug!("Read key material from {path:?} ({} bytes)", text.len());
    Ok(text)
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//

#[cfg(test)]
mod tests_credentials {
    use super::*;
    use crate::tests_support::{FakeConnector, FakeWarehouse, service_account_json};
    use std::io::Write;
    use std::sync::atomic::Ordering;

    fn manager() -> (CredentialManager, Arc<FakeConnector>) {
        let connector = Arc::new(FakeConnector::new(FakeWarehouse::default()));
        (CredentialManager::new(connector.clone()), connector)
    }

    #[test]
    fn identical_key_reuses_handle() -> ExplorerResult<()> {
        let (mut manager, connector) = manager();
        let key = service_account_json("demo");

        let first = manager.validate_and_build(&key)?;
        let second = manager.validate_and_build(&key)?;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(first.project_id(), "demo");
        Ok(())
    }

    #[test]
    fn whitespace_variant_is_a_distinct_entry() -> ExplorerResult<()> {
        let (mut manager, connector) = manager();
        let key = service_account_json("demo");
        let padded = format!("  {key}\n");

        let first = manager.validate_and_build(&key)?;
        let second = manager.validate_and_build(&padded)?;

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
        assert_eq!(manager.cached_keys(), 2);
        Ok(())
    }

    #[test]
    fn missing_fields_are_rejected() {
        let (mut manager, connector) = manager();

        let result = manager.validate_and_build(r#"{"project_id":"demo"}"#);

        assert!(matches!(result, Err(ExplorerError::Credential(_))));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
        assert_eq!(manager.cached_keys(), 0);
    }

    #[test]
    fn malformed_json_and_blank_input() {
        let (mut manager, _) = manager();

        let err = manager.validate_and_build("{not json").unwrap_err();
        assert!(matches!(err, ExplorerError::Credential(_)));

        let err = manager.validate_and_build("   ").unwrap_err();
        assert!(err.to_string().contains("No key provided"));
    }

    #[test]
    fn wrong_key_type() {
        let text = service_account_json("demo").replace("service_account", "authorized_user");
        let err = ServiceAccountKey::parse(&text).unwrap_err();
        assert!(err.to_string().contains("authorized_user"));
    }

    #[test]
    fn connector_failure_becomes_credential_error_and_is_not_cached() {
        let connector = Arc::new(FakeConnector::failing());
        let mut manager = CredentialManager::new(connector.clone());
        let key = service_account_json("demo");

        for _ in 0..2 {
            let err = manager.validate_and_build(&key).unwrap_err();
            assert!(matches!(err, ExplorerError::Credential(_)));
        }

        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
        assert_eq!(manager.cached_keys(), 0);
    }

    #[test]
    fn token_uri_defaults() -> ExplorerResult<()> {
        let key = ServiceAccountKey::parse(&service_account_json("demo"))?;
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
        assert!(!format!("{key:?}").contains("PRIVATE KEY"));
        Ok(())
    }

    #[test]
    fn key_file_round_trip() -> ExplorerResult<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        let key = service_account_json("from-file");
        file.write_all(key.as_bytes())?;

        assert_eq!(read_key_file(file.path())?, key);
        Ok(())
    }
}
