//! Tamper-evident persistence of pending campaign actions
//!
//! One file per campaign id, each wrapping the action payload with a
//! base64-encoded salted SHA-256 hash. The salt lives in the host's
//! preference store so a payload copied from another device (or edited in
//! place) fails verification and is treated as absent.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use parking_lot::Mutex;
use rand::Rng;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::prefs::Preferences;
use crate::JsonObject;

/// Preference key under which the action-store salt is persisted
pub const ACTIONS_SALT_KEY: &str = "DDSDK_ACTIONS_SALT";

const SALT_LEN: usize = 32;

/// Why a persisted action could not be returned.
#[derive(Debug, Error)]
enum VerifyError {
    /// Recomputed hash differs from the stored one; the file is tampered
    /// with or was written under a different salt.
    #[error("mismatched hash for action {0}")]
    HashMismatch(String),

    /// The file does not deserialize into the expected wrapper shape.
    #[error("unable to deserialise action {0}: {1}")]
    Malformed(String, String),
}

/// Content-addressed store of one pending action payload per campaign.
///
/// All operations are serialized under a single per-instance lock; action
/// volume is human-triggered-event scale, not hot-path.
pub struct ActionStore {
    location: PathBuf,
    prefs: Arc<dyn Preferences>,
    salt: Mutex<Option<Vec<u8>>>,
}

impl ActionStore {
    /// Open the store under `location`, creating the directory if needed
    pub fn new(location: impl Into<PathBuf>, prefs: Arc<dyn Preferences>) -> Self {
        let location = location.into();
        if let Err(err) = fs::create_dir_all(&location) {
            log::error!(
                "Failed to create action store directory {}: {}",
                location.display(),
                err
            );
        }
        Self {
            location,
            prefs,
            salt: Mutex::new(None),
        }
    }

    /// Retrieve the pending action for a campaign.
    ///
    /// A payload whose hash does not verify is deleted and reported as
    /// absent. A payload that fails to deserialize is reported as absent
    /// but left on disk.
    pub fn get(&self, campaign_id: i64) -> Option<JsonObject> {
        let mut salt_slot = self.salt.lock();

        let file = self.location.join(campaign_id.to_string());
        let contents = match fs::read_to_string(&file) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                log::error!("Failed to read action {}: {}", file.display(), err);
                return None;
            }
        };

        let salt = self.ensure_salt(&mut salt_slot);
        match verify(&contents, &salt) {
            Ok(action) => Some(action),
            Err(err @ VerifyError::HashMismatch(_)) => {
                log::warn!("{}", err);
                if let Err(err) = fs::remove_file(&file) {
                    log::error!("Failed to delete action {}: {}", file.display(), err);
                }
                None
            }
            Err(err) => {
                log::warn!("{}", err);
                None
            }
        }
    }

    /// Persist a pending action for a campaign, replacing any previous one
    pub fn put(&self, campaign_id: i64, action: &JsonObject) {
        let mut salt_slot = self.salt.lock();
        let salt = self.ensure_salt(&mut salt_slot);

        let serialized = match serde_json::to_string(action) {
            Ok(serialized) => serialized,
            Err(err) => {
                log::warn!("Unable to serialise action for campaign {}: {}", campaign_id, err);
                return;
            }
        };
        let hash = BASE64.encode(salted_hash(serialized.as_bytes(), &salt));

        let mut wrapper = JsonObject::new();
        wrapper.insert("contents".to_string(), Value::Object(action.clone()));
        wrapper.insert("hash".to_string(), Value::String(hash));

        let file = self.location.join(campaign_id.to_string());
        if let Err(err) = fs::write(&file, Value::Object(wrapper).to_string()) {
            log::error!("Failed to write action {}: {}", file.display(), err);
        }
    }

    /// Delete the pending action for a campaign, if any
    pub fn remove(&self, campaign_id: i64) {
        let _guard = self.salt.lock();

        let file = self.location.join(campaign_id.to_string());
        match fs::remove_file(&file) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => log::error!("Failed to delete action {}: {}", file.display(), err),
        }
    }

    /// Delete every persisted action and forget the salt.
    ///
    /// The next `put` generates a fresh salt, so payloads written before
    /// the clear can no longer verify.
    pub fn clear(&self) {
        let mut salt_slot = self.salt.lock();

        match fs::read_dir(&self.location) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    if let Err(err) = fs::remove_file(entry.path()) {
                        log::error!(
                            "Failed to delete action {}: {}",
                            entry.path().display(),
                            err
                        );
                    }
                }
            }
            Err(err) => log::error!(
                "Failed to list action store {}: {}",
                self.location.display(),
                err
            ),
        }

        *salt_slot = None;
        self.prefs.delete(ACTIONS_SALT_KEY);
    }

    /// Load the persisted salt or generate and persist a fresh one.
    /// Must be called with the store lock held.
    fn ensure_salt(&self, slot: &mut Option<Vec<u8>>) -> Vec<u8> {
        if let Some(salt) = slot.as_ref() {
            return salt.clone();
        }

        if let Some(encoded) = self.prefs.get(ACTIONS_SALT_KEY) {
            match BASE64.decode(&encoded) {
                Ok(salt) => {
                    *slot = Some(salt.clone());
                    return salt;
                }
                Err(err) => {
                    log::warn!("Persisted action salt is not valid base64: {}", err);
                }
            }
        }

        let mut rng = rand::thread_rng();
        let mut salt = vec![0u8; SALT_LEN];
        for byte in &mut salt {
            *byte = rng.gen_range(1..=u8::MAX);
        }

        self.prefs.set(ACTIONS_SALT_KEY, &BASE64.encode(&salt));
        *slot = Some(salt.clone());
        salt
    }
}

fn verify(contents: &str, salt: &[u8]) -> Result<JsonObject, VerifyError> {
    let malformed = |detail: &str| {
        VerifyError::Malformed(contents.to_string(), detail.to_string())
    };

    let wrapper: Value = serde_json::from_str(contents)
        .map_err(|err| malformed(&err.to_string()))?;
    let action = wrapper
        .get("contents")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("missing contents object"))?;
    let persisted_hash = wrapper
        .get("hash")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing hash"))?;
    let persisted_hash = BASE64
        .decode(persisted_hash)
        .map_err(|err| malformed(&err.to_string()))?;

    let serialized = serde_json::to_string(action)
        .map_err(|err| malformed(&err.to_string()))?;
    let hash = salted_hash(serialized.as_bytes(), salt);

    if persisted_hash != hash {
        return Err(VerifyError::HashMismatch(contents.to_string()));
    }

    Ok(action.clone())
}

fn salted_hash(text: &[u8], salt: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(text);
    hasher.update(salt);
    hasher.finalize().to_vec()
}
