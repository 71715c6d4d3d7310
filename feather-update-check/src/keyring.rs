use crate::error::KeyringError;
use ed25519_dalek::{Signature, VerifyingKey};
use serde::Deserialize;
use sha2::Digest as _;
use std::path::Path;

/// A maintainer key releases may be signed with.
#[derive(Debug, Clone)]
pub struct TrustedSigner {
    pub name: String,
    pub public_key: VerifyingKey,
}

impl TrustedSigner {
    pub fn new(name: impl Into<String>, public_key: VerifyingKey) -> Self {
        Self {
            name: name.into(),
            public_key,
        }
    }

    /// Lowercase hex SHA-256 of the public key bytes.
    pub fn fingerprint(&self) -> String {
        hex::encode(sha2::Sha256::digest(self.public_key.as_bytes()))
    }
}

/// The set of signers whose manifests are accepted.
#[derive(Debug, Clone, Default)]
pub struct TrustedKeyring {
    signers: Vec<TrustedSigner>,
}

#[derive(Deserialize)]
struct KeyringEntry {
    name: String,
    public_key: String,
}

impl TrustedKeyring {
    pub fn new(signers: Vec<TrustedSigner>) -> Self {
        Self { signers }
    }

    pub fn from_json(data: &[u8]) -> Result<Self, KeyringError> {
        let entries: Vec<KeyringEntry> = serde_json::from_slice(data)?;

        let signers = entries
            .into_iter()
            .map(|entry| {
                let key = hex::decode(entry.public_key.trim())
                    .ok()
                    .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
                    .and_then(|bytes| VerifyingKey::from_bytes(&bytes).ok())
                    .ok_or_else(|| KeyringError::InvalidPublicKey(entry.name.clone()))?;

                Ok(TrustedSigner::new(entry.name, key))
            })
            .collect::<Result<Vec<_>, KeyringError>>()?;

        Ok(Self { signers })
    }

    #[tracing::instrument]
    pub async fn load(path: &Path) -> Result<Self, KeyringError> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            tracing::error!("Failed to read keyring {}: {}", path.display(), e);
            e
        })?;

        let keyring = Self::from_json(&data)?;
        tracing::debug!("Loaded {} trusted signer(s)", keyring.signers.len());

        Ok(keyring)
    }

    pub fn signers(&self) -> &[TrustedSigner] {
        &self.signers
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    /// Find the trusted signer that produced `signature` over `message`.
    pub fn find_signer(&self, message: &[u8], signature: &Signature) -> Option<&TrustedSigner> {
        self.signers
            .iter()
            .find(|signer| signer.public_key.verify_strict(message, signature).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer as _, SigningKey};

    fn signing_key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    #[test]
    fn test_from_json() {
        let key = signing_key(1).verifying_key();
        let json = format!(
            r#"[{{"name": "dev", "public_key": "{}"}}]"#,
            hex::encode(key.as_bytes())
        );

        let keyring = TrustedKeyring::from_json(json.as_bytes()).unwrap();
        assert_eq!(keyring.signers().len(), 1);
        assert_eq!(keyring.signers()[0].name, "dev");
        assert_eq!(keyring.signers()[0].public_key, key);
    }

    #[test]
    fn test_from_json_rejects_bad_key() {
        let json = br#"[{"name": "dev", "public_key": "abcd"}]"#;
        assert!(matches!(
            TrustedKeyring::from_json(json),
            Err(KeyringError::InvalidPublicKey(name)) if name == "dev"
        ));
    }

    #[test]
    fn test_find_signer() {
        let alice = signing_key(1);
        let bob = signing_key(2);
        let mallory = signing_key(3);

        let keyring = TrustedKeyring::new(vec![
            TrustedSigner::new("alice", alice.verifying_key()),
            TrustedSigner::new("bob", bob.verifying_key()),
        ]);

        let signature = bob.sign(b"hashes");
        assert_eq!(keyring.find_signer(b"hashes", &signature).unwrap().name, "bob");
        assert!(keyring.find_signer(b"other", &signature).is_none());

        let forged = mallory.sign(b"hashes");
        assert!(keyring.find_signer(b"hashes", &forged).is_none());
    }

    #[test]
    fn test_empty_keyring_trusts_nobody() {
        let signature = signing_key(1).sign(b"hashes");
        assert!(TrustedKeyring::default().find_signer(b"hashes", &signature).is_none());
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let signer = TrustedSigner::new("dev", signing_key(1).verifying_key());
        let fingerprint = signer.fingerprint();
        assert_eq!(fingerprint.len(), 64);
        assert_eq!(fingerprint, signer.fingerprint());
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
