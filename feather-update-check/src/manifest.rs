//! Armored, signed list of release file hashes.
//!
//! ```text
//! -----BEGIN FEATHER SIGNED HASHES-----
//! <sha256 hex>  <file name>
//! -----BEGIN FEATHER SIGNATURE-----
//! <base64 ed25519 signature>
//! -----END FEATHER SIGNATURE-----
//! ```
//!
//! The signature covers the canonical body: lines between the two `BEGIN`
//! markers with trailing whitespace removed, surrounding blank lines dropped,
//! joined with `\n`.

use crate::error::VerifyError;
use base64::Engine as _;
use base64::prelude::BASE64_STANDARD;
use ed25519_dalek::{Signature, Signer as _, SigningKey};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

const BEGIN_HASHES: &str = "-----BEGIN FEATHER SIGNED HASHES-----";
const BEGIN_SIGNATURE: &str = "-----BEGIN FEATHER SIGNATURE-----";
const END_SIGNATURE: &str = "-----END FEATHER SIGNATURE-----";

#[derive(Debug, Clone)]
pub struct SignedHashManifest {
    body: String,
    signature: Signature,
}

impl SignedHashManifest {
    pub fn parse(armored: &[u8]) -> Result<Self, VerifyError> {
        let text = std::str::from_utf8(armored)
            .map_err(|_| malformed("manifest is not valid UTF-8"))?;

        let mut lines = text.lines().map(str::trim_end);

        if !lines.any(|line| line == BEGIN_HASHES) {
            return Err(malformed("missing hashes header"));
        }

        let mut body = Vec::new();
        loop {
            match lines.next() {
                Some(BEGIN_SIGNATURE) => break,
                Some(line) => body.push(line),
                None => return Err(malformed("missing signature header")),
            }
        }

        let mut encoded = String::new();
        loop {
            match lines.next() {
                Some(END_SIGNATURE) => break,
                Some(line) => encoded.push_str(line.trim()),
                None => return Err(malformed("missing signature trailer")),
            }
        }

        let signature_bytes = BASE64_STANDARD.decode(encoded)?;
        let signature_bytes = <[u8; 64]>::try_from(signature_bytes.as_slice())
            .map_err(|_| malformed("signature must be 64 bytes"))?;

        Ok(Self {
            body: canonical_body(body),
            signature: Signature::from_bytes(&signature_bytes),
        })
    }

    /// Sign `body` and wrap it in armor.
    pub fn armor(body: &str, key: &SigningKey) -> String {
        let body = canonical_body(body.lines().map(str::trim_end));
        let signature = BASE64_STANDARD.encode(key.sign(body.as_bytes()).to_bytes());

        format!(
            "{}\n{}\n{}\n{}\n{}\n",
            BEGIN_HASHES, body, BEGIN_SIGNATURE, signature, END_SIGNATURE
        )
    }

    /// The exact bytes the signature covers.
    pub fn signed_message(&self) -> &[u8] {
        self.body.as_bytes()
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Parse the body into a file name to SHA-256 map.
    pub fn entries(&self) -> Result<BTreeMap<String, [u8; 32]>, VerifyError> {
        let mut entries = BTreeMap::new();

        for line in self.body.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((digest, file_name)) = line.split_once(char::is_whitespace) else {
                return Err(malformed(format!("unexpected line '{}'", line)));
            };

            let file_name = file_name.trim_start();
            let file_name = file_name.strip_prefix('*').unwrap_or(file_name);
            if file_name.is_empty() {
                return Err(malformed(format!("no file name in '{}'", line)));
            }

            let digest = hex::decode(digest)
                .ok()
                .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
                .ok_or_else(|| malformed(format!("bad sha256 digest for '{}'", file_name)))?;

            match entries.entry(file_name.to_owned()) {
                Entry::Vacant(entry) => {
                    entry.insert(digest);
                }
                Entry::Occupied(entry) => {
                    return Err(malformed(format!("duplicate entry for '{}'", entry.key())));
                }
            }
        }

        Ok(entries)
    }
}

fn canonical_body<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    let lines = lines.into_iter().collect::<Vec<_>>();

    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);

    lines[start..end].join("\n")
}

fn malformed(reason: impl Into<String>) -> VerifyError {
    VerifyError::MalformedManifest(reason.into())
}
