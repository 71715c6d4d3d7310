use crate::error::VerifyError;
use crate::keyring::TrustedKeyring;
use crate::manifest::SignedHashManifest;

/// Hash of a release file, vouched for by a trusted signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHash {
    pub hash: [u8; 32],
    pub signer: String,
}

/// Check the signature of an armored hash manifest and pull out the hash
/// of `binary_filename`.
pub fn verify_parse_signed_hashes(
    armored: &[u8],
    binary_filename: &str,
    keyring: &TrustedKeyring,
) -> Result<SignedHash, VerifyError> {
    let manifest = SignedHashManifest::parse(armored)?;

    let signer = keyring
        .find_signer(manifest.signed_message(), manifest.signature())
        .ok_or(VerifyError::UntrustedSignature)?;

    // Only look at the content once the signature checks out.
    let hash = manifest
        .entries()?
        .remove(binary_filename)
        .ok_or_else(|| VerifyError::MissingEntry(binary_filename.to_owned()))?;

    tracing::debug!(
        "Manifest signed by {} ({})",
        signer.name,
        signer.fingerprint()
    );

    Ok(SignedHash {
        hash,
        signer: signer.name.clone(),
    })
}
