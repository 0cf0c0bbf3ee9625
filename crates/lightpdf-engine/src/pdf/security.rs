// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Access control encoder — Standard Security Handler through lopdf
// (revision 2 with 40-bit RC4, revision 3 with 128-bit RC4).

use lightpdf_core::error::{EngineError, Result};
use lightpdf_core::params::SecuritySpec;
use lightpdf_core::types::EncryptionStrength;
use lopdf::{Document, EncryptionState, EncryptionVersion, Object, Permissions, StringFormat};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use super::handle::PdfHandle;

/// Encrypt the handle's document in place according to `spec`.
#[instrument(skip_all, fields(level = spec.encryption_level, permissions = spec.permissions.len()))]
pub fn secure(handle: &mut PdfHandle, spec: &SecuritySpec, source: &[u8]) -> Result<()> {
    let strength = spec.strength()?;
    if spec.owner_password.is_empty() {
        return Err(EngineError::validation("owner password must not be empty"));
    }
    info!(
        key_bits = strength.key_bits(),
        user_password = spec.user_password.is_some(),
        "Encrypting PDF"
    );

    let document = handle.document_mut();
    ensure_file_id(document, source);
    apply_encryption(
        document,
        strength,
        &spec.owner_password,
        spec.user_password.as_deref().unwrap_or_default(),
        permissions(spec.permission_flags()),
    )
}

/// lopdf permission flags for a `/P` bit set. lopdf adds the reserved bits
/// itself.
pub fn permissions(flags: u32) -> Permissions {
    Permissions::from_bits_truncate(u64::from(flags))
}

/// Encrypt every string and stream, then link the `/Encrypt` dictionary.
/// The trailer must already carry an `/ID`.
pub fn apply_encryption(
    document: &mut Document,
    strength: EncryptionStrength,
    owner_password: &str,
    user_password: &str,
    permissions: Permissions,
) -> Result<()> {
    if document.is_encrypted() {
        return Err(EngineError::processing("document is already encrypted"));
    }

    // Cross-reference and object streams are rebuilt on save, never copied.
    document
        .objects
        .retain(|_, object| !matches!(object.type_name(), Ok(b"XRef") | Ok(b"ObjStm")));

    let version = match strength {
        EncryptionStrength::Rc4_40 => EncryptionVersion::V1 {
            document: &*document,
            owner_password,
            user_password,
            permissions,
        },
        EncryptionStrength::Rc4_128 => EncryptionVersion::V2 {
            document: &*document,
            owner_password,
            user_password,
            key_length: strength.key_bits() as usize,
            permissions,
        },
    };
    let state = EncryptionState::try_from(version)
        .map_err(|err| EngineError::processing(format!("cannot derive encryption keys: {err}")))?;
    document
        .encrypt(&state)
        .map_err(|err| EngineError::processing(format!("encryption failed: {err}")))?;
    debug!(objects = document.objects.len(), "Strings and streams encrypted");
    Ok(())
}

/// Give the trailer an `/ID` when it has none, derived from a digest of the
/// input. Key derivation mixes in its first element.
fn ensure_file_id(document: &mut Document, source: &[u8]) {
    let present = document
        .trailer
        .get(b"ID")
        .and_then(Object::as_array)
        .ok()
        .and_then(|ids| ids.first())
        .and_then(|first| first.as_str().ok())
        .is_some_and(|id| !id.is_empty());
    if present {
        return;
    }

    let id = Sha256::digest(source)[..16].to_vec();
    document.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
}
