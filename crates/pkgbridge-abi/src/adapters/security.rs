use std::path::Path;

use pkgbridge_engine::report::{defaults, DigestReport, KeyRingReport, KeyTrust};
use pkgbridge_engine::{KeyContext, PublicKey};

use super::Binding;
use crate::callbacks::SecurityCallbacks;
use crate::strings::c_text;
use crate::tables::KEY_TRUST;

/// Key ring and digest questions. An unanswered question gets the engine's
/// own answer, so leaving a slot empty never loosens verification.
#[derive(Debug)]
pub struct SecurityAdapter {
    pub binding: Binding<SecurityCallbacks>,
}

impl SecurityAdapter {
    pub fn new() -> Self {
        Self {
            binding: Binding::new("security"),
        }
    }
}

impl Default for SecurityAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyRingReport for SecurityAdapter {
    fn accept_key(&self, key: &PublicKey, context: &KeyContext) -> KeyTrust {
        let Some((accept_key, data)) = self.binding.slot(|c| (c.accept_key, c.accept_key_data))
        else {
            return defaults::accept_key(key, context);
        };
        let id = c_text(&key.id);
        let name = c_text(&key.name);
        let fingerprint = c_text(&key.fingerprint);
        let alias = c_text(&context.repo_alias);
        // SAFETY: slot and data come from the registered struct.
        let raw = unsafe {
            accept_key(
                id.as_ptr(),
                name.as_ptr(),
                fingerprint.as_ptr(),
                alias.as_ptr(),
                data,
            )
        };
        KEY_TRUST.forward_raw(raw)
    }

    fn accept_unsigned_file(&self, file: &str, context: &KeyContext) -> bool {
        let Some((unsigned_file, data)) = self
            .binding
            .slot(|c| (c.unsigned_file, c.unsigned_file_data))
        else {
            return defaults::accept_unsigned_file(file, context);
        };
        let file = c_text(file);
        let alias = c_text(&context.repo_alias);
        // SAFETY: as above.
        unsafe { unsigned_file(file.as_ptr(), alias.as_ptr(), data) }
    }

    fn accept_unknown_key(&self, file: &str, id: &str, context: &KeyContext) -> bool {
        let Some((unknown_key, data)) = self.binding.slot(|c| (c.unknown_key, c.unknown_key_data))
        else {
            return defaults::accept_unknown_key(file, id, context);
        };
        let file = c_text(file);
        let id = c_text(id);
        let alias = c_text(&context.repo_alias);
        // SAFETY: as above.
        unsafe { unknown_key(file.as_ptr(), id.as_ptr(), alias.as_ptr(), data) }
    }

    fn accept_verification_failed(
        &self,
        file: &str,
        key: &PublicKey,
        context: &KeyContext,
    ) -> bool {
        let Some((verification_failed, data)) = self
            .binding
            .slot(|c| (c.verification_failed, c.verification_failed_data))
        else {
            return defaults::accept_verification_failed(file, key, context);
        };
        let file = c_text(file);
        let id = c_text(&key.id);
        let name = c_text(&key.name);
        let fingerprint = c_text(&key.fingerprint);
        let alias = c_text(&context.repo_alias);
        // SAFETY: as above.
        unsafe {
            verification_failed(
                file.as_ptr(),
                id.as_ptr(),
                name.as_ptr(),
                fingerprint.as_ptr(),
                alias.as_ptr(),
                data,
            )
        }
    }
}

impl DigestReport for SecurityAdapter {
    fn accept_no_digest(&self, file: &Path) -> bool {
        let Some((checksum_missing, data)) = self
            .binding
            .slot(|c| (c.checksum_missing, c.checksum_missing_data))
        else {
            return defaults::accept_digest();
        };
        let file = c_text(&file.to_string_lossy());
        // SAFETY: as above.
        unsafe { checksum_missing(file.as_ptr(), data) }
    }

    fn accept_unknown_digest(&self, file: &Path, name: &str) -> bool {
        let Some((checksum_unknown, data)) = self
            .binding
            .slot(|c| (c.checksum_unknown, c.checksum_unknown_data))
        else {
            return defaults::accept_digest();
        };
        let file = c_text(&file.to_string_lossy());
        let checksum = c_text(name);
        // SAFETY: as above.
        unsafe { checksum_unknown(file.as_ptr(), checksum.as_ptr(), data) }
    }

    fn accept_wrong_digest(&self, file: &Path, requested: &str, found: &str) -> bool {
        let Some((checksum_wrong, data)) = self
            .binding
            .slot(|c| (c.checksum_wrong, c.checksum_wrong_data))
        else {
            return defaults::accept_digest();
        };
        let file = c_text(&file.to_string_lossy());
        let expected = c_text(requested);
        let actual = c_text(found);
        // SAFETY: as above.
        unsafe { checksum_wrong(file.as_ptr(), expected.as_ptr(), actual.as_ptr(), data) }
    }
}
