// Canonical form and the signature field lifecycle shared by transactions and packets

use crate::error::Result;
use serde::Serialize;
use std::ops::Deref;

/// An entity that carries its own signature field.
///
/// The canonical form is the entity serialized with the signature field
/// present. Signing and verification always run over the canonical form
/// with the signature field blanked.
pub trait Signable {
    /// Current signature (empty while unsigned)
    fn signature(&self) -> &str;

    /// Mutable access to the signature field
    fn signature_mut(&mut self) -> &mut String;

    /// Serialize to canonical JSON
    fn canonical_form(&self, indent: bool) -> Result<String>;

    /// Whether a signature is present
    fn is_signed(&self) -> bool {
        !self.signature().is_empty()
    }
}

/// Serialize with the crate-wide JSON settings
pub fn to_json<T: Serialize + ?Sized>(value: &T, indent: bool) -> Result<String> {
    let json = if indent {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

/// Scoped blanking of a signature field.
///
/// Takes the signature out of the entity on construction and puts it back
/// when dropped, however the enclosing scope is left.
pub struct BlankedSignature<'a, T: Signable + ?Sized> {
    entity: &'a mut T,
    saved: String,
}

impl<'a, T: Signable + ?Sized> BlankedSignature<'a, T> {
    pub fn new(entity: &'a mut T) -> Self {
        let saved = std::mem::take(entity.signature_mut());
        Self { entity, saved }
    }

    /// The signature that was removed
    pub fn saved(&self) -> &str {
        &self.saved
    }
}

impl<T: Signable + ?Sized> Deref for BlankedSignature<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.entity
    }
}

impl<T: Signable + ?Sized> Drop for BlankedSignature<'_, T> {
    fn drop(&mut self) {
        *self.entity.signature_mut() = std::mem::take(&mut self.saved);
    }
}
