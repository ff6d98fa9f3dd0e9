use core::any::Any;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use exs_document::Element;

use crate::content::{ContentSerializer, TextConverter};
use crate::context::{Reading, Writing};
use crate::error::{Error, Result};
use crate::extension::{Composition, Extension, Target};

// -----------------------------------------------------------------------------
// Encryption

/// A reversible text transformation applied to encrypted members.
pub trait Encryption: Send + Sync + 'static {
    fn encrypt(&self, plain: &str) -> Result<String>;

    fn decrypt(&self, cipher: &str) -> Result<String>;
}

/// Base64 of the UTF-8 bytes. Obfuscation only; the default algorithm.
#[derive(Clone, Copy, Debug, Default)]
pub struct Base64Encryption;

impl Encryption for Base64Encryption {
    fn encrypt(&self, plain: &str) -> Result<String> {
        Ok(STANDARD.encode(plain.as_bytes()))
    }

    fn decrypt(&self, cipher: &str) -> Result<String> {
        let bytes = STANDARD
            .decode(cipher.trim())
            .map_err(|e| Error::format("encrypted text", e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| Error::format("encrypted text", e.to_string()))
    }
}

// -----------------------------------------------------------------------------
// Encrypt

/// Encrypts the text of its targets.
///
/// Uses the configured algorithm unless one is given here. Targets without
/// textual content fail the configuration build.
#[derive(Clone, Default)]
pub struct Encrypt {
    algorithm: Option<Arc<dyn Encryption>>,
}

impl Encrypt {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_algorithm(algorithm: impl Encryption) -> Self {
        Self {
            algorithm: Some(Arc::new(algorithm)),
        }
    }
}

impl Extension for Encrypt {
    fn kind(&self) -> &'static str {
        "encryption"
    }

    fn compose(
        &self,
        cx: &Composition<'_>,
        target: &Target<'_>,
        inner: Arc<dyn ContentSerializer>,
    ) -> Result<Arc<dyn ContentSerializer>> {
        if inner.text().is_none() {
            return Err(Error::contract(format!(
                "`{target}` cannot be encrypted: its content is not textual"
            )));
        }
        let algorithm = match &self.algorithm {
            Some(algorithm) => algorithm.clone(),
            None => cx.encryption.clone(),
        };
        Ok(Arc::new(EncryptedContent { inner, algorithm }))
    }
}

struct EncryptedContent {
    inner: Arc<dyn ContentSerializer>,
    algorithm: Arc<dyn Encryption>,
}

impl EncryptedContent {
    fn converter(&self) -> Result<&dyn TextConverter> {
        self.inner
            .text()
            .ok_or_else(|| Error::contract("encrypted content lost its text form"))
    }
}

impl TextConverter for EncryptedContent {
    fn format(&self, value: &dyn Any) -> Result<String> {
        let plain = self.converter()?.format(value)?;
        self.algorithm.encrypt(&plain)
    }

    fn parse(&self, text: &str) -> Result<Box<dyn Any>> {
        let plain = self.algorithm.decrypt(text)?;
        self.converter()?.parse(&plain)
    }
}

impl ContentSerializer for EncryptedContent {
    fn write(&self, cx: &mut Writing<'_>, value: &dyn Any) -> Result<()> {
        let text = TextConverter::format(self, value)?;
        cx.write_text(&text)
    }

    fn read(&self, _cx: &mut Reading<'_>, element: &Element) -> Result<Box<dyn Any>> {
        TextConverter::parse(self, &element.text()).map_err(|e| match e {
            Error::Format { message, .. } => Error::format(element.name(), message),
            other => other,
        })
    }

    fn text(&self) -> Option<&dyn TextConverter> {
        Some(self)
    }
}
