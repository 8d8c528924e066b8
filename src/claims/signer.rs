use crate::claims::{Claims, SetupError, SignError};
use base64ct::{Base64UrlUnpadded, Encoding};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::{Signature, SigningKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::Serialize;
use sha2::Sha256;
use std::{fmt, fs, path::Path};

pub const ALGORITHM: &str = "RS256";

#[derive(Debug, Serialize)]
struct Header<'a> {
    alg: &'static str,
    typ: &'static str,
    kid: &'a str,
}

/// Signs claims assertions as compact RS256 JWTs.
#[derive(Clone)]
pub struct ClaimsSigner {
    signing_key: SigningKey<Sha256>,
    kid: String,
    issuer: String,
}

impl fmt::Debug for ClaimsSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsSigner")
            .field("kid", &self.kid)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

fn decode_private_key(pem_or_der: &[u8]) -> Result<RsaPrivateKey, SetupError> {
    if pem_or_der.starts_with(b"-----BEGIN") {
        let s = std::str::from_utf8(pem_or_der).map_err(|_| SetupError::KeyParse)?;
        return RsaPrivateKey::from_pkcs8_pem(s)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(s))
            .map_err(|_| SetupError::KeyParse);
    }

    RsaPrivateKey::from_pkcs8_der(pem_or_der)
        .or_else(|_| RsaPrivateKey::from_pkcs1_der(pem_or_der))
        .map_err(|_| SetupError::KeyParse)
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, SignError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

impl ClaimsSigner {
    /// # Errors
    ///
    /// Returns an error if the key is not an RSA private key in PKCS#8 or
    /// PKCS#1, PEM or DER.
    pub fn new(
        private_key_pem_or_der: &[u8],
        kid: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Result<Self, SetupError> {
        let private_key = decode_private_key(private_key_pem_or_der)?;

        Ok(Self {
            signing_key: SigningKey::<Sha256>::new(private_key),
            kid: kid.into(),
            issuer: issuer.into(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds no usable RSA key.
    pub fn from_file(
        path: &Path,
        kid: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Result<Self, SetupError> {
        let key = fs::read(path).map_err(|source| SetupError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::new(&key, kid, issuer)
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign `claims`, adding `iss`, `iat` and, when known, `aud`.
    ///
    /// # Errors
    ///
    /// Returns an error if the header or claims cannot be serialized.
    pub fn sign(
        &self,
        mut claims: Claims,
        audience: Option<&str>,
        issued_at: i64,
    ) -> Result<String, SignError> {
        claims.insert("iss".to_string(), self.issuer.clone().into());
        claims.insert("iat".to_string(), issued_at.into());
        if let Some(aud) = audience {
            claims.insert("aud".to_string(), aud.into());
        }

        let header = Header {
            alg: ALGORITHM,
            typ: "JWT",
            kid: &self.kid,
        };
        let signing_input = format!("{}.{}", b64e_json(&header)?, b64e_json(&claims)?);
        let signature: Signature = self.signing_key.sign(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&signature.to_vec());

        Ok(format!("{signing_input}.{signature_b64}"))
    }
}
