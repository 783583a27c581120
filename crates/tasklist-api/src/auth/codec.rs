//! Token codecs
//!
//! A token is a claim set signed as an RS256 JWS, then wrapped in a compact
//! JWE (`RSA-OAEP-256` key management, `A256GCM` content encryption) so that
//! holders without the private key cannot read it.
//!
//! The two roles are separate traits so either algorithm can be replaced
//! without touching the authority or the middleware.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use super::keys::{KeyError, RsaKeyPair};
use super::token::Claims;

const JWE_ALG: &str = "RSA-OAEP-256";
const JWE_ENC: &str = "A256GCM";
const JWE_CONTENT_TYPE: &str = "JWT";
const CEK_LEN: usize = 32;
const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Codec failures. Callers outside this module only ever see them collapsed.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("signing failed: {0}")]
    Sign(String),

    #[error("signature rejected: {0}")]
    Signature(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Produces and checks an integrity-protected encoding of a claim set
pub trait Signer: Send + Sync {
    fn sign(&self, claims: &Claims) -> Result<String, CodecError>;

    /// Check the signature and return the embedded claims. Time and issuer
    /// checks are left to the caller.
    fn verify(&self, signed: &str) -> Result<Claims, CodecError>;
}

/// Hides a payload from anyone without the decryption key
pub trait Encrypter: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<String, CodecError>;

    fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, CodecError>;
}

/// Turns a claim set into an opaque token string and back
pub trait TokenCodec: Send + Sync {
    fn encode(&self, claims: &Claims) -> Result<String, CodecError>;

    fn decode(&self, token: &str) -> Result<Claims, CodecError>;
}

/// RS256 JWS signer backed by `jsonwebtoken`
pub struct Rs256Signer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Rs256Signer {
    pub fn new(keys: &RsaKeyPair) -> Result<Self, KeyError> {
        let private_der = keys
            .private_key()
            .to_pkcs1_der()
            .map_err(|e| KeyError::Unparseable(e.to_string()))?;
        let public_der = keys
            .public_key()
            .to_pkcs1_der()
            .map_err(|e| KeyError::Unparseable(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["iss", "sub", "exp"]);

        Ok(Self {
            encoding: EncodingKey::from_rsa_der(private_der.as_bytes()),
            decoding: DecodingKey::from_rsa_der(public_der.as_bytes()),
            validation,
        })
    }
}

impl Signer for Rs256Signer {
    fn sign(&self, claims: &Claims) -> Result<String, CodecError> {
        encode(&Header::new(Algorithm::RS256), claims, &self.encoding)
            .map_err(|e| CodecError::Sign(e.to_string()))
    }

    fn verify(&self, signed: &str) -> Result<Claims, CodecError> {
        decode::<Claims>(signed, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| CodecError::Signature(e.to_string()))
    }
}

/// JWE protected header
#[derive(Debug, Serialize, Deserialize)]
struct JweHeader {
    alg: String,
    enc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cty: Option<String>,
}

/// Compact JWE with `RSA-OAEP-256` key wrapping and `A256GCM` content encryption
pub struct RsaOaepEncrypter {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl RsaOaepEncrypter {
    pub fn new(keys: &RsaKeyPair) -> Self {
        Self {
            private: keys.private_key().clone(),
            public: keys.public_key().clone(),
        }
    }
}

impl Encrypter for RsaOaepEncrypter {
    fn encrypt(&self, plaintext: &[u8]) -> Result<String, CodecError> {
        let header = JweHeader {
            alg: JWE_ALG.to_string(),
            enc: JWE_ENC.to_string(),
            cty: Some(JWE_CONTENT_TYPE.to_string()),
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| CodecError::Encrypt(e.to_string()))?;
        let header_b64 = URL_SAFE_NO_PAD.encode(header_json);

        // Fresh content key and IV for every token
        let mut cek = [0u8; CEK_LEN];
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut cek);
        OsRng.fill_bytes(&mut iv);

        let encrypted_key = self
            .public
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &cek)
            .map_err(|e| CodecError::Encrypt(e.to_string()))?;

        let cipher =
            Aes256Gcm::new_from_slice(&cek).map_err(|e| CodecError::Encrypt(e.to_string()))?;
        let mut sealed = cipher
            .encrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: plaintext,
                    aad: header_b64.as_bytes(),
                },
            )
            .map_err(|_| CodecError::Encrypt("content encryption failed".to_string()))?;
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(format!(
            "{}.{}.{}.{}.{}",
            header_b64,
            URL_SAFE_NO_PAD.encode(encrypted_key),
            URL_SAFE_NO_PAD.encode(iv),
            URL_SAFE_NO_PAD.encode(sealed),
            URL_SAFE_NO_PAD.encode(tag),
        ))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, CodecError> {
        let parts: Vec<&str> = ciphertext.split('.').collect();
        let [header_b64, key_b64, iv_b64, body_b64, tag_b64] = parts[..] else {
            return Err(CodecError::Malformed(format!(
                "expected 5 segments, found {}",
                parts.len()
            )));
        };

        let header: JweHeader = serde_json::from_slice(&b64_decode(header_b64)?)
            .map_err(|e| CodecError::Malformed(format!("header: {e}")))?;
        if header.alg != JWE_ALG || header.enc != JWE_ENC {
            return Err(CodecError::Malformed(format!(
                "unsupported algorithms {}/{}",
                header.alg, header.enc
            )));
        }

        let cek = self
            .private
            .decrypt_blinded(&mut OsRng, Oaep::new::<Sha256>(), &b64_decode(key_b64)?)
            .map_err(|e| CodecError::Decrypt(e.to_string()))?;
        if cek.len() != CEK_LEN {
            return Err(CodecError::Decrypt("content key has wrong length".to_string()));
        }

        let iv = b64_decode(iv_b64)?;
        if iv.len() != IV_LEN {
            return Err(CodecError::Malformed("IV has wrong length".to_string()));
        }
        let tag = b64_decode(tag_b64)?;
        if tag.len() != TAG_LEN {
            return Err(CodecError::Malformed("tag has wrong length".to_string()));
        }
        let mut sealed = b64_decode(body_b64)?;
        sealed.extend_from_slice(&tag);

        let cipher =
            Aes256Gcm::new_from_slice(&cek).map_err(|e| CodecError::Decrypt(e.to_string()))?;
        cipher
            .decrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: &sealed,
                    aad: header_b64.as_bytes(),
                },
            )
            .map_err(|_| CodecError::Decrypt("authentication tag mismatch".to_string()))
    }
}

fn b64_decode(segment: &str) -> Result<Vec<u8>, CodecError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| CodecError::Malformed(e.to_string()))
}

/// Signs with `S`, then encrypts the signed artifact with `E`
pub struct SignThenEncrypt<S, E> {
    signer: S,
    encrypter: E,
}

impl<S: Signer, E: Encrypter> SignThenEncrypt<S, E> {
    pub fn new(signer: S, encrypter: E) -> Self {
        Self { signer, encrypter }
    }
}

/// The default codec: RS256 inside RSA-OAEP-256/A256GCM, one keypair for both
pub type RsaTokenCodec = SignThenEncrypt<Rs256Signer, RsaOaepEncrypter>;

impl RsaTokenCodec {
    pub fn from_key_pair(keys: &RsaKeyPair) -> Result<Self, KeyError> {
        Ok(Self::new(Rs256Signer::new(keys)?, RsaOaepEncrypter::new(keys)))
    }
}

impl<S: Signer, E: Encrypter> TokenCodec for SignThenEncrypt<S, E> {
    fn encode(&self, claims: &Claims) -> Result<String, CodecError> {
        let signed = self.signer.sign(claims)?;
        self.encrypter.encrypt(signed.as_bytes())
    }

    fn decode(&self, token: &str) -> Result<Claims, CodecError> {
        let plaintext = self.encrypter.decrypt(token)?;
        let signed = String::from_utf8(plaintext)
            .map_err(|_| CodecError::Malformed("payload is not UTF-8".to_string()))?;
        self.signer.verify(&signed)
    }
}
