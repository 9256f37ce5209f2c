//! SCRAM-SHA-256 authentication (RFC 5802).
//!
//! The PBKDF2 step is precomputed: configuration carries the salted
//! password directly, so the exchange only needs HMAC and SHA-256. All
//! methods are pure string-to-string transforms; connection I/O lives in
//! `connection`.

use crate::config::{AuthConfig, ConfigError};
use crate::error::ServerError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// The gs2 header for clients that neither support nor use channel
/// binding, and its base64 echo in the client-final message.
const GS2_HEADER: &str = "n,,";
const CHANNEL_BINDING: &str = "c=biws,";

/// Server-side SCRAM credentials: the admin username, the advertised salt
/// and iteration count, and the precomputed salted password.
#[derive(Debug, Clone)]
pub struct ScramCredentials {
    username: String,
    salt: String,
    iterations: u32,
    salted_password: [u8; 32],
}

impl ScramCredentials {
    /// Builds credentials from configuration, decoding the stored salted
    /// password.
    pub fn from_config(auth: &AuthConfig) -> Result<Self, ConfigError> {
        auth.validate()?;
        let decoded = BASE64.decode(&auth.password_hash).map_err(|e| {
            ConfigError::ValidationError(format!("auth.password_hash is not valid base64: {e}"))
        })?;
        let salted_password: [u8; 32] = decoded.try_into().map_err(|v: Vec<u8>| {
            ConfigError::ValidationError(format!(
                "auth.password_hash must decode to 32 bytes, got {}",
                v.len()
            ))
        })?;

        Ok(Self {
            username: auth.username.clone(),
            salt: auth.password_salt.clone(),
            iterations: auth.iterations,
            salted_password,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// One connection's SCRAM exchange. The accumulated auth-message and the
/// nonces exist only while the handshake is in flight.
pub struct ScramExchange {
    credentials: Arc<ScramCredentials>,
    auth_message: String,
    client_nonce: String,
    server_nonce: String,
}

impl ScramExchange {
    pub fn new(credentials: Arc<ScramCredentials>) -> Self {
        Self {
            credentials,
            auth_message: String::new(),
            client_nonce: String::new(),
            server_nonce: String::new(),
        }
    }

    /// Consumes the client-first authentication string:
    /// `n,,n=<user>,r=<client-nonce>`.
    pub fn client_first(&mut self, authentication: &str) -> Result<(), ServerError> {
        let body = authentication
            .strip_prefix(GS2_HEADER)
            .ok_or_else(|| ServerError::AuthFormat("invalid authentication encoding".into()))?;

        self.auth_message = body.to_string();
        for attr in body.split(',') {
            let Some((key, value)) = attr.split_once('=') else {
                return Err(ServerError::AuthFormat(format!(
                    "invalid authentication attribute: {attr:?}"
                )));
            };
            match key {
                "n" => {
                    if value != self.credentials.username {
                        return Err(ServerError::AuthRejected(format!(
                            "username must be {:?}",
                            self.credentials.username
                        )));
                    }
                }
                "r" => self.client_nonce = value.to_string(),
                _ => {
                    return Err(ServerError::AuthFormat(format!(
                        "invalid authentication attribute key: {key:?}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Produces the server-first authentication string:
    /// `r=<combined-nonce>,s=<salt>,i=<iterations>`.
    pub fn server_first(&mut self) -> String {
        let mut nonce = [0u8; 18];
        rand::thread_rng().fill_bytes(&mut nonce);
        self.server_first_with_nonce(nonce)
    }

    fn server_first_with_nonce(&mut self, nonce: [u8; 18]) -> String {
        self.server_nonce = format!("{}{}", self.client_nonce, BASE64.encode(nonce));

        let authentication = format!(
            "r={},s={},i={}",
            self.server_nonce, self.credentials.salt, self.credentials.iterations
        );
        self.auth_message.push(',');
        self.auth_message.push_str(&authentication);
        authentication
    }

    /// Verifies the client-final authentication string
    /// (`c=biws,r=<nonce>,p=<proof>`) and, on success, returns the
    /// server-final string `v=<server-signature>`.
    pub fn client_final(&mut self, authentication: &str) -> Result<String, ServerError> {
        let client_key = hmac_sha256(&self.credentials.salted_password, b"Client Key");
        let stored_key: [u8; 32] = Sha256::digest(client_key).into();

        // Everything before the proof itself is part of the auth-message,
        // channel-binding echo included.
        let proof_at = authentication.find(",p=").ok_or_else(|| {
            ServerError::AuthFormat("missing client proof".into())
        })?;
        self.auth_message.push(',');
        self.auth_message.push_str(&authentication[..proof_at]);

        let client_signature = hmac_sha256(&stored_key, self.auth_message.as_bytes());
        let expected_proof: Vec<u8> = client_key
            .iter()
            .zip(client_signature.iter())
            .map(|(k, s)| k ^ s)
            .collect();
        let expected_proof = BASE64.encode(expected_proof);

        let attributes = authentication
            .strip_prefix(CHANNEL_BINDING)
            .ok_or_else(|| ServerError::AuthFormat("invalid authentication encoding".into()))?;

        let (mut valid_nonce, mut valid_proof) = (false, false);
        for attr in attributes.split(',') {
            let Some((key, value)) = attr.split_once('=') else {
                return Err(ServerError::AuthFormat(format!(
                    "invalid authentication attribute: {attr:?}"
                )));
            };
            match key {
                "r" => {
                    if value != self.server_nonce {
                        return Err(ServerError::AuthRejected("invalid server nonce".into()));
                    }
                    valid_nonce = true;
                }
                "p" => {
                    if value != expected_proof {
                        return Err(ServerError::AuthRejected("invalid client proof".into()));
                    }
                    valid_proof = true;
                }
                _ => {
                    return Err(ServerError::AuthFormat(format!(
                        "invalid authentication attribute key: {key:?}"
                    )));
                }
            }
        }
        if !(valid_nonce && valid_proof) {
            return Err(ServerError::AuthFormat(
                "missing authentication attributes".into(),
            ));
        }

        let server_key = hmac_sha256(&self.credentials.salted_password, b"Server Key");
        let server_signature = hmac_sha256(&server_key, self.auth_message.as_bytes());
        Ok(format!("v={}", BASE64.encode(server_signature)))
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}
