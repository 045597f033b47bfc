use axum::http::HeaderValue;
use eyre::{eyre, Error};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub struct Jwt {
    decode: DecodingKey,
    encode: EncodingKey,
    validation: Validation,
    header: Header,
}

impl Jwt {
    pub fn new(secret: &str) -> Self {
        Jwt {
            decode: DecodingKey::from_secret(secret.as_bytes()),
            encode: EncodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            header: Header::default(),
        }
    }

    /// Decodes the claims of a `Bearer` authorization header.
    pub fn claims<C: DeserializeOwned>(&self, header: &HeaderValue) -> Result<C, Error> {
        let token = header
            .to_str()?
            .strip_prefix("Bearer ")
            .ok_or_else(|| eyre!("No Bearer"))?;
        Ok(jsonwebtoken::decode::<C>(token, &self.decode, &self.validation)?.claims)
    }

    pub fn make_jwt<C: Serialize>(&self, claims: &C) -> Result<JwtToken, Error> {
        let token = jsonwebtoken::encode(&self.header, claims, &self.encode)?;
        Ok(JwtToken { token })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtToken {
    pub token: String,
}
