//! Relational store credentials as stored in the secret store.

use serde::{Deserialize, Deserializer};
use std::fmt;

/// Connection credentials for the metadata database.
///
/// Fetched fresh for every invocation and never persisted. `Debug` redacts
/// the password so the struct is safe to carry through traced spans.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub dbname: String,
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
}

impl Credentials {
    /// Parse the JSON secret string. Unknown fields are ignored.
    pub fn from_secret_string(secret: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(secret)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("dbname", &self.dbname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .finish()
    }
}

/// Secrets written by hand often carry the port as a string.
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse::<u16>()
            .map_err(|err| serde::de::Error::custom(format!("invalid port `{text}`: {err}"))),
    }
}
