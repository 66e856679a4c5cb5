//! How requests map to sessions

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Session keying strategy, fixed per process
///
/// `Token` mints an opaque token on each detection and hands it back; the
/// caller must resend it with every question. `Address` keys on the peer IP,
/// so every client behind one NAT shares a single session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKeyStrategy {
    #[default]
    Token,
    Address,
}

/// Key assigned to a fresh detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedKey {
    pub key: String,
    /// Present under `Token`; returned to the caller
    pub token: Option<String>,
}

impl SessionKeyStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Address => "address",
        }
    }

    pub fn issue(&self, peer: SocketAddr) -> IssuedKey {
        match self {
            Self::Token => {
                let token = uuid::Uuid::new_v4().simple().to_string();
                IssuedKey {
                    key: token.clone(),
                    token: Some(token),
                }
            }
            Self::Address => IssuedKey {
                key: peer.ip().to_string(),
                token: None,
            },
        }
    }

    /// Key for a question; `None` when the caller presented nothing usable
    pub fn resolve(&self, peer: SocketAddr, token: Option<&str>) -> Option<String> {
        match self {
            Self::Token => token
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            Self::Address => Some(peer.ip().to_string()),
        }
    }
}
