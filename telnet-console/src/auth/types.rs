//! Auth domain types: AccessLevel, Credential, LoginRecord
//!
//! Serializable, cloneable, and cheap to pass around.

use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::ConsoleError;

/// Access tiers, ordered from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    Player,
    Counselor,
    GameMaster,
    Seer,
    Administrator,
    Developer,
    Owner,
}

impl AccessLevel {
    pub const ALL: [AccessLevel; 7] = [
        Self::Player,
        Self::Counselor,
        Self::GameMaster,
        Self::Seer,
        Self::Administrator,
        Self::Developer,
        Self::Owner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player => "Player",
            Self::Counselor => "Counselor",
            Self::GameMaster => "GameMaster",
            Self::Seer => "Seer",
            Self::Administrator => "Administrator",
            Self::Developer => "Developer",
            Self::Owner => "Owner",
        }
    }

    /// Case-insensitive parse; accepts the tier name or its numeric level
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u8>() {
            return Self::ALL.get(n as usize).copied();
        }
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .or_else(|| match s.to_ascii_lowercase().as_str() {
                "gm" => Some(Self::GameMaster),
                "admin" => Some(Self::Administrator),
                "dev" => Some(Self::Developer),
                _ => None,
            })
    }

    /// Permission level (higher = more access)
    pub fn level(&self) -> u8 {
        *self as u8
    }

    /// Check if this tier has at least the permissions of `required`
    pub fn has_permission(&self, required: AccessLevel) -> bool {
        self.level() >= required.level()
    }
}

impl FromStr for AccessLevel {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ConsoleError::UnknownAccessLevel(s.to_string()))
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator credential as held by the credential store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Username as registered (lookups are case-insensitive)
    pub username: String,
    pub password_digest: String,
    pub access: AccessLevel,
    pub last_login: Option<DateTime<Local>>,
    pub login_count: u64,
}

impl Credential {
    pub fn new(username: impl Into<String>, password_digest: String, access: AccessLevel) -> Self {
        Self {
            username: username.into(),
            password_digest,
            access,
            last_login: None,
            login_count: 0,
        }
    }

    /// Store key for a username
    pub fn key(username: &str) -> String {
        username.trim().to_lowercase()
    }
}

/// Result of a successful credential check
#[derive(Debug, Clone)]
pub struct LoginRecord {
    pub username: String,
    pub access: AccessLevel,
    /// Login before this one, `None` on first login
    pub previous_login: Option<DateTime<Local>>,
    pub login_count: u64,
}

/// Credential summary without the digest, for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSummary {
    pub username: String,
    pub access: AccessLevel,
    pub last_login: Option<DateTime<Local>>,
    pub login_count: u64,
}

impl From<&Credential> for CredentialSummary {
    fn from(c: &Credential) -> Self {
        Self {
            username: c.username.clone(),
            access: c.access,
            last_login: c.last_login,
            login_count: c.login_count,
        }
    }
}
