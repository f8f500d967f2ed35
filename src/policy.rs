//! Role-based access policy and bearer credentials.
//!
//! Every operation declares the roles allowed to perform it. Credentials are
//! HS256 tokens carrying the subject and role with a fixed one-hour validity.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{ComplianceError, ComplianceResult};

/// Validity window of an issued credential, in seconds.
pub const TOKEN_VALIDITY_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Collector,
    Admin,
}

impl FromStr for Role {
    type Err = ComplianceError;

    fn from_str(input: &str) -> Result<Role, Self::Err> {
        match input.to_lowercase().as_str() {
            "collector" => Ok(Role::Collector),
            "admin" => Ok(Role::Admin),
            other => Err(ComplianceError::validation(
                "role",
                format!("unknown role '{other}'"),
            )),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Collector => write!(f, "collector"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Operations guarded by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Ingest,
    ListLogs,
    ReadLog,
    DeleteLog,
    VerifyLog,
    Stats,
    Trends,
    ViolationBreakdown,
    RecentViolations,
}

impl Operation {
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Operation::Ingest => &[Role::Collector, Role::Admin],
            Operation::ListLogs
            | Operation::ReadLog
            | Operation::DeleteLog
            | Operation::VerifyLog
            | Operation::Stats
            | Operation::Trends
            | Operation::ViolationBreakdown
            | Operation::RecentViolations => &[Role::Admin],
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Ingest => "ingest",
            Operation::ListLogs => "list_logs",
            Operation::ReadLog => "read_log",
            Operation::DeleteLog => "delete_log",
            Operation::VerifyLog => "verify_log",
            Operation::Stats => "stats",
            Operation::Trends => "trends",
            Operation::ViolationBreakdown => "violation_breakdown",
            Operation::RecentViolations => "recent_violations",
        };
        f.write_str(name)
    }
}

/// Claims carried by a bearer credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username the credential was issued to.
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Gate an operation on the caller's role.
pub fn authorize(claims: &Claims, operation: Operation) -> ComplianceResult<()> {
    if operation.permits(claims.role) {
        Ok(())
    } else {
        tracing::warn!(
            "Denied {} for subject={} role={}",
            operation,
            claims.sub,
            claims.role
        );
        Err(ComplianceError::forbidden(claims.role, operation))
    }
}

/// Issues and validates bearer credentials.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> ComplianceResult<Self> {
        if secret.trim().is_empty() {
            return Err(ComplianceError::config("jwt_secret must be set"));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn issue(&self, subject: &str, role: Role) -> ComplianceResult<String> {
        let now = Utc::now().timestamp();
        self.issue_at(subject, role, now)
    }

    /// Issue a credential as if it had been minted at `issued_at` (unix seconds).
    pub fn issue_at(&self, subject: &str, role: Role, issued_at: i64) -> ComplianceResult<String> {
        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat: issued_at,
            exp: issued_at + TOKEN_VALIDITY_SECS,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn validate(&self, token: &str) -> ComplianceResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> ComplianceResult<&str> {
    let header = header.ok_or_else(|| ComplianceError::auth("missing Authorization header"))?;
    match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(ComplianceError::auth(
            "expected Authorization: Bearer <token>",
        )),
    }
}

/// Looks up login credentials.
pub trait CredentialStore: Send + Sync {
    /// Role of the user when the password matches, `None` otherwise.
    fn authenticate(&self, username: &str, password: &str) -> Option<Role>;
}

/// A configured user entry; passwords are kept as SHA-256 hex digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,
    pub password_sha256: String,
    pub role: Role,
}

pub fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

/// Credential store backed by a fixed user list.
pub struct StaticCredentialStore {
    users: HashMap<String, (String, Role)>,
}

impl StaticCredentialStore {
    pub fn new(entries: &[UserEntry]) -> Self {
        let users = entries
            .iter()
            .map(|u| {
                (
                    u.username.clone(),
                    (u.password_sha256.to_lowercase(), u.role),
                )
            })
            .collect();
        Self { users }
    }

    /// Build a store from plaintext pairs. Intended for fixtures.
    pub fn from_plaintext(entries: &[(&str, &str, Role)]) -> Self {
        let users: Vec<UserEntry> = entries
            .iter()
            .map(|(name, password, role)| UserEntry {
                username: name.to_string(),
                password_sha256: hash_password(password),
                role: *role,
            })
            .collect();
        Self::new(&users)
    }
}

impl CredentialStore for StaticCredentialStore {
    fn authenticate(&self, username: &str, password: &str) -> Option<Role> {
        let (digest, role) = self.users.get(username)?;
        (hash_password(password) == *digest).then_some(*role)
    }
}
