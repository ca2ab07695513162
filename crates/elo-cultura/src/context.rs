//! Explicit per-request identity threaded into every core operation.
//!
//! Session handling lives upstream (the auth gateway validates the session and forwards the
//! resolved tenant, user and role as headers). Services never look identity up ambiently; they
//! receive a [`RequestContext`] and filter every read and write by its tenant.

use std::fmt;
use std::str::FromStr;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::ids::{TenantId, UserId};

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Proponente,
    Avaliador,
    Gestor,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Proponente => "proponente",
            Self::Avaliador => "avaliador",
            Self::Gestor => "gestor",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Gestor, admin and super-admin may run privileged edital operations.
    pub const fn is_manager(self) -> bool {
        matches!(self, Self::Gestor | Self::Admin | Self::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "proponente" => Ok(Self::Proponente),
            "avaliador" => Ok(Self::Avaliador),
            "gestor" => Ok(Self::Gestor),
            "admin" => Ok(Self::Admin),
            "super_admin" | "superadmin" | "super-admin" => Ok(Self::SuperAdmin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub tenant_id: TenantId,
    pub actor_id: UserId,
    pub role: Role,
}

impl RequestContext {
    pub fn new(tenant_id: TenantId, actor_id: UserId, role: Role) -> Self {
        Self {
            tenant_id,
            actor_id,
            role,
        }
    }

    pub fn require_manager(&self, action: &'static str) -> Result<(), AccessDenied> {
        if self.role.is_manager() {
            Ok(())
        } else {
            Err(AccessDenied {
                role: self.role,
                action,
            })
        }
    }

    pub fn require_role(&self, role: Role, action: &'static str) -> Result<(), AccessDenied> {
        if self.role == role {
            Ok(())
        } else {
            Err(AccessDenied {
                role: self.role,
                action,
            })
        }
    }
}

/// Raised when the actor's role does not allow the requested operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("role {role} is not allowed to {action}")]
pub struct AccessDenied {
    pub role: Role,
    pub action: &'static str,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id = header_value(parts, TENANT_HEADER)?;
        let actor_id = header_value(parts, USER_HEADER)?;
        let role = header_value(parts, ROLE_HEADER)?;
        Ok(Self::new(tenant_id, actor_id, role))
    }
}

fn header_value<T: FromStr>(parts: &Parts, name: &'static str) -> Result<T, Response> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.parse::<T>().ok())
        .ok_or_else(|| unauthenticated(name))
}

fn unauthenticated(header: &'static str) -> Response {
    let payload = json!({
        "error": format!("missing or invalid {header} header"),
    });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}
