//! Acting-user extraction from trusted gateway headers.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Donor,
    Receiver,
    NgoVolunteer,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "donor" => Some(Role::Donor),
            "receiver" => Some(Role::Receiver),
            "ngo_volunteer" => Some(Role::NgoVolunteer),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Donor => "donor",
            Role::Receiver => "receiver",
            Role::NgoVolunteer => "ngo_volunteer",
            Role::Admin => "admin",
        }
    }
}

/// Roles allowed to ask for food
pub const REQUESTING_ROLES: &[Role] = &[Role::Receiver, Role::NgoVolunteer];

/// User on whose behalf the request is made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser {
    pub id: Uuid,
    pub role: Role,
}

impl ActingUser {
    /// Reject the call unless the user holds one of `roles`
    pub fn require_any(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "Role '{}' is not allowed to perform this action",
                self.role.as_str()
            )))
        }
    }

    pub fn require(&self, role: Role) -> Result<(), AppError> {
        self.require_any(&[role])
    }
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|h| h.to_str().ok())
}

fn extract(req: &HttpRequest) -> Result<ActingUser, AppError> {
    let id = header(req, USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized("User ID missing".to_string()))?;
    let id = Uuid::parse_str(id.trim())
        .map_err(|_| AppError::Unauthorized("Invalid user ID".to_string()))?;

    let role = header(req, USER_ROLE_HEADER)
        .ok_or_else(|| AppError::Unauthorized("User role missing".to_string()))?;
    let role = Role::parse(role.trim())
        .ok_or_else(|| AppError::Unauthorized("Invalid user role".to_string()))?;

    Ok(ActingUser { id, role })
}

impl FromRequest for ActingUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(extract(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_extracts_identity_headers() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, id.to_string()))
            .insert_header((USER_ROLE_HEADER, "ngo_volunteer"))
            .to_http_request();

        let user = extract(&req).unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::NgoVolunteer);
        assert!(user.require_any(REQUESTING_ROLES).is_ok());
        assert!(user.require(Role::Donor).is_err());
    }

    #[test]
    fn test_missing_or_malformed_headers_are_unauthorized() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(extract(&req), Err(AppError::Unauthorized(_))));

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "not-a-uuid"))
            .insert_header((USER_ROLE_HEADER, "donor"))
            .to_http_request();
        assert!(matches!(extract(&req), Err(AppError::Unauthorized(_))));

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .insert_header((USER_ROLE_HEADER, "superuser"))
            .to_http_request();
        assert!(matches!(extract(&req), Err(AppError::Unauthorized(_))));
    }
}
