use super::*;
use config::config::ConfyConfig;
use ODM::models::User;
use ODM::odm;

use chrono::{DateTime, Utc};
use log::{error, info};
use mongodb::bson::oid::ObjectId;
use rocket::http::{ContentType, Status};
use rocket::request::{FromRequest, Outcome, Request};
use rocket::response::{Responder, Response};
use serde_json::json;
use std::io::Cursor;

// Utils structs for rocket::manage
pub struct MongoState {
    pub db: mongodb::Database,
}

pub struct Config {
    pub config: ConfyConfig,
}

/// Message stashed by request guards so the error catchers can
/// reply with something more specific than the bare status
#[derive(Default, Clone)]
pub struct GuardMessage(pub Option<String>);

/// The authenticated caller, resolved from the Authorization header
pub struct ApiUser {
    pub user: User,
    pub token: String,
}

// Checking that a user is connected
#[rocket::async_trait]
impl<'r> FromRequest<'r> for ApiUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<ApiUser, ()> {
        let state = match request.rocket().state::<MongoState>() {
            Some(value) => value,
            None => return Outcome::Error((Status::InternalServerError, ())),
        };

        let header = match request.headers().get_one("Authorization") {
            Some(value) => value,
            None => return Outcome::Error((Status::Unauthorized, ())),
        };
        let token = match header.strip_prefix("Bearer ") {
            Some(value) => value.trim().to_string(),
            None => return Outcome::Error((Status::Unauthorized, ())),
        };

        let session = match odm::get_session(&state.db, &token).await {
            Ok(value) => value,
            Err(_) => return Outcome::Error((Status::InternalServerError, ())),
        };
        let session = match session {
            Some(value) => value,
            None => return Outcome::Error((Status::Unauthorized, ())),
        };

        let expired = DateTime::parse_from_rfc3339(&session.expires_at)
            .map(|value| value.with_timezone(&Utc) < Utc::now())
            .unwrap_or(true);
        if expired {
            return Outcome::Error((Status::Unauthorized, ()));
        }

        let user = match odm::get_user_by_id(&state.db, &session.user_id).await {
            Ok(Some(value)) => value,
            Ok(None) => return Outcome::Error((Status::Unauthorized, ())),
            Err(_) => return Outcome::Error((Status::InternalServerError, ())),
        };

        // Disabled accounts stay locked out, admins keep access.
        if !user.is_active && !user.is_admin {
            request.local_cache(|| {
                GuardMessage(Some(
                    "Your account has been disabled. Please contact support.".to_string(),
                ))
            });
            return Outcome::Error((Status::Forbidden, ()));
        }

        let route = match request.route() {
            None => "Unknown Route".to_string(),
            Some(value) => format!("{}", value),
        };
        info!("{}", format!("Client>>Server:\t{} is trying to access route: {} as {}", &user.email, route, request.method()));

        Outcome::Success(ApiUser { user, token })
    }
}

/// An error reply: HTTP status plus a JSON error envelope
pub struct ApiError {
    pub status: Status,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: &str) -> ApiError {
        ApiError { status: Status::BadRequest, message: message.to_string() }
    }

    pub fn unauthorized(message: &str) -> ApiError {
        ApiError { status: Status::Unauthorized, message: message.to_string() }
    }

    pub fn forbidden(message: &str) -> ApiError {
        ApiError { status: Status::Forbidden, message: message.to_string() }
    }

    pub fn not_found(message: &str) -> ApiError {
        ApiError { status: Status::NotFound, message: message.to_string() }
    }

    /// Database failure: logged once here so every handler reports
    /// the same way
    pub fn db(route: &rocket::Route, email: &str) -> ApiError {
        error!("{}", format!("Database failed while handling {} for {}", route, email));
        ApiError {
            status: Status::InternalServerError,
            message: "Internal server error".to_string(),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _request: &'r Request<'_>) -> rocket::response::Result<'static> {
        let body = json!({ "error": self.message }).to_string();
        Response::build()
            .status(self.status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

/// Rejects identifiers that cannot be a document id before any lookup
pub fn check_id(id: &str, what: &str) -> Result<(), ApiError> {
    match ObjectId::parse_str(id) {
        Ok(_) => Ok(()),
        Err(_) => Err(ApiError::bad_request(&format!("Invalid {} ID", what))),
    }
}

pub fn require_admin(user: &User) -> Result<(), ApiError> {
    if !user.is_admin {
        return Err(ApiError::forbidden("Admin access required"));
    }
    Ok(())
}

/// Campus domain gate for signups
pub fn email_domain_allowed(email: &str, domain: &str) -> bool {
    email.to_lowercase().ends_with(&domain.to_lowercase())
}
