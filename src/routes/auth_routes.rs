use super::{*};

use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, SecondsFormat, Utc};
use log::info;
use mongodb::bson::Document;
use mongodb::Database;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde_json::{json, Value};

use json_format::json_format::serialize_user;
use ODM::models::*;
use ODM::odm;
use ODM::odm_utils::generate_session_token;

/// Create a bearer session for a user and hand back the token
async fn issue_session(db: &Database, user_id: &str, ttl_minutes: i64) -> mongodb::error::Result<String> {
    let token = generate_session_token();
    let expires_at = (Utc::now() + Duration::minutes(ttl_minutes))
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    odm::insert_session(db, &token, user_id, &expires_at).await?;
    Ok(token)
}

///
///Signup route
///
///INPUT:  email, password, name and role
///OUTPUT: a fresh bearer token plus the created user
///
#[post("/api/auth/signup", data = "<input>")]
async fn signup(
    input: Json<SignupInput>,
    db: &State<MongoState>,
    cfg: &State<Config>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    let email = input.email.trim().to_lowercase();

    if !email_domain_allowed(&email, &cfg.config.allowed_email_domain) {
        return Err(ApiError::bad_request(&format!(
            "Only {} emails are allowed",
            cfg.config.allowed_email_domain
        )));
    }
    if input.role != "rider" && input.role != "driver" {
        return Err(ApiError::bad_request("Role must be rider or driver"));
    }
    if input.password.is_empty() || input.name.is_empty() {
        return Err(ApiError::bad_request("Name and password are required"));
    }

    let existing = odm::get_user_by_email(&db.db, &email)
        .await
        .map_err(|_| ApiError::db(route, &email))?;
    if existing.is_some() {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let salt = SaltString::generate(&mut rand::thread_rng());
    let password_hash = Argon2::default()
        .hash_password(input.password.as_bytes(), &salt)
        .map_err(|_| ApiError::bad_request("Password could not be processed"))?
        .to_string();

    let user_id = odm::insert_user(&db.db, &email, &password_hash, &input.name, &input.role)
        .await
        .map_err(|_| ApiError::db(route, &email))?;
    let token = issue_session(&db.db, &user_id, cfg.config.token_ttl_minutes)
        .await
        .map_err(|_| ApiError::db(route, &email))?;

    info!("{}", format!("Server>>Client:\tRegistered {} as {}", &email, &input.role));
    Ok(Json(json!({
        "message": "User created successfully",
        "token": token,
        "user": {
            "id": user_id,
            "email": email,
            "name": input.name,
            "role": input.role,
            "is_admin": false,
            "verification_status": "unverified",
            "ride_count": 0,
        },
    })))
}

///
///Login route
///
///INPUT:  email and password
///OUTPUT: a fresh bearer token plus the serialized user
///
#[post("/api/auth/login", data = "<input>")]
async fn login(
    input: Json<LoginInput>,
    db: &State<MongoState>,
    cfg: &State<Config>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    let email = input.email.trim().to_lowercase();

    let user = odm::get_user_by_email(&db.db, &email)
        .await
        .map_err(|_| ApiError::db(route, &email))?;
    let user = match user {
        Some(value) => value,
        None => return Err(ApiError::unauthorized("Invalid email or password")),
    };

    let parsed_hash = match PasswordHash::new(&user.password_hash) {
        Ok(value) => value,
        Err(_) => return Err(ApiError::unauthorized("Invalid email or password")),
    };
    if Argon2::default()
        .verify_password(input.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    if !user.is_active {
        return Err(ApiError::forbidden(
            "Your account has been disabled. Please contact support.",
        ));
    }

    let token = issue_session(&db.db, &user.id, cfg.config.token_ttl_minutes)
        .await
        .map_err(|_| ApiError::db(route, &email))?;
    let user_value = serialize_user(&db.db, &user)
        .await
        .map_err(|_| ApiError::db(route, &email))?;

    info!("{}", format!("Server>>Client:\tLogged in {}", &email));
    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": user_value,
    })))
}

///
///Logout route, deletes the presented session
///
#[post("/api/auth/logout")]
async fn logout(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    odm::delete_session(&db.db, &auth.token)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    Ok(Json(json!({ "message": "Logged out" })))
}

/// The authenticated caller, fully serialized
#[get("/api/auth/me")]
async fn me(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    let user_value = serialize_user(&db.db, &auth.user)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    Ok(Json(json!({ "user": user_value })))
}

#[get("/api/profile")]
async fn get_profile(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    let user_value = serialize_user(&db.db, &auth.user)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    Ok(Json(json!({ "user": user_value })))
}

///
///Profile update route
///
///INPUT:  any of name, role, vehicle details, branch, academic year
///OUTPUT: the updated serialized user
///
#[put("/api/profile", data = "<input>")]
async fn update_profile(
    auth: ApiUser,
    input: Json<ProfileUpdate>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    let mut fields = Document::new();

    if let Some(name) = &input.name {
        if !name.is_empty() {
            fields.insert("name", name.clone());
        }
    }
    if let Some(role) = &input.role {
        if role == "rider" || role == "driver" {
            fields.insert("role", role.clone());
        }
    }
    if let Some(vehicle_model) = &input.vehicle_model {
        fields.insert("vehicle_model", vehicle_model.clone());
    }
    if let Some(vehicle_number) = &input.vehicle_number {
        fields.insert("vehicle_number", vehicle_number.clone());
    }
    if let Some(vehicle_color) = &input.vehicle_color {
        fields.insert("vehicle_color", vehicle_color.clone());
    }
    if let Some(branch) = &input.branch {
        if config::config::branch_name(branch).is_none() {
            return Err(ApiError::bad_request("Invalid branch"));
        }
        fields.insert("branch", branch.clone());
    }
    if let Some(academic_year) = &input.academic_year {
        if config::config::academic_year_name(academic_year).is_none() {
            return Err(ApiError::bad_request("Invalid academic year"));
        }
        fields.insert("academic_year", academic_year.clone());
    }

    if !fields.is_empty() {
        odm::update_user_fields(&db.db, &auth.user.id, fields)
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
    }

    let updated = odm::get_user_by_id(&db.db, &auth.user.id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let user_value = serialize_user(&db.db, &updated)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    Ok(Json(json!({ "message": "Profile updated", "user": user_value })))
}

pub fn routes() -> Vec<Route> {
    return routes![signup, login, logout, me, get_profile, update_profile];
}
