use super::{*};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use log::info;
use mongodb::bson::doc;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde_json::{json, Value};

use ODM::models::*;
use ODM::odm;
use ODM::odm_utils::now_rfc3339;

///
///Student ID upload route
///
///The image arrives as a base64 data URL; the payload has to decode
///before the verification moves to pending.
///
#[post("/api/verification/upload", data = "<input>")]
async fn upload(
    auth: ApiUser,
    input: Json<VerificationUpload>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    if auth.user.is_admin {
        return Err(ApiError::bad_request("Admins do not need verification"));
    }

    if !input.student_id_image.starts_with("data:image/") {
        return Err(ApiError::bad_request("Invalid image format. Please upload a valid image."));
    }
    let payload = input
        .student_id_image
        .split(',')
        .nth(1)
        .unwrap_or(input.student_id_image.as_str());
    if BASE64_STANDARD.decode(payload).is_err() {
        return Err(ApiError::bad_request("Invalid image data"));
    }

    odm::update_user_fields(
        &db.db,
        &auth.user.id,
        doc! {
            "student_id_image": input.student_id_image.clone(),
            "verification_status": "pending",
            "rejection_reason": None::<String>,
            "submitted_at": now_rfc3339(),
        },
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    info!("{}", format!("Server>>Client:\tVerification submitted by {}", &auth.user.email));
    Ok(Json(json!({ "message": "Student ID uploaded successfully. Awaiting admin verification." })))
}

/// The caller's own verification state
#[get("/api/verification/status")]
async fn status(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    let user = odm::get_user_by_id(&db.db, &auth.user.id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(json!({
        "verification_status": user.verification_status,
        "rejection_reason": user.rejection_reason,
        "verified_at": user.verified_at,
        "submitted_at": user.submitted_at,
        "has_uploaded_id": user.student_id_image.is_some(),
    })))
}

/// Pending verification queue - admin only
#[get("/api/admin/verifications")]
async fn pending_verifications(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    let users = odm::get_users(&db.db, doc! {"verification_status": "pending"}, doc! {"submitted_at": -1})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let verifications: Vec<Value> = users
        .iter()
        .map(|user| {
            json!({
                "id": user.id,
                "name": user.name,
                "email": user.email,
                "role": user.role,
                "student_id_image": user.student_id_image,
                "submitted_at": user.submitted_at,
                "created_at": user.created_at,
            })
        })
        .collect();

    Ok(Json(json!({ "verifications": verifications })))
}

/// Every verification record of every non-admin user - admin only
#[get("/api/admin/verifications/all")]
async fn all_verifications(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    let users = odm::get_users(&db.db, doc! {"is_admin": {"$ne": true}}, doc! {"submitted_at": -1})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let verifications: Vec<Value> = users
        .iter()
        .map(|user| {
            json!({
                "id": user.id,
                "name": user.name,
                "email": user.email,
                "role": user.role,
                "verification_status": user.verification_status,
                "student_id_image": user.student_id_image,
                "rejection_reason": user.rejection_reason,
                "submitted_at": user.submitted_at,
                "verified_at": user.verified_at,
                "created_at": user.created_at,
            })
        })
        .collect();

    Ok(Json(json!({ "verifications": verifications })))
}

///
///Verification decision route - admin only
///
///Approve marks the user verified; reject needs a reason the user
///will see.
///
#[put("/api/admin/verifications/<user_id>", data = "<input>")]
async fn handle_verification(
    auth: ApiUser,
    user_id: String,
    input: Json<VerificationAction>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    check_id(&user_id, "user")?;
    let user = odm::get_user_by_id(&db.db, &user_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    match input.action.as_str() {
        "approve" => {
            odm::update_user_fields(
                &db.db,
                &user_id,
                doc! {
                    "verification_status": "verified",
                    "verified_at": now_rfc3339(),
                    "rejection_reason": None::<String>,
                    "verified_by": &auth.user.id,
                },
            )
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;

            odm::insert_audit_log(
                &db.db,
                &auth.user.id,
                &auth.user.name,
                "verification_approved",
                "user",
                &user_id,
                doc! {"user_name": &user.name},
            )
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;

            Ok(Json(json!({ "message": format!("User {} has been verified successfully", user.name) })))
        },
        "reject" => {
            let reason = match &input.reason {
                Some(value) if !value.is_empty() => value.clone(),
                _ => return Err(ApiError::bad_request("Rejection reason is required")),
            };

            odm::update_user_fields(
                &db.db,
                &user_id,
                doc! {
                    "verification_status": "rejected",
                    "rejection_reason": &reason,
                    "verified_at": None::<String>,
                    "rejected_by": &auth.user.id,
                },
            )
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;

            odm::insert_audit_log(
                &db.db,
                &auth.user.id,
                &auth.user.name,
                "verification_rejected",
                "user",
                &user_id,
                doc! {"user_name": &user.name, "reason": &reason},
            )
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;

            Ok(Json(json!({ "message": format!("User {}'s verification has been rejected", user.name) })))
        },
        _ => Err(ApiError::bad_request("Action must be approve or reject")),
    }
}

///
///Verification revoke route - admin only, verified users only
///
#[put("/api/admin/verifications/<user_id>/revoke")]
async fn revoke_verification(
    auth: ApiUser,
    user_id: String,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    check_id(&user_id, "user")?;
    let user = odm::get_user_by_id(&db.db, &user_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if user.verification_status != "verified" {
        return Err(ApiError::bad_request("User is not verified"));
    }

    odm::update_user_fields(
        &db.db,
        &user_id,
        doc! {
            "verification_status": "unverified",
            "verified_at": None::<String>,
            "verification_revoked_at": now_rfc3339(),
            "verification_revoked_by": &auth.user.id,
        },
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    odm::insert_audit_log(
        &db.db,
        &auth.user.id,
        &auth.user.name,
        "verification_revoked",
        "user",
        &user_id,
        doc! {"user_name": &user.name},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    Ok(Json(json!({ "message": format!("Verification revoked for {}", user.name) })))
}

pub fn routes() -> Vec<Route> {
    return routes![
        upload,
        status,
        pending_verifications,
        all_verifications,
        handle_verification,
        revoke_verification
    ];
}
