use super::{*};

use log::{info, warn};
use mongodb::bson::doc;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde_json::{json, Value};

use json_format::json_format::serialize_sos_event;
use ODM::models::*;
use ODM::odm;
use ODM::odm_utils::now_rfc3339;

///
///SOS trigger route - ride participants only, ongoing rides only
///
///One open alert per request; a second trigger is rejected until an
///admin resolves the first.
///
#[post("/api/sos", data = "<input>")]
async fn trigger_sos(
    auth: ApiUser,
    input: Json<SosCreate>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    check_id(&input.ride_request_id, "ride request")?;
    let request = odm::get_ride_request(&db.db, &input.ride_request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride request not found"))?;

    let ride = odm::get_ride(&db.db, &request.ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;

    let is_rider = request.rider_id == auth.user.id;
    let is_driver = ride.driver_id == auth.user.id;
    if !(is_rider || is_driver) {
        return Err(ApiError::forbidden("Only ride participants can trigger SOS"));
    }

    if request.status != "ongoing" {
        return Err(ApiError::bad_request("SOS can only be triggered during an ongoing ride"));
    }

    let existing = odm::find_open_sos_for_request(&db.db, &input.ride_request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    if existing.is_some() {
        return Err(ApiError::bad_request("An SOS alert is already active for this ride"));
    }

    let sos_id = odm::insert_sos_event(&db.db, &input, &request.ride_id, &auth.user.id, &auth.user.role)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let sos = odm::get_sos_event(&db.db, &sos_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("SOS event not found"))?;
    let sos_value = serialize_sos_event(&db.db, &sos)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    warn!("{}", format!("SOS triggered on request {} by {}", &input.ride_request_id, &auth.user.email));
    Ok(Json(json!({
        "message": "SOS alert triggered! Help is on the way.",
        "sos": sos_value,
    })))
}

/// The caller's still-open SOS alerts
#[get("/api/sos/my-active")]
async fn my_active(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    let events = odm::get_sos_events(
        &db.db,
        doc! {"triggered_by": &auth.user.id, "status": {"$in": ["active", "under_review"]}},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut sos_values = vec![];
    for sos in &events {
        sos_values.push(
            serialize_sos_event(&db.db, sos)
                .await
                .map_err(|_| ApiError::db(route, &auth.user.email))?,
        );
    }
    Ok(Json(json!({ "sos_events": sos_values })))
}

/// The SOS triage board with its counters - admin only
#[get("/api/admin/sos?<status>")]
async fn admin_sos(
    auth: ApiUser,
    status: Option<String>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    let mut filter = doc! {};
    if let Some(status) = &status {
        filter.insert("status", status.clone());
    }

    let events = odm::get_sos_events(&db.db, filter)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut sos_values = vec![];
    for sos in &events {
        sos_values.push(
            serialize_sos_event(&db.db, sos)
                .await
                .map_err(|_| ApiError::db(route, &auth.user.email))?,
        );
    }

    let active_count = odm::count_sos_events(&db.db, doc! {"status": "active"})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let under_review_count = odm::count_sos_events(&db.db, doc! {"status": "under_review"})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let resolved_count = odm::count_sos_events(&db.db, doc! {"status": "resolved"})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    Ok(Json(json!({
        "sos_events": sos_values,
        "counts": {
            "active": active_count,
            "under_review": under_review_count,
            "resolved": resolved_count,
            "total": active_count + under_review_count + resolved_count,
        },
    })))
}

///
///SOS triage route - admin only
///
///Review parks the alert under review, resolve closes it. Notes
///carry over on resolve when none are given.
///
#[put("/api/admin/sos/<sos_id>", data = "<input>")]
async fn admin_update_sos(
    auth: ApiUser,
    sos_id: String,
    input: Json<SosAction>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    check_id(&sos_id, "SOS")?;
    let sos = odm::get_sos_event(&db.db, &sos_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("SOS event not found"))?;

    let message = match input.action.as_str() {
        "review" => {
            odm::update_sos_fields(
                &db.db,
                &sos_id,
                doc! {
                    "status": "under_review",
                    "reviewed_at": now_rfc3339(),
                    "reviewed_by": &auth.user.id,
                    "admin_notes": input.notes.clone(),
                },
            )
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
            "SOS marked as under review"
        },
        "resolve" => {
            let notes = input.notes.clone().or_else(|| sos.admin_notes.clone());
            odm::update_sos_fields(
                &db.db,
                &sos_id,
                doc! {
                    "status": "resolved",
                    "resolved_at": now_rfc3339(),
                    "resolved_by": &auth.user.id,
                    "admin_notes": notes,
                },
            )
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
            "SOS resolved successfully"
        },
        _ => return Err(ApiError::bad_request("Action must be review or resolve")),
    };

    odm::insert_audit_log(
        &db.db,
        &auth.user.id,
        &auth.user.name,
        &format!("sos_{}", input.action),
        "sos",
        &sos_id,
        doc! {"previous_status": &sos.status, "notes": input.notes.clone()},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let updated = odm::get_sos_event(&db.db, &sos_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("SOS event not found"))?;
    let sos_value = serialize_sos_event(&db.db, &updated)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    info!("{}", format!("Server>>Client:\tSOS {} {} by {}", &sos_id, input.action, &auth.user.email));
    Ok(Json(json!({ "message": message, "sos": sos_value })))
}

pub fn routes() -> Vec<Route> {
    return routes![trigger_sos, my_active, admin_sos, admin_update_sos];
}
