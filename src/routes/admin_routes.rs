use super::{*};

use chrono::{Duration, Utc};
use log::{info, warn};
use mongodb::bson::{doc, Document};
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde_json::{json, Value};

use json_format::json_format::{serialize_ride, serialize_user};
use ODM::models::*;
use ODM::odm;
use ODM::odm_utils::now_rfc3339;

const REPORT_CATEGORIES: [&str; 4] = ["safety", "behavior", "misuse", "other"];

//
// User management
//

/// Every user, fully serialized - admin only
#[get("/api/admin/users")]
async fn admin_users(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    let users = odm::get_users(&db.db, doc! {}, doc! {"created_at": -1})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut user_values = vec![];
    for user in &users {
        user_values.push(
            serialize_user(&db.db, user)
                .await
                .map_err(|_| ApiError::db(route, &auth.user.email))?,
        );
    }
    Ok(Json(json!({ "users": user_values })))
}

/// One user with activity and account-status summaries - admin only
#[get("/api/admin/users/<user_id>")]
async fn admin_user_details(
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

    let mut user_value = serialize_user(&db.db, &user)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let rides_offered = odm::count_rides(&db.db, doc! {"driver_id": &user_id})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let rides_taken = odm::count_ride_requests(&db.db, doc! {"rider_id": &user_id})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let sos_triggered = odm::count_sos_events(&db.db, doc! {"triggered_by": &user_id})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let reports_filed = odm::count_reports(&db.db, doc! {"reporter_id": &user_id})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let reports_received = odm::count_reports(&db.db, doc! {"reported_user_id": &user_id})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    user_value["activity"] = json!({
        "rides_offered": rides_offered,
        "rides_taken": rides_taken,
        "sos_events_triggered": sos_triggered,
        "reports_filed": reports_filed,
        "reports_received": reports_received,
    });
    user_value["account_status"] = json!({
        "is_active": user.is_active,
        "is_suspended": user.is_suspended,
        "warning_count": user.warning_count,
        "last_warning_at": user.last_warning_at,
        "status_reason": user.status_reason,
    });

    Ok(Json(json!({ "user": user_value })))
}

///
///Account enable/disable route - admin only, admins exempt
///
#[put("/api/admin/users/<user_id>/status", data = "<input>")]
async fn update_user_status(
    auth: ApiUser,
    user_id: String,
    input: Json<UserStatusUpdate>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    check_id(&user_id, "user")?;
    let user = odm::get_user_by_id(&db.db, &user_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if user.is_admin {
        return Err(ApiError::bad_request("Cannot disable admin accounts"));
    }

    odm::update_user_fields(
        &db.db,
        &user_id,
        doc! {
            "is_active": input.is_active,
            "status_reason": input.reason.clone(),
            "status_updated_at": now_rfc3339(),
            "status_updated_by": &auth.user.id,
        },
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let action = if input.is_active { "enabled" } else { "disabled" };
    odm::insert_audit_log(
        &db.db,
        &auth.user.id,
        &auth.user.name,
        &format!("user_{}", action),
        "user",
        &user_id,
        doc! {"reason": input.reason.clone(), "user_name": &user.name},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    Ok(Json(json!({ "message": format!("User {} has been {}", user.name, action) })))
}

///
///Admin promotion route - confirmation flag required
///
#[put("/api/admin/users/<user_id>/promote", data = "<input>")]
async fn promote_user(
    auth: ApiUser,
    user_id: String,
    input: Json<PromoteUserInput>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    if !input.confirm {
        return Err(ApiError::bad_request("Confirmation required"));
    }

    check_id(&user_id, "user")?;
    let user = odm::get_user_by_id(&db.db, &user_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if user.is_admin {
        return Err(ApiError::bad_request("User is already an admin"));
    }

    odm::update_user_fields(
        &db.db,
        &user_id,
        doc! {
            "is_admin": true,
            "role": "admin",
            "promoted_at": now_rfc3339(),
            "promoted_by": &auth.user.id,
        },
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    odm::insert_audit_log(
        &db.db,
        &auth.user.id,
        &auth.user.name,
        "user_promoted",
        "user",
        &user_id,
        doc! {"user_name": &user.name, "previous_role": &user.role},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    warn!("{}", format!("User {} promoted to admin by {}", &user.email, &auth.user.email));
    Ok(Json(json!({ "message": format!("User {} has been promoted to admin", user.name) })))
}

///
///User deletion route - admin only
///
///Removes the user and everything hanging off them: their rides,
///the requests and chat on those rides, their own requests and chat,
///ratings in both directions, SOS events and reports.
///
#[delete("/api/admin/users/<user_id>")]
async fn delete_user(
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

    if user.is_admin {
        return Err(ApiError::bad_request("Cannot delete admin accounts"));
    }

    let fail = |_| ApiError::db(route, &auth.user.email);

    let user_rides = odm::get_rides(&db.db, doc! {"driver_id": &user_id}, doc! {"created_at": -1}, None)
        .await
        .map_err(fail)?;
    let ride_ids: Vec<String> = user_rides.iter().map(|ride| ride.id.clone()).collect();

    if !ride_ids.is_empty() {
        odm::delete_ride_requests(&db.db, doc! {"ride_id": {"$in": &ride_ids}}).await.map_err(fail)?;
        odm::delete_chat_messages(&db.db, doc! {"ride_id": {"$in": &ride_ids}}).await.map_err(fail)?;
    }

    let user_requests = odm::get_ride_requests(&db.db, doc! {"rider_id": &user_id}, doc! {"created_at": -1})
        .await
        .map_err(fail)?;
    let request_ids: Vec<String> = user_requests.iter().map(|request| request.id.clone()).collect();
    if !request_ids.is_empty() {
        odm::delete_chat_messages(&db.db, doc! {"ride_request_id": {"$in": &request_ids}})
            .await
            .map_err(fail)?;
    }

    odm::delete_ride_requests(&db.db, doc! {"rider_id": &user_id}).await.map_err(fail)?;
    odm::delete_rides(&db.db, doc! {"driver_id": &user_id}).await.map_err(fail)?;
    odm::delete_ratings(
        &db.db,
        doc! {"$or": [{"rater_id": &user_id}, {"rated_user_id": &user_id}]},
    )
    .await
    .map_err(fail)?;
    odm::delete_sos_events(&db.db, doc! {"triggered_by": &user_id}).await.map_err(fail)?;
    odm::delete_reports(
        &db.db,
        doc! {"$or": [{"reporter_id": &user_id}, {"reported_user_id": &user_id}]},
    )
    .await
    .map_err(fail)?;
    odm::delete_chat_messages(&db.db, doc! {"sender_id": &user_id}).await.map_err(fail)?;
    odm::delete_user(&db.db, &user_id).await.map_err(fail)?;

    odm::insert_audit_log(
        &db.db,
        &auth.user.id,
        &auth.user.name,
        "user_deleted",
        "user",
        &user_id,
        doc! {"user_name": &user.name, "user_email": &user.email},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    warn!("{}", format!("User {} deleted by {}", &user.email, &auth.user.email));
    Ok(Json(json!({
        "message": format!("User {} and all associated data have been permanently deleted", user.name)
    })))
}

//
// Ride oversight
//

/// Every ride on the platform - admin only
#[get("/api/admin/rides")]
async fn admin_rides(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    let rides = odm::get_rides(&db.db, doc! {}, doc! {"created_at": -1}, None)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut ride_values = vec![];
    for ride in &rides {
        ride_values.push(
            serialize_ride(&db.db, ride)
                .await
                .map_err(|_| ApiError::db(route, &auth.user.email))?,
        );
    }
    Ok(Json(json!({ "rides": ride_values })))
}

/// Filterable ride monitor with per-ride SOS counts - admin only
#[get("/api/admin/rides/monitoring?<status>&<date_from>&<date_to>")]
async fn monitor_rides(
    auth: ApiUser,
    status: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    let mut filter = doc! {};
    if let Some(status) = &status {
        filter.insert("status", status.clone());
    }
    let mut date_range = doc! {};
    if let Some(date_from) = &date_from {
        date_range.insert("$gte", date_from.clone());
    }
    if let Some(date_to) = &date_to {
        date_range.insert("$lte", date_to.clone());
    }
    if !date_range.is_empty() {
        filter.insert("date", date_range);
    }

    let rides = odm::get_rides(&db.db, filter, doc! {"created_at": -1}, Some(200))
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut ride_values = vec![];
    for ride in &rides {
        let mut ride_value = serialize_ride(&db.db, ride)
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;

        if ride.status == "cancelled" {
            ride_value["cancelled_reason"] = json!(ride.cancelled_reason);
        }

        let requests = odm::get_ride_requests(&db.db, doc! {"ride_id": &ride.id}, doc! {"created_at": -1})
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
        let request_ids: Vec<String> = requests.iter().map(|request| request.id.clone()).collect();
        let sos_count = odm::count_sos_events(&db.db, doc! {"ride_request_id": {"$in": &request_ids}})
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
        ride_value["sos_count"] = json!(sos_count);

        ride_values.push(ride_value);
    }

    let cancelled_count = odm::count_rides(&db.db, doc! {"status": "cancelled"})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let total = ride_values.len();
    Ok(Json(json!({
        "rides": ride_values,
        "stats": {
            "total": total,
            "cancelled_count": cancelled_count,
        },
    })))
}

//
// Reports
//

///
///Report submission route - any authenticated user
///
///Either a user or a ride must be named; self-reports are rejected.
///
#[post("/api/reports", data = "<input>")]
async fn create_report(
    auth: ApiUser,
    input: Json<ReportCreate>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    if input.reported_user_id.is_none() && input.ride_id.is_none() {
        return Err(ApiError::bad_request("Must specify either a user or ride to report"));
    }
    if !REPORT_CATEGORIES.contains(&input.category.as_str()) {
        return Err(ApiError::bad_request("Category must be safety, behavior, misuse or other"));
    }
    if input.description.len() < 10 || input.description.len() > 1000 {
        return Err(ApiError::bad_request("Description must be between 10 and 1000 characters"));
    }

    let mut reported_user = None;
    if let Some(reported_user_id) = &input.reported_user_id {
        check_id(reported_user_id, "reported user")?;
        reported_user = odm::get_user_by_id(&db.db, reported_user_id)
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
        if reported_user.is_none() {
            return Err(ApiError::not_found("Reported user not found"));
        }
        if reported_user_id == &auth.user.id {
            return Err(ApiError::bad_request("Cannot report yourself"));
        }
    }

    if let Some(ride_id) = &input.ride_id {
        check_id(ride_id, "ride")?;
        let ride = odm::get_ride(&db.db, ride_id)
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
        if ride.is_none() {
            return Err(ApiError::not_found("Ride not found"));
        }
    }

    let report_id = odm::insert_report(
        &db.db,
        &input,
        &auth.user.id,
        &auth.user.name,
        reported_user.as_ref().map(|value| value.name.as_str()),
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    info!("{}", format!("Server>>Client:\tReport {} filed by {}", &report_id, &auth.user.email));
    Ok(Json(json!({
        "message": "Report submitted successfully. Our team will review it.",
        "report_id": report_id,
    })))
}

/// The report queue with its counters - admin only
#[get("/api/admin/reports?<status>&<category>")]
async fn admin_reports(
    auth: ApiUser,
    status: Option<String>,
    category: Option<String>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    let mut filter = doc! {};
    if let Some(status) = &status {
        filter.insert("status", status.clone());
    }
    if let Some(category) = &category {
        filter.insert("category", category.clone());
    }

    let reports = odm::get_reports(&db.db, filter)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let report_values: Vec<Value> = reports
        .iter()
        .map(|report| {
            json!({
                "id": report.id,
                "reporter_id": report.reporter_id,
                "reporter_name": report.reporter_name,
                "reported_user_id": report.reported_user_id,
                "reported_user_name": report.reported_user_name,
                "ride_id": report.ride_id,
                "category": report.category,
                "description": report.description,
                "status": report.status,
                "admin_notes": report.admin_notes,
                "action_taken": report.action_taken,
                "handled_by": report.handled_by,
                "handled_at": report.handled_at,
                "created_at": report.created_at,
            })
        })
        .collect();

    let pending_count = odm::count_reports(&db.db, doc! {"status": "pending"})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let under_review_count = odm::count_reports(&db.db, doc! {"status": "under_review"})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let total = report_values.len();
    Ok(Json(json!({
        "reports": report_values,
        "stats": {
            "pending": pending_count,
            "under_review": under_review_count,
            "total": total,
        },
    })))
}

///
///Report handling route - admin only
///
///Warn bumps the warning counter, suspend and disable deactivate the
///account, dismiss closes the report without touching the user.
///
#[put("/api/admin/reports/<report_id>", data = "<input>")]
async fn handle_report(
    auth: ApiUser,
    report_id: String,
    input: Json<ReportAction>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    if !["warn", "suspend", "disable", "dismiss"].contains(&input.action.as_str()) {
        return Err(ApiError::bad_request("Action must be warn, suspend, disable or dismiss"));
    }

    check_id(&report_id, "report")?;
    let report = odm::get_report(&db.db, &report_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Report not found"))?;

    let report_status = if input.action == "dismiss" { "dismissed" } else { "resolved" };
    odm::update_report_fields(
        &db.db,
        &report_id,
        doc! {
            "status": report_status,
            "action_taken": &input.action,
            "admin_notes": input.admin_notes.clone(),
            "handled_by": &auth.user.id,
            "handled_at": now_rfc3339(),
        },
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut message = String::new();
    if let Some(reported_user_id) = &report.reported_user_id {
        match input.action.as_str() {
            "warn" => {
                odm::add_user_warning(
                    &db.db,
                    reported_user_id,
                    doc! {
                        "last_warning_at": now_rfc3339(),
                        "last_warning_reason": input.admin_notes.clone(),
                    },
                )
                .await
                .map_err(|_| ApiError::db(route, &auth.user.email))?;
                message = "User has been warned".to_string();
            },
            "suspend" => {
                odm::update_user_fields(
                    &db.db,
                    reported_user_id,
                    doc! {
                        "is_active": false,
                        "is_suspended": true,
                        "suspended_at": now_rfc3339(),
                        "suspension_reason": input.admin_notes.clone(),
                    },
                )
                .await
                .map_err(|_| ApiError::db(route, &auth.user.email))?;
                message = "User has been suspended".to_string();
            },
            "disable" => {
                odm::update_user_fields(
                    &db.db,
                    reported_user_id,
                    doc! {
                        "is_active": false,
                        "disabled_at": now_rfc3339(),
                        "disable_reason": input.admin_notes.clone(),
                    },
                )
                .await
                .map_err(|_| ApiError::db(route, &auth.user.email))?;
                message = "User account has been disabled".to_string();
            },
            _ => {},
        }
    }
    if input.action == "dismiss" {
        message = "Report has been dismissed".to_string();
    }
    if message.is_empty() {
        message = format!("Report handled with action: {}", input.action);
    }

    odm::insert_audit_log(
        &db.db,
        &auth.user.id,
        &auth.user.name,
        &format!("report_{}", input.action),
        "report",
        &report_id,
        doc! {
            "reported_user_id": report.reported_user_id.clone(),
            "category": &report.category,
            "action_taken": &input.action,
        },
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    Ok(Json(json!({ "message": message })))
}

//
// Audit log
//

/// The admin action trail, filterable and capped - admin only
#[get("/api/admin/audit-logs?<action_type>&<target_type>&<limit>")]
async fn audit_logs(
    auth: ApiUser,
    action_type: Option<String>,
    target_type: Option<String>,
    limit: Option<i64>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    let mut filter = doc! {};
    if let Some(action_type) = &action_type {
        filter.insert("action_type", action_type.clone());
    }
    if let Some(target_type) = &target_type {
        filter.insert("target_type", target_type.clone());
    }

    let entries = odm::get_audit_logs(&db.db, filter, limit.unwrap_or(100))
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let entry_values: Vec<Value> = entries
        .iter()
        .map(|entry| {
            json!({
                "id": entry.id,
                "admin_id": entry.admin_id,
                "admin_name": entry.admin_name,
                "action_type": entry.action_type,
                "target_type": entry.target_type,
                "target_id": entry.target_id,
                "details": serde_json::to_value(&entry.details).unwrap_or_else(|_| json!({})),
                "timestamp": entry.timestamp,
            })
        })
        .collect();

    let total = entry_values.len();
    Ok(Json(json!({ "audit_logs": entry_values, "total": total })))
}

//
// Stats and analytics
//

/// Platform-wide counters - admin only
#[get("/api/admin/stats")]
async fn admin_stats(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    let fail = |_| ApiError::db(route, &auth.user.email);

    let total_users = odm::count_users(&db.db, doc! {}).await.map_err(fail)?;
    let total_riders = odm::count_users(&db.db, doc! {"role": "rider"}).await.map_err(fail)?;
    let total_drivers = odm::count_users(&db.db, doc! {"role": "driver"}).await.map_err(fail)?;
    let total_rides = odm::count_rides(&db.db, doc! {}).await.map_err(fail)?;
    let active_rides = odm::count_rides(&db.db, doc! {"status": "active"}).await.map_err(fail)?;
    let completed_rides = odm::count_rides(&db.db, doc! {"status": "completed"}).await.map_err(fail)?;
    let total_requests = odm::count_ride_requests(&db.db, doc! {}).await.map_err(fail)?;
    let pending_requests = odm::count_ride_requests(&db.db, doc! {"status": "requested"}).await.map_err(fail)?;
    let ongoing_rides = odm::count_ride_requests(&db.db, doc! {"status": "ongoing"}).await.map_err(fail)?;

    let verified_users = odm::count_users(&db.db, doc! {"verification_status": "verified"}).await.map_err(fail)?;
    let pending_verifications = odm::count_users(&db.db, doc! {"verification_status": "pending"}).await.map_err(fail)?;
    let unverified_users = odm::count_users(&db.db, doc! {"verification_status": "unverified"}).await.map_err(fail)?;
    let rejected_verifications = odm::count_users(&db.db, doc! {"verification_status": "rejected"}).await.map_err(fail)?;

    let active_sos = odm::count_sos_events(&db.db, doc! {"status": "active"}).await.map_err(fail)?;
    let total_sos = odm::count_sos_events(&db.db, doc! {}).await.map_err(fail)?;

    let pending_reports = odm::count_reports(&db.db, doc! {"status": "pending"}).await.map_err(fail)?;
    let total_reports = odm::count_reports(&db.db, doc! {}).await.map_err(fail)?;

    Ok(Json(json!({
        "stats": {
            "total_users": total_users,
            "total_riders": total_riders,
            "total_drivers": total_drivers,
            "total_rides": total_rides,
            "active_rides": active_rides,
            "completed_rides": completed_rides,
            "ongoing_rides": ongoing_rides,
            "total_requests": total_requests,
            "pending_requests": pending_requests,
            "verified_users": verified_users,
            "pending_verifications": pending_verifications,
            "unverified_users": unverified_users,
            "rejected_verifications": rejected_verifications,
            "active_sos": active_sos,
            "total_sos": total_sos,
            "pending_reports": pending_reports,
            "total_reports": total_reports,
        },
    })))
}

/// Chart series for the admin dashboard - admin only
#[get("/api/admin/analytics")]
async fn admin_analytics(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    let fail = |_| ApiError::db(route, &auth.user.email);

    let mut daily_rides = vec![];
    let mut daily_users = vec![];
    for days_back in (0..7).rev() {
        let day = Utc::now() - Duration::days(days_back);
        let date = day.format("%Y-%m-%d").to_string();
        let day_label = day.format("%a").to_string();

        let ride_count = odm::count_rides(&db.db, doc! {"date": &date}).await.map_err(fail)?;
        let completed_count = odm::count_rides(&db.db, doc! {"date": &date, "status": "completed"})
            .await
            .map_err(fail)?;
        daily_rides.push(json!({
            "day": day_label,
            "date": date,
            "rides": ride_count,
            "completed": completed_count,
        }));

        let start_of_day = format!("{}T00:00:00Z", date);
        let end_of_day = format!("{}T23:59:59Z", date);
        let new_users = odm::count_users(&db.db, doc! {"created_at": {"$gte": start_of_day, "$lte": end_of_day}})
            .await
            .map_err(fail)?;
        daily_users.push(json!({
            "day": day_label,
            "date": date,
            "new_users": new_users,
        }));
    }

    let mut report_categories = serde_json::Map::new();
    for category in REPORT_CATEGORIES {
        let count = odm::count_reports(&db.db, doc! {"category": category}).await.map_err(fail)?;
        report_categories.insert(category.to_string(), json!(count));
    }

    let sos_statuses = json!({
        "active": odm::count_sos_events(&db.db, doc! {"status": "active"}).await.map_err(fail)?,
        "under_review": odm::count_sos_events(&db.db, doc! {"status": "under_review"}).await.map_err(fail)?,
        "resolved": odm::count_sos_events(&db.db, doc! {"status": "resolved"}).await.map_err(fail)?,
    });

    let user_roles = json!({
        "riders": odm::count_users(&db.db, doc! {"role": "rider", "is_admin": {"$ne": true}}).await.map_err(fail)?,
        "drivers": odm::count_users(&db.db, doc! {"role": "driver", "is_admin": {"$ne": true}}).await.map_err(fail)?,
        "admins": odm::count_users(&db.db, doc! {"is_admin": true}).await.map_err(fail)?,
    });

    let verification_status = json!({
        "verified": odm::count_users(&db.db, doc! {"verification_status": "verified"}).await.map_err(fail)?,
        "pending": odm::count_users(&db.db, doc! {"verification_status": "pending"}).await.map_err(fail)?,
        "rejected": odm::count_users(&db.db, doc! {"verification_status": "rejected"}).await.map_err(fail)?,
        "unverified": odm::count_users(&db.db, doc! {"verification_status": "unverified"}).await.map_err(fail)?,
    });

    Ok(Json(json!({
        "daily_rides": daily_rides,
        "daily_users": daily_users,
        "report_categories": report_categories,
        "sos_statuses": sos_statuses,
        "user_roles": user_roles,
        "verification_status": verification_status,
    })))
}

//
// Event tags
//

/// Create an event tag rides can be labelled with - admin only
#[post("/api/admin/event-tags", data = "<input>")]
async fn create_event_tag(
    auth: ApiUser,
    input: Json<EventTagCreate>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    if input.name.is_empty() || input.name.len() > 50 {
        return Err(ApiError::bad_request("Tag name must be between 1 and 50 characters"));
    }
    if input.description.as_deref().map_or(false, |value| value.len() > 200) {
        return Err(ApiError::bad_request("Tag description cannot exceed 200 characters"));
    }

    let tag_id = odm::insert_event_tag(&db.db, &input, &auth.user.id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    odm::insert_audit_log(
        &db.db,
        &auth.user.id,
        &auth.user.name,
        "event_tag_created",
        "event_tag",
        &tag_id,
        doc! {"name": &input.name},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    Ok(Json(json!({ "message": "Event tag created", "event_tag_id": tag_id })))
}

/// Rename, describe or retire an event tag - admin only
#[put("/api/admin/event-tags/<tag_id>", data = "<input>")]
async fn update_event_tag(
    auth: ApiUser,
    tag_id: String,
    input: Json<EventTagUpdate>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    check_id(&tag_id, "event tag")?;
    let tag = odm::get_event_tag(&db.db, &tag_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Event tag not found"))?;

    let mut fields = Document::new();
    if let Some(name) = &input.name {
        if name.is_empty() || name.len() > 50 {
            return Err(ApiError::bad_request("Tag name must be between 1 and 50 characters"));
        }
        fields.insert("name", name.clone());
    }
    if let Some(description) = &input.description {
        if description.len() > 200 {
            return Err(ApiError::bad_request("Tag description cannot exceed 200 characters"));
        }
        fields.insert("description", description.clone());
    }
    if let Some(is_active) = input.is_active {
        fields.insert("is_active", is_active);
    }

    if !fields.is_empty() {
        odm::update_event_tag_fields(&db.db, &tag_id, fields)
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
    }

    Ok(Json(json!({ "message": format!("Event tag {} updated", tag.name) })))
}

pub fn routes() -> Vec<Route> {
    return routes![
        admin_users,
        admin_user_details,
        update_user_status,
        promote_user,
        delete_user,
        admin_rides,
        monitor_rides,
        create_report,
        admin_reports,
        handle_report,
        audit_logs,
        admin_stats,
        admin_analytics,
        create_event_tag,
        update_event_tag
    ];
}
