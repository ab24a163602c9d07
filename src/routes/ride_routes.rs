use super::{*};

use log::info;
use mongodb::bson::{doc, Document};
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde_json::{json, Value};

use json_format::json_format::{route_match_score, serialize_ride, time_diff_minutes};
use ODM::models::*;
use ODM::odm;
use ODM::odm_utils::{now_rfc3339, recurrence_dates};

///
///Ride creation route - verified drivers only
///
///A recurring ride is expanded into dated instances over the
///requested horizon, skipping days already carrying an identical
///offer.
///
#[post("/api/rides", data = "<input>")]
async fn create_ride(
    auth: ApiUser,
    input: Json<RideCreate>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    let user = &auth.user;
    if user.role != "driver" {
        return Err(ApiError::forbidden("Only drivers can post rides"));
    }
    if user.verification_status != "verified" {
        return Err(ApiError::forbidden(
            "Only verified users can post rides. Please complete ID verification first.",
        ));
    }

    if !(1..=10).contains(&input.available_seats) {
        return Err(ApiError::bad_request("Available seats must be between 1 and 10"));
    }
    if input.estimated_cost < 0.0 {
        return Err(ApiError::bad_request("Estimated cost cannot be negative"));
    }
    if let Some(pickup_point) = &input.pickup_point {
        if config::config::pickup_point_name(pickup_point).is_none() {
            return Err(ApiError::bad_request("Invalid pickup point"));
        }
    }

    let mut pattern_days: &[u32] = &[];
    if input.is_recurring {
        let pattern = match &input.recurrence_pattern {
            Some(value) => value,
            None => return Err(ApiError::bad_request("Recurrence pattern is required for recurring rides")),
        };
        let days_ahead = match input.recurrence_days_ahead {
            Some(value) => value,
            None => return Err(ApiError::bad_request("Number of days ahead is required for recurring rides")),
        };
        if !(1..=30).contains(&days_ahead) {
            return Err(ApiError::bad_request("Days ahead must be between 1 and 30"));
        }
        pattern_days = match config::config::recurrence_days(pattern) {
            Some(value) => value,
            None => return Err(ApiError::bad_request("Invalid recurrence pattern")),
        };
    }

    let ride_id = odm::insert_ride(&db.db, &user.id, &input, &input.date, input.is_recurring, None)
        .await
        .map_err(|_| ApiError::db(route, &user.email))?;

    let mut recurring_created = 0;
    if input.is_recurring {
        let days_ahead = input.recurrence_days_ahead.unwrap_or(0);
        for date in recurrence_dates(&input.date, pattern_days, days_ahead) {
            let duplicate = odm::find_duplicate_ride(
                &db.db,
                &user.id,
                &input.source,
                &input.destination,
                &date,
                &input.time,
            )
            .await
            .map_err(|_| ApiError::db(route, &user.email))?;
            if duplicate.is_none() {
                odm::insert_ride(&db.db, &user.id, &input, &date, false, Some(&ride_id))
                    .await
                    .map_err(|_| ApiError::db(route, &user.email))?;
                recurring_created += 1;
            }
        }
    }

    let ride = odm::get_ride(&db.db, &ride_id)
        .await
        .map_err(|_| ApiError::db(route, &user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;
    let ride_value = serialize_ride(&db.db, &ride)
        .await
        .map_err(|_| ApiError::db(route, &user.email))?;

    let message = if recurring_created > 0 {
        format!("Ride created successfully with {} recurring instances", recurring_created)
    } else {
        "Ride created successfully".to_string()
    };

    info!("{}", format!("Server>>Client:\tRide {} posted by {}", &ride_id, &user.email));
    Ok(Json(json!({
        "message": message,
        "ride": ride_value,
        "recurring_rides_created": recurring_created,
    })))
}

///
///Ride listing and search route
///
///Basic filters narrow the query; the route overlap and preferred
///time window scores partition the result into recommended rides
///first (best score, then smallest time difference) and the rest.
///
#[get("/api/rides?<destination>&<source>&<date>&<time_window>&<preferred_time>&<pickup_point>&<event_tag>&<branch>&<academic_year>")]
async fn list_rides(
    auth: ApiUser,
    destination: Option<String>,
    source: Option<String>,
    date: Option<String>,
    time_window: Option<i64>,
    preferred_time: Option<String>,
    pickup_point: Option<String>,
    event_tag: Option<String>,
    branch: Option<String>,
    academic_year: Option<String>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    let mut filter = doc! {"status": "active"};
    if let Some(date) = &date {
        filter.insert("date", date.clone());
    }
    if let Some(pickup_point) = &pickup_point {
        filter.insert("pickup_point", pickup_point.clone());
    }
    if let Some(event_tag) = &event_tag {
        filter.insert("event_tag", event_tag.clone());
    }

    let rides = odm::get_rides(&db.db, filter, doc! {"created_at": -1}, None)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut recommended: Vec<(i64, i64, Value)> = vec![];
    let mut rest: Vec<Value> = vec![];

    for ride in &rides {
        let mut serialized = serialize_ride(&db.db, ride)
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;

        // Full rides are not offered.
        if serialized["seats_available"].as_i64().unwrap_or(0) <= 0 {
            continue;
        }
        if let Some(branch) = &branch {
            if serialized["driver_branch"].as_str() != Some(branch.as_str()) {
                continue;
            }
        }
        if let Some(academic_year) = &academic_year {
            if serialized["driver_academic_year"].as_str() != Some(academic_year.as_str()) {
                continue;
            }
        }

        let mut score = 0;
        let mut time_diff = None;
        let mut is_recommended = false;

        if source.is_some() || destination.is_some() {
            score = route_match_score(&ride.source, &ride.destination, source.as_deref(), destination.as_deref());
            if score >= 50 {
                is_recommended = true;
            }
        }

        match (&preferred_time, time_window) {
            (Some(preferred), Some(window)) => {
                let diff = time_diff_minutes(&ride.time, preferred);
                if diff <= window {
                    is_recommended = true;
                    serialized["time_diff_minutes"] = json!(diff);
                    time_diff = Some(diff);
                } else {
                    // Outside an explicit window the ride is dropped.
                    continue;
                }
            },
            (Some(preferred), None) => {
                let diff = time_diff_minutes(&ride.time, preferred);
                serialized["time_diff_minutes"] = json!(diff);
                time_diff = Some(diff);
            },
            _ => {},
        }

        serialized["route_score"] = json!(score);
        serialized["is_recommended"] = json!(is_recommended);

        if is_recommended {
            recommended.push((score, time_diff.unwrap_or(9999), serialized));
        } else {
            rest.push(serialized);
        }
    }

    recommended.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    let recommended_count = recommended.len();

    let mut all_rides: Vec<Value> = recommended.into_iter().map(|entry| entry.2).collect();
    all_rides.extend(rest);
    let total_count = all_rides.len();

    Ok(Json(json!({
        "rides": all_rides,
        "recommended_count": recommended_count,
        "total_count": total_count,
    })))
}

/// Single ride lookup
#[get("/api/rides/<ride_id>")]
async fn get_ride(
    auth: ApiUser,
    ride_id: String,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    check_id(&ride_id, "ride")?;
    let ride = odm::get_ride(&db.db, &ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;
    let ride_value = serialize_ride(&db.db, &ride)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    Ok(Json(json!({ "ride": ride_value })))
}

/// Every ride a driver has posted, newest first
#[get("/api/rides/driver/my-rides")]
async fn my_rides(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    if auth.user.role != "driver" {
        return Err(ApiError::forbidden("Only drivers can access this endpoint"));
    }

    let rides = odm::get_rides(&db.db, doc! {"driver_id": &auth.user.id}, doc! {"created_at": -1}, None)
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

///
///Ride update route - owner only
///
#[put("/api/rides/<ride_id>", data = "<input>")]
async fn update_ride(
    auth: ApiUser,
    ride_id: String,
    input: Json<RideUpdate>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    check_id(&ride_id, "ride")?;
    let existing = odm::get_ride(&db.db, &ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;

    if existing.driver_id != auth.user.id {
        return Err(ApiError::forbidden("You can only update your own rides"));
    }

    let mut fields = Document::new();
    if let Some(source) = &input.source {
        if !source.is_empty() {
            fields.insert("source", source.clone());
        }
    }
    if let Some(destination) = &input.destination {
        if !destination.is_empty() {
            fields.insert("destination", destination.clone());
        }
    }
    if let Some(source_lat) = input.source_lat {
        fields.insert("source_lat", source_lat);
    }
    if let Some(source_lng) = input.source_lng {
        fields.insert("source_lng", source_lng);
    }
    if let Some(destination_lat) = input.destination_lat {
        fields.insert("destination_lat", destination_lat);
    }
    if let Some(destination_lng) = input.destination_lng {
        fields.insert("destination_lng", destination_lng);
    }
    if let Some(date) = &input.date {
        if !date.is_empty() {
            fields.insert("date", date.clone());
        }
    }
    if let Some(time) = &input.time {
        if !time.is_empty() {
            fields.insert("time", time.clone());
        }
    }
    if let Some(available_seats) = input.available_seats {
        if !(1..=10).contains(&available_seats) {
            return Err(ApiError::bad_request("Available seats must be between 1 and 10"));
        }
        fields.insert("available_seats", available_seats);
    }
    if let Some(estimated_cost) = input.estimated_cost {
        if estimated_cost < 0.0 {
            return Err(ApiError::bad_request("Estimated cost cannot be negative"));
        }
        fields.insert("estimated_cost", estimated_cost);
    }
    if let Some(pickup_point) = &input.pickup_point {
        if config::config::pickup_point_name(pickup_point).is_none() {
            return Err(ApiError::bad_request("Invalid pickup point"));
        }
        fields.insert("pickup_point", pickup_point.clone());
    }
    if let Some(event_tag) = &input.event_tag {
        fields.insert("event_tag", event_tag.clone());
    }

    if !fields.is_empty() {
        odm::update_ride_fields(&db.db, &ride_id, fields)
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
    }

    let updated = odm::get_ride(&db.db, &ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;
    let ride_value = serialize_ride(&db.db, &updated)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    Ok(Json(json!({ "message": "Ride updated", "ride": ride_value })))
}

///
///Ride deletion route - owner or admin
///
///Requests and chat scoped to the ride go with it.
///
#[delete("/api/rides/<ride_id>")]
async fn delete_ride(
    auth: ApiUser,
    ride_id: String,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    check_id(&ride_id, "ride")?;
    let existing = odm::get_ride(&db.db, &ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;

    if existing.driver_id != auth.user.id && !auth.user.is_admin {
        return Err(ApiError::forbidden("You can only delete your own rides"));
    }

    odm::delete_ride(&db.db, &ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    odm::delete_ride_requests(&db.db, doc! {"ride_id": &ride_id})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    odm::delete_chat_messages(&db.db, doc! {"ride_id": &ride_id})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    info!("{}", format!("Server>>Client:\tRide {} deleted by {}", &ride_id, &auth.user.email));
    Ok(Json(json!({ "message": "Ride deleted successfully" })))
}

///
///Ride completion route - driver only
///
///Every accepted or ongoing request on the ride completes with it.
///
#[put("/api/rides/<ride_id>/complete")]
async fn complete_ride(
    auth: ApiUser,
    ride_id: String,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    check_id(&ride_id, "ride")?;
    let existing = odm::get_ride(&db.db, &ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;

    if existing.driver_id != auth.user.id {
        return Err(ApiError::forbidden("Only the driver can complete this ride"));
    }

    odm::update_ride_fields(&db.db, &ride_id, doc! {"status": "completed"})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    odm::update_requests_many(
        &db.db,
        doc! {"ride_id": &ride_id, "status": {"$in": ["accepted", "ongoing"]}},
        doc! {"status": "completed", "completed_at": now_rfc3339()},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let updated = odm::get_ride(&db.db, &ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;
    let ride_value = serialize_ride(&db.db, &updated)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    Ok(Json(json!({ "message": "Ride completed", "ride": ride_value })))
}

///
///Ride cancellation route - driver only, active rides only
///
#[put("/api/rides/<ride_id>/cancel", data = "<input>")]
async fn cancel_ride(
    auth: ApiUser,
    ride_id: String,
    input: Json<RideCancel>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    check_id(&ride_id, "ride")?;
    let existing = odm::get_ride(&db.db, &ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;

    if existing.driver_id != auth.user.id {
        return Err(ApiError::forbidden("Only the driver can cancel this ride"));
    }
    if existing.status != "active" {
        return Err(ApiError::bad_request("Only active rides can be cancelled"));
    }

    odm::update_ride_fields(
        &db.db,
        &ride_id,
        doc! {"status": "cancelled", "cancelled_reason": input.reason.clone()},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let updated = odm::get_ride(&db.db, &ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;
    let ride_value = serialize_ride(&db.db, &updated)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    Ok(Json(json!({ "message": "Ride cancelled", "ride": ride_value })))
}

/// The fixed campus pickup points
#[get("/api/pickup-points")]
async fn pickup_points() -> Json<Value> {
    let points: Vec<Value> = config::config::PICKUP_POINTS
        .iter()
        .map(|(id, name, description)| json!({"id": id, "name": name, "description": description}))
        .collect();
    Json(json!({ "pickup_points": points }))
}

/// The recurrence patterns recurring rides can use
#[get("/api/recurrence-patterns")]
async fn recurrence_patterns() -> Json<Value> {
    let patterns: Vec<Value> = config::config::RECURRENCE_PATTERNS
        .iter()
        .map(|(id, name, days)| json!({"id": id, "name": name, "days": days}))
        .collect();
    Json(json!({ "patterns": patterns }))
}

#[get("/api/branches")]
async fn branches() -> Json<Value> {
    let branches: Vec<Value> = config::config::BRANCHES
        .iter()
        .map(|(id, name)| json!({"id": id, "name": name}))
        .collect();
    Json(json!({ "branches": branches }))
}

#[get("/api/academic-years")]
async fn academic_years() -> Json<Value> {
    let years: Vec<Value> = config::config::ACADEMIC_YEARS
        .iter()
        .map(|(id, name)| json!({"id": id, "name": name}))
        .collect();
    Json(json!({ "academic_years": years }))
}

/// The active event tags rides can be labelled with
#[get("/api/event-tags")]
async fn event_tags(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    let tags = odm::get_event_tags(&db.db, doc! {"is_active": true})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let tag_values: Vec<Value> = tags
        .iter()
        .map(|tag| {
            json!({
                "id": tag.id,
                "name": tag.name,
                "description": tag.description,
            })
        })
        .collect();
    Ok(Json(json!({ "event_tags": tag_values })))
}

pub fn routes() -> Vec<Route> {
    return routes![
        create_ride,
        list_rides,
        get_ride,
        my_rides,
        update_ride,
        delete_ride,
        complete_ride,
        cancel_ride,
        pickup_points,
        recurrence_patterns,
        branches,
        academic_years,
        event_tags
    ];
}
