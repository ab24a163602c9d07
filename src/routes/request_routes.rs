use super::{*};

use chrono::Local;
use log::info;
use mongodb::bson::doc;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde_json::{json, Value};

use json_format::json_format::{serialize_ride_request, urgent_window_ok};
use ODM::models::*;
use ODM::odm;
use ODM::odm_utils::{generate_ride_pin, now_rfc3339};

///
///Seat request route - verified riders only
///
///Urgent requests are only accepted for rides departing within the
///next hour. The seat check here and the one on acceptance are both
///read-then-write, so concurrent requests can slip past them.
///
#[post("/api/ride-requests", data = "<input>")]
async fn create_request(
    auth: ApiUser,
    input: Json<RideRequestCreate>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    let user = &auth.user;
    if user.role != "rider" {
        return Err(ApiError::forbidden("Only riders can request rides"));
    }
    if user.verification_status != "verified" {
        return Err(ApiError::forbidden(
            "Only verified users can request rides. Please complete ID verification first.",
        ));
    }

    check_id(&input.ride_id, "ride")?;
    let ride = odm::get_ride(&db.db, &input.ride_id)
        .await
        .map_err(|_| ApiError::db(route, &user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;

    if ride.status != "active" {
        return Err(ApiError::bad_request("This ride is no longer active"));
    }

    if input.is_urgent && !urgent_window_ok(&ride.date, &ride.time, Local::now().naive_local()) {
        return Err(ApiError::bad_request(
            "Urgent requests can only be made for rides starting within the next 60 minutes",
        ));
    }

    let existing = odm::find_request_for_rider(&db.db, &input.ride_id, &user.id)
        .await
        .map_err(|_| ApiError::db(route, &user.email))?;
    if existing.is_some() {
        return Err(ApiError::bad_request("You have already requested this ride"));
    }

    let taken = odm::seats_taken(&db.db, &input.ride_id, false)
        .await
        .map_err(|_| ApiError::db(route, &user.email))?;
    if taken as i64 >= ride.available_seats {
        return Err(ApiError::bad_request("No seats available"));
    }

    let request_id = odm::insert_ride_request(&db.db, &input.ride_id, &user.id, input.is_urgent)
        .await
        .map_err(|_| ApiError::db(route, &user.email))?;
    let request = odm::get_ride_request(&db.db, &request_id)
        .await
        .map_err(|_| ApiError::db(route, &user.email))?
        .ok_or_else(|| ApiError::not_found("Request not found"))?;
    let request_value = serialize_ride_request(&db.db, &request)
        .await
        .map_err(|_| ApiError::db(route, &user.email))?;

    let message = if input.is_urgent {
        "Urgent ride request submitted! Driver will be notified."
    } else {
        "Ride request submitted"
    };

    info!("{}", format!("Server>>Client:\tRequest {} placed by {}", &request_id, &user.email));
    Ok(Json(json!({ "message": message, "request": request_value })))
}

/// Every request the calling rider has placed, newest first
#[get("/api/ride-requests/my-requests")]
async fn my_requests(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    if auth.user.role != "rider" {
        return Err(ApiError::forbidden("Only riders can access this endpoint"));
    }

    let requests = odm::get_ride_requests(&db.db, doc! {"rider_id": &auth.user.id}, doc! {"created_at": -1})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut request_values = vec![];
    for request in &requests {
        request_values.push(
            serialize_ride_request(&db.db, request)
                .await
                .map_err(|_| ApiError::db(route, &auth.user.email))?,
        );
    }
    Ok(Json(json!({ "requests": request_values })))
}

/// Requests placed against one ride - its driver or an admin only
#[get("/api/ride-requests/ride/<ride_id>")]
async fn ride_requests(
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

    if ride.driver_id != auth.user.id && !auth.user.is_admin {
        return Err(ApiError::forbidden("You can only view requests for your own rides"));
    }

    let requests = odm::get_ride_requests(&db.db, doc! {"ride_id": &ride_id}, doc! {"created_at": -1})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut request_values = vec![];
    for request in &requests {
        request_values.push(
            serialize_ride_request(&db.db, request)
                .await
                .map_err(|_| ApiError::db(route, &auth.user.email))?,
        );
    }
    Ok(Json(json!({ "requests": request_values })))
}

/// Collect the ride ids a driver owns
async fn driver_ride_ids(db: &mongodb::Database, driver_id: &str) -> mongodb::error::Result<Vec<String>> {
    let rides = odm::get_rides(db, doc! {"driver_id": driver_id}, doc! {"created_at": -1}, None).await?;
    Ok(rides.into_iter().map(|ride| ride.id).collect())
}

/// Pending requests across every ride of the calling driver
#[get("/api/ride-requests/driver/pending")]
async fn driver_pending(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    if auth.user.role != "driver" {
        return Err(ApiError::forbidden("Only drivers can access this endpoint"));
    }

    let ride_ids = driver_ride_ids(&db.db, &auth.user.id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let requests = odm::get_ride_requests(
        &db.db,
        doc! {"ride_id": {"$in": ride_ids}, "status": "requested"},
        doc! {"created_at": -1},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut request_values = vec![];
    for request in &requests {
        request_values.push(
            serialize_ride_request(&db.db, request)
                .await
                .map_err(|_| ApiError::db(route, &auth.user.email))?,
        );
    }
    Ok(Json(json!({ "requests": request_values })))
}

/// Accepted and ongoing requests across every ride of the calling driver
#[get("/api/ride-requests/driver/accepted")]
async fn driver_accepted(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    if auth.user.role != "driver" {
        return Err(ApiError::forbidden("Only drivers can access this endpoint"));
    }

    let ride_ids = driver_ride_ids(&db.db, &auth.user.id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let requests = odm::get_ride_requests(
        &db.db,
        doc! {"ride_id": {"$in": ride_ids}, "status": {"$in": ["accepted", "ongoing"]}},
        doc! {"created_at": -1},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut request_values = vec![];
    for request in &requests {
        request_values.push(
            serialize_ride_request(&db.db, request)
                .await
                .map_err(|_| ApiError::db(route, &auth.user.email))?,
        );
    }
    Ok(Json(json!({ "requests": request_values })))
}

///
///Accept / reject route - the ride's driver only
///
///Acceptance re-checks the seat count and assigns the 4-digit PIN
///the rider will show at pickup.
///
#[put("/api/ride-requests/<request_id>", data = "<input>")]
async fn handle_request(
    auth: ApiUser,
    request_id: String,
    input: Json<RideRequestAction>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    if input.action != "accept" && input.action != "reject" {
        return Err(ApiError::bad_request("Action must be accept or reject"));
    }

    check_id(&request_id, "request")?;
    let request = odm::get_ride_request(&db.db, &request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Request not found"))?;

    let ride = odm::get_ride(&db.db, &request.ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;

    if ride.driver_id != auth.user.id {
        return Err(ApiError::forbidden("Only the driver can handle this request"));
    }
    if request.status != "requested" {
        return Err(ApiError::bad_request("Request already processed"));
    }

    let new_status = if input.action == "accept" { "accepted" } else { "rejected" };

    if input.action == "accept" {
        let taken = odm::seats_taken(&db.db, &request.ride_id, false)
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
        if taken as i64 >= ride.available_seats {
            return Err(ApiError::bad_request("No seats available"));
        }

        odm::update_request_fields(
            &db.db,
            &request_id,
            doc! {
                "status": new_status,
                "ride_pin": generate_ride_pin(),
                "accepted_at": now_rfc3339(),
            },
        )
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    } else {
        odm::update_request_fields(&db.db, &request_id, doc! {"status": new_status})
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
    }

    let updated = odm::get_ride_request(&db.db, &request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Request not found"))?;
    let request_value = serialize_ride_request(&db.db, &updated)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    info!("{}", format!("Server>>Client:\tRequest {} {} by {}", &request_id, new_status, &auth.user.email));
    Ok(Json(json!({ "message": format!("Request {}", new_status), "request": request_value })))
}

///
///Ride start route - the driver confirms the rider's PIN
///
///Only an accepted request can start; a wrong PIN leaves it untouched.
///
#[post("/api/ride-requests/<request_id>/start", data = "<input>")]
async fn start_ride(
    auth: ApiUser,
    request_id: String,
    input: Json<StartRideInput>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    check_id(&request_id, "request")?;
    let request = odm::get_ride_request(&db.db, &request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride request not found"))?;

    let ride = odm::get_ride(&db.db, &request.ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;

    if ride.driver_id != auth.user.id {
        return Err(ApiError::forbidden("Only the driver can start this ride"));
    }

    if request.status != "accepted" {
        if request.status == "ongoing" {
            return Err(ApiError::bad_request("Ride has already started"));
        }
        return Err(ApiError::bad_request("Ride request must be accepted before starting"));
    }

    if request.ride_pin.as_deref() != Some(input.pin.as_str()) {
        return Err(ApiError::bad_request("Incorrect PIN. Please verify with the rider."));
    }

    odm::update_request_fields(
        &db.db,
        &request_id,
        doc! {"status": "ongoing", "ride_started_at": now_rfc3339()},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let updated = odm::get_ride_request(&db.db, &request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride request not found"))?;
    let request_value = serialize_ride_request(&db.db, &updated)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    info!("{}", format!("Server>>Client:\tRequest {} started by {}", &request_id, &auth.user.email));
    Ok(Json(json!({ "message": "Ride started successfully!", "request": request_value })))
}

/// Live view of a request - participants or admin
#[get("/api/ride-requests/<request_id>/live", rank = 2)]
async fn live_ride(
    auth: ApiUser,
    request_id: String,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    check_id(&request_id, "request")?;
    let request = odm::get_ride_request(&db.db, &request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride request not found"))?;

    let ride = odm::get_ride(&db.db, &request.ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;

    let is_rider = request.rider_id == auth.user.id;
    let is_driver = ride.driver_id == auth.user.id;
    if !(is_rider || is_driver || auth.user.is_admin) {
        return Err(ApiError::forbidden("Not authorized to view this ride"));
    }

    let open_sos = odm::find_open_sos_for_request(&db.db, &request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut request_value = serialize_ride_request(&db.db, &request)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    request_value["has_active_sos"] = json!(open_sos.is_some());
    request_value["sos_id"] = json!(open_sos.map(|sos| sos.id));

    Ok(Json(json!({ "ride": request_value })))
}

///
///Safe arrival route - the rider completes the ride
///
///When the last accepted or ongoing request completes, the ride
///itself flips to completed.
///
#[post("/api/ride-requests/<request_id>/reached-safely")]
async fn reached_safely(
    auth: ApiUser,
    request_id: String,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    check_id(&request_id, "request")?;
    let request = odm::get_ride_request(&db.db, &request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride request not found"))?;

    if request.rider_id != auth.user.id {
        return Err(ApiError::forbidden("Only the rider can confirm safe arrival"));
    }

    if request.status != "ongoing" {
        if request.status == "completed" {
            return Err(ApiError::bad_request("Ride is already completed"));
        }
        return Err(ApiError::bad_request("Ride must be ongoing to mark as completed"));
    }

    let now = now_rfc3339();
    odm::update_request_fields(
        &db.db,
        &request_id,
        doc! {"status": "completed", "reached_safely_at": &now, "completed_at": &now},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let remaining = odm::count_ride_requests(
        &db.db,
        doc! {"ride_id": &request.ride_id, "status": {"$in": ["accepted", "ongoing"]}},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;
    if remaining == 0 {
        odm::update_ride_fields(&db.db, &request.ride_id, doc! {"status": "completed"})
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
    }

    let updated = odm::get_ride_request(&db.db, &request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride request not found"))?;
    let request_value = serialize_ride_request(&db.db, &updated)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    info!("{}", format!("Server>>Client:\tRequest {} completed by {}", &request_id, &auth.user.email));
    Ok(Json(json!({ "message": "Arrived safely! Ride completed.", "request": request_value })))
}

pub fn routes() -> Vec<Route> {
    return routes![
        create_request,
        my_requests,
        ride_requests,
        driver_pending,
        driver_accepted,
        handle_request,
        start_ride,
        live_ride,
        reached_safely
    ];
}
