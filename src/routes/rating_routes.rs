use super::{*};

use log::info;
use mongodb::bson::doc;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde_json::{json, Value};

use json_format::json_format::{
    completed_ride_count, rating_stats, trust_level, user_stats, weekly_summary,
};
use ODM::models::*;
use ODM::odm;

///
///Rating submission route
///
///Only participants of a completed request can rate, each exactly
///once, always rating the counterpart. Uniqueness is a lookup before
///the insert, so a duplicate can still race in between.
///
#[post("/api/ratings", data = "<input>")]
async fn submit_rating(
    auth: ApiUser,
    input: Json<RatingCreate>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    if !(1..=5).contains(&input.rating) {
        return Err(ApiError::bad_request("Rating must be between 1 and 5"));
    }
    if input.feedback.as_deref().map_or(false, |value| value.len() > 500) {
        return Err(ApiError::bad_request("Feedback cannot exceed 500 characters"));
    }

    check_id(&input.ride_request_id, "ride request")?;
    let request = odm::get_ride_request(&db.db, &input.ride_request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride request not found"))?;

    if request.status != "completed" {
        return Err(ApiError::bad_request("Can only rate completed rides"));
    }

    let ride = odm::get_ride(&db.db, &request.ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;

    let (rated_user_id, rater_role) = if auth.user.id == request.rider_id {
        (ride.driver_id.clone(), "rider")
    } else if auth.user.id == ride.driver_id {
        (request.rider_id.clone(), "driver")
    } else {
        return Err(ApiError::forbidden("You were not part of this ride"));
    };

    let existing = odm::find_rating(
        &db.db,
        doc! {"ride_request_id": &input.ride_request_id, "rater_id": &auth.user.id},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;
    if existing.is_some() {
        return Err(ApiError::bad_request("You have already rated this ride"));
    }

    let rating_id = odm::insert_rating(&db.db, &input, &request.ride_id, &auth.user.id, rater_role, &rated_user_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let (new_average, _, _) = rating_stats(&db.db, &rated_user_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    info!("{}", format!("Server>>Client:\tRating {} submitted by {}", &rating_id, &auth.user.email));
    Ok(Json(json!({
        "message": "Rating submitted successfully",
        "rating": {
            "id": rating_id,
            "rating": input.rating,
            "feedback": input.feedback,
        },
        "rated_user_new_average": new_average,
    })))
}

/// Whether the caller may still rate a request, with the reason if not
#[get("/api/ratings/can-rate/<request_id>")]
async fn can_rate(
    auth: ApiUser,
    request_id: String,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    check_id(&request_id, "ride request")?;
    let request = match odm::get_ride_request(&db.db, &request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
    {
        Some(value) => value,
        None => return Ok(Json(json!({"can_rate": false, "reason": "Ride request not found"}))),
    };

    if request.status != "completed" {
        return Ok(Json(json!({"can_rate": false, "reason": "Ride is not completed"})));
    }

    let ride = match odm::get_ride(&db.db, &request.ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
    {
        Some(value) => value,
        None => return Ok(Json(json!({"can_rate": false, "reason": "Ride not found"}))),
    };

    if auth.user.id != request.rider_id && auth.user.id != ride.driver_id {
        return Ok(Json(json!({"can_rate": false, "reason": "Not part of this ride"})));
    }

    let existing = odm::find_rating(
        &db.db,
        doc! {"ride_request_id": &request_id, "rater_id": &auth.user.id},
    )
    .await
    .map_err(|_| ApiError::db(route, &auth.user.email))?;
    if let Some(rating) = existing {
        return Ok(Json(json!({
            "can_rate": false,
            "reason": "Already rated",
            "existing_rating": rating.rating,
        })));
    }

    let (rated_user_id, rated_role) = if auth.user.id == request.rider_id {
        (ride.driver_id.clone(), "driver")
    } else {
        (request.rider_id.clone(), "rider")
    };
    let rated_user = odm::get_user_by_id(&db.db, &rated_user_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    Ok(Json(json!({
        "can_rate": true,
        "rated_user_id": rated_user_id,
        "rated_user_name": rated_user.map(|value| value.name).unwrap_or_else(|| "Unknown".to_string()),
        "rated_role": rated_role,
    })))
}

/// Aggregated rating profile of any user
#[get("/api/users/<user_id>/ratings")]
async fn user_ratings(
    auth: ApiUser,
    user_id: String,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    check_id(&user_id, "user")?;
    let user = odm::get_user_by_id(&db.db, &user_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let (average_rating, total_ratings, distribution) = rating_stats(&db.db, &user_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let ride_count = completed_ride_count(&db.db, &user_id, &user.role)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let trust = trust_level(average_rating, ride_count);

    Ok(Json(json!({
        "user_id": user_id,
        "name": user.name,
        "role": user.role,
        "average_rating": average_rating,
        "total_ratings": total_ratings,
        "rating_distribution": {
            "1": distribution[0],
            "2": distribution[1],
            "3": distribution[2],
            "4": distribution[3],
            "5": distribution[4],
        },
        "ride_count": ride_count,
        "trust_level": trust,
    })))
}

/// One history row: a completed request joined with its counterpart
/// and both directions of rating
async fn history_entry(
    db: &mongodb::Database,
    user_id: &str,
    own_role: &str,
    request: &RideRequest,
    ride: &Ride,
) -> mongodb::error::Result<Value> {
    let (other_user_id, other_user_role) = if own_role == "driver" {
        (request.rider_id.clone(), "rider")
    } else {
        (ride.driver_id.clone(), "driver")
    };
    let other_user = odm::get_user_by_id(db, &other_user_id).await?;

    let my_rating = odm::find_rating(db, doc! {"ride_request_id": &request.id, "rater_id": user_id}).await?;
    let their_rating = odm::find_rating(db, doc! {"ride_request_id": &request.id, "rated_user_id": user_id}).await?;

    Ok(json!({
        "ride_request_id": request.id,
        "ride_id": ride.id,
        "role": own_role,
        "other_user_id": other_user_id,
        "other_user_name": other_user.map(|value| value.name).unwrap_or_else(|| "Unknown".to_string()),
        "other_user_role": other_user_role,
        "source": ride.source,
        "destination": ride.destination,
        "date": ride.date,
        "time": ride.time,
        "cost": ride.estimated_cost,
        "completed_at": request.completed_at,
        "reached_safely_at": request.reached_safely_at,
        "my_rating": my_rating.as_ref().map(|value| value.rating),
        "their_rating": their_rating.as_ref().map(|value| value.rating),
        "can_rate": my_rating.is_none(),
        "pickup_point": ride.pickup_point,
    }))
}

/// Completed ride history of the caller, rider or driver side
#[get("/api/ride-history")]
async fn ride_history(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    let user = &auth.user;
    let mut history = vec![];

    if user.role == "driver" {
        let rides = odm::get_rides(
            &db.db,
            doc! {"driver_id": &user.id, "status": "completed"},
            doc! {"created_at": -1},
            None,
        )
        .await
        .map_err(|_| ApiError::db(route, &user.email))?;

        for ride in &rides {
            let requests = odm::get_ride_requests(
                &db.db,
                doc! {"ride_id": &ride.id, "status": "completed"},
                doc! {"created_at": -1},
            )
            .await
            .map_err(|_| ApiError::db(route, &user.email))?;
            for request in &requests {
                history.push(
                    history_entry(&db.db, &user.id, "driver", request, ride)
                        .await
                        .map_err(|_| ApiError::db(route, &user.email))?,
                );
            }
        }
    } else {
        let requests = odm::get_ride_requests(
            &db.db,
            doc! {"rider_id": &user.id, "status": "completed"},
            doc! {"created_at": -1},
        )
        .await
        .map_err(|_| ApiError::db(route, &user.email))?;

        for request in &requests {
            let ride = odm::get_ride(&db.db, &request.ride_id)
                .await
                .map_err(|_| ApiError::db(route, &user.email))?;
            if let Some(ride) = ride {
                history.push(
                    history_entry(&db.db, &user.id, "rider", request, &ride)
                        .await
                        .map_err(|_| ApiError::db(route, &user.email))?,
                );
            }
        }
    }

    let total_count = history.len();
    Ok(Json(json!({ "history": history, "total_count": total_count })))
}

/// Full summary of one finished ride - participants or admin
#[get("/api/ride-history/<request_id>")]
async fn ride_summary(
    auth: ApiUser,
    request_id: String,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    check_id(&request_id, "ride request")?;
    let request = odm::get_ride_request(&db.db, &request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride request not found"))?;

    let ride = odm::get_ride(&db.db, &request.ride_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;

    let rider_id = request.rider_id.clone();
    let driver_id = ride.driver_id.clone();

    if auth.user.id != rider_id && auth.user.id != driver_id && !auth.user.is_admin {
        return Err(ApiError::forbidden("You were not part of this ride"));
    }

    let rider = odm::get_user_by_id(&db.db, &rider_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let driver = odm::get_user_by_id(&db.db, &driver_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let rider_rating = odm::find_rating(&db.db, doc! {"ride_request_id": &request_id, "rater_id": &rider_id})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let driver_rating = odm::find_rating(&db.db, doc! {"ride_request_id": &request_id, "rater_id": &driver_id})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let is_rider = auth.user.id == rider_id;
    let is_driver = auth.user.id == driver_id;
    let can_rate = (is_rider && rider_rating.is_none()) || (is_driver && driver_rating.is_none());

    Ok(Json(json!({
        "summary": {
            "ride_request_id": request_id,
            "ride_id": ride.id,
            "status": request.status,
            "source": ride.source,
            "destination": ride.destination,
            "pickup_point": ride.pickup_point,
            "date": ride.date,
            "time": ride.time,
            "cost": ride.estimated_cost,
            "created_at": request.created_at,
            "accepted_at": request.accepted_at,
            "ride_started_at": request.ride_started_at,
            "completed_at": request.completed_at,
            "reached_safely_at": request.reached_safely_at,
            "rider": {
                "id": rider_id,
                "name": rider.as_ref().map(|value| value.name.clone()).unwrap_or_else(|| "Unknown".to_string()),
                "verification_status": rider.as_ref().map(|value| value.verification_status.clone()).unwrap_or_else(|| "unverified".to_string()),
            },
            "driver": {
                "id": driver_id,
                "name": driver.as_ref().map(|value| value.name.clone()).unwrap_or_else(|| "Unknown".to_string()),
                "verification_status": driver.as_ref().map(|value| value.verification_status.clone()).unwrap_or_else(|| "unverified".to_string()),
                "vehicle_model": driver.as_ref().and_then(|value| value.vehicle_model.clone()),
                "vehicle_number": driver.as_ref().and_then(|value| value.vehicle_number.clone()),
                "vehicle_color": driver.as_ref().and_then(|value| value.vehicle_color.clone()),
            },
            "rider_gave_rating": rider_rating.as_ref().map(|value| value.rating),
            "rider_gave_feedback": rider_rating.as_ref().and_then(|value| value.feedback.clone()),
            "driver_gave_rating": driver_rating.as_ref().map(|value| value.rating),
            "driver_gave_feedback": driver_rating.as_ref().and_then(|value| value.feedback.clone()),
            "is_rider": is_rider,
            "is_driver": is_driver,
            "can_rate": can_rate,
        },
    })))
}

/// Completed rides still waiting on the caller's rating
#[get("/api/ratings/pending")]
async fn pending_ratings(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    let user = &auth.user;
    let mut pending = vec![];

    if user.role == "driver" {
        let rides = odm::get_rides(
            &db.db,
            doc! {"driver_id": &user.id, "status": "completed"},
            doc! {"created_at": -1},
            None,
        )
        .await
        .map_err(|_| ApiError::db(route, &user.email))?;

        for ride in &rides {
            let requests = odm::get_ride_requests(
                &db.db,
                doc! {"ride_id": &ride.id, "status": "completed"},
                doc! {"created_at": -1},
            )
            .await
            .map_err(|_| ApiError::db(route, &user.email))?;

            for request in &requests {
                let existing = odm::find_rating(
                    &db.db,
                    doc! {"ride_request_id": &request.id, "rater_id": &user.id},
                )
                .await
                .map_err(|_| ApiError::db(route, &user.email))?;
                if existing.is_none() {
                    let rider = odm::get_user_by_id(&db.db, &request.rider_id)
                        .await
                        .map_err(|_| ApiError::db(route, &user.email))?;
                    pending.push(json!({
                        "ride_request_id": request.id,
                        "other_user_id": request.rider_id,
                        "other_user_name": rider.map(|value| value.name).unwrap_or_else(|| "Unknown".to_string()),
                        "other_user_role": "rider",
                        "source": ride.source,
                        "destination": ride.destination,
                        "date": ride.date,
                        "completed_at": request.completed_at,
                    }));
                }
            }
        }
    } else {
        let requests = odm::get_ride_requests(
            &db.db,
            doc! {"rider_id": &user.id, "status": "completed"},
            doc! {"created_at": -1},
        )
        .await
        .map_err(|_| ApiError::db(route, &user.email))?;

        for request in &requests {
            let existing = odm::find_rating(
                &db.db,
                doc! {"ride_request_id": &request.id, "rater_id": &user.id},
            )
            .await
            .map_err(|_| ApiError::db(route, &user.email))?;
            if existing.is_none() {
                if let Some(ride) = odm::get_ride(&db.db, &request.ride_id)
                    .await
                    .map_err(|_| ApiError::db(route, &user.email))?
                {
                    let driver = odm::get_user_by_id(&db.db, &ride.driver_id)
                        .await
                        .map_err(|_| ApiError::db(route, &user.email))?;
                    pending.push(json!({
                        "ride_request_id": request.id,
                        "other_user_id": ride.driver_id,
                        "other_user_name": driver.map(|value| value.name).unwrap_or_else(|| "Unknown".to_string()),
                        "other_user_role": "driver",
                        "source": ride.source,
                        "destination": ride.destination,
                        "date": ride.date,
                        "completed_at": request.completed_at,
                    }));
                }
            }
        }
    }

    let count = pending.len();
    Ok(Json(json!({ "pending_ratings": pending, "count": count })))
}

/// Lifetime and last-7-days stats of the caller
#[get("/api/stats/me")]
async fn my_stats(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    let stats = user_stats(&db.db, &auth.user)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let weekly = weekly_summary(&db.db, &auth.user)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    Ok(Json(json!({ "stats": stats, "weekly_summary": weekly })))
}

/// Recent ratings for moderation, filterable by score - admin only
#[get("/api/admin/ratings?<min_rating>&<max_rating>")]
async fn admin_ratings(
    auth: ApiUser,
    min_rating: Option<i64>,
    max_rating: Option<i64>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    let mut filter = doc! {};
    let mut range = doc! {};
    if let Some(min_rating) = min_rating {
        range.insert("$gte", min_rating);
    }
    if let Some(max_rating) = max_rating {
        range.insert("$lte", max_rating);
    }
    if !range.is_empty() {
        filter.insert("rating", range);
    }

    let ratings = odm::get_ratings(&db.db, filter, Some(100))
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut rating_values = vec![];
    for rating in &ratings {
        let rater = odm::get_user_by_id(&db.db, &rating.rater_id)
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
        let rated = odm::get_user_by_id(&db.db, &rating.rated_user_id)
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
        rating_values.push(json!({
            "id": rating.id,
            "rating": rating.rating,
            "feedback": rating.feedback,
            "rater_name": rater.map(|value| value.name).unwrap_or_else(|| "Unknown".to_string()),
            "rater_role": rating.rater_role,
            "rated_user_name": rated.map(|value| value.name).unwrap_or_else(|| "Unknown".to_string()),
            "created_at": rating.created_at,
        }));
    }

    let total_ratings = odm::count_ratings(&db.db, doc! {})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let low_ratings = odm::count_ratings(&db.db, doc! {"rating": {"$lte": 2}})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    Ok(Json(json!({
        "ratings": rating_values,
        "stats": {
            "total_ratings": total_ratings,
            "low_ratings_count": low_ratings,
        },
    })))
}

/// Users whose ratings put them in the review band - admin only
#[get("/api/admin/low-trust-users")]
async fn low_trust_users(auth: ApiUser, db: &State<MongoState>, route: &Route) -> Result<Json<Value>, ApiError> {
    require_admin(&auth.user)?;

    let users = odm::get_users(&db.db, doc! {"is_admin": {"$ne": true}}, doc! {"created_at": -1})
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut low_trust: Vec<(f64, Value)> = vec![];
    for user in &users {
        let (average_rating, total_ratings, _) = rating_stats(&db.db, &user.id)
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
        let ride_count = completed_ride_count(&db.db, &user.id, &user.role)
            .await
            .map_err(|_| ApiError::db(route, &auth.user.email))?;
        let trust = trust_level(average_rating, ride_count);

        let flagged = trust["level"] == "low" || average_rating.map_or(false, |value| value < 3.0);
        if flagged {
            low_trust.push((
                average_rating.unwrap_or(0.0),
                json!({
                    "id": user.id,
                    "name": user.name,
                    "email": user.email,
                    "role": user.role,
                    "verification_status": user.verification_status,
                    "average_rating": average_rating,
                    "total_ratings": total_ratings,
                    "ride_count": ride_count,
                    "trust_level": trust,
                }),
            ));
        }
    }

    low_trust.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    let count = low_trust.len();
    let users: Vec<Value> = low_trust.into_iter().map(|entry| entry.1).collect();

    Ok(Json(json!({ "low_trust_users": users, "count": count })))
}

pub fn routes() -> Vec<Route> {
    return routes![
        submit_rating,
        can_rate,
        user_ratings,
        ride_history,
        ride_summary,
        pending_ratings,
        my_stats,
        admin_ratings,
        low_trust_users
    ];
}
