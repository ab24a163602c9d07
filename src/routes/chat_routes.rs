use super::{*};

use log::info;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde_json::{json, Value};

use json_format::json_format::serialize_chat_message;
use ODM::models::*;
use ODM::odm;

/// Load the request and its ride, or fail with the right status
async fn request_with_ride(
    db: &mongodb::Database,
    request_id: &str,
    route: &Route,
    email: &str,
) -> Result<(RideRequest, Ride), ApiError> {
    check_id(request_id, "request")?;
    let request = odm::get_ride_request(db, request_id)
        .await
        .map_err(|_| ApiError::db(route, email))?
        .ok_or_else(|| ApiError::not_found("Ride request not found"))?;
    let ride = odm::get_ride(db, &request.ride_id)
        .await
        .map_err(|_| ApiError::db(route, email))?
        .ok_or_else(|| ApiError::not_found("Ride not found"))?;
    Ok((request, ride))
}

///
///Chat log route - ride participants only, admins may read
///
///The chat opens on acceptance and is read-only once the ride
///completes.
///
#[get("/api/chat/<request_id>/messages")]
async fn get_messages(
    auth: ApiUser,
    request_id: String,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    let (request, ride) = request_with_ride(&db.db, &request_id, route, &auth.user.email).await?;

    let is_rider = request.rider_id == auth.user.id;
    let is_driver = ride.driver_id == auth.user.id;
    if !(is_rider || is_driver || auth.user.is_admin) {
        return Err(ApiError::forbidden("Only ride participants can access chat"));
    }

    if request.status == "requested" || request.status == "rejected" {
        return Err(ApiError::forbidden("Chat is only available after ride acceptance"));
    }

    let messages = odm::get_chat_messages(&db.db, &request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let mut message_values = vec![];
    for message in &messages {
        message_values.push(
            serialize_chat_message(&db.db, message)
                .await
                .map_err(|_| ApiError::db(route, &auth.user.email))?,
        );
    }

    let chat_enabled = request.status == "accepted" || request.status == "ongoing";
    Ok(Json(json!({
        "messages": message_values,
        "chat_enabled": chat_enabled,
        "request_status": request.status,
    })))
}

///
///Chat send route - ride participants only
///
#[post("/api/chat/<request_id>/messages", data = "<input>")]
async fn send_message(
    auth: ApiUser,
    request_id: String,
    input: Json<ChatMessageInput>,
    db: &State<MongoState>,
    route: &Route,
) -> Result<Json<Value>, ApiError> {
    let (request, ride) = request_with_ride(&db.db, &request_id, route, &auth.user.email).await?;

    let is_rider = request.rider_id == auth.user.id;
    let is_driver = ride.driver_id == auth.user.id;
    if !(is_rider || is_driver) {
        return Err(ApiError::forbidden("Only ride participants can send messages"));
    }

    if request.status != "accepted" && request.status != "ongoing" {
        if request.status == "completed" {
            return Err(ApiError::forbidden("Chat is disabled after ride completion"));
        }
        return Err(ApiError::forbidden("Chat is only available after ride acceptance"));
    }

    if input.message.is_empty() || input.message.len() > 1000 {
        return Err(ApiError::bad_request("Message must be between 1 and 1000 characters"));
    }

    let message_id = odm::insert_chat_message(&db.db, &request_id, &request.ride_id, &auth.user.id, &input.message)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    let messages = odm::get_chat_messages(&db.db, &request_id)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;
    let sent = messages
        .iter()
        .find(|message| message.id == message_id)
        .ok_or_else(|| ApiError::not_found("Message not found"))?;
    let message_value = serialize_chat_message(&db.db, sent)
        .await
        .map_err(|_| ApiError::db(route, &auth.user.email))?;

    info!("{}", format!("Server>>Client:\tChat message on request {} by {}", &request_id, &auth.user.email));
    Ok(Json(json!({ "message": "Message sent", "chat_message": message_value })))
}

pub fn routes() -> Vec<Route> {
    return routes![get_messages, send_message];
}
