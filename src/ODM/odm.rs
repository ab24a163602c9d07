//!
//! Documentation of the odm module.
//! Used to connect to the Unipool database and to run every
//! collection read and write the route handlers need.
//!
//! No operation here is transactional. Multi-step flows
//! (seat checks, cascaded deletes) are read-then-write at the
//! handler level, so concurrent requests can interleave.
//!

use super::*;
use models::*;
use odm_utils::*;
use config::config::ConfyConfig;
use std::time::Duration;

use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::{ClientOptions, FindOptions, ListDatabasesOptions};
use mongodb::{Client, Database};
use log::{error, info};

///
/// Initiate DB connection
///
/// # Arguments
///
/// * `config` - A config object containing 'database' and 'database_ip'
///
/// # Log
///
/// * `info` - "Database Connected!", indicating success
/// * `error` - "Could not connect to MongoDB {error}", indicating error
///
pub async fn init(config: &ConfyConfig) -> mongodb::error::Result<Database> {
    connect(config).await
}

/// basic connection, isn't available out of the "odm.rs" module
async fn connect(config: &ConfyConfig) -> mongodb::error::Result<Database> {
    let mut client_options = ClientOptions::parse(&config.database_ip).await?;
    client_options.connect_timeout = Some(Duration::from_secs(config.timeout));
    client_options.heartbeat_freq = Some(Duration::from_secs(config.timeout));
    client_options.server_selection_timeout = Some(Duration::from_secs(config.timeout));
    let client = Client::with_options(client_options)?;

    match client.list_database_names(Document::new(), ListDatabasesOptions::builder().build()).await {
        Ok(_) => {
            info!("Database Connected!");
        },
        Err(value) => {
            error!("{}", format!("Could not connect to MongoDB {}", value));
            return Err(value);
        },
    }

    Ok(client.database(&config.database[..]))
}

//
// USER ACTIONS
//

/// Creates and inserts a new user, returning the new hex id
pub async fn insert_user(
    db: &Database,
    email: &str,
    password_hash: &str,
    name: &str,
    role: &str,
) -> mongodb::error::Result<String> {
    let collection = db.collection::<Document>("users");

    let insert_one_result = collection
        .insert_one(
            doc! {
                "email":               email,
                "password_hash":       password_hash,
                "name":                name,
                "role":                role,
                "is_admin":            false,
                "verification_status": "unverified",
                "student_id_image":    None::<String>,
                "rejection_reason":    None::<String>,
                "verified_at":         None::<String>,
                "is_active":           true,
                "is_suspended":        false,
                "warning_count":       0_i64,
                "created_at":          now_rfc3339(),
            },
            None,
        )
        .await?;

    Ok(insert_one_result.inserted_id.as_object_id().map(|value| value.to_hex()).unwrap_or_default())
}

///
/// Get user by id
///
/// # Output
///
/// * Err(_) - indicates DB error
/// * Ok(None) - user has not been found (or the id is not a valid ObjectId)
/// * Ok(Some(value)) - user has been found
///
pub async fn get_user_by_id(db: &Database, id: &str) -> mongodb::error::Result<Option<User>> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(None),
    };
    let collection = db.collection::<UserDocument>("users");

    let user_doc = collection.find_one(doc! {"_id": oid}, None).await?;
    Ok(user_doc.map(|value| doc_to_user(&value)))
}

/// Get user by email (emails are stored lowercased)
pub async fn get_user_by_email(db: &Database, email: &str) -> mongodb::error::Result<Option<User>> {
    let collection = db.collection::<UserDocument>("users");

    let user_doc = collection.find_one(doc! {"email": email}, None).await?;
    Ok(user_doc.map(|value| doc_to_user(&value)))
}

/// Get all users matching a filter, with a sort order
pub async fn get_users(db: &Database, filter: Document, sort: Document) -> mongodb::error::Result<Vec<User>> {
    let collection = db.collection::<UserDocument>("users");
    let find_options = FindOptions::builder().sort(sort).build();

    let mut cursor = collection.find(filter, find_options).await?;

    let mut users: Vec<User> = vec![];
    while let Some(result) = cursor.try_next().await? {
        users.push(doc_to_user(&result));
    }
    Ok(users)
}

/// Set fields on a user document
pub async fn update_user_fields(db: &Database, id: &str, fields: Document) -> mongodb::error::Result<()> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(()),
    };
    let collection = db.collection::<UserDocument>("users");
    collection.update_one(doc! {"_id": oid}, doc! {"$set": fields}, None).await?;
    Ok(())
}

/// Bump the warning counter and stamp the warning metadata in one update
pub async fn add_user_warning(db: &Database, id: &str, fields: Document) -> mongodb::error::Result<()> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(()),
    };
    let collection = db.collection::<UserDocument>("users");
    collection
        .update_one(
            doc! {"_id": oid},
            doc! {"$inc": {"warning_count": 1_i64}, "$set": fields},
            None,
        )
        .await?;
    Ok(())
}

/// Deletes a single user document (cascades are done by the caller)
pub async fn delete_user(db: &Database, id: &str) -> mongodb::error::Result<()> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(()),
    };
    db.collection::<UserDocument>("users").delete_one(doc! {"_id": oid}, None).await?;
    Ok(())
}

pub async fn count_users(db: &Database, filter: Document) -> mongodb::error::Result<u64> {
    db.collection::<UserDocument>("users").count_documents(filter, None).await
}

//
// SESSION ACTIONS
//

/// Insert a bearer session
pub async fn insert_session(db: &Database, token: &str, user_id: &str, expires_at: &str) -> mongodb::error::Result<()> {
    let collection = db.collection::<Document>("sessions");
    collection
        .insert_one(
            doc! {
                "token":      token,
                "user_id":    user_id,
                "created_at": now_rfc3339(),
                "expires_at": expires_at,
            },
            None,
        )
        .await?;
    Ok(())
}

/// Get a session by its bearer token
pub async fn get_session(db: &Database, token: &str) -> mongodb::error::Result<Option<Session>> {
    let collection = db.collection::<SessionDocument>("sessions");
    let session_doc = collection.find_one(doc! {"token": token}, None).await?;
    Ok(session_doc.map(|value| doc_to_session(&value)))
}

/// Delete a session (logout)
pub async fn delete_session(db: &Database, token: &str) -> mongodb::error::Result<()> {
    db.collection::<SessionDocument>("sessions").delete_one(doc! {"token": token}, None).await?;
    Ok(())
}

//
// RIDE ACTIONS
//

/// Insert a ride offer, returning the new hex id.
/// Recurring instances reuse this with their own date and a parent id.
pub async fn insert_ride(
    db: &Database,
    driver_id: &str,
    ride: &RideCreate,
    date: &str,
    is_recurring: bool,
    parent_ride_id: Option<&str>,
) -> mongodb::error::Result<String> {
    let collection = db.collection::<Document>("rides");

    let insert_one_result = collection
        .insert_one(
            doc! {
                "driver_id":           driver_id,
                "source":              ride.source.clone(),
                "destination":         ride.destination.clone(),
                "source_lat":          ride.source_lat,
                "source_lng":          ride.source_lng,
                "destination_lat":     ride.destination_lat,
                "destination_lng":     ride.destination_lng,
                "date":                date,
                "time":                ride.time.clone(),
                "available_seats":     ride.available_seats,
                "estimated_cost":      ride.estimated_cost,
                "status":              "active",
                "pickup_point":        ride.pickup_point.clone(),
                "is_recurring":        is_recurring,
                "recurrence_pattern":  if is_recurring { ride.recurrence_pattern.clone() } else { None },
                "parent_ride_id":      parent_ride_id,
                "event_tag":           ride.event_tag.clone(),
                "cancelled_reason":    None::<String>,
                "created_at":          now_rfc3339(),
            },
            None,
        )
        .await?;

    Ok(insert_one_result.inserted_id.as_object_id().map(|value| value.to_hex()).unwrap_or_default())
}

/// Get ride by its ID
pub async fn get_ride(db: &Database, id: &str) -> mongodb::error::Result<Option<Ride>> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(None),
    };
    let collection = db.collection::<RideDocument>("rides");

    let ride_doc = collection.find_one(doc! {"_id": oid}, None).await?;
    Ok(ride_doc.map(|value| doc_to_ride(&value)))
}

/// Get all rides matching a filter, sorted, optionally limited
pub async fn get_rides(
    db: &Database,
    filter: Document,
    sort: Document,
    limit: Option<i64>,
) -> mongodb::error::Result<Vec<Ride>> {
    let collection = db.collection::<RideDocument>("rides");
    let find_options = match limit {
        Some(value) => FindOptions::builder().sort(sort).limit(value).build(),
        None => FindOptions::builder().sort(sort).build(),
    };

    let mut cursor = collection.find(filter, find_options).await?;

    let mut rides: Vec<Ride> = vec![];
    while let Some(result) = cursor.try_next().await? {
        rides.push(doc_to_ride(&result));
    }
    Ok(rides)
}

/// Find a ride identical in route and schedule, used to skip
/// duplicate recurring instances
pub async fn find_duplicate_ride(
    db: &Database,
    driver_id: &str,
    source: &str,
    destination: &str,
    date: &str,
    time: &str,
) -> mongodb::error::Result<Option<Ride>> {
    let collection = db.collection::<RideDocument>("rides");
    let ride_doc = collection
        .find_one(
            doc! {
                "driver_id":   driver_id,
                "source":      source,
                "destination": destination,
                "date":        date,
                "time":        time,
            },
            None,
        )
        .await?;
    Ok(ride_doc.map(|value| doc_to_ride(&value)))
}

/// Set fields on a ride document
pub async fn update_ride_fields(db: &Database, id: &str, fields: Document) -> mongodb::error::Result<()> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(()),
    };
    let collection = db.collection::<RideDocument>("rides");
    collection.update_one(doc! {"_id": oid}, doc! {"$set": fields}, None).await?;
    Ok(())
}

/// Deletes a single ride (requests and chat are cascaded by the caller)
pub async fn delete_ride(db: &Database, id: &str) -> mongodb::error::Result<()> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(()),
    };
    db.collection::<RideDocument>("rides").delete_one(doc! {"_id": oid}, None).await?;
    Ok(())
}

/// Deletes every ride matching a filter
pub async fn delete_rides(db: &Database, filter: Document) -> mongodb::error::Result<()> {
    db.collection::<RideDocument>("rides").delete_many(filter, None).await?;
    Ok(())
}

pub async fn count_rides(db: &Database, filter: Document) -> mongodb::error::Result<u64> {
    db.collection::<RideDocument>("rides").count_documents(filter, None).await
}

//
// RIDE REQUEST ACTIONS
//

/// Insert a seat request against a ride, returning the new hex id
pub async fn insert_ride_request(
    db: &Database,
    ride_id: &str,
    rider_id: &str,
    is_urgent: bool,
) -> mongodb::error::Result<String> {
    let collection = db.collection::<Document>("ride_requests");

    let insert_one_result = collection
        .insert_one(
            doc! {
                "ride_id":    ride_id,
                "rider_id":   rider_id,
                "status":     "requested",
                "ride_pin":   None::<String>,
                "is_urgent":  is_urgent,
                "created_at": now_rfc3339(),
            },
            None,
        )
        .await?;

    Ok(insert_one_result.inserted_id.as_object_id().map(|value| value.to_hex()).unwrap_or_default())
}

/// Get a ride request by its ID
pub async fn get_ride_request(db: &Database, id: &str) -> mongodb::error::Result<Option<RideRequest>> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(None),
    };
    let collection = db.collection::<RideRequestDocument>("ride_requests");

    let request_doc = collection.find_one(doc! {"_id": oid}, None).await?;
    Ok(request_doc.map(|value| doc_to_ride_request(&value)))
}

/// Get all ride requests matching a filter, with a sort order
pub async fn get_ride_requests(db: &Database, filter: Document, sort: Document) -> mongodb::error::Result<Vec<RideRequest>> {
    let collection = db.collection::<RideRequestDocument>("ride_requests");
    let find_options = FindOptions::builder().sort(sort).build();

    let mut cursor = collection.find(filter, find_options).await?;

    let mut requests: Vec<RideRequest> = vec![];
    while let Some(result) = cursor.try_next().await? {
        requests.push(doc_to_ride_request(&result));
    }
    Ok(requests)
}

/// Find the request a given rider already placed against a ride
pub async fn find_request_for_rider(db: &Database, ride_id: &str, rider_id: &str) -> mongodb::error::Result<Option<RideRequest>> {
    let collection = db.collection::<RideRequestDocument>("ride_requests");
    let request_doc = collection
        .find_one(doc! {"ride_id": ride_id, "rider_id": rider_id}, None)
        .await?;
    Ok(request_doc.map(|value| doc_to_ride_request(&value)))
}

///
/// How many seats of a ride are taken.
///
/// Counts accepted and ongoing requests; for completed rides the
/// completed requests are included so past rides report the riders
/// that actually travelled.
///
/// This count feeds the seat check on request creation and
/// acceptance. The check and the following write are separate
/// operations, so two concurrent accepts can both pass it.
///
pub async fn seats_taken(db: &Database, ride_id: &str, include_completed: bool) -> mongodb::error::Result<u64> {
    let statuses: Vec<&str> = if include_completed {
        vec!["accepted", "ongoing", "completed"]
    } else {
        vec!["accepted", "ongoing"]
    };
    let collection = db.collection::<RideRequestDocument>("ride_requests");
    collection
        .count_documents(doc! {"ride_id": ride_id, "status": {"$in": statuses}}, None)
        .await
}

/// Set fields on a ride request document
pub async fn update_request_fields(db: &Database, id: &str, fields: Document) -> mongodb::error::Result<()> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(()),
    };
    let collection = db.collection::<RideRequestDocument>("ride_requests");
    collection.update_one(doc! {"_id": oid}, doc! {"$set": fields}, None).await?;
    Ok(())
}

/// Set fields on every ride request matching a filter
pub async fn update_requests_many(db: &Database, filter: Document, fields: Document) -> mongodb::error::Result<()> {
    let collection = db.collection::<RideRequestDocument>("ride_requests");
    collection.update_many(filter, doc! {"$set": fields}, None).await?;
    Ok(())
}

/// Deletes every ride request matching a filter
pub async fn delete_ride_requests(db: &Database, filter: Document) -> mongodb::error::Result<()> {
    db.collection::<RideRequestDocument>("ride_requests").delete_many(filter, None).await?;
    Ok(())
}

pub async fn count_ride_requests(db: &Database, filter: Document) -> mongodb::error::Result<u64> {
    db.collection::<RideRequestDocument>("ride_requests").count_documents(filter, None).await
}

//
// CHAT ACTIONS
//

/// Insert a chat message scoped to a ride request, returning the new hex id
pub async fn insert_chat_message(
    db: &Database,
    ride_request_id: &str,
    ride_id: &str,
    sender_id: &str,
    message: &str,
) -> mongodb::error::Result<String> {
    let collection = db.collection::<Document>("chat_messages");

    let insert_one_result = collection
        .insert_one(
            doc! {
                "ride_request_id": ride_request_id,
                "ride_id":         ride_id,
                "sender_id":       sender_id,
                "message":         message,
                "created_at":      now_rfc3339(),
            },
            None,
        )
        .await?;

    Ok(insert_one_result.inserted_id.as_object_id().map(|value| value.to_hex()).unwrap_or_default())
}

/// Get the chat log of a ride request, oldest first
pub async fn get_chat_messages(db: &Database, ride_request_id: &str) -> mongodb::error::Result<Vec<ChatMessage>> {
    let collection = db.collection::<ChatMessageDocument>("chat_messages");
    let find_options = FindOptions::builder().sort(doc! {"created_at": 1}).build();

    let mut cursor = collection.find(doc! {"ride_request_id": ride_request_id}, find_options).await?;

    let mut messages: Vec<ChatMessage> = vec![];
    while let Some(result) = cursor.try_next().await? {
        messages.push(doc_to_chat_message(&result));
    }
    Ok(messages)
}

/// Deletes every chat message matching a filter
pub async fn delete_chat_messages(db: &Database, filter: Document) -> mongodb::error::Result<()> {
    db.collection::<ChatMessageDocument>("chat_messages").delete_many(filter, None).await?;
    Ok(())
}

//
// SOS ACTIONS
//

/// Insert an SOS event, returning the new hex id
pub async fn insert_sos_event(
    db: &Database,
    sos: &SosCreate,
    ride_id: &str,
    triggered_by: &str,
    triggered_by_role: &str,
) -> mongodb::error::Result<String> {
    let collection = db.collection::<Document>("sos_events");

    let insert_one_result = collection
        .insert_one(
            doc! {
                "ride_request_id":   sos.ride_request_id.clone(),
                "ride_id":           ride_id,
                "triggered_by":      triggered_by,
                "triggered_by_role": triggered_by_role,
                "latitude":          sos.latitude,
                "longitude":         sos.longitude,
                "message":           sos.message.clone(),
                "status":            "active",
                "admin_notes":       None::<String>,
                "reviewed_at":       None::<String>,
                "resolved_at":       None::<String>,
                "resolved_by":       None::<String>,
                "created_at":        now_rfc3339(),
            },
            None,
        )
        .await?;

    Ok(insert_one_result.inserted_id.as_object_id().map(|value| value.to_hex()).unwrap_or_default())
}

/// Get an SOS event by its ID
pub async fn get_sos_event(db: &Database, id: &str) -> mongodb::error::Result<Option<SosEvent>> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(None),
    };
    let collection = db.collection::<SosEventDocument>("sos_events");

    let sos_doc = collection.find_one(doc! {"_id": oid}, None).await?;
    Ok(sos_doc.map(|value| doc_to_sos_event(&value)))
}

/// Get all SOS events matching a filter, newest first
pub async fn get_sos_events(db: &Database, filter: Document) -> mongodb::error::Result<Vec<SosEvent>> {
    let collection = db.collection::<SosEventDocument>("sos_events");
    let find_options = FindOptions::builder().sort(doc! {"created_at": -1}).build();

    let mut cursor = collection.find(filter, find_options).await?;

    let mut events: Vec<SosEvent> = vec![];
    while let Some(result) = cursor.try_next().await? {
        events.push(doc_to_sos_event(&result));
    }
    Ok(events)
}

/// Find an SOS that is still open (active or under review) for a ride request
pub async fn find_open_sos_for_request(db: &Database, ride_request_id: &str) -> mongodb::error::Result<Option<SosEvent>> {
    let collection = db.collection::<SosEventDocument>("sos_events");
    let sos_doc = collection
        .find_one(
            doc! {"ride_request_id": ride_request_id, "status": {"$in": ["active", "under_review"]}},
            None,
        )
        .await?;
    Ok(sos_doc.map(|value| doc_to_sos_event(&value)))
}

/// Set fields on an SOS event document
pub async fn update_sos_fields(db: &Database, id: &str, fields: Document) -> mongodb::error::Result<()> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(()),
    };
    let collection = db.collection::<SosEventDocument>("sos_events");
    collection.update_one(doc! {"_id": oid}, doc! {"$set": fields}, None).await?;
    Ok(())
}

/// Deletes every SOS event matching a filter
pub async fn delete_sos_events(db: &Database, filter: Document) -> mongodb::error::Result<()> {
    db.collection::<SosEventDocument>("sos_events").delete_many(filter, None).await?;
    Ok(())
}

pub async fn count_sos_events(db: &Database, filter: Document) -> mongodb::error::Result<u64> {
    db.collection::<SosEventDocument>("sos_events").count_documents(filter, None).await
}

//
// RATING ACTIONS
//

/// Insert a rating, returning the new hex id.
/// Uniqueness per (request, rater) is checked by the caller before
/// inserting, so a duplicate can still race in between the two steps.
pub async fn insert_rating(
    db: &Database,
    rating: &RatingCreate,
    ride_id: &str,
    rater_id: &str,
    rater_role: &str,
    rated_user_id: &str,
) -> mongodb::error::Result<String> {
    let collection = db.collection::<Document>("ratings");

    let insert_one_result = collection
        .insert_one(
            doc! {
                "ride_request_id": rating.ride_request_id.clone(),
                "ride_id":         ride_id,
                "rater_id":        rater_id,
                "rater_role":      rater_role,
                "rated_user_id":   rated_user_id,
                "rating":          rating.rating,
                "feedback":        rating.feedback.clone(),
                "created_at":      now_rfc3339(),
            },
            None,
        )
        .await?;

    Ok(insert_one_result.inserted_id.as_object_id().map(|value| value.to_hex()).unwrap_or_default())
}

/// Find a single rating matching a filter
pub async fn find_rating(db: &Database, filter: Document) -> mongodb::error::Result<Option<Rating>> {
    let collection = db.collection::<RatingDocument>("ratings");
    let rating_doc = collection.find_one(filter, None).await?;
    Ok(rating_doc.map(|value| doc_to_rating(&value)))
}

/// Get all ratings matching a filter, newest first, optionally limited
pub async fn get_ratings(db: &Database, filter: Document, limit: Option<i64>) -> mongodb::error::Result<Vec<Rating>> {
    let collection = db.collection::<RatingDocument>("ratings");
    let find_options = match limit {
        Some(value) => FindOptions::builder().sort(doc! {"created_at": -1}).limit(value).build(),
        None => FindOptions::builder().sort(doc! {"created_at": -1}).build(),
    };

    let mut cursor = collection.find(filter, find_options).await?;

    let mut ratings: Vec<Rating> = vec![];
    while let Some(result) = cursor.try_next().await? {
        ratings.push(doc_to_rating(&result));
    }
    Ok(ratings)
}

/// Deletes every rating matching a filter
pub async fn delete_ratings(db: &Database, filter: Document) -> mongodb::error::Result<()> {
    db.collection::<RatingDocument>("ratings").delete_many(filter, None).await?;
    Ok(())
}

pub async fn count_ratings(db: &Database, filter: Document) -> mongodb::error::Result<u64> {
    db.collection::<RatingDocument>("ratings").count_documents(filter, None).await
}

//
// EVENT TAG ACTIONS
//

/// Insert an event tag, returning the new hex id
pub async fn insert_event_tag(db: &Database, tag: &EventTagCreate, created_by: &str) -> mongodb::error::Result<String> {
    let collection = db.collection::<Document>("event_tags");

    let insert_one_result = collection
        .insert_one(
            doc! {
                "name":        tag.name.clone(),
                "description": tag.description.clone(),
                "is_active":   true,
                "created_by":  created_by,
                "created_at":  now_rfc3339(),
            },
            None,
        )
        .await?;

    Ok(insert_one_result.inserted_id.as_object_id().map(|value| value.to_hex()).unwrap_or_default())
}

/// Get an event tag by its ID
pub async fn get_event_tag(db: &Database, id: &str) -> mongodb::error::Result<Option<EventTag>> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(None),
    };
    let collection = db.collection::<EventTagDocument>("event_tags");

    let tag_doc = collection.find_one(doc! {"_id": oid}, None).await?;
    Ok(tag_doc.map(|value| doc_to_event_tag(&value)))
}

/// Get all event tags matching a filter
pub async fn get_event_tags(db: &Database, filter: Document) -> mongodb::error::Result<Vec<EventTag>> {
    let collection = db.collection::<EventTagDocument>("event_tags");
    let find_options = FindOptions::builder().sort(doc! {"created_at": -1}).build();

    let mut cursor = collection.find(filter, find_options).await?;

    let mut tags: Vec<EventTag> = vec![];
    while let Some(result) = cursor.try_next().await? {
        tags.push(doc_to_event_tag(&result));
    }
    Ok(tags)
}

/// Set fields on an event tag document
pub async fn update_event_tag_fields(db: &Database, id: &str, fields: Document) -> mongodb::error::Result<()> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(()),
    };
    let collection = db.collection::<EventTagDocument>("event_tags");
    collection.update_one(doc! {"_id": oid}, doc! {"$set": fields}, None).await?;
    Ok(())
}

//
// REPORT ACTIONS
//

/// Insert a user report, returning the new hex id
pub async fn insert_report(
    db: &Database,
    report: &ReportCreate,
    reporter_id: &str,
    reporter_name: &str,
    reported_user_name: Option<&str>,
) -> mongodb::error::Result<String> {
    let collection = db.collection::<Document>("reports");

    let insert_one_result = collection
        .insert_one(
            doc! {
                "reporter_id":        reporter_id,
                "reporter_name":      reporter_name,
                "reported_user_id":   report.reported_user_id.clone(),
                "reported_user_name": reported_user_name,
                "ride_id":            report.ride_id.clone(),
                "category":           report.category.clone(),
                "description":        report.description.clone(),
                "status":             "pending",
                "admin_notes":        None::<String>,
                "action_taken":       None::<String>,
                "handled_by":         None::<String>,
                "handled_at":         None::<String>,
                "created_at":         now_rfc3339(),
            },
            None,
        )
        .await?;

    Ok(insert_one_result.inserted_id.as_object_id().map(|value| value.to_hex()).unwrap_or_default())
}

/// Get a report by its ID
pub async fn get_report(db: &Database, id: &str) -> mongodb::error::Result<Option<Report>> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(None),
    };
    let collection = db.collection::<ReportDocument>("reports");

    let report_doc = collection.find_one(doc! {"_id": oid}, None).await?;
    Ok(report_doc.map(|value| doc_to_report(&value)))
}

/// Get all reports matching a filter, newest first
pub async fn get_reports(db: &Database, filter: Document) -> mongodb::error::Result<Vec<Report>> {
    let collection = db.collection::<ReportDocument>("reports");
    let find_options = FindOptions::builder().sort(doc! {"created_at": -1}).build();

    let mut cursor = collection.find(filter, find_options).await?;

    let mut reports: Vec<Report> = vec![];
    while let Some(result) = cursor.try_next().await? {
        reports.push(doc_to_report(&result));
    }
    Ok(reports)
}

/// Set fields on a report document
pub async fn update_report_fields(db: &Database, id: &str, fields: Document) -> mongodb::error::Result<()> {
    let oid = match ObjectId::parse_str(id) {
        Ok(value) => value,
        Err(_) => return Ok(()),
    };
    let collection = db.collection::<ReportDocument>("reports");
    collection.update_one(doc! {"_id": oid}, doc! {"$set": fields}, None).await?;
    Ok(())
}

/// Deletes every report matching a filter
pub async fn delete_reports(db: &Database, filter: Document) -> mongodb::error::Result<()> {
    db.collection::<ReportDocument>("reports").delete_many(filter, None).await?;
    Ok(())
}

pub async fn count_reports(db: &Database, filter: Document) -> mongodb::error::Result<u64> {
    db.collection::<ReportDocument>("reports").count_documents(filter, None).await
}

//
// AUDIT LOG ACTIONS
//

/// Append an entry to the audit trail. Audit entries are never
/// updated or deleted.
pub async fn insert_audit_log(
    db: &Database,
    admin_id: &str,
    admin_name: &str,
    action_type: &str,
    target_type: &str,
    target_id: &str,
    details: Document,
) -> mongodb::error::Result<()> {
    let collection = db.collection::<Document>("audit_logs");
    collection
        .insert_one(
            doc! {
                "admin_id":    admin_id,
                "admin_name":  admin_name,
                "action_type": action_type,
                "target_type": target_type,
                "target_id":   target_id,
                "details":     details,
                "timestamp":   now_rfc3339(),
            },
            None,
        )
        .await?;
    Ok(())
}

/// Get audit log entries matching a filter, newest first, limited
pub async fn get_audit_logs(db: &Database, filter: Document, limit: i64) -> mongodb::error::Result<Vec<AuditLogEntry>> {
    let collection = db.collection::<AuditLogDocument>("audit_logs");
    let find_options = FindOptions::builder().sort(doc! {"timestamp": -1}).limit(limit).build();

    let mut cursor = collection.find(filter, find_options).await?;

    let mut entries: Vec<AuditLogEntry> = vec![];
    while let Some(result) = cursor.try_next().await? {
        entries.push(doc_to_audit_entry(&result));
    }
    Ok(entries)
}
