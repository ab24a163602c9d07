pub mod auth_routes;
pub mod ride_routes;
pub mod request_routes;
pub mod chat_routes;
pub mod verification_routes;
pub mod sos_routes;
pub mod rating_routes;
pub mod admin_routes;
pub mod routes_utils;

use super::ODM;
use super::config;
use super::json_format;

use mongodb::bson::doc;
use rocket::request::Request;
use rocket::serde::json::Json;
use rocket::{Catcher, Route, State};
use serde_json::{json, Value};

pub use routes_utils::*;

#[get("/")]
async fn index() -> Json<Value> {
    Json(json!({
        "message": "Unipool Ride Sharing API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

#[get("/health")]
async fn health(db: &State<MongoState>) -> Json<Value> {
    let database = match db.db.run_command(doc! {"ping": 1}, None).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };
    Json(json!({ "status": "healthy", "database": database }))
}

#[catch(401)]
fn unauthorized_catcher() -> Json<Value> {
    Json(json!({ "error": "Authentication required" }))
}

#[catch(403)]
fn forbidden_catcher(request: &Request) -> Json<Value> {
    let message = request.local_cache(|| GuardMessage(None));
    let message = message.0.clone().unwrap_or_else(|| "Access denied".to_string());
    Json(json!({ "error": message }))
}

#[catch(404)]
fn not_found_catcher() -> Json<Value> {
    Json(json!({ "error": "Resource not found" }))
}

#[catch(422)]
fn unprocessable_catcher() -> Json<Value> {
    Json(json!({ "error": "Malformed request payload" }))
}

#[catch(500)]
fn internal_catcher() -> Json<Value> {
    Json(json!({ "error": "Internal server error" }))
}

pub fn routes() -> Vec<Route> {
    let mut routes = routes![index, health];
    routes.append(&mut auth_routes::routes());
    routes.append(&mut ride_routes::routes());
    routes.append(&mut request_routes::routes());
    routes.append(&mut chat_routes::routes());
    routes.append(&mut verification_routes::routes());
    routes.append(&mut sos_routes::routes());
    routes.append(&mut rating_routes::routes());
    routes.append(&mut admin_routes::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![
        unauthorized_catcher,
        forbidden_catcher,
        not_found_catcher,
        unprocessable_catcher,
        internal_catcher
    ]
}
