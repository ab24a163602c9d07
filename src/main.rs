//!
//! # Unipool - campus ride sharing backend
//!
//! Unipool is the HTTP backend of a campus ride sharing platform.
//! Students sign up with their campus email, verify their identity,
//! offer and request rides, chat once a ride is agreed, rate each
//! other afterwards and can raise an SOS during an ongoing ride.
//! Administrators review verifications, reports and SOS alerts.
//!
//! Everything is JSON over HTTP, persisted in MongoDB collections.
//!

#![allow(non_snake_case)]
#[macro_use] extern crate rocket;

mod routes;
mod json_format;
mod ODM;
mod config;

use anyhow::Context;
use routes::{MongoState, Config};
use log::{error, warn};

#[cfg(test)] mod tests;

/// The main function, runs w/ cargo run
#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let config = config::config::init().await.context("CONFIG failed to launch")?;
    config::config::setup_logger(&config).await.context("LOGGER failed to launch")?;

    let db = ODM::odm::init(&config).await.context("DATABASE failed to launch")?;
    warn!("UNIPOOL IS LAUNCHING");

    let lift = rocket::build()
        .mount("/", routes::routes())
        .register("/", routes::catchers())
        .manage(MongoState { db })
        .manage(Config { config })
        .launch()
        .await;

    warn!("UNIPOOL OVER");
    if let Err(value) = lift {
        error!("Rocket could not run, error {}", value);
    }
    Ok(())
}
