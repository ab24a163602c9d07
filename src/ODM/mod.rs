//!
//! Documentation of the ODM module.
//! Contains all the files needed for the MongoDB database connection.
//!


use super::config;
pub mod odm;
pub mod models;
pub mod odm_utils;
