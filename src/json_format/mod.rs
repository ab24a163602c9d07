//!
//! Documentation of the json_format module.
//! Contains the response assembly for every API reply.
//!


use super::ODM;
use super::config;
pub mod json_format;
