pub mod authorization;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod payloads;
pub mod services;
pub mod token;

pub mod utils {
    pub mod input_validation;
    pub mod password_utils;
}
