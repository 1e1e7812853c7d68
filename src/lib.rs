pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod html;
pub mod state;
pub mod users;
