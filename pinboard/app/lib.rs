//! A pin and board sharing service.
//!
//! Users upload images and videos as pins, collect them into boards, and get
//! a home feed biased by what they searched for before. Everything is served
//! as JSON over HTTP; see [`routes::build_route`] for the endpoints.

pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod feed;
pub mod forms;
pub mod media;
pub mod models;
pub mod moderation;
pub mod passwords;
pub mod repo;
pub mod routes;
pub mod schema;
pub mod tags;
pub mod tokens;
pub mod views;
pub mod web;
