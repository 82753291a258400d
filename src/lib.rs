extern crate dotenv;

pub mod config;
pub mod db;
pub mod event;
pub mod identity;
pub mod middleware;
pub mod migrate;
pub mod orm;
pub mod post;
pub mod status;
pub mod web;
