pub mod animation;
pub mod app;
pub mod braille;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod interaction;
pub mod map;
pub mod present;
pub mod ui;
