//! Rainbow Scratch Paper: an opaque cover over a rainbow (or any uploaded
//! image) that the user scratches away, with PNG export of what is on screen.

pub mod app;
pub mod background;
pub mod cli;
pub mod controller;
pub mod controls;
pub mod error;
pub mod export;
pub mod ingest;
pub mod logger;
pub mod menu;
pub mod scratch;
pub mod settings;
pub mod surface;
