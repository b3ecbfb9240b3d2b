#![deny(warnings, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub(crate) mod api;
pub mod app;
pub mod classification;
pub mod clustering;
pub mod config;
pub mod observability;
pub mod pipeline;
pub mod util;
