//! Address resolution adapters

pub mod google;

pub use google::{GoogleGeocoder, GoogleGeocoderConfig};
