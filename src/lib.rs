//! Hardware-independent part of the sensor node firmware.
//!
//! Everything in here builds for the ESP32-S3 target and for the host, so the
//! publish loop, the BMP180 compensation maths and the topic/payload
//! formatting can be unit tested with `cargo test`.

#![cfg_attr(not(test), no_std)]

pub mod bmp180;
pub mod config;
pub mod domain;
pub mod identity;
pub mod mqtt;
pub mod node;
pub mod wifi;
