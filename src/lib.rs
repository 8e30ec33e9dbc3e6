//! CardBeacon library — covert playing-card beacons over WiFi.
//!
//! A sender advertises one playing card as a WiFi network whose name is
//! `CARD_` followed by six invisible code points. This crate holds the
//! portable half of the receiver: the card model, the beacon codec, and a
//! scan pipeline that periodically scans, de-duplicates sightings within
//! a cache window and reports each newly seen card. Everything here is
//! `no_std` without an allocator and testable on any host with
//! `cargo test`. Platform binaries (ESP32 firmware, the host simulator)
//! are thin drivers that own the clock and the radio.
//!
//! - `card`, `codec` — card model and beacon name encoding
//! - `cache`, `pipeline`, `history` — scan lifecycle and card events
//! - `scanner` — promiscuous-mode sniffing as a scan facility
//! - `protocol`, `comm` — NDJSON messages and host commands
//! - `board`, `defaults` — compile-time board constants and tunables

#![cfg_attr(not(test), no_std)]

pub mod board;
pub mod cache;
pub mod card;
pub mod codec;
pub mod comm;
pub mod defaults;
pub mod history;
pub mod pipeline;
pub mod protocol;
pub mod scanner;
