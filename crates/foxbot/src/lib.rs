//! Fox Fury — Telegram tap-to-earn bot with a Mini App HTTP backend.
//!
//! The binary wires two front-ends around the shared `foxcore` user
//! store: a long-polling Telegram dispatcher (onboarding and the main
//! keyboard) and an `axum` API (balance lookup and tap registration)
//! consumed by the Mini App.

pub mod cli;
pub mod telegram;
