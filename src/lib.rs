//! Vitalgate - a unified accessor for permissioned health data.
//!
//! # Overview
//!
//! Vitalgate reconciles two on-device data sources, a permissioned external
//! health-record store and a local motion co-processor, into unified
//! metrics: steps, distance, calories, height, weight, age, biological sex.
//! Its core is a time-window resolution and multi-source aggregation engine:
//! symbolic periods become concrete `[start, end)` instants, samples are
//! filtered to trusted origins, and an estimated calorie burn fills in when
//! no direct measurement exists.
//!
//! Both collaborators are injected as traits; this crate owns no platform
//! handles, network protocol, or storage of its own.
//!
//! # Failure Model
//!
//! Vitalgate is **fail-soft by construction**: metrics are best-effort.
//!
//! - No metric operation ever surfaces an error to its caller.
//! - Every query failure collapses to "no data": zero, an empty or
//!   zero-filled collection, or `false`.
//! - Writes are fire-and-forget; failures are logged and dropped.
//!
//! Callers cannot distinguish "no data occurred" from "query failed"; that
//! is the contract, not an accident.
//!
//! # Modules
//!
//! - [`model`]: Value types for periods, windows, metrics, and samples
//! - [`period`]: Symbolic period resolution (with its compatibility quirks)
//! - [`backends`]: Collaborator traits and the synthetic in-memory pair
//! - [`sources`]: Trusted-origin filtering
//! - [`aggregation`]: Windowed sum, hourly-bucket, and daily-series queries
//! - [`energy`]: Fallback calorie estimation from the user profile
//! - [`dispatch`]: Delivery of completions onto one designated context
//! - [`facade`]: The public callback-based API, [`facade::HealthHub`]

pub mod aggregation;
pub mod backends;
pub mod dispatch;
pub mod energy;
pub mod error;
pub mod facade;
pub mod model;
pub mod period;
pub mod sources;
