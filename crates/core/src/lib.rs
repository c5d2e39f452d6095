//! redroute-core: device models, routing engine, and card discovery for
//! multi-channel USB audio interfaces.
//!
//! Everything in this crate is hardware-agnostic: the control surface is
//! reached through the traits in [`domain::control`], and the ALSA
//! implementation lives in the `infra` crate.

pub mod domain;
