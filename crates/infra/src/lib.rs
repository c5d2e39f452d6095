//! redroute-infra: ALSA realization of the control-surface traits
//!
//! The core crate talks to hardware exclusively through
//! `redroute_core::domain::control`; this crate provides the ALSA-backed
//! implementation plus the raw capability probe behind the `describe`
//! diagnostic command.

pub mod control;
