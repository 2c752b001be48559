#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![deny(unused_features)]
#![warn(unused_crate_dependencies)]

//! Report verification.
//!
//! [service::ReportService] runs new reports through the configured
//! [pipeline::PipelineStrategy], stores the [policy] decision and applies
//! admin decisions and operational status changes.

pub mod notification;
pub mod pipeline;
pub mod policy;
pub mod service;
pub mod state_machine;
pub mod status;

use utils::ComponentError;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Malformed input")]
    MalformedInput,
    #[error("Admin action is not allowed in the current verification state")]
    InvalidTransition,
    #[error("Report was modified concurrently")]
    Conflict,
    #[error("Report not found")]
    NotFound,
    #[error("Report is not verified")]
    NotVerified,
    #[error("Operational status transition is not allowed")]
    InvalidStatusTransition,
    #[error("Actor is not allowed to change the report")]
    NotAllowed,
    #[error("Persistence error")]
    Persistence,
}

impl ComponentError for VerificationError {
    const COMPONENT_NAME: &'static str = "Verification";
}
