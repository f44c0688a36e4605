//! Authentication
//!
//! This module handles:
//! * Auth tokens sent with the INIT request
//! * Mapping the server's reply to an [`AuthOutcome`]

mod outcome;
mod token;

pub use outcome::{map_init_response, AuthOutcome};
pub use token::AuthToken;
