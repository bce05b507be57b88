//! The mock target: a configurable responder and its admin API,
//! sharing a single [`ResponderConfigStore`].

mod admin;
mod config;
mod responder;

pub use self::{
    admin::{AdminService, CONFIG_PATH, MAX_ADMIN_BODY_SIZE},
    config::{ResponderConfig, ResponderConfigStore},
    responder::MockResponder,
};
