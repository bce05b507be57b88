//! Library for the loadpair tools containing most of their core code:
//! the load driver (client side) and the controllable mock target (server side).

#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

pub mod client;
pub mod driver;
pub mod target;
pub mod tls;
pub mod utils;
