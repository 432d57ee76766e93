//! minigreet: a minimal greetd greeter for the terminal.
//!
//! One configured user, a password field and a session selector. The
//! authentication state machine lives in [`auth`], session discovery and
//! the session ring in [`session`], and the greetd plumbing in [`greeter`].

pub mod auth;
pub mod config;
pub mod greeter;
pub mod logging;
pub mod power;
pub mod session;
pub mod tui;
pub mod user;
