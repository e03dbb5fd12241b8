//! HTTP plumbing: cookie-jar client, session handle and login

pub mod auth;
pub mod client;
pub mod session;
pub use auth::authenticate;
pub use client::{HttpClient, HttpResponse};
pub use session::Session;
