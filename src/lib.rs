//! webprobe - Authenticated Web Application Vulnerability Scanner
//!
//! Logs into a target application, crawls its reachable pages and forms, and probes
//! them for SQL injection, cross-site scripting, insecure direct object references
//! and weak authentication/session handling. Findings share one six-field schema
//! and are exported as JSON or CSV.

pub mod config;
pub mod crawler;
pub mod error;
pub mod http;
pub mod models;
pub mod report;
pub mod scanner;
