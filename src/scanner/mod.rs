//! Scan pipeline and probe module trait
//!
//! Authenticate -> Crawl -> Probe (four independent modules) -> Aggregate.

pub mod aggregator;
pub mod auth;
pub mod idor;
pub mod matchers;
pub mod sqli;
pub mod xss;

pub use aggregator::FindingAggregator;
pub use auth::AuthScanner;
pub use idor::IdorScanner;
pub use sqli::SqliScanner;
pub use xss::XssScanner;

use crate::crawler::{self, Crawler};
use crate::error::{Result, WebProbeError};
use crate::http::{self, HttpClient, Session};
use crate::models::{Finding, PageRecord, ScanConfig, ScanResult};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use url::Url;

/// Trait that all probe modules implement
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Returns the module name
    fn name(&self) -> &str;

    /// Returns a description of what this module checks
    fn description(&self) -> &str;

    /// Runs the module against the crawled pages and its known endpoint templates.
    /// Transport failures are absorbed inside the module; an `Err` means the module
    /// could not start (e.g. an endpoint template does not resolve).
    async fn scan(
        &self,
        session: &Session,
        config: &ScanConfig,
        pages: &[PageRecord],
    ) -> Result<Vec<Finding>>;
}

/// Orchestrates the scan phases and the registered probe modules
pub struct ScanEngine {
    scanners: Vec<Arc<dyn Scanner>>,
}

impl ScanEngine {
    /// Creates a ScanEngine with no registered scanners
    pub fn new() -> Self {
        Self {
            scanners: Vec::new(),
        }
    }

    /// Creates a ScanEngine with the four probe modules registered in run order
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.register(Arc::new(SqliScanner));
        engine.register(Arc::new(XssScanner));
        engine.register(Arc::new(AuthScanner));
        engine.register(Arc::new(IdorScanner));
        engine
    }

    /// Registers a new scanner module
    pub fn register(&mut self, scanner: Arc<dyn Scanner>) {
        self.scanners.push(scanner);
    }

    /// Returns information about all registered modules
    pub fn list_modules(&self) -> Vec<(&str, &str)> {
        self.scanners
            .iter()
            .map(|s| (s.name(), s.description()))
            .collect()
    }

    /// Fails on module names in the configuration that no registered scanner answers to
    pub fn validate_modules(&self, config: &ScanConfig) -> Result<()> {
        for module in &config.modules {
            if !self.scanners.iter().any(|s| s.name() == module) {
                return Err(WebProbeError::ModuleNotFound(module.clone()));
            }
        }
        Ok(())
    }

    /// Runs every phase and returns the complete result
    pub async fn run(&self, config: &ScanConfig) -> Result<ScanResult> {
        let mut result = ScanResult::new(&config.target);
        let session = Self::authenticate(config).await?;
        result.auth_status = session.status().clone();

        let pages = Self::crawl(&session, config).await;
        let aggregator = self.probe(&session, config, &pages).await;

        let (findings, modules_executed) = aggregator.into_parts();
        result.pages = pages;
        result.findings = findings;
        result.modules_executed = modules_executed;
        result.total_requests = session.client().request_count();
        result.finish();

        Ok(result)
    }

    /// Phase 1: builds the scan session and logs it in
    pub async fn authenticate(config: &ScanConfig) -> Result<Session> {
        let base_url = Url::parse(&config.target)?;
        let client = HttpClient::from_config(config)?;
        let session = Session::new(client, base_url);
        Ok(http::authenticate(
            session,
            &config.endpoints.login,
            &config.credentials,
            &config.endpoints.login_trigger,
        )
        .await)
    }

    /// Phase 2: crawls from the navigation menu
    pub async fn crawl(session: &Session, config: &ScanConfig) -> Vec<PageRecord> {
        if !session.is_authenticated() {
            warn!(
                "Crawling with an unauthenticated session ({}): only public pages will be found",
                session.status()
            );
        }
        let seeds = crawler::discover_seeds(session, config).await;
        info!("Starting crawler from {} seeds", seeds.len());
        Crawler::new(session, config).crawl(&seeds).await
    }

    /// Phase 3 and 4: runs the enabled modules and aggregates their findings in
    /// registration order, whether or not they ran concurrently.
    pub async fn probe(
        &self,
        session: &Session,
        config: &ScanConfig,
        pages: &[PageRecord],
    ) -> FindingAggregator {
        let enabled: Vec<Arc<dyn Scanner>> = self
            .scanners
            .iter()
            .filter(|s| config.modules.iter().any(|m| m == s.name()))
            .cloned()
            .collect();

        if config.concurrent {
            Self::run_concurrent(&enabled, session, config, pages).await
        } else {
            Self::run_sequential(&enabled, session, config, pages).await
        }
    }

    async fn run_sequential(
        scanners: &[Arc<dyn Scanner>],
        session: &Session,
        config: &ScanConfig,
        pages: &[PageRecord],
    ) -> FindingAggregator {
        let mut aggregator = FindingAggregator::new();
        let pb = ProgressBar::new(scanners.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        for scanner in scanners {
            pb.set_message(format!("Running {}...", scanner.name()));
            info!("Executing module: {}", scanner.name());

            match scanner.scan(session, config, pages).await {
                Ok(findings) => {
                    info!(
                        "Module '{}' completed: {} findings",
                        scanner.name(),
                        findings.len()
                    );
                    aggregator.record(scanner.name(), findings);
                }
                Err(e) => {
                    error!("Module '{}' failed: {}", scanner.name(), e);
                }
            }

            pb.inc(1);
        }

        pb.finish_with_message("Probing complete");
        aggregator
    }

    async fn run_concurrent(
        scanners: &[Arc<dyn Scanner>],
        session: &Session,
        config: &ScanConfig,
        pages: &[PageRecord],
    ) -> FindingAggregator {
        let mut set = JoinSet::new();

        for (index, scanner) in scanners.iter().enumerate() {
            let scanner = Arc::clone(scanner);
            let session = session.clone();
            let config = config.clone();
            let pages = pages.to_vec();

            set.spawn(async move {
                info!("Executing module: {}", scanner.name());
                let outcome = scanner.scan(&session, &config, &pages).await;
                (index, scanner.name().to_string(), outcome)
            });
        }

        let mut slots: Vec<Option<(String, Vec<Finding>)>> = vec![None; scanners.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, name, Ok(findings))) => {
                    info!("Module '{}' completed: {} findings", name, findings.len());
                    slots[index] = Some((name, findings));
                }
                Ok((_, name, Err(e))) => error!("Module '{}' failed: {}", name, e),
                Err(e) => error!("Scanner task panicked: {}", e),
            }
        }

        let mut aggregator = FindingAggregator::new();
        for (name, findings) in slots.into_iter().flatten() {
            aggregator.record(&name, findings);
        }
        aggregator
    }
}

impl Default for ScanEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registration_order() {
        let engine = ScanEngine::with_defaults();
        let names: Vec<&str> = engine.list_modules().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["sqli", "xss", "auth", "idor"]);
    }

    #[test]
    fn test_validate_modules_rejects_unknown() {
        let engine = ScanEngine::with_defaults();
        let mut config = ScanConfig::default();
        assert!(engine.validate_modules(&config).is_ok());

        config.modules.push("ssl".to_string());
        assert!(matches!(
            engine.validate_modules(&config),
            Err(WebProbeError::ModuleNotFound(m)) if m == "ssl"
        ));
    }
}
