//! Order-preserving, append-only collection of findings

use crate::models::{Finding, Severity};

/// Collects module outputs in the order they are recorded. Nothing is deduplicated,
/// reordered or removed.
#[derive(Debug, Default)]
pub struct FindingAggregator {
    findings: Vec<Finding>,
    modules_executed: Vec<String>,
}

impl FindingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one module's findings after everything recorded so far
    pub fn record(&mut self, module: &str, findings: Vec<Finding>) {
        self.modules_executed.push(module.to_string());
        self.findings.extend(findings);
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn modules_executed(&self) -> &[String] {
        &self.modules_executed
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    pub fn into_parts(self) -> (Vec<Finding>, Vec<String>) {
        (self.findings, self.modules_executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FindingKind;

    #[test]
    fn test_preserves_order_and_duplicates() {
        let auth = Finding::new(FindingKind::AuthCookieFlags, "http://t/login.php", Severity::Medium);
        let idor = Finding::new(FindingKind::IdorVertical, "http://t/exec/", Severity::High);

        let mut aggregator = FindingAggregator::new();
        aggregator.record("auth", vec![auth.clone(), auth.clone()]);
        aggregator.record("idor", vec![idor.clone()]);
        aggregator.record("sqli", Vec::new());

        assert_eq!(aggregator.findings(), &[auth.clone(), auth, idor]);
        assert_eq!(aggregator.modules_executed(), &["auth", "idor", "sqli"]);
        assert_eq!(aggregator.count_by_severity(Severity::Medium), 2);
        assert_eq!(aggregator.len(), 3);
    }
}
