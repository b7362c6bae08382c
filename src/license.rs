/**
 * License Checker
 *
 * DESIGN DECISION: Static SPDX lookup table + fixed compatibility matrix,
 * no external license database client
 * WHY: the registry only ever hands back a free-text license field (§6);
 * normalizing and classifying it is a closed, deterministic lookup problem,
 * not something worth a network round trip per package
 *
 * REASONING CHAIN:
 * 1. `normalize_to_spdx` tries an exact match first, then a case-insensitive
 *    substring match, so "MIT License" and "mit" both resolve to "MIT"
 * 2. `RiskLevel` is shared with the Integration Mapper (`integration::RiskLevel`)
 *    so a caller combining both reports never has to reconcile two risk scales
 * 3. The compatibility matrix has named rules for the cases §4.6 calls out
 *    explicitly, and a documented default rule for everything else, so no
 *    license pair silently falls through unclassified
 */

use crate::cache::TtlCache;
use crate::error::Result;
use crate::integration::RiskLevel;
use crate::registry::RegistryClient;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseType {
    Permissive,
    WeakCopyleft,
    StrongCopyleft,
    PublicDomain,
    Proprietary,
    Other,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageLicenseInfo {
    pub package_name: String,
    pub raw_license: String,
    pub spdx_id: String,
    pub license_type: LicenseType,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseCompatibility {
    pub compatible: bool,
    pub requirements: Vec<String>,
    pub restrictions: Vec<String>,
    pub risk_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictSeverity {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseConflict {
    pub package_a: String,
    pub package_b: String,
    pub severity: ConflictSeverity,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyAction {
    Allow,
    Warn,
    Forbid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LicensePolicy {
    pub allowed: Vec<String>,
    pub warn: Vec<String>,
    pub forbidden: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyViolation {
    pub package_name: String,
    pub spdx_id: String,
    pub action: PolicyAction,
    pub severity: ViolationSeverity,
}

/// Stable export shape (§6 External interfaces): total package count, a
/// count of packages per SPDX id, the conflicts the compatibility matrix
/// flagged, package names split out by the categories a report reader cares
/// about, the weighted overall risk, and a flat list of recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseReport {
    pub total_packages: usize,
    pub license_distribution: HashMap<String, usize>,
    pub compatibility_issues: Vec<LicenseConflict>,
    pub unknown_licenses: Vec<String>,
    pub proprietary_packages: Vec<String>,
    pub copyleft_packages: Vec<String>,
    pub risk_assessment: RiskLevel,
    pub recommendations: Vec<String>,
}

/// SPDX identifier, exact-match first, then case-insensitive substring.
const SPDX_TABLE: &[(&str, &str)] = &[
    ("MIT", "MIT"),
    ("MIT LICENSE", "MIT"),
    ("APACHE-2.0", "Apache-2.0"),
    ("APACHE 2.0", "Apache-2.0"),
    ("APACHE LICENSE 2.0", "Apache-2.0"),
    ("BSD-2-CLAUSE", "BSD-2-Clause"),
    ("BSD-3-CLAUSE", "BSD-3-Clause"),
    ("ISC", "ISC"),
    ("LGPL-2.1", "LGPL-2.1"),
    ("LGPL-3.0", "LGPL-3.0"),
    ("MPL-2.0", "MPL-2.0"),
    ("GPL-2.0", "GPL-2.0"),
    ("GPL-3.0", "GPL-3.0"),
    ("AGPL-3.0", "AGPL-3.0"),
    ("UNLICENSE", "Unlicense"),
    ("CC0-1.0", "CC0-1.0"),
    ("PROPRIETARY", "Proprietary"),
    ("UNLICENSED", "Proprietary"),
];

fn normalize_to_spdx(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "Unknown".to_string();
    }
    let upper = trimmed.to_uppercase();

    for (key, spdx) in SPDX_TABLE {
        if upper == *key {
            return spdx.to_string();
        }
    }
    for (key, spdx) in SPDX_TABLE {
        if upper.contains(key) {
            return spdx.to_string();
        }
    }
    trimmed.to_string()
}

fn classify_type(spdx_id: &str) -> LicenseType {
    match spdx_id {
        "MIT" | "Apache-2.0" | "BSD-2-Clause" | "BSD-3-Clause" | "ISC" => LicenseType::Permissive,
        "LGPL-2.1" | "LGPL-3.0" | "MPL-2.0" => LicenseType::WeakCopyleft,
        "GPL-2.0" | "GPL-3.0" | "AGPL-3.0" => LicenseType::StrongCopyleft,
        "Unlicense" | "CC0-1.0" => LicenseType::PublicDomain,
        "Proprietary" => LicenseType::Proprietary,
        "Unknown" => LicenseType::Unknown,
        _ => LicenseType::Other,
    }
}

/// Risk assignment documented per §4.6: permissive is low risk, copyleft
/// strength tracks risk upward, proprietary is always critical. Public
/// domain is treated as permissive-low; "Other" (an SPDX id outside the
/// known table) is treated as medium since its obligations are unverified.
fn risk_for_type(license_type: LicenseType) -> RiskLevel {
    match license_type {
        LicenseType::Permissive | LicenseType::PublicDomain => RiskLevel::Low,
        LicenseType::WeakCopyleft => RiskLevel::Medium,
        LicenseType::StrongCopyleft => RiskLevel::High,
        LicenseType::Proprietary => RiskLevel::Critical,
        LicenseType::Other => RiskLevel::Medium,
        LicenseType::Unknown => RiskLevel::Unknown,
    }
}

/// Per-package weight for the overall-risk formula (§4.6). `Unknown` (a
/// package whose license could not be determined) contributes no weight —
/// it is neither penalized nor rewarded, matching the rule that
/// unknown-license pairs never conflict either.
fn risk_weight(risk: RiskLevel) -> f64 {
    match risk {
        RiskLevel::Critical => 4.0,
        RiskLevel::High => 3.0,
        RiskLevel::Medium => 2.0,
        RiskLevel::Low => 1.0,
        RiskLevel::Unknown => 0.0,
    }
}

fn conflict_bonus(severity: ConflictSeverity) -> f64 {
    match severity {
        ConflictSeverity::Critical => 5.0,
        ConflictSeverity::High => 3.0,
        ConflictSeverity::Medium => 2.0,
    }
}

/// Computes compatibility, conflicts, and policy compliance across a set of
/// package licenses. Registry lookups for license metadata are cached with
/// a TTL so repeated checks for the same package don't re-fetch.
pub struct LicenseChecker {
    registry: Arc<dyn RegistryClient>,
    cache: TtlCache<String, String>,
}

impl LicenseChecker {
    pub fn new(registry: Arc<dyn RegistryClient>, config: &crate::config::CoreConfig) -> Self {
        Self {
            registry,
            cache: TtlCache::new(config.license_cache_ttl()),
        }
    }

    /// Look up a package's raw license string from the registry, using the
    /// cached value when present and unexpired.
    pub async fn fetch_raw_license(
        &self,
        name: &str,
        version: &str,
        cancel: tokio_util::sync::CancellationToken,
    ) -> Result<String> {
        let cache_key = format!("{name}@{version}");
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }
        let data = self.registry.fetch_package(name, cancel).await?;
        let raw = data
            .versions
            .get(version)
            .or_else(|| data.dist_tags.get("latest").and_then(|v| data.versions.get(v)))
            .and_then(|v| v.license.clone())
            .map(|value| match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Object(map) => map
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("Unknown")
                    .to_string(),
                _ => "Unknown".to_string(),
            })
            .unwrap_or_else(|| "Unknown".to_string());
        self.cache.insert(cache_key, raw.clone());
        Ok(raw)
    }

    pub fn classify_package(&self, package_name: &str, raw_license: &str) -> PackageLicenseInfo {
        let spdx_id = normalize_to_spdx(raw_license);
        let license_type = classify_type(&spdx_id);
        let risk_level = risk_for_type(license_type);
        PackageLicenseInfo {
            package_name: package_name.to_string(),
            raw_license: raw_license.to_string(),
            spdx_id,
            license_type,
            risk_level,
        }
    }

    /// Compatibility between two license types. Named rules cover permissive
    /// combinations and the proprietary/strong-copyleft incompatibility
    /// explicitly called out by §4.6; everything else falls to the default
    /// rule (compatible, medium risk) since most license pairs coexist with
    /// attribution-only obligations.
    pub fn compatibility(&self, a: LicenseType, b: LicenseType) -> LicenseCompatibility {
        use LicenseType::*;

        if a == Proprietary && matches!(b, StrongCopyleft) || b == Proprietary && matches!(a, StrongCopyleft) {
            return LicenseCompatibility {
                compatible: false,
                requirements: vec![],
                restrictions: vec!["strong copyleft cannot be combined with proprietary code".to_string()],
                risk_score: 1.0,
            };
        }

        if matches!(a, Permissive | PublicDomain) && matches!(b, Permissive | PublicDomain) {
            return LicenseCompatibility {
                compatible: true,
                requirements: vec!["preserve attribution notices".to_string()],
                restrictions: vec![],
                risk_score: 0.1,
            };
        }

        if matches!(a, StrongCopyleft) || matches!(b, StrongCopyleft) {
            return LicenseCompatibility {
                compatible: true,
                requirements: vec!["derivative works must be released under a compatible copyleft license".to_string()],
                restrictions: vec!["cannot be relicensed as proprietary".to_string()],
                risk_score: 0.7,
            };
        }

        LicenseCompatibility {
            compatible: true,
            requirements: vec!["review license obligations before redistribution".to_string()],
            restrictions: vec![],
            risk_score: 0.4,
        }
    }

    /// For every unordered pair, consult `compatibility()` and emit a
    /// conflict only when it reports the pair incompatible (§4.6 Conflict
    /// analysis) — never from an independent severity chain that could
    /// disagree with the matrix about which pairs actually conflict.
    pub fn analyze_conflicts(&self, packages: &[PackageLicenseInfo]) -> Vec<LicenseConflict> {
        let mut conflicts = Vec::new();
        for i in 0..packages.len() {
            for j in (i + 1)..packages.len() {
                let a = &packages[i];
                let b = &packages[j];
                if a.license_type == LicenseType::Unknown || b.license_type == LicenseType::Unknown {
                    continue;
                }

                let compat = self.compatibility(a.license_type, b.license_type);
                if compat.compatible {
                    continue;
                }

                let severity = if (a.license_type == LicenseType::Proprietary && b.license_type == LicenseType::StrongCopyleft)
                    || (b.license_type == LicenseType::Proprietary && a.license_type == LicenseType::StrongCopyleft)
                {
                    ConflictSeverity::Critical
                } else if a.license_type == LicenseType::StrongCopyleft || b.license_type == LicenseType::StrongCopyleft {
                    ConflictSeverity::High
                } else {
                    ConflictSeverity::Medium
                };

                conflicts.push(LicenseConflict {
                    package_a: a.package_name.clone(),
                    package_b: b.package_name.clone(),
                    severity,
                    explanation: format!(
                        "{} ({:?}) and {} ({:?}) impose conflicting obligations",
                        a.package_name, a.license_type, b.package_name, b.license_type
                    ),
                });
            }
        }
        conflicts
    }

    pub fn evaluate_policies(&self, packages: &[PackageLicenseInfo], policy: &LicensePolicy) -> Vec<PolicyViolation> {
        packages
            .iter()
            .filter_map(|p| {
                let (action, severity) = if policy.forbidden.iter().any(|id| id == &p.spdx_id) {
                    (PolicyAction::Forbid, ViolationSeverity::High)
                } else if policy.warn.iter().any(|id| id == &p.spdx_id) {
                    (PolicyAction::Warn, ViolationSeverity::Medium)
                } else if policy.allowed.iter().any(|id| id == &p.spdx_id) {
                    return None;
                } else {
                    (PolicyAction::Warn, ViolationSeverity::Low)
                };
                Some(PolicyViolation {
                    package_name: p.package_name.clone(),
                    spdx_id: p.spdx_id.clone(),
                    action,
                    severity,
                })
            })
            .collect()
    }

    /// (Σ per-package weight + Σ conflict penalty) / package_count, per
    /// §4.6: weights critical=4/high=3/medium=2/low=1, conflict bonuses
    /// critical=5/high=3/medium=2, thresholds >=4 critical / >=3 high /
    /// >=2 medium / else low. Zero packages yields `Unknown`.
    pub fn overall_risk(&self, packages: &[PackageLicenseInfo], conflicts: &[LicenseConflict]) -> RiskLevel {
        if packages.is_empty() {
            return RiskLevel::Unknown;
        }
        let package_weight: f64 = packages.iter().map(|p| risk_weight(p.risk_level)).sum();
        let conflict_penalty: f64 = conflicts.iter().map(|c| conflict_bonus(c.severity)).sum();
        let score = (package_weight + conflict_penalty) / packages.len() as f64;

        if score >= 4.0 {
            RiskLevel::Critical
        } else if score >= 3.0 {
            RiskLevel::High
        } else if score >= 2.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Compliant iff no critical conflicts and no high-severity forbidden
    /// violations (§4.6 Compliance validation). Takes the conflict and
    /// violation lists directly rather than a `LicenseReport`, since the
    /// stable report shape (§6) doesn't carry policy violations.
    pub fn validate_compliance(&self, conflicts: &[LicenseConflict], violations: &[PolicyViolation]) -> bool {
        let no_critical_conflicts = !conflicts.iter().any(|c| c.severity == ConflictSeverity::Critical);
        let no_high_forbidden = !violations
            .iter()
            .any(|v| v.action == PolicyAction::Forbid && v.severity == ViolationSeverity::High);
        no_critical_conflicts && no_high_forbidden
    }

    pub fn build_report(&self, packages: Vec<PackageLicenseInfo>, policy: &LicensePolicy) -> LicenseReport {
        let total_packages = packages.len();
        let mut license_distribution: HashMap<String, usize> = HashMap::new();
        let mut unknown_licenses = Vec::new();
        let mut proprietary_packages = Vec::new();
        let mut copyleft_packages = Vec::new();
        for p in &packages {
            *license_distribution.entry(p.spdx_id.clone()).or_insert(0) += 1;
            match p.license_type {
                LicenseType::Unknown => unknown_licenses.push(p.package_name.clone()),
                LicenseType::Proprietary => proprietary_packages.push(p.package_name.clone()),
                LicenseType::WeakCopyleft | LicenseType::StrongCopyleft => {
                    copyleft_packages.push(p.package_name.clone())
                }
                _ => {}
            }
        }

        let compatibility_issues = self.analyze_conflicts(&packages);
        let violations = self.evaluate_policies(&packages, policy);
        let risk_assessment = self.overall_risk(&packages, &compatibility_issues);
        let recommendations = build_recommendations(
            &compatibility_issues,
            &violations,
            &unknown_licenses,
            &proprietary_packages,
        );

        LicenseReport {
            total_packages,
            license_distribution,
            compatibility_issues,
            unknown_licenses,
            proprietary_packages,
            copyleft_packages,
            risk_assessment,
            recommendations,
        }
    }

    pub fn export_json(&self, report: &LicenseReport) -> serde_json::Value {
        serde_json::to_value(report).unwrap_or(serde_json::Value::Null)
    }
}

fn build_recommendations(
    conflicts: &[LicenseConflict],
    violations: &[PolicyViolation],
    unknown_licenses: &[String],
    proprietary_packages: &[String],
) -> Vec<String> {
    let mut recommendations = Vec::new();
    if conflicts.iter().any(|c| c.severity == ConflictSeverity::Critical) {
        recommendations.push("resolve critical license conflicts before distribution".to_string());
    }
    if violations
        .iter()
        .any(|v| v.action == PolicyAction::Forbid)
    {
        recommendations.push("remove packages that violate the forbidden-license policy".to_string());
    }
    if !unknown_licenses.is_empty() {
        recommendations.push("determine the license for packages with unknown license metadata".to_string());
    }
    if !proprietary_packages.is_empty() {
        recommendations.push("confirm proprietary packages are licensed for this distribution".to_string());
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PackageVersionData;
    use async_trait::async_trait;

    struct NoopRegistry;

    #[async_trait]
    impl RegistryClient for NoopRegistry {
        async fn fetch_package(
            &self,
            _name: &str,
            _cancel: tokio_util::sync::CancellationToken,
        ) -> Result<PackageVersionData> {
            unreachable!("tests never call fetch")
        }
    }

    fn checker() -> LicenseChecker {
        let config = crate::config::ConfigLoader::defaults();
        LicenseChecker::new(Arc::new(NoopRegistry), &config)
    }

    #[test]
    fn normalizes_common_variants_to_spdx() {
        let checker = checker();
        assert_eq!(checker.classify_package("a", "MIT License").spdx_id, "MIT");
        assert_eq!(checker.classify_package("b", "Apache 2.0").spdx_id, "Apache-2.0");
        assert_eq!(checker.classify_package("c", "").spdx_id, "Unknown");
    }

    #[test]
    fn proprietary_and_strong_copyleft_conflict_is_critical() {
        let checker = checker();
        let packages = vec![
            checker.classify_package("prop-pkg", "Proprietary"),
            checker.classify_package("gpl-pkg", "GPL-3.0"),
        ];
        let conflicts = checker.analyze_conflicts(&packages);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, ConflictSeverity::Critical);
    }

    #[test]
    fn conflict_severity_is_symmetric_in_ordering() {
        let checker = checker();
        let a = checker.classify_package("prop-pkg", "Proprietary");
        let b = checker.classify_package("gpl-pkg", "GPL-3.0");
        let forward = checker.analyze_conflicts(&[a.clone(), b.clone()]);
        let backward = checker.analyze_conflicts(&[b, a]);
        assert_eq!(forward[0].severity, backward[0].severity);
    }

    #[test]
    fn validate_compliance_is_false_on_critical_conflict() {
        let checker = checker();
        let packages = vec![
            checker.classify_package("prop-pkg", "Proprietary"),
            checker.classify_package("gpl-pkg", "GPL-3.0"),
        ];
        let policy = LicensePolicy::default();
        let conflicts = checker.analyze_conflicts(&packages);
        let violations = checker.evaluate_policies(&packages, &policy);
        assert!(!checker.validate_compliance(&conflicts, &violations));
    }

    #[test]
    fn zero_packages_yields_unknown_overall_risk() {
        let checker = checker();
        assert_eq!(checker.overall_risk(&[], &[]), RiskLevel::Unknown);
    }

    #[test]
    fn single_high_risk_package_without_conflicts_is_high_not_critical() {
        let checker = checker();
        let packages = vec![checker.classify_package("gpl-pkg", "GPL-3.0")];
        assert_eq!(packages[0].risk_level, RiskLevel::High);
        assert_eq!(checker.overall_risk(&packages, &[]), RiskLevel::High);
    }

    #[test]
    fn forbidden_license_in_policy_is_a_high_severity_violation() {
        let checker = checker();
        let packages = vec![checker.classify_package("gpl-pkg", "GPL-3.0")];
        let policy = LicensePolicy {
            allowed: vec!["MIT".to_string()],
            warn: vec![],
            forbidden: vec!["GPL-3.0".to_string()],
        };
        let violations = checker.evaluate_policies(&packages, &policy);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].action, PolicyAction::Forbid);
        assert_eq!(violations[0].severity, ViolationSeverity::High);
    }
}
