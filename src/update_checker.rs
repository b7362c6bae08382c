/**
 * Semver + Update Checker
 *
 * DESIGN DECISION: Hand-rolled semver parsing/compare, not the `semver` crate
 * WHY: §4.5 specifies non-standard comparison rules (build metadata ignored
 * unconditionally, not just de-prioritized) and a bespoke priority/effort/
 * timeline model the `semver` crate has no notion of; a thin regex parser
 * keeps those rules in one place instead of fighting a general-purpose crate
 *
 * REASONING CHAIN:
 * 1. `SemanticVersion::parse` is the single source of truth for the version
 *    grammar; every other computation in this module consumes its output
 * 2. `UpdateChecker` wraps an injected `RegistryClient` behind a TTL cache;
 *    cache reads never block on the network once warm
 * 3. Recommendation/compatibility/priority/effort/timeline are independent,
 *    narrowly-scoped functions so each rule in §4.5 has exactly one place
 *    it lives
 */

use crate::config::CoreConfig;
use crate::error::{Error, Result};
use crate::registry::{PackageVersionData, RegistryClient};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

use crate::cache::TtlCache;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
    pub raw: String,
}

fn version_re() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| {
        Regex::new(r"^v?(\d+)\.(\d+)\.(\d+)(?:-([0-9A-Za-z.\-]+))?(?:\+([0-9A-Za-z.\-]+))?$")
            .expect("static regex is valid")
    })
}

impl SemanticVersion {
    pub fn parse(input: &str) -> Result<Self> {
        let caps = version_re()
            .captures(input)
            .ok_or_else(|| Error::ParseError(format!("not a semantic version: {input}")))?;

        let major = caps[1].parse().map_err(|_| Error::ParseError(format!("invalid major in {input}")))?;
        let minor = caps[2].parse().map_err(|_| Error::ParseError(format!("invalid minor in {input}")))?;
        let patch = caps[3].parse().map_err(|_| Error::ParseError(format!("invalid patch in {input}")))?;

        Ok(SemanticVersion {
            major,
            minor,
            patch,
            prerelease: caps.get(4).map(|m| m.as_str().to_string()),
            build: caps.get(5).map(|m| m.as_str().to_string()),
            raw: input.to_string(),
        })
    }

    /// Lexicographic over (major, minor, patch), then no-prerelease >
    /// has-prerelease, then prerelease string comparison. Build metadata
    /// is always ignored (§9 Open Questions).
    pub fn compare(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateType {
    Patch,
    Minor,
    Major,
    Prerelease,
}

pub fn determine_update_type(current: &SemanticVersion, target: &SemanticVersion) -> UpdateType {
    if current.major != target.major {
        UpdateType::Major
    } else if current.minor != target.minor {
        UpdateType::Minor
    } else if current.patch != target.patch {
        UpdateType::Patch
    } else {
        UpdateType::Prerelease
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompatibilityLevel {
    Safe,
    MinorRisk,
    Breaking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compatibility {
    pub level: CompatibilityLevel,
    pub risk: f64,
    pub breaking_changes: Vec<String>,
    pub dependency_conflicts: Vec<String>,
    pub peer_conflicts: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effort {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeline {
    Immediate,
    ShortTerm,
    LongTerm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecommendation {
    pub current_version: String,
    pub latest: String,
    pub recommended: String,
    pub update_type: UpdateType,
    pub compatibility: Compatibility,
    pub benefits: Vec<String>,
    pub risks: Vec<String>,
    pub priority: Priority,
    pub effort: Effort,
    pub timeline: Timeline,
    pub security_update: bool,
}

/// Parses semver, fetches/caches registry data, and produces update
/// recommendations per the requested update window.
pub struct UpdateChecker {
    registry: Arc<dyn RegistryClient>,
    cache: TtlCache<String, PackageVersionData>,
}

impl UpdateChecker {
    pub fn new(registry: Arc<dyn RegistryClient>, config: &CoreConfig) -> Self {
        Self {
            registry,
            cache: TtlCache::new(config.registry_cache_ttl()),
        }
    }

    /// Fetch package data, serving from the TTL cache when fresh.
    pub async fn fetch(&self, name: &str, cancel: CancellationToken) -> Result<PackageVersionData> {
        if let Some(cached) = self.cache.get(&name.to_string()) {
            return Ok(cached);
        }
        if cancel.is_cancelled() {
            return Err(Error::RegistryError(format!("fetch of {name} was cancelled")));
        }
        let data = self.registry.fetch_package(name, cancel).await?;
        self.cache.insert(name.to_string(), data.clone());
        Ok(data)
    }

    /// Recommend an upgrade for `current` within `window`, using already-fetched `data`.
    pub fn recommend(
        &self,
        current: &str,
        data: &PackageVersionData,
        window: UpdateType,
    ) -> Result<UpdateRecommendation> {
        let current_version = SemanticVersion::parse(current)?;

        let mut candidates: Vec<SemanticVersion> = data
            .versions
            .keys()
            .filter_map(|v| SemanticVersion::parse(v).ok())
            .filter(|v| v.compare(&current_version) == Ordering::Greater)
            .filter(|v| window == UpdateType::Prerelease || v.prerelease.is_none())
            .filter(|v| determine_update_type(&current_version, v) == window)
            .collect();
        candidates.sort_by(|a, b| b.compare(a));

        let recommended = match candidates.into_iter().next() {
            Some(v) => v.raw,
            None => data
                .dist_tags
                .get("latest")
                .cloned()
                .ok_or_else(|| Error::UnknownPackage(data.name.clone()))?,
        };

        let target_version = SemanticVersion::parse(&recommended)?;
        let update_type = determine_update_type(&current_version, &target_version);
        let compatibility = self.compatibility(data, current, &recommended, update_type);
        let security_update = Self::looks_like_security_update(data, &recommended);
        let priority = Self::priority(security_update, update_type, compatibility.risk);
        let effort = Self::effort(update_type, compatibility.risk, compatibility.breaking_changes.len());
        let timeline = Self::timeline(priority, compatibility.risk);

        let mut benefits = vec![];
        let mut risks = vec![];
        match update_type {
            UpdateType::Patch => benefits.push("bug fixes with minimal risk".to_string()),
            UpdateType::Minor => benefits.push("new backwards-compatible functionality".to_string()),
            UpdateType::Major => risks.push("breaking changes likely".to_string()),
            UpdateType::Prerelease => risks.push("prerelease quality, not yet stable".to_string()),
        }
        if security_update {
            benefits.push("addresses a known security issue".to_string());
        }
        risks.extend(compatibility.breaking_changes.clone());

        Ok(UpdateRecommendation {
            current_version: current.to_string(),
            latest: data.dist_tags.get("latest").cloned().unwrap_or_else(|| recommended.clone()),
            recommended,
            update_type,
            compatibility,
            benefits,
            risks,
            priority,
            effort,
            timeline,
            security_update,
        })
    }

    fn compatibility(
        &self,
        data: &PackageVersionData,
        current: &str,
        target: &str,
        update_type: UpdateType,
    ) -> Compatibility {
        let (level, mut risk) = match update_type {
            UpdateType::Major => (CompatibilityLevel::Breaking, 0.8),
            UpdateType::Minor => (CompatibilityLevel::MinorRisk, 0.3),
            UpdateType::Patch => (CompatibilityLevel::Safe, 0.1),
            UpdateType::Prerelease => (CompatibilityLevel::MinorRisk, 0.3),
        };

        let mut breaking_changes = vec![];
        if update_type == UpdateType::Major {
            breaking_changes.push(format!("major version bump from {current} to {target}"));
        }
        if let Some(target_pv) = data.versions.get(target) {
            if target_pv.deprecated.is_some() {
                breaking_changes.push("target version is marked deprecated".to_string());
                risk += 0.2;
            }
        }

        let mut dependency_conflicts = vec![];
        let mut peer_conflicts = vec![];
        if let (Some(current_pv), Some(target_pv)) = (data.versions.get(current), data.versions.get(target)) {
            for (dep, current_range) in &current_pv.dependencies {
                if let Some(target_range) = target_pv.dependencies.get(dep) {
                    if target_range != current_range {
                        dependency_conflicts.push(format!("{dep}: {current_range} -> {target_range}"));
                    }
                }
            }
            for (dep, current_range) in &current_pv.peer_dependencies {
                if let Some(target_range) = target_pv.peer_dependencies.get(dep) {
                    if target_range != current_range {
                        peer_conflicts.push(format!("{dep}: {current_range} -> {target_range}"));
                    }
                }
            }
        }

        let mut recommendations = vec![];
        match level {
            CompatibilityLevel::Breaking => {
                recommendations.push("review breaking changes before upgrading".to_string())
            }
            CompatibilityLevel::MinorRisk => {
                recommendations.push("run the test suite after upgrading".to_string())
            }
            CompatibilityLevel::Safe => recommendations.push("safe to upgrade".to_string()),
        }

        Compatibility {
            level,
            risk,
            breaking_changes,
            dependency_conflicts,
            peer_conflicts,
            recommendations,
        }
    }

    fn looks_like_security_update(data: &PackageVersionData, target: &str) -> bool {
        data.versions
            .get(target)
            .and_then(|pv| pv.description.as_ref())
            .map(|d| {
                let lower = d.to_lowercase();
                lower.contains("security") || lower.contains("vulnerability") || lower.contains("cve")
            })
            .unwrap_or(false)
    }

    /// score = 0.5 + (0.4 if security) - (0.2 if major) - 0.3*risk.
    ///
    /// The 0.5 baseline keeps an ordinary patch update (no security flag,
    /// risk 0.1) at priority `medium`, matching the documented patch-window
    /// scenario; without it the `-0.3*risk` term alone would put nearly
    /// every non-security update at `low`.
    fn priority(security_update: bool, update_type: UpdateType, risk: f64) -> Priority {
        let score = 0.5
            + if security_update { 0.4 } else { 0.0 }
            - if update_type == UpdateType::Major { 0.2 } else { 0.0 }
            - 0.3 * risk;

        if score >= 0.7 {
            Priority::Critical
        } else if score >= 0.5 {
            Priority::High
        } else if score >= 0.3 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    fn effort(update_type: UpdateType, risk: f64, breaking_change_count: usize) -> Effort {
        match update_type {
            UpdateType::Patch => Effort::Low,
            UpdateType::Minor => {
                if risk > 0.4 {
                    Effort::Medium
                } else {
                    Effort::Low
                }
            }
            UpdateType::Major => {
                if breaking_change_count > 2 {
                    Effort::High
                } else {
                    Effort::Medium
                }
            }
            UpdateType::Prerelease => Effort::Medium,
        }
    }

    fn timeline(priority: Priority, risk: f64) -> Timeline {
        match priority {
            Priority::Critical => Timeline::Immediate,
            Priority::High if risk < 0.5 => Timeline::ShortTerm,
            _ if risk > 0.6 => Timeline::LongTerm,
            _ => Timeline::ShortTerm,
        }
    }

    /// Retain only recommendations that demand immediate attention:
    /// critical priority, or flagged as a security update.
    pub fn filter_critical(recommendations: &[UpdateRecommendation]) -> Vec<&UpdateRecommendation> {
        recommendations
            .iter()
            .filter(|r| r.priority == Priority::Critical || r.security_update)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_full_semver_with_prerelease_and_build() {
        let v = SemanticVersion::parse("v1.2.3-beta.1+build.5").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
        assert_eq!(v.prerelease.as_deref(), Some("beta.1"));
        assert_eq!(v.build.as_deref(), Some("build.5"));
        assert_eq!(v.raw, "v1.2.3-beta.1+build.5");
    }

    #[test]
    fn invalid_version_is_a_parse_error() {
        assert!(matches!(
            SemanticVersion::parse("not.a.version"),
            Err(Error::ParseError(_))
        ));
    }

    #[test]
    fn release_outranks_prerelease() {
        let release = SemanticVersion::parse("1.0.0").unwrap();
        let prerelease = SemanticVersion::parse("1.0.0-alpha").unwrap();
        assert_eq!(release.compare(&prerelease), Ordering::Greater);
    }

    #[test]
    fn prerelease_strings_compare_lexicographically() {
        let beta = SemanticVersion::parse("1.0.0-beta").unwrap();
        let alpha = SemanticVersion::parse("1.0.0-alpha").unwrap();
        assert_eq!(beta.compare(&alpha), Ordering::Greater);
    }

    #[test]
    fn compare_is_antisymmetric() {
        let a = SemanticVersion::parse("1.2.3").unwrap();
        let b = SemanticVersion::parse("1.3.0").unwrap();
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
    }

    fn version_data(versions: &[&str], latest: &str) -> PackageVersionData {
        let mut map = HashMap::new();
        for v in versions {
            map.insert(v.to_string(), Default::default());
        }
        let mut dist_tags = HashMap::new();
        dist_tags.insert("latest".to_string(), latest.to_string());
        PackageVersionData {
            name: "demo".to_string(),
            dist_tags,
            versions: map,
            time: HashMap::new(),
        }
    }

    #[test]
    fn patch_window_recommends_nearest_patch() {
        let checker_data = version_data(&["1.0.1", "1.1.0", "2.0.0"], "2.0.0");
        let registry: Arc<dyn RegistryClient> = Arc::new(NoopRegistry);
        let checker = UpdateChecker::new(registry, &CoreConfig::default());
        let rec = checker.recommend("1.0.0", &checker_data, UpdateType::Patch).unwrap();
        assert_eq!(rec.recommended, "1.0.1");
        assert_eq!(rec.update_type, UpdateType::Patch);
        assert_eq!(rec.priority, Priority::Medium);
        assert_eq!(rec.effort, Effort::Low);
    }

    #[test]
    fn major_window_recommends_breaking_update() {
        let checker_data = version_data(&["1.0.1", "1.1.0", "2.0.0"], "2.0.0");
        let registry: Arc<dyn RegistryClient> = Arc::new(NoopRegistry);
        let checker = UpdateChecker::new(registry, &CoreConfig::default());
        let rec = checker.recommend("1.0.0", &checker_data, UpdateType::Major).unwrap();
        assert_eq!(rec.recommended, "2.0.0");
        assert_eq!(rec.update_type, UpdateType::Major);
        assert_eq!(rec.compatibility.level, CompatibilityLevel::Breaking);
        assert!(rec.compatibility.risk >= 0.5);
        assert!(matches!(rec.effort, Effort::Medium | Effort::High));
    }

    struct NoopRegistry;

    #[async_trait::async_trait]
    impl RegistryClient for NoopRegistry {
        async fn fetch_package(
            &self,
            _name: &str,
            _cancel: CancellationToken,
        ) -> Result<PackageVersionData> {
            unreachable!("not exercised in these tests")
        }
    }
}
