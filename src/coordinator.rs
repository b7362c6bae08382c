/**
 * Coordinator
 *
 * DESIGN DECISION: Thin fan-out owner, one instance per analyzer, no
 * coordinator-level lock
 * WHY: each analyzer already guards its own state with an internal mutex
 * (§5 Concurrency model); a coordinator-level lock would only serialize
 * work that's already safe to run concurrently
 *
 * REASONING CHAIN:
 * 1. `ingest_file` fans a single file out to the Component Identifier, then
 *    the Cycle Detector, then the Integration Mapper, matching the
 *    dependency order in §2 (Path Normalizer -> CI -> CD; IM standalone)
 * 2. `ingest_files_parallel` uses `rayon` to run that same fan-out across
 *    many files at once; correctness relies entirely on each analyzer's own
 *    internal synchronization, never on ordering between files
 * 3. Update/license checks operate on an explicit, caller-supplied package
 *    list — the Coordinator never discovers packages itself, since manifest
 *    parsing is out of scope (§1 Non-goals)
 */

use crate::component::{ComponentIdentifier, FileRecord};
use crate::config::CoreConfig;
use crate::cycle::{CycleDetector, CycleRecord};
use crate::error::Result;
use crate::integration::{IntegrationMapper, IntegrationPoint};
use crate::license::{LicenseChecker, LicensePolicy, LicenseReport};
use crate::registry::RegistryClient;
use crate::update_checker::{UpdateChecker, UpdateRecommendation, UpdateType};
use rayon::prelude::*;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The result of fanning one file out across the Component Identifier, the
/// Cycle Detector, and the Integration Mapper.
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub file_record: FileRecord,
    pub integration_points: Vec<IntegrationPoint>,
}

/// Owns one instance of each analyzer and presents a single entry point for
/// ingesting files and running package-level checks.
pub struct Coordinator {
    component_identifier: ComponentIdentifier,
    cycle_detector: CycleDetector,
    integration_mapper: IntegrationMapper,
    update_checker: UpdateChecker,
    license_checker: LicenseChecker,
}

impl Coordinator {
    pub fn new(config: CoreConfig, registry: Arc<dyn RegistryClient>) -> Self {
        Self {
            component_identifier: ComponentIdentifier::new(),
            cycle_detector: CycleDetector::new(),
            integration_mapper: IntegrationMapper::new(),
            update_checker: UpdateChecker::new(registry.clone(), &config),
            license_checker: LicenseChecker::new(registry, &config),
        }
    }

    /// Ingest one file across every axis that consumes file text directly.
    pub fn ingest_file(&self, path: &str, text: &str) -> IngestResult {
        let file_record = self.component_identifier.identify(path, text);
        self.cycle_detector.ingest(path, text);
        let integration_points = self.integration_mapper.scan(path, text);
        IngestResult {
            file_record,
            integration_points,
        }
    }

    /// Ingest many files concurrently. Each analyzer guards its own state
    /// internally, so files may complete in any order relative to each other.
    pub fn ingest_files_parallel(&self, files: &[(String, String)]) -> Vec<IngestResult> {
        files
            .par_iter()
            .map(|(path, text)| self.ingest_file(path, text))
            .collect()
    }

    pub fn cycles(&self) -> Vec<CycleRecord> {
        self.cycle_detector.analyze()
    }

    pub fn integration_points(&self) -> Vec<IntegrationPoint> {
        self.integration_mapper.points()
    }

    pub fn component_count(&self) -> usize {
        self.component_identifier.len()
    }

    /// Fetch registry data and recommend an update for `current` within
    /// `window`. `name` is used only for the registry lookup.
    pub async fn check_update(
        &self,
        name: &str,
        current: &str,
        window: UpdateType,
        cancel: CancellationToken,
    ) -> Result<UpdateRecommendation> {
        let data = self.update_checker.fetch(name, cancel).await?;
        self.update_checker.recommend(current, &data, window)
    }

    /// Build a license report across an explicit set of `(name, version)`
    /// pairs the caller supplies.
    pub async fn check_licenses(
        &self,
        packages: &[(String, String)],
        policy: &LicensePolicy,
        cancel: CancellationToken,
    ) -> Result<LicenseReport> {
        let mut infos = Vec::with_capacity(packages.len());
        for (name, version) in packages {
            let raw = self
                .license_checker
                .fetch_raw_license(name, version, cancel.clone())
                .await?;
            infos.push(self.license_checker.classify_package(name, &raw));
        }
        Ok(self.license_checker.build_report(infos, policy))
    }
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
            _cancel: CancellationToken,
        ) -> Result<PackageVersionData> {
            unreachable!("not exercised in these tests")
        }
    }

    fn coordinator() -> Coordinator {
        Coordinator::new(CoreConfig::default(), Arc::new(NoopRegistry))
    }

    #[test]
    fn ingest_file_fans_out_to_component_and_integration() {
        let coordinator = coordinator();
        let text = "import React from 'react';\nexport default function Button() {\n  return <button>Click</button>;\n}\n";
        let result = coordinator.ingest_file("/src/components/Button.tsx", text);
        assert_eq!(result.file_record.component_name, "Button");
        assert!(result.integration_points.is_empty());
        assert_eq!(coordinator.component_count(), 1);
    }

    #[test]
    fn ingest_files_parallel_detects_cross_file_cycle() {
        let coordinator = coordinator();
        let files = vec![
            (
                "/src/components/A.jsx".to_string(),
                "import B from './B';\nexport default function A() { return <B/>; }\n".to_string(),
            ),
            (
                "/src/components/B.jsx".to_string(),
                "import A from './A';\nexport default function B() { return <A/>; }\n".to_string(),
            ),
        ];
        let results = coordinator.ingest_files_parallel(&files);
        assert_eq!(results.len(), 2);
        assert_eq!(coordinator.cycles().len(), 1);
    }

    #[test]
    fn ingest_file_records_integration_points() {
        let coordinator = coordinator();
        let text = "const client = createClient();\nconst key = process.env.REDIS_KEY;\n";
        let result = coordinator.ingest_file("/src/cache/redis.js", text);
        assert!(!result.integration_points.is_empty());
        assert!(!coordinator.integration_points().is_empty());
    }
}
