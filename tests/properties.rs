//! Property-based tests for the invariants named in SPEC_FULL.md §8:
//! semver total ordering, cycle canonicality, and license conflict symmetry.

use proptest::prelude::*;
use repolens_core::cycle::CycleDetector;
use repolens_core::license::LicenseChecker;
use repolens_core::registry::{PackageVersionData, RegistryClient};
use repolens_core::update_checker::SemanticVersion;
use std::sync::Arc;

struct NoopRegistry;

#[async_trait::async_trait]
impl RegistryClient for NoopRegistry {
    async fn fetch_package(
        &self,
        _name: &str,
        _cancel: tokio_util::sync::CancellationToken,
    ) -> repolens_core::Result<PackageVersionData> {
        unreachable!("not exercised in these tests")
    }
}

fn license_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("MIT"),
        Just("Apache-2.0"),
        Just("GPL-3.0"),
        Just("LGPL-2.1"),
        Just("Proprietary"),
        Just("Unlicense"),
    ]
}

fn semver_strategy() -> impl Strategy<Value = (u64, u64, u64)> {
    (0u64..20, 0u64..20, 0u64..20)
}

proptest! {
    /// Antisymmetry: if a < b then b > a, and a.compare(a) is always Equal.
    #[test]
    fn semver_compare_is_antisymmetric((maj, min, pat) in semver_strategy(), (maj2, min2, pat2) in semver_strategy()) {
        let a = SemanticVersion::parse(&format!("{maj}.{min}.{pat}")).unwrap();
        let b = SemanticVersion::parse(&format!("{maj2}.{min2}.{pat2}")).unwrap();
        let forward = a.compare(&b);
        let backward = b.compare(&a);
        prop_assert_eq!(forward.reverse(), backward);
        prop_assert_eq!(a.compare(&a), std::cmp::Ordering::Equal);
    }

    /// Transitivity: if a <= b and b <= c then a <= c.
    #[test]
    fn semver_compare_is_transitive(
        (maj, min, pat) in semver_strategy(),
        (maj2, min2, pat2) in semver_strategy(),
        (maj3, min3, pat3) in semver_strategy(),
    ) {
        let a = SemanticVersion::parse(&format!("{maj}.{min}.{pat}")).unwrap();
        let b = SemanticVersion::parse(&format!("{maj2}.{min2}.{pat2}")).unwrap();
        let c = SemanticVersion::parse(&format!("{maj3}.{min3}.{pat3}")).unwrap();
        if a.compare(&b) != std::cmp::Ordering::Greater && b.compare(&c) != std::cmp::Ordering::Greater {
            prop_assert_ne!(a.compare(&c), std::cmp::Ordering::Greater);
        }
    }

    /// Cycle canonicality: re-analyzing the same ingested graph yields the
    /// same set of cycle ids, regardless of how many times analyze() runs.
    #[test]
    fn cycle_analysis_is_canonical(chain_length in 2usize..6) {
        let detector = CycleDetector::new();
        for i in 0..chain_length {
            let next = (i + 1) % chain_length;
            let path = format!("/src/mod_{i}.js");
            let text = format!("import next from './mod_{next}';\nexport const v{i} = 1;\n");
            detector.ingest(&path, &text);
        }
        let first = detector.analyze();
        let second = detector.analyze();
        let first_ids: Vec<_> = first.iter().map(|c| c.id.clone()).collect();
        let second_ids: Vec<_> = second.iter().map(|c| c.id.clone()).collect();
        prop_assert_eq!(first_ids, second_ids);
    }

    /// Conflict severity between a pair of licensed packages doesn't depend
    /// on which one is listed first.
    #[test]
    fn license_conflict_severity_is_symmetric(license_a in license_strategy(), license_b in license_strategy()) {
        let config = repolens_core::CoreConfig::default();
        let checker = LicenseChecker::new(Arc::new(NoopRegistry), &config);
        let a = checker.classify_package("pkg-a", license_a);
        let b = checker.classify_package("pkg-b", license_b);

        let forward = checker.analyze_conflicts(&[a.clone(), b.clone()]);
        let backward = checker.analyze_conflicts(&[b, a]);

        prop_assert_eq!(forward.len(), backward.len());
        if let (Some(f), Some(b)) = (forward.first(), backward.first()) {
            prop_assert_eq!(f.severity, b.severity);
        }
    }
}
