/**
 * repolens-core
 *
 * DESIGN DECISION: Modular architecture with one module per analyzer axis
 * WHY: Separation of concerns enables independent testing, optimization, and
 * evolution of each subsystem while maintaining clear contracts between
 * components
 *
 * REASONING CHAIN:
 * 1. Static analysis of a codebase decomposes into four largely-independent
 *    axes: component classification, cycle detection, integration mapping,
 *    and package-registry analytics
 * 2. Each axis has its own module with its own cache and error surface
 * 3. A thin Coordinator owns one instance of each analyzer and fans ingested
 *    files out to them, so callers touch one entry point
 * 4. Error handling centralized in error.rs provides consistent error
 *    semantics across every analyzer
 * 5. The system is a deliberate lexical scanner (regex/substring), never an
 *    AST parser — no module here touches a parser or the filesystem
 *
 * PATTERN: Pattern-001 (library core + thin coordinator)
 *
 * # Architecture Overview
 *
 * ```text
 * ┌───────────────────────────────────────────────────────────────┐
 * │                        Coordinator                            │
 * ├───────────────┬───────────────┬───────────────┬───────────────┤
 * │ Component     │ Cycle         │ Integration   │ Update/License│
 * │ Identifier    │ Detector      │ Mapper        │ Checker       │
 * ├───────────────┴───────────────┴───────────────┴───────────────┤
 * │                    Path Normalizer (leaf)                     │
 * ├─────────────────────────────────────────────────────────────  │
 * │                   Error Handling (error.rs)                   │
 * └───────────────────────────────────────────────────────────────┘
 * ```
 *
 * # Safety Guarantees
 *
 * - No unsafe code
 * - No panics on malformed input: unparseable files degrade to `Unknown`
 *   role, empty exports/deps, and contribute no edges or integration points
 * - Every fallible boundary returns `Result<T, Error>`
 */

pub mod cache;
pub mod component;
pub mod config;
pub mod coordinator;
pub mod cycle;
pub mod error;
pub mod integration;
pub mod license;
pub mod path_normalizer;
pub mod registry;
pub mod update_checker;

pub use component::{ComponentIdentifier, ComponentRole, FileRecord};
pub use config::{ConfigLoader, CoreConfig};
pub use coordinator::Coordinator;
pub use cycle::{CycleDetector, CycleRecord, CycleSeverity, CycleStats, CycleType};
pub use error::{Error, Result};
pub use integration::{
    CredentialInfo, IntegrationMapper, IntegrationPoint, IntegrationStats, RiskLevel, SecurityAssessment,
};
pub use license::{
    LicenseChecker, LicenseConflict, LicensePolicy, LicenseReport, LicenseType, PackageLicenseInfo,
    PolicyViolation,
};
pub use path_normalizer::PathNormalizer;
pub use registry::{PackageVersion, PackageVersionData, RegistryClient};
pub use update_checker::{SemanticVersion, UpdateChecker, UpdateRecommendation, UpdateType};

pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;

/// Returns the library version as a semantic version string.
pub fn version() -> String {
    format!("{}.{}.{}", VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_is_well_formed() {
        let ver = version();
        assert_eq!(ver, "0.1.0");
        assert!(ver.contains('.'));
    }
}
