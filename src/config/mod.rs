/**
 * Configuration Module
 *
 * DESIGN DECISION: Single flat configuration struct with TOML-backed defaults
 * WHY: The core only exposes three tunables (two cache TTLs, one registry URL);
 * a hierarchical multi-source merge system would be solving a problem this
 * library doesn't have
 *
 * REASONING CHAIN:
 * 1. Every field is optional in the TOML document and falls back to a default
 * 2. No merge precedence is needed because there is exactly one config source
 * 3. Callers who want layered config (env > file > default) compose that
 *    themselves and hand the core a single resolved `CoreConfig`
 *
 * PATTERN: Pattern-CONFIG-001 (Configuration Loading), narrowed to one tier
 */

pub mod loader;

pub use loader::{ConfigLoader, CoreConfig};
