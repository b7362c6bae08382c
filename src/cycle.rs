/**
 * Cycle Detector
 *
 * DESIGN DECISION: Flat index-keyed graph (`Vec<Node>` + `HashMap<path,idx>`),
 * never back-pointers
 * WHY: the graph is built incrementally from many files and read by a single
 * enumeration pass; integer indices let nodes and edges live in plain `Vec`s
 * with no lifetime threading (§9 Design Notes, cyclic data via integer ids)
 *
 * REASONING CHAIN:
 * 1. `ingest` reuses `component::classify`/`component::extract_raw_dependencies`
 *    directly so import edges and role typing never disagree with the
 *    Component Identifier's own view of the same file
 * 2. Cycle enumeration is a simplified, correctness-equivalent variant of
 *    Johnson's algorithm: rank nodes by path, and for each node as a
 *    candidate cycle start, DFS only into nodes whose rank is >= the
 *    start's rank, reporting a cycle when an edge returns to start. Every
 *    elementary cycle has a unique minimal-rank member, so restricting each
 *    start's search to rank >= itself reports each elementary cycle exactly
 *    once without Tarjan-SCC blocking/unblocking bookkeeping
 * 3. Typing a cycle from its member roles follows a fixed precedence so a
 *    mixed cycle never silently reports as whichever role happened to sort
 *    first
 */

use crate::component::{self, ComponentRole};
use crate::path_normalizer::PathNormalizer;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CycleType {
    TypeCycle,
    ComponentCycle,
    ServiceCycle,
    UtilityCycle,
    MixedCycle,
    ImportCycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CycleSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub id: String,
    pub files: Vec<String>,
    pub cycle_type: CycleType,
    pub severity: CycleSeverity,
    pub length: usize,
    pub resolution_strategies: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleStats {
    pub total: usize,
    pub by_severity: HashMap<String, usize>,
    pub by_type: HashMap<String, usize>,
    pub average_length: f64,
    pub complexity_score: f64,
    pub most_problematic_files: Vec<String>,
}

struct Node {
    path: String,
    role: ComponentRole,
    is_dts: bool,
}

/// Builds an import graph across ingested files and enumerates its cycles.
pub struct CycleDetector {
    nodes: Mutex<Vec<Node>>,
    index: Mutex<HashMap<String, usize>>,
    edges: Mutex<HashSet<(usize, usize)>>,
}

impl CycleDetector {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(Vec::new()),
            index: Mutex::new(HashMap::new()),
            edges: Mutex::new(HashSet::new()),
        }
    }

    fn node_index(&self, path: &str, role: ComponentRole, is_dts: bool) -> usize {
        let mut index = self.index.lock().expect("cycle index lock poisoned");
        if let Some(&i) = index.get(path) {
            return i;
        }
        let mut nodes = self.nodes.lock().expect("cycle nodes lock poisoned");
        let i = nodes.len();
        nodes.push(Node {
            path: path.to_string(),
            role,
            is_dts,
        });
        index.insert(path.to_string(), i);
        i
    }

    /// Ingest one file: classify it, resolve its relative imports, and add
    /// edges for every resolved, non-self, non-bare dependency.
    pub fn ingest(&self, path: &str, text: &str) {
        let (role, _) = component::classify(path, text);
        let is_dts = path.ends_with(".d.ts");
        let from = self.node_index(path, role, is_dts);

        for raw in component::extract_raw_dependencies(text) {
            if !(raw.starts_with("./") || raw.starts_with("../")) {
                continue;
            }
            let Some(resolved) = PathNormalizer::resolve(path, &raw) else {
                continue;
            };
            if resolved == path {
                continue;
            }
            let to = {
                let index = self.index.lock().expect("cycle index lock poisoned");
                index.get(&resolved).copied()
            }
            .unwrap_or_else(|| self.node_index(&resolved, ComponentRole::Unknown, resolved.ends_with(".d.ts")));
            self.edges.lock().expect("cycle edges lock poisoned").insert((from, to));
        }
    }

    /// Enumerate all elementary cycles in the current graph.
    pub fn analyze(&self) -> Vec<CycleRecord> {
        let nodes = self.nodes.lock().expect("cycle nodes lock poisoned");
        let edges = self.edges.lock().expect("cycle edges lock poisoned");

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for &(from, to) in edges.iter() {
            adjacency[from].push(to);
        }
        for list in adjacency.iter_mut() {
            list.sort_unstable();
        }

        let mut order: Vec<usize> = (0..nodes.len()).collect();
        order.sort_by(|&a, &b| nodes[a].path.cmp(&nodes[b].path));
        let mut rank = vec![0usize; nodes.len()];
        for (r, &n) in order.iter().enumerate() {
            rank[n] = r;
        }

        let mut cycles: Vec<Vec<usize>> = Vec::new();
        for &start in &order {
            let mut path = vec![start];
            let mut on_path = vec![false; nodes.len()];
            on_path[start] = true;
            find_cycles_from(start, start, rank[start], &adjacency, &rank, &mut path, &mut on_path, &mut cycles);
        }

        let mut records: Vec<CycleRecord> = cycles
            .into_iter()
            .map(|member_indices| build_record(&nodes, &member_indices))
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub fn cycles(&self) -> Vec<CycleRecord> {
        self.analyze()
    }

    pub fn cycles_by_severity(&self, severity: CycleSeverity) -> Vec<CycleRecord> {
        self.analyze().into_iter().filter(|c| c.severity == severity).collect()
    }

    pub fn cycles_by_type(&self, cycle_type: CycleType) -> Vec<CycleRecord> {
        self.analyze().into_iter().filter(|c| c.cycle_type == cycle_type).collect()
    }

    pub fn stats(&self) -> CycleStats {
        let cycles = self.analyze();
        if cycles.is_empty() {
            return CycleStats::default();
        }

        let mut by_severity: HashMap<String, usize> = HashMap::new();
        let mut by_type: HashMap<String, usize> = HashMap::new();
        let mut file_counts: HashMap<String, usize> = HashMap::new();
        let mut total_length = 0usize;
        let mut complexity_score = 0.0f64;

        for c in &cycles {
            *by_severity.entry(format!("{:?}", c.severity)).or_insert(0) += 1;
            *by_type.entry(format!("{:?}", c.cycle_type)).or_insert(0) += 1;
            total_length += c.length;
            let weight = match c.severity {
                CycleSeverity::Low => 1.0,
                CycleSeverity::Medium => 2.0,
                CycleSeverity::High => 3.0,
                CycleSeverity::Critical => 4.0,
            };
            complexity_score += c.length as f64 * weight;
            for f in &c.files {
                *file_counts.entry(f.clone()).or_insert(0) += 1;
            }
        }

        let mut most_problematic: Vec<(String, usize)> = file_counts.into_iter().collect();
        most_problematic.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let most_problematic_files = most_problematic.into_iter().take(10).map(|(f, _)| f).collect();

        CycleStats {
            total: cycles.len(),
            by_severity,
            by_type,
            average_length: total_length as f64 / cycles.len() as f64,
            complexity_score,
            most_problematic_files,
        }
    }

    pub fn export_json(&self) -> serde_json::Value {
        serde_json::json!({
            "cycles": self.analyze(),
            "stats": self.stats(),
            "graph": self.graph_json(),
        })
    }

    /// Flat node/edge view of the ingested import graph, for callers that
    /// want to render or re-analyze it without re-running `ingest`.
    fn graph_json(&self) -> serde_json::Value {
        let nodes = self.nodes.lock().expect("cycle nodes lock poisoned");
        let edges = self.edges.lock().expect("cycle edges lock poisoned");
        let node_paths: Vec<&str> = nodes.iter().map(|n| n.path.as_str()).collect();
        let edge_pairs: Vec<[&str; 2]> = edges
            .iter()
            .map(|&(from, to)| [nodes[from].path.as_str(), nodes[to].path.as_str()])
            .collect();
        serde_json::json!({ "nodes": node_paths, "edges": edge_pairs })
    }
}

impl Default for CycleDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn find_cycles_from(
    start: usize,
    current: usize,
    start_rank: usize,
    adjacency: &[Vec<usize>],
    rank: &[usize],
    path: &mut Vec<usize>,
    on_path: &mut [bool],
    out: &mut Vec<Vec<usize>>,
) {
    for &next in &adjacency[current] {
        if next == start {
            out.push(path.clone());
            continue;
        }
        if rank[next] < start_rank || on_path[next] {
            continue;
        }
        path.push(next);
        on_path[next] = true;
        find_cycles_from(start, next, start_rank, adjacency, rank, path, on_path, out);
        on_path[next] = false;
        path.pop();
    }
}

fn build_record(nodes: &[Node], member_indices: &[usize]) -> CycleRecord {
    let files: Vec<String> = member_indices.iter().map(|&i| nodes[i].path.clone()).collect();
    let cycle_type = derive_cycle_type(nodes, member_indices);
    let severity = derive_severity(cycle_type, files.len());
    let resolution_strategies = derive_resolution_strategies(cycle_type, files.len());
    let id = format!(
        "{:016x}",
        fnv1a(&{
            let mut sorted = files.clone();
            sorted.sort();
            sorted.join("->")
        })
    );
    CycleRecord {
        id,
        length: files.len(),
        files,
        cycle_type,
        severity,
        resolution_strategies,
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in s.as_bytes() {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Precedence, checked in order against the whole member set rather than
/// an exact role-set match: any `.d.ts` member makes it a TypeCycle; else
/// any `ReactComponent` member makes it a ComponentCycle; else any
/// `Service` member makes it a ServiceCycle; else all-`Utility` makes it a
/// UtilityCycle; else all-`Unknown` (or no roles) makes it an ImportCycle;
/// anything left over is a MixedCycle.
fn derive_cycle_type(nodes: &[Node], member_indices: &[usize]) -> CycleType {
    if member_indices.iter().any(|&i| nodes[i].is_dts) {
        return CycleType::TypeCycle;
    }

    let roles: Vec<ComponentRole> = member_indices.iter().map(|&i| nodes[i].role).collect();

    if roles.iter().any(|r| *r == ComponentRole::ReactComponent) {
        return CycleType::ComponentCycle;
    }
    if roles.iter().any(|r| *r == ComponentRole::Service) {
        return CycleType::ServiceCycle;
    }
    if roles.iter().all(|r| *r == ComponentRole::Utility) {
        return CycleType::UtilityCycle;
    }
    if roles.iter().all(|r| *r == ComponentRole::Unknown) {
        return CycleType::ImportCycle;
    }
    CycleType::MixedCycle
}

/// Critical iff TypeCycle; High iff ComponentCycle or length >= 3; Medium
/// for everything shorter. `Low` is reserved and never emitted.
fn derive_severity(cycle_type: CycleType, length: usize) -> CycleSeverity {
    if cycle_type == CycleType::TypeCycle {
        CycleSeverity::Critical
    } else if cycle_type == CycleType::ComponentCycle || length >= 3 {
        CycleSeverity::High
    } else {
        CycleSeverity::Medium
    }
}

fn derive_resolution_strategies(cycle_type: CycleType, length: usize) -> Vec<String> {
    let mut strategies = Vec::new();
    match cycle_type {
        CycleType::TypeCycle => strategies.push("Type Abstractions".to_string()),
        CycleType::ComponentCycle => strategies.push("Dependency Injection".to_string()),
        CycleType::ServiceCycle => {
            strategies.push("Extract Interface".to_string());
            strategies.push("Event Bus".to_string());
        }
        CycleType::MixedCycle => {
            strategies.push("Re-export Boundary".to_string());
            strategies.push("Extract Interface".to_string());
        }
        CycleType::UtilityCycle | CycleType::ImportCycle => {
            if length <= 2 {
                strategies.push("Merge Modules".to_string());
            } else {
                strategies.push("Re-export Boundary".to_string());
            }
        }
    }
    strategies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_file_component_cycle_is_reported() {
        let detector = CycleDetector::new();
        detector.ingest(
            "/src/components/A.jsx",
            "import B from './B';\nexport default function A() { return <B/>; }\n",
        );
        detector.ingest(
            "/src/components/B.jsx",
            "import A from './A';\nexport default function B() { return <A/>; }\n",
        );
        let cycles = detector.analyze();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].cycle_type, CycleType::ComponentCycle);
        assert_eq!(cycles[0].length, 2);
    }

    #[test]
    fn dts_member_forces_critical_type_cycle() {
        let detector = CycleDetector::new();
        detector.ingest("/src/types/a.d.ts", "import { B } from './b';\nexport type A = B;\n");
        detector.ingest("/src/types/b.d.ts", "import { A } from './a';\nexport type B = A;\n");
        let cycles = detector.analyze();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].cycle_type, CycleType::TypeCycle);
        assert_eq!(cycles[0].severity, CycleSeverity::Critical);
    }

    #[test]
    fn no_edges_means_no_cycles() {
        let detector = CycleDetector::new();
        detector.ingest("/src/utils/a.js", "export const a = 1;\n");
        assert!(detector.analyze().is_empty());
    }

    #[test]
    fn three_file_cycle_is_reported_exactly_once() {
        let detector = CycleDetector::new();
        detector.ingest("/src/services/A.js", "import B from './B';\nexport class AService {}\n");
        detector.ingest("/src/services/B.js", "import C from './C';\nexport class BService {}\n");
        detector.ingest("/src/services/C.js", "import A from './A';\nexport class CService {}\n");
        let cycles = detector.analyze();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].length, 3);
    }

    #[test]
    fn self_reference_never_forms_a_cycle() {
        let detector = CycleDetector::new();
        detector.ingest("/src/utils/a.js", "import a from './a';\nexport const a2 = 1;\n");
        assert!(detector.analyze().is_empty());
    }

    #[test]
    fn analyze_is_deterministic_across_calls() {
        let detector = CycleDetector::new();
        detector.ingest("/src/components/A.jsx", "import B from './B';\nexport default function A() { return <B/>; }\n");
        detector.ingest("/src/components/B.jsx", "import A from './A';\nexport default function B() { return <A/>; }\n");
        assert_eq!(detector.analyze(), detector.analyze());
    }

    #[test]
    fn react_component_member_wins_precedence_over_service_member() {
        let detector = CycleDetector::new();
        detector.ingest(
            "/src/components/A.jsx",
            "import B from '../services/B';\nexport default function A() { return <B/>; }\n",
        );
        detector.ingest(
            "/src/services/B.js",
            "import A from '../components/A';\nexport class BService { async fetchAll() { return fetch('/b'); } }\n",
        );
        let cycles = detector.analyze();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].cycle_type, CycleType::ComponentCycle);
        assert_eq!(cycles[0].severity, CycleSeverity::High);
    }

    #[test]
    fn export_json_has_stats_and_graph_keys() {
        let detector = CycleDetector::new();
        detector.ingest("/src/utils/a.js", "export const a = 1;\n");
        let value = detector.export_json();
        assert!(value.get("cycles").is_some());
        assert!(value.get("stats").is_some());
        assert!(value.get("graph").is_some());
        assert!(value.get("statistics").is_none());
    }
}
