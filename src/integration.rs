/**
 * Integration Mapper
 *
 * DESIGN DECISION: Line-by-line substring/regex scan, no AST, no file I/O
 * WHY: Integration points are found by recognizing textual signatures
 * (`mongodb://`, `new Pool`, `process.env`), not by understanding program
 * structure; a parser buys nothing here
 *
 * REASONING CHAIN:
 * 1. Detector families run independently per line; the API family alone
 *    enforces exactly-one-per-line precedence (GraphQL > WebSocket > HTTP)
 * 2. IDs are derived deterministically (FNV-1a over path/kind/line) so
 *    re-scanning a file yields byte-identical IDs, never randomness
 * 3. Credential analysis runs once over the whole file because a hardcoded
 *    secret and the env-var read that would replace it are rarely on the
 *    same line
 */

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// Shared closed-set risk label used by both the Integration Mapper and the
/// License Checker (§3). `Unknown` exists only for the License Checker's
/// zero-package overall-risk case; the Integration Mapper never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationType {
    MongoDb,
    PostgreSql,
    MySql,
    Redis,
    GraphQl,
    WebSocket,
    Http,
    Aws,
    Gcp,
    Payment,
    Analytics,
    Messaging,
    OAuth,
    Jwt,
    Ldap,
    EnvVar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvironmentTag {
    Development,
    Staging,
    Production,
    External,
    Cloud,
    Internal,
    Config,
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialInfo {
    pub uses_env_vars: bool,
    pub uses_hardcoded: bool,
    pub uses_config_file: bool,
    pub credential_types: Vec<String>,
    pub security_issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationPoint {
    pub id: String,
    pub display_name: String,
    pub integration_type: IntegrationType,
    pub protocol: String,
    pub endpoint: String,
    pub file_path: String,
    pub line: usize,
    pub risk_level: RiskLevel,
    pub risk_reasons: Vec<String>,
    pub environment: EnvironmentTag,
    pub credentials: CredentialInfo,
    pub metadata: HashMap<String, serde_json::Value>,
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in s.as_bytes() {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn generate_id(path: &str, kind: &str, line: usize) -> String {
    format!("{:016x}", fnv1a(&format!("{path}:{kind}:{line}")))
}

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static CELL: OnceLock<Regex> = OnceLock::new();
            CELL.get_or_init(|| Regex::new($pattern).expect("static regex is valid"))
        }
    };
}

static_regex!(env_var_process_re, r"process\.env\.([A-Za-z_][A-Za-z0-9_]*)");
static_regex!(env_var_getenv_re, r#"os\.Getenv\(\s*["']([^"']+)["']\s*\)"#);
static_regex!(
    password_literal_re,
    r#"(?i)password\s*[:=]\s*["'][^"']+["']"#
);
static_regex!(
    apikey_literal_re,
    r#"(?i)(api[_-]?key|apikey)\s*[:=]\s*["'][^"']+["']"#
);
static_regex!(
    token_literal_re,
    r#"(?i)(token|secret)\s*[:=]\s*["'][^"']{8,}["']"#
);
static_regex!(http_method_url_re, r#"(?i)https?://\S+.*\b(GET|POST|PUT|DELETE|PATCH)\b"#);
static_regex!(http_call_re, r"(?i)\b(?:axios|request)\.(get|post|put|delete|patch)\(|\bfetch\(");

/// Scans files for external-system touchpoints and assesses their risk.
pub struct IntegrationMapper {
    points: Mutex<Vec<IntegrationPoint>>,
}

impl IntegrationMapper {
    pub fn new() -> Self {
        Self {
            points: Mutex::new(Vec::new()),
        }
    }

    /// Scan `text` for integration points, append them to the registry, and
    /// return the newly discovered points.
    pub fn scan(&self, path: &str, text: &str) -> Vec<IntegrationPoint> {
        let credentials = analyze_credentials(text);
        let mut found = Vec::new();

        for (i, raw_line) in text.lines().enumerate() {
            let line_no = i + 1;
            let normalized = normalize_line(raw_line);

            for (kind, protocol) in scan_database_family(&normalized) {
                found.push(build_point(path, line_no, kind, protocol, raw_line, &credentials));
            }

            if let Some((kind, protocol)) = scan_api_family(&normalized) {
                found.push(build_point(path, line_no, kind, protocol, raw_line, &credentials));
            }

            for (kind, protocol) in scan_third_party_family(&normalized) {
                found.push(build_point(path, line_no, kind, protocol, raw_line, &credentials));
            }

            for (kind, protocol) in scan_auth_family(&normalized) {
                found.push(build_point(path, line_no, kind, protocol, raw_line, &credentials));
            }

            if let Some(var_name) = scan_env_var(&normalized) {
                found.push(build_env_point(path, line_no, &var_name, &credentials));
            }
        }

        self.points.lock().expect("integration cache lock poisoned").extend(found.clone());
        found
    }

    pub fn points(&self) -> Vec<IntegrationPoint> {
        self.points.lock().expect("integration cache lock poisoned").clone()
    }

    pub fn points_by_type(&self, kind: IntegrationType) -> Vec<IntegrationPoint> {
        self.points()
            .into_iter()
            .filter(|p| p.integration_type == kind)
            .collect()
    }

    pub fn high_risk_points(&self) -> Vec<IntegrationPoint> {
        self.points()
            .into_iter()
            .filter(|p| matches!(p.risk_level, RiskLevel::High | RiskLevel::Critical))
            .collect()
    }

    pub fn stats(&self) -> IntegrationStats {
        let points = self.points();
        let mut by_type: HashMap<String, usize> = HashMap::new();
        let mut by_risk: HashMap<String, usize> = HashMap::new();
        for p in &points {
            *by_type.entry(format!("{:?}", p.integration_type)).or_insert(0) += 1;
            *by_risk.entry(format!("{:?}", p.risk_level)).or_insert(0) += 1;
        }
        IntegrationStats {
            total: points.len(),
            by_type,
            by_risk,
        }
    }

    pub fn security_assessment(&self) -> SecurityAssessment {
        let points = self.points();
        if points.is_empty() {
            return SecurityAssessment {
                overall_risk: RiskLevel::Unknown,
                issues: vec![],
                recommendations: vec![],
            };
        }

        let high_or_critical = points
            .iter()
            .filter(|p| matches!(p.risk_level, RiskLevel::High | RiskLevel::Critical))
            .count();
        let ratio = high_or_critical as f64 / points.len() as f64;
        let overall_risk = if ratio > 0.5 {
            RiskLevel::High
        } else if ratio > 0.25 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        let mut issues: Vec<String> = points
            .iter()
            .filter(|p| matches!(p.risk_level, RiskLevel::High | RiskLevel::Critical))
            .flat_map(|p| p.risk_reasons.clone())
            .collect();
        issues.sort();
        issues.dedup();

        let mut recommendations = vec![];
        if points.iter().any(|p| p.credentials.uses_hardcoded) {
            recommendations.push("move credentials to environment variables".to_string());
            recommendations.push("implement a secrets management solution".to_string());
        }
        if points.iter().any(|p| p.endpoint.contains("http://")) {
            recommendations.push("use HTTPS for all endpoints".to_string());
            recommendations.push("enable TLS".to_string());
        }
        if points.len() > 10 {
            recommendations.push("consider an API gateway to consolidate integration points".to_string());
        }

        SecurityAssessment {
            overall_risk,
            issues,
            recommendations,
        }
    }

    pub fn export_json(&self) -> serde_json::Value {
        serde_json::json!({
            "integration_points": self.points(),
            "statistics": self.stats(),
            "security_assessment": self.security_assessment(),
        })
    }
}

impl Default for IntegrationMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationStats {
    pub total: usize,
    pub by_type: HashMap<String, usize>,
    pub by_risk: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityAssessment {
    pub overall_risk: RiskLevel,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

fn normalize_line(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn analyze_credentials(text: &str) -> CredentialInfo {
    let uses_env_vars = text.contains("process.env") || text.contains("os.Getenv");
    // `[^"']` isn't newline-excluded in this regex engine, so matching
    // against the whole file lets an unterminated opening quote greedily
    // span to an unrelated closing quote many lines down. Match per line
    // instead, which also matches how a reviewer would read a diff.
    let password_match = text.lines().any(|line| password_literal_re().is_match(line));
    let apikey_match = text.lines().any(|line| apikey_literal_re().is_match(line));
    let token_match = text.lines().any(|line| token_literal_re().is_match(line));

    let mut security_issues = vec![];
    if password_match {
        security_issues.push("hardcoded password literal".to_string());
    }
    if apikey_match {
        security_issues.push("hardcoded API key".to_string());
    }
    if token_match {
        security_issues.push("hardcoded token literal".to_string());
    }

    let mut credential_types = vec![];
    if password_match {
        credential_types.push("password".to_string());
    }
    if apikey_match {
        credential_types.push("api_key".to_string());
    }
    if token_match {
        credential_types.push("token".to_string());
    }

    CredentialInfo {
        uses_env_vars,
        uses_hardcoded: (password_match || apikey_match || token_match) && !uses_env_vars,
        uses_config_file: text.contains(".env") || text.contains("config.toml") || text.contains("config.json"),
        credential_types,
        security_issues,
    }
}

fn scan_database_family(line: &str) -> Vec<(IntegrationType, &'static str)> {
    let mut found = vec![];
    if line.contains("mongodb://")
        || line.contains("mongodb+srv://")
        || line.contains("MongoClient")
        || line.contains("mongoose.connect")
    {
        found.push((IntegrationType::MongoDb, "mongodb"));
    }
    if line.contains("postgresql://")
        || line.contains("postgres://")
        || line.contains("pg.Client")
        || line.contains("new Pool")
    {
        found.push((IntegrationType::PostgreSql, "postgresql"));
    }
    if line.contains("mysql://") || line.contains("mysql.createConnection") || line.contains("mysql2") {
        found.push((IntegrationType::MySql, "mysql"));
    }
    if line.contains("redis://") || line.contains("createClient") || line.contains("new Redis") {
        found.push((IntegrationType::Redis, "redis"));
    }
    found
}

fn scan_api_family(line: &str) -> Option<(IntegrationType, &'static str)> {
    let lower = line.to_lowercase();
    let graphql = (lower.contains("apollo") && line.contains("new")) || (lower.contains("graphql") && line.contains("://"));
    if graphql {
        return Some((IntegrationType::GraphQl, "graphql"));
    }

    let websocket = line.contains("ws://")
        || line.contains("wss://")
        || line.contains("new WebSocket")
        || (lower.contains("socket.io") && !line.trim_start().starts_with("import"));
    if websocket {
        return Some((IntegrationType::WebSocket, "websocket"));
    }

    let url_with_method = http_method_url_re().is_match(line);
    let method_call = http_call_re().is_match(line);
    if url_with_method || (method_call && !line.contains("://")) {
        return Some((IntegrationType::Http, "http"));
    }

    None
}

fn scan_third_party_family(line: &str) -> Vec<(IntegrationType, &'static str)> {
    let lower = line.to_lowercase();
    let mut found = vec![];

    if line.contains("aws-sdk")
        || line.contains(".amazonaws.com")
        || line.contains("AWS.")
        || line.contains("S3")
        || line.contains("DynamoDB")
        || line.contains("Lambda")
    {
        found.push((IntegrationType::Aws, "aws"));
    }
    if line.contains("google-cloud") || line.contains(".googleapis.com") || lower.contains("firebase") || lower.contains("firestore") {
        found.push((IntegrationType::Gcp, "gcp"));
    }
    if lower.contains("stripe") || lower.contains("paypal") || lower.contains("square") {
        found.push((IntegrationType::Payment, "payment"));
    }
    if lower.contains("google analytics") || lower.contains("gtag") || lower.contains("mixpanel") || lower.contains("amplitude") {
        found.push((IntegrationType::Analytics, "analytics"));
    }
    if lower.contains("kafka") || lower.contains("rabbitmq") || lower.contains("sqs") || lower.contains("pubsub") {
        found.push((IntegrationType::Messaging, "messaging"));
    }
    found
}

fn scan_auth_family(line: &str) -> Vec<(IntegrationType, &'static str)> {
    let lower = line.to_lowercase();
    let mut found = vec![];

    let oauth = lower.contains("oauth")
        || (lower.contains("google") && lower.contains("auth"))
        || (lower.contains("facebook") && lower.contains("auth"))
        || (lower.contains("github") && lower.contains("auth"));
    if oauth {
        found.push((IntegrationType::OAuth, "oauth"));
    }
    if lower.contains("jwt") || lower.contains("jsonwebtoken") || lower.contains("bearer") {
        found.push((IntegrationType::Jwt, "jwt"));
    }
    if lower.contains("ldap") {
        found.push((IntegrationType::Ldap, "ldap"));
    }
    found
}

fn scan_env_var(line: &str) -> Option<String> {
    if let Some(caps) = env_var_process_re().captures(line) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = env_var_getenv_re().captures(line) {
        return Some(caps[1].to_string());
    }
    None
}

fn build_point(
    path: &str,
    line: usize,
    kind: IntegrationType,
    protocol: &str,
    raw_line: &str,
    credentials: &CredentialInfo,
) -> IntegrationPoint {
    let endpoint = raw_line.trim().to_string();
    let (risk_level, risk_reasons) = assess_risk(kind, &endpoint, credentials);
    let environment = derive_environment(kind, &endpoint);
    IntegrationPoint {
        id: generate_id(path, &format!("{kind:?}"), line),
        display_name: format!("{kind:?}"),
        integration_type: kind,
        protocol: protocol.to_string(),
        endpoint,
        file_path: path.to_string(),
        line,
        risk_level,
        risk_reasons,
        environment,
        credentials: credentials.clone(),
        metadata: HashMap::new(),
    }
}

fn build_env_point(path: &str, line: usize, var_name: &str, credentials: &CredentialInfo) -> IntegrationPoint {
    let kind = IntegrationType::EnvVar;
    let (risk_level, risk_reasons) = assess_risk(kind, var_name, credentials);
    IntegrationPoint {
        id: generate_id(path, "EnvVar", line),
        display_name: "Environment Variable".to_string(),
        integration_type: kind,
        protocol: "env".to_string(),
        endpoint: var_name.to_string(),
        file_path: path.to_string(),
        line,
        risk_level,
        risk_reasons,
        environment: EnvironmentTag::Config,
        credentials: credentials.clone(),
        metadata: HashMap::new(),
    }
}

fn assess_risk(kind: IntegrationType, endpoint: &str, credentials: &CredentialInfo) -> (RiskLevel, Vec<String>) {
    use IntegrationType::*;
    let lower = endpoint.to_lowercase();

    match kind {
        MongoDb | PostgreSql | MySql | Redis => {
            if credentials.uses_hardcoded {
                (RiskLevel::Critical, vec!["hardcoded credentials present".to_string()])
            } else if !credentials.security_issues.is_empty() {
                (RiskLevel::High, vec!["security issues detected in file".to_string()])
            } else if lower.contains("localhost") || lower.contains("127.0.0.1") {
                (RiskLevel::Low, vec!["localhost endpoint".to_string()])
            } else {
                (RiskLevel::Medium, vec!["remote database endpoint".to_string()])
            }
        }
        Http | GraphQl => {
            if credentials.uses_hardcoded {
                (RiskLevel::High, vec!["hardcoded credentials present".to_string()])
            } else if lower.contains("http://") {
                (RiskLevel::Medium, vec!["uses plaintext HTTP".to_string()])
            } else if lower.contains("https://") {
                (RiskLevel::Low, vec!["uses TLS (https)".to_string()])
            } else {
                (RiskLevel::Medium, vec!["endpoint scheme not specified".to_string()])
            }
        }
        WebSocket => {
            if lower.contains("ws://") {
                (RiskLevel::Medium, vec!["unencrypted websocket".to_string()])
            } else {
                (RiskLevel::Low, vec!["encrypted websocket".to_string()])
            }
        }
        Aws | Gcp => {
            if credentials.uses_hardcoded {
                (RiskLevel::Critical, vec!["hardcoded cloud credentials".to_string()])
            } else {
                (RiskLevel::Medium, vec!["cloud provider integration".to_string()])
            }
        }
        Payment => (RiskLevel::Critical, vec!["payment provider integration".to_string()]),
        Analytics => (RiskLevel::Medium, vec!["third-party analytics collection".to_string()]),
        OAuth | Jwt | Ldap => (RiskLevel::High, vec!["authentication provider integration".to_string()]),
        Messaging => (RiskLevel::Medium, vec!["messaging system integration".to_string()]),
        EnvVar => {
            const SENSITIVE: &[&str] = &["password", "secret", "key", "token", "credential"];
            if SENSITIVE.iter().any(|s| lower.contains(s)) {
                (RiskLevel::High, vec!["sensitive environment variable".to_string()])
            } else {
                (RiskLevel::Low, vec!["ordinary environment variable".to_string()])
            }
        }
    }
}

fn derive_environment(kind: IntegrationType, endpoint: &str) -> EnvironmentTag {
    use IntegrationType::*;
    match kind {
        Aws | Gcp => return EnvironmentTag::Cloud,
        Payment | Analytics | Messaging | OAuth => return EnvironmentTag::External,
        Jwt | Ldap => return EnvironmentTag::Internal,
        EnvVar => return EnvironmentTag::Config,
        _ => {}
    }

    let lower = endpoint.to_lowercase();
    if lower.contains("localhost") || lower.contains("127.0.0.1") {
        EnvironmentTag::Development
    } else if lower.contains("staging") || lower.contains("test") {
        EnvironmentTag::Staging
    } else if lower.contains("prod") || lower.contains(".com") || lower.contains(".net") {
        EnvironmentTag::Production
    } else {
        EnvironmentTag::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apollo_client_yields_single_graphql_point_not_http() {
        let mapper = IntegrationMapper::new();
        let text = r#"const c = new ApolloClient({uri: "https://graphql.example.com"})"#;
        let points = mapper.scan("/src/api/client.js", text);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].integration_type, IntegrationType::GraphQl);
    }

    #[test]
    fn mongo_and_postgres_can_both_fire_on_the_same_line() {
        let mapper = IntegrationMapper::new();
        let text = "const note = 'migrating mongodb://localhost/app to postgres://localhost/app';";
        let points = mapper.scan("/src/db/migrate.js", text);
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn line_numbers_are_one_based_and_non_decreasing() {
        let mapper = IntegrationMapper::new();
        let text = "const a = 1;\nconst b = process.env.API_KEY;\nconst c = process.env.DB_URL;\n";
        mapper.scan("/src/config/env.js", text);
        let points = mapper.points();
        assert_eq!(points[0].line, 2);
        assert_eq!(points[1].line, 3);
        assert!(points.windows(2).all(|w| w[0].line <= w[1].line));
    }

    #[test]
    fn hardcoded_password_without_env_reads_is_flagged() {
        let mapper = IntegrationMapper::new();
        let text = r#"const conn = { password: "hunter2" };"#;
        mapper.scan("/src/db/conn.js", text);
        let points = mapper.points();
        assert!(points.is_empty() || points.iter().all(|p| p.credentials.uses_hardcoded));
    }

    #[test]
    fn reported_ids_are_stable_across_rescans() {
        let a = IntegrationMapper::new();
        let b = IntegrationMapper::new();
        let text = "const redisClient = createClient();";
        let pa = a.scan("/src/cache/redis.js", text);
        let pb = b.scan("/src/cache/redis.js", text);
        assert_eq!(pa[0].id, pb[0].id);
    }
}
