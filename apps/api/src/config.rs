use anyhow::{bail, Context, Result};

use crate::decision::l2::L2Policy;

pub const FALLBACK_PORT: &str = "8080";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub aws_region: String,
    pub anthropic_api_key: String,
    pub port: u16,
    /// Raw `PORT` value, reported by the debug endpoint.
    pub port_env: Option<String>,
    pub rust_log: String,
    pub folders: FolderLayout,
    pub l1_advance_threshold: f64,
    pub l1_reject_threshold: f64,
    pub l2_policy: L2Policy,
    pub recruiter_sheet_id: Option<String>,
    pub decision_sheet_id: Option<String>,
    pub google_service_account_file: Option<String>,
    pub riva: SlackBotConfig,
    pub arjun: SlackBotConfig,
    pub batch_trigger_token: Option<String>,
    pub memory: MemoryConfig,
    pub scheduler: SchedulerConfig,
    pub llm_intent_fallback: bool,
}

/// Prefix layout of the candidate folders in the bucket.
/// Every stage folder holds one sub-folder per role, which holds one folder per candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderLayout {
    pub roles: Vec<String>,
    pub l1_pending: String,
    pub l2_pending: String,
    pub final_selected: String,
    pub l1_rejected: String,
    pub l2_rejected: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderKind {
    L1Pending,
    L2Pending,
    FinalSelected,
    L1Rejected,
    L2Rejected,
}

impl FolderLayout {
    pub fn base(&self, kind: FolderKind) -> &str {
        match kind {
            FolderKind::L1Pending => &self.l1_pending,
            FolderKind::L2Pending => &self.l2_pending,
            FolderKind::FinalSelected => &self.final_selected,
            FolderKind::L1Rejected => &self.l1_rejected,
            FolderKind::L2Rejected => &self.l2_rejected,
        }
    }

    /// Folder id of the role folder under a stage folder, e.g. `L1 Pending Review/IT Support`.
    pub fn role_folder(&self, kind: FolderKind, role: &str) -> String {
        format!("{}/{}", self.base(kind).trim_end_matches('/'), role)
    }

    /// Case-insensitive lookup of a configured role name.
    pub fn resolve_role(&self, role: &str) -> Option<&str> {
        let wanted = role.trim().to_lowercase();
        self.roles
            .iter()
            .find(|r| r.to_lowercase() == wanted)
            .map(String::as_str)
    }
}

impl Default for FolderLayout {
    fn default() -> Self {
        Self {
            roles: vec![
                "IT Support".to_string(),
                "IT Admin".to_string(),
                "HR Support".to_string(),
            ],
            l1_pending: "L1 Pending Review".to_string(),
            l2_pending: "L2 Pending Review".to_string(),
            final_selected: "Profiles/Final Selected".to_string(),
            l1_rejected: "Profiles/L1 Rejected".to_string(),
            l2_rejected: "Profiles/L2 Rejected".to_string(),
        }
    }
}

/// Credentials and channel for one chat bot.
#[derive(Debug, Clone, Default)]
pub struct SlackBotConfig {
    pub bot_token: Option<String>,
    pub signing_secret: Option<String>,
    pub default_channel_id: Option<String>,
    pub bot_user_id: Option<String>,
}

impl SlackBotConfig {
    fn from_env(prefix: &str) -> Self {
        Self {
            bot_token: optional_env(&format!("{prefix}_BOT_TOKEN")),
            signing_secret: optional_env(&format!("{prefix}_SIGNING_SECRET")),
            default_channel_id: optional_env(&format!("{prefix}_DEFAULT_CHANNEL_ID")),
            bot_user_id: optional_env(&format!("{prefix}_BOT_USER_ID")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryScope {
    CandidateOnly,
    RoleOnly,
    Full,
}

impl MemoryScope {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "candidate_only" => Some(Self::CandidateOnly),
            "role_only" => Some(Self::RoleOnly),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CandidateOnly => "candidate_only",
            Self::RoleOnly => "role_only",
            Self::Full => "full",
        }
    }

    pub fn includes_candidate(&self) -> bool {
        matches!(self, Self::CandidateOnly | Self::Full)
    }

    pub fn includes_role(&self) -> bool {
        matches!(self, Self::RoleOnly | Self::Full)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub enabled: bool,
    pub scope: MemoryScope,
    pub database_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub l1_hours: Vec<u32>,
    pub l2_hours: Vec<u32>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port_env = optional_env("PORT");
        let port = port_env
            .clone()
            .unwrap_or_else(|| FALLBACK_PORT.to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let defaults = FolderLayout::default();
        let roles = match optional_env("PIPELINE_ROLES") {
            Some(raw) => split_list(&raw),
            None => defaults.roles.clone(),
        };
        if roles.is_empty() {
            bail!("PIPELINE_ROLES must name at least one role");
        }
        let folders = FolderLayout {
            roles,
            l1_pending: optional_env("L1_PENDING_PREFIX").unwrap_or(defaults.l1_pending),
            l2_pending: optional_env("L2_PENDING_PREFIX").unwrap_or(defaults.l2_pending),
            final_selected: optional_env("FINAL_SELECTED_PREFIX")
                .unwrap_or(defaults.final_selected),
            l1_rejected: optional_env("L1_REJECTED_PREFIX").unwrap_or(defaults.l1_rejected),
            l2_rejected: optional_env("L2_REJECTED_PREFIX").unwrap_or(defaults.l2_rejected),
        };

        let l1_advance_threshold = env_f64("L1_ADVANCE_THRESHOLD", 0.7)?;
        let l1_reject_threshold = env_f64("L1_REJECT_THRESHOLD", 0.4)?;
        if l1_reject_threshold >= l1_advance_threshold {
            bail!("L1_REJECT_THRESHOLD must be below L1_ADVANCE_THRESHOLD");
        }
        let l2_policy = l2_policy_from_env()?;

        let memory_scope = match optional_env("MEMORY_SCOPE") {
            Some(raw) => MemoryScope::parse(&raw).with_context(|| {
                format!("MEMORY_SCOPE must be candidate_only, role_only or full (got '{raw}')")
            })?,
            None => MemoryScope::Full,
        };

        let recruiter_sheet_id = optional_env("RECRUITER_SHEET_ID");

        Ok(Config {
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            aws_region: optional_env("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port,
            port_env,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            folders,
            l1_advance_threshold,
            l1_reject_threshold,
            l2_policy,
            decision_sheet_id: optional_env("DECISION_SHEET_ID").or(recruiter_sheet_id.clone()),
            recruiter_sheet_id,
            google_service_account_file: optional_env("GOOGLE_SERVICE_ACCOUNT_FILE"),
            riva: SlackBotConfig::from_env("SLACK_RIVA"),
            arjun: SlackBotConfig::from_env("SLACK_ARJUN"),
            batch_trigger_token: optional_env("BATCH_TRIGGER_TOKEN"),
            memory: MemoryConfig {
                enabled: env_flag("MEMORY_ENABLED", true)?,
                scope: memory_scope,
                database_url: optional_env("MEMORY_DB_URL"),
            },
            scheduler: SchedulerConfig {
                enabled: env_flag("ENABLE_JOB_SCHEDULER", false)?,
                l1_hours: env_hours("L1_SCHEDULE_HOURS", &[13, 21])?,
                l2_hours: env_hours("L2_SCHEDULE_HOURS", &[16, 23])?,
            },
            llm_intent_fallback: env_flag("ENABLE_LLM_INTENT_FALLBACK", true)?,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Fully populated config that needs no environment.
    pub fn for_tests() -> Self {
        Config {
            s3_bucket: "talent".into(),
            s3_endpoint: "http://localhost:9000".into(),
            aws_access_key_id: "minio".into(),
            aws_secret_access_key: "minio-secret".into(),
            aws_region: "us-east-1".into(),
            anthropic_api_key: "sk-test".into(),
            port: 8080,
            port_env: None,
            rust_log: "info".into(),
            folders: FolderLayout {
                roles: vec!["IT Support".into()],
                ..Default::default()
            },
            l1_advance_threshold: 0.7,
            l1_reject_threshold: 0.4,
            l2_policy: L2Policy::default(),
            recruiter_sheet_id: None,
            decision_sheet_id: None,
            google_service_account_file: None,
            riva: SlackBotConfig::default(),
            arjun: SlackBotConfig::default(),
            batch_trigger_token: None,
            memory: MemoryConfig {
                enabled: false,
                scope: MemoryScope::Full,
                database_url: None,
            },
            scheduler: SchedulerConfig {
                enabled: false,
                l1_hours: vec![13, 21],
                l2_hours: vec![16, 23],
            },
            llm_intent_fallback: false,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str, default: bool) -> Result<bool> {
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => parse_flag(&raw).with_context(|| format!("{key} must be a boolean (got '{raw}')")),
    }
}

fn env_f64(key: &str, default: f64) -> Result<f64> {
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => {
            let value = raw
                .parse::<f64>()
                .with_context(|| format!("{key} must be a number"))?;
            if !(0.0..=1.0).contains(&value) {
                bail!("{key} must be between 0 and 1 (got {value})");
            }
            Ok(value)
        }
    }
}

/// L2 thresholds, each overridable; unset keys keep the defaults.
fn l2_policy_from_env() -> Result<L2Policy> {
    let defaults = L2Policy::default();
    let policy = L2Policy {
        advance_score: env_f64("L2_ADVANCE_SCORE", defaults.advance_score)?,
        advance_communication: env_f64("L2_ADVANCE_COMMUNICATION", defaults.advance_communication)?,
        advance_leadership: env_f64("L2_ADVANCE_LEADERSHIP", defaults.advance_leadership)?,
        reject_score: env_f64("L2_REJECT_SCORE", defaults.reject_score)?,
        reject_communication: env_f64("L2_REJECT_COMMUNICATION", defaults.reject_communication)?,
        hold_score_min: env_f64("L2_HOLD_SCORE_MIN", defaults.hold_score_min)?,
        hold_communication_min: env_f64(
            "L2_HOLD_COMMUNICATION_MIN",
            defaults.hold_communication_min,
        )?,
    };
    if policy.reject_score >= policy.advance_score {
        bail!("L2_REJECT_SCORE must be below L2_ADVANCE_SCORE");
    }
    if policy.reject_communication >= policy.advance_communication {
        bail!("L2_REJECT_COMMUNICATION must be below L2_ADVANCE_COMMUNICATION");
    }
    Ok(policy)
}

fn env_hours(key: &str, default: &[u32]) -> Result<Vec<u32>> {
    match optional_env(key) {
        None => Ok(default.to_vec()),
        Some(raw) => parse_hours(&raw).with_context(|| format!("{key} must be a list of hours 0-23")),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_hours(raw: &str) -> Option<Vec<u32>> {
    let mut hours = Vec::new();
    for part in split_list(raw) {
        let hour = part.parse::<u32>().ok().filter(|h| *h < 24)?;
        hours.push(hour);
    }
    hours.sort_unstable();
    hours.dedup();
    Some(hours)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
