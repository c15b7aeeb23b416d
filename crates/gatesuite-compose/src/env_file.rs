//! `.env` synthesis from a variable table.
//!
//! Well-known keys are written first in a fixed order, with banner comments
//! introducing the Redis and optional-channel groups. Any other variable
//! follows in sorted order. A literal override block is appended last, and
//! keys it assigns are not emitted twice.

use std::collections::BTreeSet;

use crate::variables::VariableTable;

/// First line of every synthesized file.
pub const ENV_HEADER: &str = "# Container Image / Env - generated from compose";

/// Keys written first, in this order, when present in the table.
pub const PRIORITY: &[&str] = &[
    "HERALD_IMAGE",
    "WARDEN_IMAGE",
    "STARGATE_IMAGE",
    "HERALD_REDIS_IMAGE",
    "WARDEN_REDIS_IMAGE",
    "HERALD_REDIS_ADDR",
    "HERALD_REDIS_PASSWORD",
    "HERALD_REDIS_DB",
    "WARDEN_REDIS_ADDR",
    "WARDEN_REDIS_PASSWORD",
    "WARDEN_REDIS_PASSWORD_FILE",
    "WARDEN_REDIS_ENABLED",
    "WARDEN_DATA_FILE",
    "HERALD_REDIS_DATA_PATH",
    "WARDEN_REDIS_DATA_PATH",
    "PROTECTED_IMAGE",
    "AUTH_HOST",
    "STARGATE_DOMAIN",
    "PROTECTED_DOMAIN",
    "STARGATE_PREFIX",
    "PROTECTED_PREFIX",
    "USER_HEADER_NAME",
    "LOGIN_PAGE_TITLE",
    "LOGIN_PAGE_FOOTER_TEXT",
    "COOKIE_DOMAIN",
    "LANGUAGE",
    "PASSWORDS",
    "HERALD_API_KEY",
    "HERALD_HMAC_SECRET",
    "WARDEN_API_KEY",
    "WARDEN_ENABLED",
    "HERALD_ENABLED",
    "SESSION_STORAGE_ENABLED",
    "SESSION_STORAGE_REDIS_ADDR",
    "SESSION_STORAGE_REDIS_PASSWORD",
    "WARDEN_CACHE_TTL",
    "AUDIT_LOG_ENABLED",
    "AUDIT_LOG_FORMAT",
    "DEBUG",
    "MODE",
    "LOG_LEVEL",
    "INTERVAL",
    "WARDEN_REMOTE_CONFIG",
    "WARDEN_REMOTE_KEY",
    "WARDEN_HTTP_TIMEOUT",
    "WARDEN_HTTP_MAX_IDLE_CONNS",
    "WARDEN_HTTP_INSECURE_TLS",
    "HERALD_TEST_MODE",
    "CHALLENGE_EXPIRY",
    "CODE_LENGTH",
    "MAX_ATTEMPTS",
    "PROVIDER_FAILURE_POLICY",
    "RESEND_COOLDOWN",
    "LOCKOUT_DURATION",
    "IDEMPOTENCY_KEY_TTL",
    "ALLOWED_PURPOSES",
    "SERVICE_NAME",
    "HERALD_HMAC_KEYS",
    "RATE_LIMIT_PER_USER",
    "RATE_LIMIT_PER_IP",
    "RATE_LIMIT_PER_DESTINATION",
    "HERALD_DINGTALK_IMAGE",
    "HERALD_DINGTALK_API_URL",
    "HERALD_DINGTALK_API_KEY",
    "DINGTALK_APP_KEY",
    "DINGTALK_APP_SECRET",
    "DINGTALK_AGENT_ID",
    "DINGTALK_LOOKUP_MODE",
    "HERALD_DINGTALK_IDEMPOTENCY_TTL",
    "HERALD_SMTP_IMAGE",
    "HERALD_SMTP_API_URL",
    "HERALD_SMTP_API_KEY",
    "SMTP_HOST",
    "SMTP_PORT",
    "SMTP_USER",
    "SMTP_PASSWORD",
    "SMTP_FROM",
    "SMTP_USE_STARTTLS",
    "HERALD_SMTP_IDEMPOTENCY_TTL",
    "HERALD_TOTP_ENABLED",
    "HERALD_TOTP_BASE_URL",
    "HERALD_TOTP_API_KEY",
    "HERALD_TOTP_IMAGE",
    "HERALD_TOTP_ENCRYPTION_KEY",
    "HERALD_TOTP_EXPOSE_SECRET_IN_ENROLL",
    "HERALD_TOTP_REDIS_ADDR",
    "HERALD_TOTP_PORT",
];

/// A banner comment and the keys it introduces.
struct Group {
    banner: &'static str,
    keys: &'static [&'static str],
}

const GROUPS: [Group; 4] = [
    Group {
        banner: "# Redis connection (override for external Redis)",
        keys: &[
            "HERALD_REDIS_ADDR",
            "HERALD_REDIS_PASSWORD",
            "HERALD_REDIS_DB",
            "WARDEN_REDIS_ADDR",
            "WARDEN_REDIS_PASSWORD",
            "WARDEN_REDIS_PASSWORD_FILE",
            "WARDEN_REDIS_ENABLED",
        ],
    },
    Group {
        banner: "# DingTalk channel (optional): Herald calls herald-dingtalk via HTTP",
        keys: &[
            "HERALD_DINGTALK_IMAGE",
            "HERALD_DINGTALK_API_URL",
            "HERALD_DINGTALK_API_KEY",
            "DINGTALK_APP_KEY",
            "DINGTALK_APP_SECRET",
            "DINGTALK_AGENT_ID",
            "DINGTALK_LOOKUP_MODE",
            "HERALD_DINGTALK_IDEMPOTENCY_TTL",
        ],
    },
    Group {
        banner: "# Email channel (optional): Herald calls herald-smtp via HTTP for email verification codes",
        keys: &[
            "HERALD_SMTP_IMAGE",
            "HERALD_SMTP_API_URL",
            "HERALD_SMTP_API_KEY",
            "SMTP_HOST",
            "SMTP_PORT",
            "SMTP_USER",
            "SMTP_PASSWORD",
            "SMTP_FROM",
            "SMTP_USE_STARTTLS",
            "HERALD_SMTP_IDEMPOTENCY_TTL",
        ],
    },
    Group {
        banner: "# TOTP 2FA (optional): Stargate calls herald-totp for enroll/verify",
        keys: &[
            "HERALD_TOTP_IMAGE",
            "HERALD_TOTP_ENCRYPTION_KEY",
            "HERALD_TOTP_EXPOSE_SECRET_IN_ENROLL",
            "HERALD_TOTP_REDIS_ADDR",
            "HERALD_TOTP_PORT",
        ],
    },
];

/// Builds `.env` text from `vars`, appending `literal_override` verbatim.
///
/// With an empty table and no override the hardcoded baseline from
/// [`default_env_body`] is returned instead.
#[must_use]
pub fn synthesize(vars: &VariableTable, literal_override: Option<&str>) -> String {
    let literal = literal_override.map(str::trim).filter(|s| !s.is_empty());
    let assigned = literal.map(assigned_keys).unwrap_or_default();
    let emit = |key: &str| vars.contains_key(key) && !assigned.contains(key);

    let mut body = Vec::new();
    let mut announced = [false; GROUPS.len()];
    for key in PRIORITY.iter().copied().filter(|&k| emit(k)) {
        if let Some(idx) = GROUPS.iter().position(|g| g.keys.contains(&key)) {
            if !announced[idx] {
                announced[idx] = true;
                body.push(GROUPS[idx].banner.to_owned());
            }
        }
        body.push(format!("{key}={}", vars[key]));
    }
    for (key, value) in vars {
        if !PRIORITY.contains(&key.as_str()) && emit(key) {
            body.push(format!("{key}={value}"));
        }
    }

    if body.is_empty() && literal.is_none() {
        return default_env_body().to_owned();
    }

    let mut lines = vec![ENV_HEADER.to_owned(), String::new()];
    lines.append(&mut body);
    if let Some(text) = literal {
        lines.push(String::new());
        lines.push(text.to_owned());
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Keys assigned by `KEY=VALUE` lines of a literal `.env` block.
fn assigned_keys(text: &str) -> BTreeSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let l = l.strip_prefix("export ").unwrap_or(l);
            l.split_once('=').map(|(k, _)| k.trim().to_owned())
        })
        .filter(|k| !k.is_empty())
        .collect()
}

/// Baseline `.env` used when nothing could be inferred from a compose file.
#[must_use]
pub const fn default_env_body() -> &'static str {
    DEFAULT_ENV_BODY
}

const DEFAULT_ENV_BODY: &str = "# Container Image Version Configuration

# Herald Service Image
HERALD_IMAGE=ghcr.io/soulteary/herald:v0.5.0

# Warden Service Image
WARDEN_IMAGE=ghcr.io/soulteary/warden:v0.9.3

# Stargate Service Image
STARGATE_IMAGE=ghcr.io/soulteary/stargate:v0.8.4

# Redis Image Version
HERALD_REDIS_IMAGE=redis:8.4-alpine
WARDEN_REDIS_IMAGE=redis:8.4-alpine

# Herald Redis connection
HERALD_REDIS_ADDR=herald-redis:6379
HERALD_REDIS_PASSWORD=
HERALD_REDIS_DB=0

# Warden Redis connection
WARDEN_REDIS_ADDR=warden-redis:6379
WARDEN_REDIS_PASSWORD=
# WARDEN_REDIS_PASSWORD_FILE=
# WARDEN_REDIS_ENABLED=true

# Warden remote config (when MODE is REMOTE / HYBRID etc.)
# WARDEN_REMOTE_CONFIG=http://example.com/data.json
# WARDEN_REMOTE_KEY=

# Warden HTTP client (optional)
# WARDEN_HTTP_MAX_IDLE_CONNS=100
# WARDEN_HTTP_INSECURE_TLS=false

# Redis data path (only used with bind-path storage)
# HERALD_REDIS_DATA_PATH=./data/herald-redis
# WARDEN_REDIS_DATA_PATH=./data/warden-redis

# Protected service (whoami) behind Stargate forward auth, used for E2E and demos
# PROTECTED_IMAGE=ghcr.io/traefik/whoami:v1.11

# Herald optional: idempotency TTL (0=use challenge expiry), allowed purposes, HMAC keys (JSON), service name
# IDEMPOTENCY_KEY_TTL=0
# ALLOWED_PURPOSES=login
# SERVICE_NAME=herald
# HERALD_HMAC_KEYS=

# DingTalk channel (optional): Herald calls herald-dingtalk via HTTP for verification code push
# HERALD_DINGTALK_IMAGE=ghcr.io/soulteary/herald-dingtalk:latest
# HERALD_DINGTALK_API_URL=http://herald-dingtalk:8083
# HERALD_DINGTALK_API_KEY=
# DINGTALK_APP_KEY=
# DINGTALK_APP_SECRET=
# DINGTALK_AGENT_ID=
# DINGTALK_LOOKUP_MODE=none

# Email channel (optional): Herald calls herald-smtp via HTTP for email verification codes
# HERALD_SMTP_IMAGE=ghcr.io/soulteary/herald-smtp:latest
# HERALD_SMTP_API_URL=http://herald-smtp:8085
# HERALD_SMTP_API_KEY=
# SMTP_HOST=
# SMTP_PORT=587
# SMTP_USER=
# SMTP_PASSWORD=
# SMTP_FROM=
# SMTP_USE_STARTTLS=true
# HERALD_SMTP_IDEMPOTENCY_TTL=300

# TOTP 2FA (optional): Stargate calls herald-totp for enroll/verify and backup codes
# HERALD_TOTP_ENABLED=false
# HERALD_TOTP_BASE_URL=http://herald-totp:8084
# HERALD_TOTP_API_KEY=
# HERALD_TOTP_IMAGE=ghcr.io/soulteary/herald-totp:latest
# HERALD_TOTP_ENCRYPTION_KEY=   # 32-byte AES-256 key, required when herald-totp runs
# HERALD_TOTP_PORT=:8084
# HERALD_TOTP_REDIS_ADDR=herald-redis:6379
# HERALD_TOTP_EXPOSE_SECRET_IN_ENROLL=true
";
