//! Final YAML rendering: header banner and inline environment comments.
//!
//! Comments are added to the serialized text because the YAML tree cannot
//! carry them. Each known `- KEY=...` entry inside an `environment:` block
//! gets a `# ...` line above it at the same indentation.

use gatesuite_common::error::Result;
use gatesuite_common::types::Topology;

use crate::document::ComposeDocument;

/// Explanatory comment per environment key.
pub const ENV_COMMENTS: &[(&str, &str)] = &[
    ("PORT", "Service listen port"),
    ("REDIS_ADDR", "Herald Redis address (host:port), override with HERALD_REDIS_ADDR"),
    ("REDIS_PASSWORD", "Redis password, empty means no auth"),
    ("REDIS_DB", "Herald Redis database number"),
    ("LOG_LEVEL", "Log level (info/debug/warn/error)"),
    ("API_KEY", "Service-to-service API key, change in production"),
    ("HMAC_SECRET", "Herald HMAC signing secret, change in production"),
    ("HERALD_TEST_MODE", "Herald test mode (codes are not really sent)"),
    ("PROVIDER_FAILURE_POLICY", "Provider failure policy (soft/strict)"),
    ("CHALLENGE_EXPIRY", "Verification code lifetime"),
    ("CODE_LENGTH", "Verification code length"),
    ("MAX_ATTEMPTS", "Maximum verification attempts per challenge"),
    ("RESEND_COOLDOWN", "Resend cooldown"),
    ("IDEMPOTENCY_KEY_TTL", "Herald idempotency key TTL (0 uses CHALLENGE_EXPIRY)"),
    ("ALLOWED_PURPOSES", "Herald allowed purposes, comma separated, e.g. login,reset,bind,stepup"),
    ("SERVICE_NAME", "Herald service identifier (HMAC etc.)"),
    ("HERALD_HMAC_KEYS", "Herald multi-key HMAC JSON, e.g. {\"key-id\":\"secret\"}, optional"),
    ("REDIS", "Warden Redis address (host:port), override with WARDEN_REDIS_ADDR"),
    ("REDIS_PASSWORD_FILE", "Warden Redis password file (optional, wins over REDIS_PASSWORD)"),
    ("REDIS_ENABLED", "Whether Warden uses Redis (optional, default true)"),
    ("DATA_FILE", "Warden local user data file (path inside the container)"),
    ("MODE", "Warden mode (ONLY_LOCAL/REMOTE/HYBRID etc.)"),
    ("INTERVAL", "Warden polling interval (seconds)"),
    ("CONFIG", "Warden remote config URL (REMOTE and similar modes)"),
    ("KEY", "Warden remote config auth header (e.g. Bearer token)"),
    ("HTTP_MAX_IDLE_CONNS", "Warden HTTP max idle connections"),
    ("HTTP_INSECURE_TLS", "Whether Warden skips TLS verification (development only)"),
    ("AUTH_HOST", "Auth page host / domain"),
    ("LOGIN_PAGE_TITLE", "Login page title"),
    ("LOGIN_PAGE_FOOTER_TEXT", "Login page footer text"),
    ("COOKIE_DOMAIN", "Cookie domain (set when spanning subdomains)"),
    ("PASSWORDS", "Login password configuration, change in production"),
    ("LANGUAGE", "UI language"),
    ("WARDEN_URL", "Address Stargate uses to reach Warden"),
    ("WARDEN_ENABLED", "Enable Warden"),
    ("WARDEN_API_KEY", "Warden API key"),
    ("WARDEN_CACHE_TTL", "Warden cache TTL (seconds)"),
    ("HERALD_URL", "Address Stargate uses to reach Herald"),
    ("HERALD_ENABLED", "Enable Herald"),
    ("HERALD_API_KEY", "Herald API key"),
    ("HERALD_HMAC_SECRET", "Herald HMAC secret"),
    ("SESSION_STORAGE_ENABLED", "Enable session storage"),
    ("SESSION_STORAGE_REDIS_ADDR", "Session storage Redis address"),
    ("SESSION_STORAGE_REDIS_PASSWORD", "Session storage Redis password"),
    ("AUDIT_LOG_ENABLED", "Enable audit log"),
    ("AUDIT_LOG_FORMAT", "Audit log format (json/text)"),
    ("WARDEN_REDIS_PASSWORD", "Warden Redis password"),
    ("WARDEN_HTTP_TIMEOUT", "Warden HTTP request timeout (seconds)"),
    ("LOCKOUT_DURATION", "Herald lockout duration after too many attempts"),
    ("RATE_LIMIT_PER_USER", "Herald rate limit per user per hour"),
    ("RATE_LIMIT_PER_IP", "Herald rate limit per IP per minute"),
    ("RATE_LIMIT_PER_DESTINATION", "Herald rate limit per destination per hour"),
    ("HERALD_DINGTALK_API_URL", "Herald DingTalk channel: herald-dingtalk address (optional)"),
    ("HERALD_DINGTALK_API_KEY", "Herald DingTalk channel: herald-dingtalk API key (optional)"),
    ("HERALD_DINGTALK_IMAGE", "herald-dingtalk image (optional)"),
    ("DINGTALK_APP_KEY", "herald-dingtalk: DingTalk app key"),
    ("DINGTALK_APP_SECRET", "herald-dingtalk: DingTalk app secret"),
    ("DINGTALK_AGENT_ID", "herald-dingtalk: DingTalk app agent id (work notices)"),
    ("DINGTALK_LOOKUP_MODE", "herald-dingtalk: none=to is a userid only; mobile=to may be a userid or an 11-digit mobile number"),
    ("HERALD_DINGTALK_IDEMPOTENCY_TTL", "herald-dingtalk idempotency cache TTL (seconds)"),
    ("HERALD_TOTP_ENABLED", "Enable herald-totp (TOTP 2FA)"),
    ("HERALD_TOTP_BASE_URL", "Address Stargate uses to reach herald-totp"),
    ("HERALD_TOTP_API_KEY", "herald-totp API key (matches the herald-totp container API_KEY)"),
    ("HERALD_TOTP_IMAGE", "herald-totp image"),
    ("HERALD_TOTP_ENCRYPTION_KEY", "herald-totp 32-byte AES-256 encryption key"),
    ("HERALD_TOTP_EXPOSE_SECRET_IN_ENROLL", "Whether herald-totp enroll/start returns secret_base32"),
    ("HERALD_TOTP_REDIS_ADDR", "Redis address used by herald-totp"),
    ("HERALD_TOTP_PORT", "herald-totp listen port"),
    ("HERALD_SMTP_IMAGE", "herald-smtp image (optional)"),
    ("HERALD_SMTP_API_URL", "Herald email channel: herald-smtp address (optional)"),
    ("HERALD_SMTP_API_KEY", "Herald email channel: herald-smtp API key (optional)"),
    ("SMTP_HOST", "herald-smtp: SMTP server host"),
    ("SMTP_PORT", "herald-smtp: SMTP port"),
    ("SMTP_USER", "herald-smtp: SMTP username"),
    ("SMTP_PASSWORD", "herald-smtp: SMTP password"),
    ("SMTP_FROM", "herald-smtp: sender address"),
    ("SMTP_USE_STARTTLS", "herald-smtp: use STARTTLS"),
    ("HERALD_SMTP_IDEMPOTENCY_TTL", "herald-smtp idempotency cache TTL (seconds)"),
    ("PROTECTED_IMAGE", "Protected service (whoami) image, for E2E and demos"),
    ("DEBUG", "Debug mode"),
];

/// Returns the comment for an environment key.
#[must_use]
pub fn env_comment(key: &str) -> Option<&'static str> {
    ENV_COMMENTS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, c)| *c)
}

/// Returns the comment banner placed at the top of a topology's compose file.
#[must_use]
pub const fn header(topology: Topology) -> &'static str {
    match topology {
        Topology::Full => {
            "# Stargate Suite with Traefik - all-in-one (generated from canonical)\n\
             # Usage: docker compose -f build/traefik/docker-compose.yml up -d\n\
             #\n"
        }
        Topology::Herald => {
            "# Herald standalone compose - Herald + herald-totp (TOTP 2FA) + Redis (generated from canonical)\n\
             # Create the shared network first: docker network create the-gate-network\n\
             # Start: docker compose -f build/traefik-herald/docker-compose.yml up -d\n\
             #\n"
        }
        Topology::Warden => {
            "# Warden standalone compose - allow-list user service and its Redis only (generated from canonical)\n\
             # Create the shared network first: docker network create the-gate-network\n\
             # Start: docker compose -f build/traefik-warden/docker-compose.yml up -d\n\
             #\n"
        }
        Topology::Stargate => {
            "# Stargate standalone compose - forward auth and the protected demo service only (generated from canonical)\n\
             # Requires Herald and Warden started from their own compose files on the-gate-network.\n\
             # Start: docker compose -f build/traefik-stargate/docker-compose.yml up -d\n\
             #\n"
        }
    }
}

/// Serializes `doc`, injects environment comments and prepends the header.
///
/// # Errors
///
/// Returns an error if YAML serialization fails.
pub fn render(doc: &ComposeDocument, topology: Topology) -> Result<String> {
    let yaml = doc.to_yaml()?;
    let mut out = String::from(header(topology));
    out.push_str(&inject_env_comments(&yaml));
    Ok(out)
}

/// Splits a `- KEY=...` list line into its indentation and key.
fn env_entry(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];
    if indent.is_empty() {
        return None;
    }
    let item = trimmed.strip_prefix('-')?;
    if !item.starts_with(char::is_whitespace) {
        return None;
    }
    let item = item.trim_start().trim_start_matches(['\'', '"']);
    let (key, _) = item.split_once('=')?;
    (!key.is_empty()).then_some((indent, key.trim()))
}

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Inserts a comment line above every known environment entry.
#[must_use]
pub fn inject_env_comments(yaml: &str) -> String {
    let mut out = String::with_capacity(yaml.len() * 2);
    let mut env_indent: Option<usize> = None;

    for line in yaml.lines() {
        let trimmed = line.trim();
        if let Some(base) = env_indent {
            let entry = env_entry(line);
            let leaves = indent_width(line) <= base
                && !trimmed.is_empty()
                && !trimmed.starts_with('#')
                && entry.is_none();
            if leaves {
                env_indent = None;
            } else if let Some((indent, comment)) =
                entry.and_then(|(indent, key)| env_comment(key).map(|c| (indent, c)))
            {
                out.push_str(indent);
                out.push_str("# ");
                out.push_str(comment);
                out.push('\n');
            }
        }
        if trimmed == "environment:" {
            env_indent = Some(indent_width(line));
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}
