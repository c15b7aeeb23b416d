//! Static knowledge about the services of the canonical document.

use crate::options::Feature;

/// The forward-auth gateway. Its environment addresses siblings by URL.
pub const GATEWAY: &str = "stargate";

/// Services attached to the reverse-proxy network.
pub const NETWORK_FACING: [&str; 2] = ["stargate", "protected-service"];

/// Logical service name to `container_name` suffix.
pub const CONTAINER_SUFFIXES: &[(&str, &str)] = &[
    ("herald", "herald"),
    ("herald-redis", "herald-redis"),
    ("herald-totp", "herald-totp"),
    ("herald-dingtalk", "herald-dingtalk"),
    ("herald-smtp", "herald-smtp"),
    ("owlmail", "owlmail"),
    ("warden", "warden"),
    ("warden-redis", "warden-redis"),
    ("stargate", "stargate"),
    ("protected-service", "whoami"),
];

/// Returns the container suffix of a known service.
#[must_use]
pub fn container_suffix(service: &str) -> Option<&'static str> {
    CONTAINER_SUFFIXES
        .iter()
        .find(|(name, _)| *name == service)
        .map(|(_, suffix)| *suffix)
}

/// Gateway environment keys holding a URL that points at a sibling service.
pub const SIBLING_URL_KEYS: &[(&str, &str)] = &[
    ("WARDEN_URL", "warden"),
    ("HERALD_URL", "herald"),
    ("HERALD_TOTP_BASE_URL", "herald-totp"),
];

/// Marker of the forward-auth address label.
pub const FORWARD_AUTH_ADDRESS: &str = "forwardauth.address=";

/// Services whose host port can be overridden, with the index of the
/// `ports` entry that carries it.
pub const HOST_PORT_TARGETS: &[(&str, usize)] = &[
    ("herald", 0),
    ("warden", 0),
    ("herald-redis", 0),
    ("herald-totp", 0),
    ("herald-smtp", 0),
    ("owlmail", 1),
];

/// Returns which `ports` entry a host-port override applies to.
#[must_use]
pub fn host_port_index(service: &str) -> Option<usize> {
    HOST_PORT_TARGETS
        .iter()
        .find(|(name, _)| *name == service)
        .map(|(_, idx)| *idx)
}

/// A Redis service whose storage can switch to a bind path.
#[derive(Debug, Clone, Copy)]
pub struct RedisService {
    /// Service name.
    pub service: &'static str,
    /// Named volume declared for it at the top level.
    pub volume: &'static str,
    /// Variable that overrides the bind path at deploy time.
    pub path_var: &'static str,
}

/// The two Redis-backed services.
pub const REDIS_SERVICES: [RedisService; 2] = [
    RedisService {
        service: "herald-redis",
        volume: "herald-redis-data",
        path_var: "HERALD_REDIS_DATA_PATH",
    },
    RedisService {
        service: "warden-redis",
        volume: "warden-redis-data",
        path_var: "WARDEN_REDIS_DATA_PATH",
    },
];

/// Wiring of an optional feature.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSpec {
    /// Which feature this describes.
    pub feature: Feature,
    /// Service that provides it.
    pub service: &'static str,
    /// Service whose environment refers to it.
    pub owner: &'static str,
    /// Owner environment keys removed when the feature is off.
    pub owner_env: &'static [&'static str],
    /// Env-file keys dropped when the feature is off.
    pub env_vars: &'static [&'static str],
}

/// Optional features with a service of their own in the canonical document.
pub const FEATURES: [FeatureSpec; 3] = [
    FeatureSpec {
        feature: Feature::DingTalk,
        service: "herald-dingtalk",
        owner: "herald",
        owner_env: &[],
        env_vars: &[
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
    FeatureSpec {
        feature: Feature::Smtp,
        service: "herald-smtp",
        owner: "herald",
        owner_env: &[],
        env_vars: &[
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
    FeatureSpec {
        feature: Feature::Totp,
        service: "herald-totp",
        owner: GATEWAY,
        owner_env: &[
            "HERALD_TOTP_ENABLED",
            "HERALD_TOTP_BASE_URL",
            "HERALD_TOTP_API_KEY",
        ],
        env_vars: &[
            "HERALD_TOTP_ENABLED",
            "HERALD_TOTP_BASE_URL",
            "HERALD_TOTP_API_KEY",
            "HERALD_TOTP_IMAGE",
            "HERALD_TOTP_ENCRYPTION_KEY",
            "HERALD_TOTP_EXPOSE_SECRET_IN_ENROLL",
            "HERALD_TOTP_REDIS_ADDR",
            "HERALD_TOTP_PORT",
        ],
    },
];

/// Mail-capture sidecar service name.
pub const MAIL_CAPTURE: &str = "owlmail";

/// Service pointed at the mail-capture sidecar.
pub const MAIL_CAPTURE_CLIENT: &str = "herald-smtp";

/// SMTP settings that route the email channel to the sidecar.
pub const MAIL_CAPTURE_SMTP_ENV: &[(&str, &str)] = &[
    ("SMTP_HOST", "owlmail"),
    ("SMTP_PORT", "1025"),
    ("SMTP_USE_STARTTLS", "false"),
    ("SMTP_USER", ""),
    ("SMTP_PASSWORD", ""),
    ("SMTP_FROM", "noreply@test.local"),
];
