//! System-wide constants and default paths.

/// Canonical compose document, relative to the project root.
pub const CANONICAL_COMPOSE: &str = "compose/canonical/docker-compose.yml";

/// Directory holding the static example compose templates, relative to the project root.
pub const EXAMPLE_COMPOSE_DIR: &str = "compose/example";

/// Default output directory for generated artifacts, relative to the project root.
pub const BUILD_DIR: &str = "build";

/// File name of every generated compose file.
pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";

/// File name of every generated environment file.
pub const ENV_FILE_NAME: &str = ".env";

/// Directories whose joint presence marks the project root.
pub const ROOT_MARKERS: [&str; 2] = ["compose", "config"];

/// Default container-name prefix.
pub const DEFAULT_CONTAINER_PREFIX: &str = "the-gate-";

/// Default name of the shared reverse-proxy network.
pub const DEFAULT_TRAEFIK_NETWORK: &str = "traefik";

/// Label namespace owned by the reverse proxy.
pub const TRAEFIK_LABEL_PREFIX: &str = "traefik.";

/// Network shared by every slice, pre-created before slices are deployed.
pub const SHARED_NETWORK: &str = "the-gate-network";

/// Default bind path for Herald's Redis data.
pub const DEFAULT_HERALD_REDIS_DATA_PATH: &str = "./data/herald-redis";

/// Default bind path for Warden's Redis data.
pub const DEFAULT_WARDEN_REDIS_DATA_PATH: &str = "./data/warden-redis";

/// Default port for the `serve` command.
pub const DEFAULT_SERVE_PORT: u16 = 8085;

/// Maximum accepted body size for `POST /api/generate`.
pub const MAX_GENERATE_BODY_BYTES: usize = 1 << 20;

/// Default deadline for `wait`, in seconds.
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 60;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn,gatesuite=info,gatesuite_compose=info";
