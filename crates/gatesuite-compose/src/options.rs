//! Generation options and the shapes they are built from.
//!
//! [`GenerationOptions`] is an immutable value handed to the engine; its
//! [`Default`] is the documented baseline (health checks on, reverse-proxy
//! network on, ports published, `the-gate-` prefix, named volumes, no
//! optional features). [`OptionsRequest`] is the JSON shape accepted over
//! HTTP, where an absent toggle means "default" rather than `false`.

use std::collections::{BTreeMap, BTreeSet};

use gatesuite_common::constants::{
    DEFAULT_CONTAINER_PREFIX, DEFAULT_HERALD_REDIS_DATA_PATH, DEFAULT_TRAEFIK_NETWORK,
    DEFAULT_WARDEN_REDIS_DATA_PATH,
};
use serde::{Deserialize, Serialize};

/// An optional provider service that can be added to or removed from a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    /// `herald-dingtalk` notification channel.
    DingTalk,
    /// `herald-smtp` email channel.
    Smtp,
    /// Local mail-capture sidecar for the email channel. Only effective with [`Feature::Smtp`].
    MailCapture,
    /// `herald-totp` second-factor service.
    Totp,
}

/// Where the two Redis-backed services keep their data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedisStorage {
    /// Keep the compose-declared named volumes.
    NamedVolume,
    /// Bind-mount host paths; each is used as the default of a `${..._DATA_PATH}` variable.
    BindPath {
        /// Host path for Herald's Redis.
        herald: String,
        /// Host path for Warden's Redis.
        warden: String,
    },
}

impl RedisStorage {
    /// Bind mode with the given paths; blank paths fall back to the defaults.
    #[must_use]
    pub fn bind(herald: &str, warden: &str) -> Self {
        Self::BindPath {
            herald: non_blank(herald).unwrap_or_else(|| DEFAULT_HERALD_REDIS_DATA_PATH.into()),
            warden: non_blank(warden).unwrap_or_else(|| DEFAULT_WARDEN_REDIS_DATA_PATH.into()),
        }
    }
}

/// Options applied uniformly to every generated topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Keep `healthcheck` blocks.
    pub health_check: bool,
    /// Replacement `healthcheck.interval`.
    pub health_check_interval: Option<String>,
    /// Replacement `healthcheck.start_period`.
    pub health_check_start_period: Option<String>,
    /// Keep the reverse-proxy network and its labels.
    pub traefik_network: bool,
    /// Name of the reverse-proxy network.
    pub traefik_network_name: String,
    /// Publish ports (`ports:`) instead of internal-only `expose:`.
    pub expose_ports: bool,
    /// Host-side port per service name, used when ports are published.
    pub host_ports: BTreeMap<String, String>,
    /// Container name prefix; empty leaves `container_name` untouched.
    pub container_name_prefix: String,
    /// Environment entries merged into every service.
    pub env_overrides: BTreeMap<String, String>,
    /// Enabled optional features.
    pub features: BTreeSet<Feature>,
    /// Redis data placement.
    pub redis_storage: RedisStorage,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            health_check: true,
            health_check_interval: None,
            health_check_start_period: None,
            traefik_network: true,
            traefik_network_name: DEFAULT_TRAEFIK_NETWORK.into(),
            expose_ports: true,
            host_ports: BTreeMap::new(),
            container_name_prefix: DEFAULT_CONTAINER_PREFIX.into(),
            env_overrides: BTreeMap::new(),
            features: BTreeSet::new(),
            redis_storage: RedisStorage::NamedVolume,
        }
    }
}

impl GenerationOptions {
    /// Returns whether a feature is enabled. Mail capture also requires SMTP.
    #[must_use]
    pub fn has(&self, feature: Feature) -> bool {
        match feature {
            Feature::MailCapture => {
                self.features.contains(&Feature::MailCapture) && self.features.contains(&Feature::Smtp)
            }
            other => self.features.contains(&other),
        }
    }

    /// Enables a feature.
    #[must_use]
    pub fn with_feature(mut self, feature: Feature) -> Self {
        let _ = self.features.insert(feature);
        self
    }

    /// Sets the container name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.container_name_prefix = prefix.into();
        self
    }

    /// Sets a host port for one service.
    #[must_use]
    pub fn with_host_port(mut self, service: impl Into<String>, port: impl Into<String>) -> Self {
        let _ = self.host_ports.insert(service.into(), port.into());
        self
    }

    /// Adds an environment override.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.env_overrides.insert(key.into(), value.into());
        self
    }

    /// Prefix used when a slice must address siblings by container name.
    /// Falls back to the default when no prefix is configured.
    #[must_use]
    pub fn addressing_prefix(&self) -> &str {
        if self.container_name_prefix.is_empty() {
            DEFAULT_CONTAINER_PREFIX
        } else {
            &self.container_name_prefix
        }
    }

    /// Effective reverse-proxy network name.
    #[must_use]
    pub fn network_name(&self) -> &str {
        if self.traefik_network_name.trim().is_empty() {
            DEFAULT_TRAEFIK_NETWORK
        } else {
            self.traefik_network_name.trim()
        }
    }

    /// Options for the CLI, read from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Options for the CLI, read through `lookup`.
    ///
    /// `USE_NAMED_VOLUME=0|false` selects bind mode with
    /// `HERALD_REDIS_DATA_PATH` / `WARDEN_REDIS_DATA_PATH`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let named = lookup("USE_NAMED_VOLUME").is_none_or(|v| {
            let v = v.trim();
            v != "0" && !v.eq_ignore_ascii_case("false")
        });
        let redis_storage = if named {
            RedisStorage::NamedVolume
        } else {
            RedisStorage::bind(
                &lookup("HERALD_REDIS_DATA_PATH").unwrap_or_default(),
                &lookup("WARDEN_REDIS_DATA_PATH").unwrap_or_default(),
            )
        };
        Self {
            redis_storage,
            ..Self::default()
        }
    }
}

/// Options as posted to `/api/generate`.
///
/// Toggles are `Option<bool>` so an omitted field keeps its default.
/// Blank strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptionsRequest {
    /// See [`GenerationOptions::health_check`].
    pub health_check: Option<bool>,
    /// See [`GenerationOptions::health_check_interval`].
    pub health_check_interval: String,
    /// See [`GenerationOptions::health_check_start_period`].
    pub health_check_start_period: String,
    /// See [`GenerationOptions::traefik_network`].
    pub traefik_network: Option<bool>,
    /// See [`GenerationOptions::traefik_network_name`].
    pub traefik_network_name: String,
    /// See [`GenerationOptions::expose_ports`].
    pub expose_ports: Option<bool>,
    /// Host port for `herald`.
    pub port_herald: String,
    /// Host port for `warden`.
    pub port_warden: String,
    /// Host port for `herald-redis`.
    pub port_herald_redis: String,
    /// Host port for `herald-totp`.
    pub port_herald_totp: String,
    /// Host port for `herald-smtp`.
    pub port_herald_smtp: String,
    /// Host port for the mail-capture web UI.
    pub port_owlmail: String,
    /// See [`GenerationOptions::container_name_prefix`].
    ///
    /// Unlike the other string fields, blank does not fall back to the
    /// `the-gate-` default: an omitted or empty prefix leaves every
    /// `container_name` as written in the canonical document. Slices that
    /// address siblings by container name still use `the-gate-`
    /// (see [`GenerationOptions::addressing_prefix`]).
    pub container_name_prefix: String,
    /// See [`GenerationOptions::env_overrides`].
    pub env_overrides: BTreeMap<String, String>,
    /// Enables [`Feature::DingTalk`].
    #[serde(rename = "includeDingTalk")]
    pub include_dingtalk: Option<bool>,
    /// Enables [`Feature::Smtp`].
    pub include_smtp: Option<bool>,
    /// Enables [`Feature::MailCapture`].
    pub use_owlmail_for_smtp: Option<bool>,
    /// Enables [`Feature::Totp`].
    pub include_totp: Option<bool>,
    /// `false` selects bind-path Redis storage.
    pub use_named_volume: Option<bool>,
    /// Bind path for Herald's Redis.
    pub herald_redis_data_path: String,
    /// Bind path for Warden's Redis.
    pub warden_redis_data_path: String,
}

impl OptionsRequest {
    /// Converts the request into engine options.
    #[must_use]
    pub fn into_options(self) -> GenerationOptions {
        let defaults = GenerationOptions::default();

        let host_ports = [
            ("herald", &self.port_herald),
            ("warden", &self.port_warden),
            ("herald-redis", &self.port_herald_redis),
            ("herald-totp", &self.port_herald_totp),
            ("herald-smtp", &self.port_herald_smtp),
            ("owlmail", &self.port_owlmail),
        ]
        .into_iter()
        .filter_map(|(svc, port)| non_blank(port).map(|p| (svc.to_owned(), p)))
        .collect();

        let features = [
            (Feature::DingTalk, self.include_dingtalk),
            (Feature::Smtp, self.include_smtp),
            (Feature::MailCapture, self.use_owlmail_for_smtp),
            (Feature::Totp, self.include_totp),
        ]
        .into_iter()
        .filter(|(_, on)| on.unwrap_or(false))
        .map(|(f, _)| f)
        .collect();

        let redis_storage = if self.use_named_volume.unwrap_or(true) {
            RedisStorage::NamedVolume
        } else {
            RedisStorage::bind(&self.herald_redis_data_path, &self.warden_redis_data_path)
        };

        GenerationOptions {
            health_check: self.health_check.unwrap_or(defaults.health_check),
            health_check_interval: non_blank(&self.health_check_interval),
            health_check_start_period: non_blank(&self.health_check_start_period),
            traefik_network: self.traefik_network.unwrap_or(defaults.traefik_network),
            traefik_network_name: non_blank(&self.traefik_network_name)
                .unwrap_or(defaults.traefik_network_name),
            expose_ports: self.expose_ports.unwrap_or(defaults.expose_ports),
            host_ports,
            container_name_prefix: self.container_name_prefix.trim().to_owned(),
            env_overrides: self.env_overrides,
            features,
            redis_storage,
        }
    }
}

fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_baseline() {
        let o = GenerationOptions::default();
        assert!(o.health_check);
        assert!(o.traefik_network);
        assert!(o.expose_ports);
        assert_eq!(o.network_name(), "traefik");
        assert_eq!(o.container_name_prefix, "the-gate-");
        assert_eq!(o.redis_storage, RedisStorage::NamedVolume);
        assert!(o.features.is_empty());
    }

    #[test]
    fn mail_capture_requires_smtp() {
        let o = GenerationOptions::default().with_feature(Feature::MailCapture);
        assert!(!o.has(Feature::MailCapture));
        let o = o.with_feature(Feature::Smtp);
        assert!(o.has(Feature::MailCapture));
    }

    #[test]
    fn addressing_prefix_falls_back_to_default() {
        let o = GenerationOptions::default().with_prefix("");
        assert_eq!(o.addressing_prefix(), "the-gate-");
        let o = o.with_prefix("foo-");
        assert_eq!(o.addressing_prefix(), "foo-");
    }

    #[test]
    fn empty_request_yields_defaults_except_prefix() {
        let req: OptionsRequest = serde_json::from_str("{}").expect("json");
        let o = req.into_options();
        assert!(o.health_check && o.traefik_network && o.expose_ports);
        assert_eq!(o.redis_storage, RedisStorage::NamedVolume);
        assert_eq!(o.container_name_prefix, "");
        assert_ne!(o.container_name_prefix, GenerationOptions::default().container_name_prefix);
        assert_eq!(o.addressing_prefix(), DEFAULT_CONTAINER_PREFIX);
    }

    #[test]
    fn request_distinguishes_false_from_absent() {
        let req: OptionsRequest = serde_json::from_str(
            r#"{"healthCheck": false, "exposePorts": false, "includeTotp": true, "includeDingTalk": true}"#,
        )
        .expect("json");
        let o = req.into_options();
        assert!(!o.health_check);
        assert!(!o.expose_ports);
        assert!(o.traefik_network);
        assert!(o.has(Feature::Totp));
        assert!(o.has(Feature::DingTalk));
        assert!(!o.has(Feature::Smtp));
    }

    #[test]
    fn request_trims_ports_and_paths() {
        let req: OptionsRequest = serde_json::from_str(
            r#"{"portHerald": " 9082 ", "portWarden": "", "useNamedVolume": false, "heraldRedisDataPath": " "}"#,
        )
        .expect("json");
        let o = req.into_options();
        assert_eq!(o.host_ports.get("herald").map(String::as_str), Some("9082"));
        assert!(!o.host_ports.contains_key("warden"));
        assert_eq!(
            o.redis_storage,
            RedisStorage::BindPath {
                herald: "./data/herald-redis".into(),
                warden: "./data/warden-redis".into(),
            }
        );
    }

    #[test]
    fn env_lookup_selects_bind_mode() {
        let o = GenerationOptions::from_lookup(|k| match k {
            "USE_NAMED_VOLUME" => Some("false".into()),
            "WARDEN_REDIS_DATA_PATH" => Some("/srv/warden".into()),
            _ => None,
        });
        assert_eq!(
            o.redis_storage,
            RedisStorage::BindPath {
                herald: "./data/herald-redis".into(),
                warden: "/srv/warden".into(),
            }
        );
    }

    #[test]
    fn env_lookup_defaults_to_named_volume() {
        let o = GenerationOptions::from_lookup(|_| None);
        assert_eq!(o.redis_storage, RedisStorage::NamedVolume);
        let o = GenerationOptions::from_lookup(|_| Some("1".into()));
        assert_eq!(o.redis_storage, RedisStorage::NamedVolume);
    }
}
