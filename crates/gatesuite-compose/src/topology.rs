//! Splitting the canonical document into the full topology and its slices.
//!
//! The full topology keeps every service. Each slice keeps an allow-listed
//! subset, declares the shared networks as external (they are pre-created
//! once for all slices), and the gateway slice is rewritten to reach
//! services that now live in other compose files.

use gatesuite_common::constants::{DEFAULT_TRAEFIK_NETWORK, SHARED_NETWORK};
use gatesuite_common::error::Result;
use gatesuite_common::types::Topology;
use serde_yaml::{Mapping, Value};

use crate::addressing::rewrite_gateway_addresses;
use crate::catalog::GATEWAY;
use crate::document::{ComposeDocument, NETWORKS, SERVICES, VOLUMES};
use crate::options::GenerationOptions;

/// What one topology keeps from the canonical document.
#[derive(Debug, Clone, Copy)]
pub struct SplitDef {
    /// The topology described.
    pub topology: Topology,
    /// Kept services; `None` keeps all of them along with every volume and network.
    pub services: Option<&'static [&'static str]>,
    /// Kept top-level volumes.
    pub volumes: &'static [&'static str],
    /// Networks declared `external: true`.
    pub external_networks: &'static [&'static str],
    /// Whether the gateway must address siblings living in other files.
    pub cross_slice: bool,
}

/// Split definitions for every topology.
pub const SPLITS: [SplitDef; 4] = [
    SplitDef {
        topology: Topology::Full,
        services: None,
        volumes: &[],
        external_networks: &[],
        cross_slice: false,
    },
    SplitDef {
        topology: Topology::Herald,
        services: Some(&["herald", "herald-redis", "herald-totp", "herald-smtp", "herald-dingtalk"]),
        volumes: &["herald-redis-data"],
        external_networks: &[SHARED_NETWORK],
        cross_slice: false,
    },
    SplitDef {
        topology: Topology::Warden,
        services: Some(&["warden", "warden-redis"]),
        volumes: &["warden-redis-data"],
        external_networks: &[SHARED_NETWORK],
        cross_slice: false,
    },
    SplitDef {
        topology: Topology::Stargate,
        services: Some(&["stargate", "protected-service"]),
        volumes: &[],
        external_networks: &[SHARED_NETWORK, DEFAULT_TRAEFIK_NETWORK],
        cross_slice: true,
    },
];

/// Returns the split definition of a topology.
#[must_use]
pub fn split_def(topology: Topology) -> &'static SplitDef {
    match topology {
        Topology::Full => &SPLITS[0],
        Topology::Herald => &SPLITS[1],
        Topology::Warden => &SPLITS[2],
        Topology::Stargate => &SPLITS[3],
    }
}

/// Produces a fresh document for `topology`. `full` is never modified.
///
/// # Errors
///
/// Returns [`gatesuite_common::error::SuiteError::MissingServices`] if the
/// canonical document has no services.
pub fn split(full: &ComposeDocument, topology: Topology, opts: &GenerationOptions) -> Result<ComposeDocument> {
    let services = full.require_services()?;
    let def = split_def(topology);

    let Some(allowed) = def.services else {
        let mut root = Mapping::new();
        for key in [SERVICES, VOLUMES, NETWORKS] {
            if let Some(section) = full.as_mapping().get(key) {
                let _ = root.insert(key.into(), section.clone());
            }
        }
        return Ok(ComposeDocument::from_mapping(root));
    };

    let mut kept = Mapping::new();
    for name in allowed {
        let Some(svc) = services.get(*name) else {
            continue;
        };
        let mut svc = svc.clone();
        if def.cross_slice && *name == GATEWAY {
            if let Value::Mapping(m) = &mut svc {
                apply_cross_slice_overrides(m, opts.addressing_prefix());
            }
        }
        let _ = kept.insert((*name).into(), svc);
    }

    let mut root = Mapping::new();
    let _ = root.insert(SERVICES.into(), Value::Mapping(kept));

    if let Some(volumes) = full.volumes() {
        let picked: Mapping = def
            .volumes
            .iter()
            .filter_map(|v| volumes.get(*v).map(|decl| (Value::from(*v), decl.clone())))
            .collect();
        if !picked.is_empty() {
            let _ = root.insert(VOLUMES.into(), Value::Mapping(picked));
        }
    }

    let networks: Mapping = def
        .external_networks
        .iter()
        .map(|n| {
            let mut decl = Mapping::new();
            let _ = decl.insert("external".into(), Value::Bool(true));
            (Value::from(*n), Value::Mapping(decl))
        })
        .collect();
    let _ = root.insert(NETWORKS.into(), Value::Mapping(networks));

    tracing::debug!(topology = %topology, services = allowed.len(), "split topology");
    Ok(ComposeDocument::from_mapping(root))
}

/// The gateway can no longer start after services from other files, and
/// must use their container names.
fn apply_cross_slice_overrides(svc: &mut Mapping, prefix: &str) {
    let _ = svc.remove("depends_on");
    rewrite_gateway_addresses(svc, prefix);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::string_list;

    const DOC: &str = r"
services:
  herald:
    image: herald
  herald-redis:
    image: redis
  warden:
    image: warden
  warden-redis:
    image: redis
  stargate:
    image: stargate
    depends_on: [herald, warden]
    environment:
      - WARDEN_URL=http://warden:8081
  protected-service:
    image: whoami
volumes:
  herald-redis-data: {}
  warden-redis-data: {}
networks:
  the-gate-network:
    driver: bridge
  traefik:
    external: true
";

    fn doc() -> ComposeDocument {
        ComposeDocument::parse(DOC).expect("parse")
    }

    #[test]
    fn full_keeps_every_section() {
        let full = doc();
        let out = split(&full, Topology::Full, &GenerationOptions::default()).expect("split");
        assert_eq!(out.service_names().len(), 6);
        assert_eq!(out.volumes(), full.volumes());
        assert_eq!(out.networks(), full.networks());
    }

    #[test]
    fn warden_slice_keeps_only_its_services_and_volume() {
        let out = split(&doc(), Topology::Warden, &GenerationOptions::default()).expect("split");
        assert_eq!(out.service_names(), vec!["warden", "warden-redis"]);
        let volumes = out.volumes().expect("volumes");
        assert_eq!(volumes.len(), 1);
        assert!(volumes.contains_key("warden-redis-data"));
        let net = out.networks().expect("networks");
        assert_eq!(net.len(), 1);
        assert_eq!(
            net.get("the-gate-network")
                .and_then(|n| n.get("external"))
                .and_then(Value::as_bool),
            Some(true)
        );
    }

    #[test]
    fn stargate_slice_has_no_volumes_and_external_proxy_network() {
        let out = split(&doc(), Topology::Stargate, &GenerationOptions::default()).expect("split");
        assert!(out.volumes().is_none());
        let net = out.networks().expect("networks");
        assert!(net.contains_key("traefik"));
        assert!(net.contains_key("the-gate-network"));
    }

    #[test]
    fn stargate_slice_drops_depends_on_and_prefixes_urls() {
        let opts = GenerationOptions::default().with_prefix("foo-");
        let out = split(&doc(), Topology::Stargate, &opts).expect("split");
        let gw = out.service("stargate").expect("stargate");
        assert!(gw.get("depends_on").is_none());
        let env = string_list(gw, "environment").expect("env");
        assert_eq!(env, vec!["WARDEN_URL=http://foo-warden:8081"]);
    }

    #[test]
    fn empty_prefix_addresses_with_default_prefix() {
        let opts = GenerationOptions::default().with_prefix("");
        let out = split(&doc(), Topology::Stargate, &opts).expect("split");
        let env = string_list(out.service("stargate").expect("gw"), "environment").expect("env");
        assert_eq!(env, vec!["WARDEN_URL=http://the-gate-warden:8081"]);
    }

    #[test]
    fn split_does_not_touch_the_source() {
        let full = doc();
        let before = full.clone();
        let _ = split(&full, Topology::Stargate, &GenerationOptions::default()).expect("split");
        assert_eq!(full, before);
    }

    #[test]
    fn missing_services_is_an_error() {
        let full = ComposeDocument::parse("volumes:\n  x: {}\n").expect("parse");
        assert!(split(&full, Topology::Full, &GenerationOptions::default()).is_err());
    }

    #[test]
    fn every_topology_has_a_definition() {
        for t in Topology::ALL {
            assert_eq!(split_def(t).topology, t);
        }
    }
}
