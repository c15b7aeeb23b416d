//! Per-service option application and reverse-proxy network handling.

use gatesuite_common::constants::{DEFAULT_TRAEFIK_NETWORK, TRAEFIK_LABEL_PREFIX};
use serde_yaml::{Mapping, Value};

use crate::addressing::rewrite_gateway_addresses;
use crate::catalog::{GATEWAY, NETWORK_FACING, container_suffix, host_port_index};
use crate::document::{
    ComposeDocument, NETWORKS, assignment_key, scalar_to_string, set_string_list, string_list,
};
use crate::features::merge_env;
use crate::options::GenerationOptions;

const DOCKER_NETWORK_LABEL: &str = "traefik.docker.network";

/// Applies health, port, naming and environment options to every service.
pub fn apply_service_options(doc: &mut ComposeDocument, opts: &GenerationOptions) {
    let Some(services) = doc.services_mut() else {
        return;
    };
    for (name, svc) in services.iter_mut() {
        let (Some(name), Some(svc)) = (name.as_str(), svc.as_mapping_mut()) else {
            continue;
        };
        apply_health(svc, opts);
        apply_ports(name, svc, opts);
        apply_naming(name, svc, opts);
        if !opts.env_overrides.is_empty() {
            merge_env(
                svc,
                opts.env_overrides
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            );
        }
    }
}

fn apply_health(svc: &mut Mapping, opts: &GenerationOptions) {
    if !opts.health_check {
        let _ = svc.remove("healthcheck");
        return;
    }
    let Some(Value::Mapping(hc)) = svc.get_mut("healthcheck") else {
        return;
    };
    for (field, value) in [
        ("interval", &opts.health_check_interval),
        ("start_period", &opts.health_check_start_period),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            let _ = hc.insert(field.into(), value.into());
        }
    }
}

/// Container side of a port mapping: everything after the last `:`.
fn container_port(mapping: &str) -> &str {
    mapping.rsplit_once(':').map_or(mapping, |(_, c)| c)
}

fn apply_ports(name: &str, svc: &mut Mapping, opts: &GenerationOptions) {
    if opts.expose_ports {
        if let (Some(idx), Some(host)) = (host_port_index(name), opts.host_ports.get(name)) {
            if let Some(Value::Sequence(ports)) = svc.get_mut("ports") {
                if let Some(entry) = ports.get_mut(idx) {
                    override_host_port(entry, host);
                }
            }
        }
        if svc.contains_key("ports") {
            let _ = svc.remove("expose");
        }
        return;
    }

    let Some(Value::Sequence(ports)) = svc.get("ports") else {
        return;
    };
    let Some(targets) = ports.iter().map(port_target).collect::<Option<Vec<_>>>() else {
        tracing::warn!(service = name, "unrecognized ports entry, keeping ports");
        return;
    };
    if targets.is_empty() {
        return;
    }
    let _ = svc.remove("ports");

    let mut expose = string_list(svc, "expose").unwrap_or_default();
    for target in targets {
        if !expose.contains(&target) {
            expose.push(target);
        }
    }
    set_string_list(svc, "expose", expose);
}

/// Sets the published side of one ports entry, keeping its container side.
fn override_host_port(entry: &mut Value, host: &str) {
    match entry {
        Value::Mapping(map) => {
            let _ = map.insert("published".into(), host.into());
        }
        other => {
            if let Some(text) = scalar_to_string(other) {
                *other = format!("{host}:{}", container_port(&text)).into();
            }
        }
    }
}

/// Container port of a short-syntax string or a long-syntax `target` mapping.
fn port_target(entry: &Value) -> Option<String> {
    let target = match entry {
        Value::Mapping(map) => map.get("target").and_then(scalar_to_string)?,
        other => container_port(&scalar_to_string(other)?).to_owned(),
    };
    (!target.is_empty()).then_some(target)
}

fn apply_naming(name: &str, svc: &mut Mapping, opts: &GenerationOptions) {
    let prefix = opts.container_name_prefix.as_str();
    if prefix.is_empty() {
        return;
    }
    if let Some(suffix) = container_suffix(name) {
        let _ = svc.insert("container_name".into(), format!("{prefix}{suffix}").into());
    }
    if name == GATEWAY {
        rewrite_gateway_addresses(svc, prefix);
    }
}

/// Removes or renames the reverse-proxy network.
pub fn apply_traefik_network(doc: &mut ComposeDocument, opts: &GenerationOptions) {
    let name = opts.network_name();
    if opts.traefik_network {
        if name != DEFAULT_TRAEFIK_NETWORK {
            rename_network(doc, name);
        }
    } else {
        detach_network(doc, name);
    }
}

fn detach_network(doc: &mut ComposeDocument, name: &str) {
    let targets = [DEFAULT_TRAEFIK_NETWORK, name];
    if let Some(networks) = doc.section_mut(NETWORKS) {
        for t in targets {
            let _ = networks.remove(t);
        }
        if networks.is_empty() {
            doc.remove_section(NETWORKS);
        }
    }
    for service in NETWORK_FACING {
        let Some(svc) = doc.service_mut(service) else {
            continue;
        };
        let now_empty = match svc.get_mut("networks") {
            Some(Value::Sequence(seq)) => {
                seq.retain(|v| v.as_str().is_none_or(|n| !targets.iter().any(|t| *t == n)));
                seq.is_empty()
            }
            Some(Value::Mapping(map)) => {
                for t in targets {
                    let _ = map.remove(t);
                }
                map.is_empty()
            }
            _ => false,
        };
        if now_empty {
            let _ = svc.remove("networks");
        }
        if let Some(labels) = string_list(svc, "labels") {
            let kept: Vec<String> = labels
                .into_iter()
                .filter(|l| !l.starts_with(TRAEFIK_LABEL_PREFIX))
                .collect();
            if kept.is_empty() {
                let _ = svc.remove("labels");
            } else {
                set_string_list(svc, "labels", kept);
            }
        }
    }
    tracing::debug!(network = name, "detached reverse-proxy network");
}

fn rename_network(doc: &mut ComposeDocument, name: &str) {
    if let Some(networks) = doc.section_mut(NETWORKS) {
        if let Some(decl) = networks.remove(DEFAULT_TRAEFIK_NETWORK) {
            let _ = networks.insert(name.into(), decl);
        }
    }
    let Some(services) = doc.services_mut() else {
        return;
    };
    for (_, svc) in services.iter_mut() {
        let Some(svc) = svc.as_mapping_mut() else {
            continue;
        };
        match svc.get_mut("networks") {
            Some(Value::Sequence(seq)) => {
                for n in seq.iter_mut() {
                    if n.as_str() == Some(DEFAULT_TRAEFIK_NETWORK) {
                        *n = name.into();
                    }
                }
            }
            Some(Value::Mapping(map)) => {
                if let Some(decl) = map.remove(DEFAULT_TRAEFIK_NETWORK) {
                    let _ = map.insert(name.into(), decl);
                }
            }
            _ => {}
        }
        if let Some(labels) = string_list(svc, "labels") {
            let renamed = labels
                .into_iter()
                .map(|l| {
                    let is_default = l
                        .split_once('=')
                        .is_some_and(|(_, v)| v.trim() == DEFAULT_TRAEFIK_NETWORK);
                    if assignment_key(&l) == DOCKER_NETWORK_LABEL && is_default {
                        format!("{DOCKER_NETWORK_LABEL}={name}")
                    } else {
                        l
                    }
                })
                .collect();
            set_string_list(svc, "labels", renamed);
        }
    }
    tracing::debug!(network = name, "renamed reverse-proxy network");
}
