//! Rewriting of in-network service addresses to prefixed container names.
//!
//! Inside one compose file a service reaches a sibling by its bare service
//! name. Once slices are deployed from separate files on a shared network,
//! only container names resolve, so URLs must carry the prefix.

use gatesuite_common::constants::DEFAULT_CONTAINER_PREFIX;
use serde_yaml::Mapping;

use crate::catalog::{CONTAINER_SUFFIXES, FORWARD_AUTH_ADDRESS, SIBLING_URL_KEYS, container_suffix};
use crate::document::{assignment_key, set_string_list, string_list};

/// Replaces the host of every `scheme://host` in `text` whose host is one
/// of `targets` (bare, or carrying the default prefix) with
/// `prefix + suffix`. Other hosts are left alone.
#[must_use]
pub fn prefix_hosts(text: &str, targets: &[(&str, &str)], prefix: &str) -> String {
    let mut out = String::with_capacity(text.len() + prefix.len());
    let mut rest = text;
    while let Some(idx) = rest.find("://") {
        let (head, tail) = rest.split_at(idx + 3);
        out.push_str(head);
        let host_end = tail
            .find(|c: char| matches!(c, ':' | '/' | '}' | '"' | '\'' | '`' | ' ' | ','))
            .unwrap_or(tail.len());
        let host = &tail[..host_end];
        let bare = host.strip_prefix(DEFAULT_CONTAINER_PREFIX).unwrap_or(host);
        match targets.iter().find(|(service, _)| *service == bare) {
            Some((_, suffix)) => {
                out.push_str(prefix);
                out.push_str(suffix);
            }
            None => out.push_str(host),
        }
        rest = &tail[host_end..];
    }
    out.push_str(rest);
    out
}

/// Points the gateway's sibling URLs and forward-auth address at prefixed
/// container names.
pub fn rewrite_gateway_addresses(svc: &mut Mapping, prefix: &str) {
    if let Some(env) = string_list(svc, "environment") {
        let rewritten = env
            .into_iter()
            .map(|entry| {
                let key = assignment_key(&entry);
                match SIBLING_URL_KEYS.iter().find(|(k, _)| *k == key) {
                    Some((_, service)) => {
                        let suffix = container_suffix(service).unwrap_or(service);
                        let updated = prefix_hosts(&entry, &[(service, suffix)], prefix);
                        if updated != entry {
                            tracing::debug!(key, value = %updated, "rewrote sibling address");
                        }
                        updated
                    }
                    None => entry,
                }
            })
            .collect();
        set_string_list(svc, "environment", rewritten);
    }

    if let Some(labels) = string_list(svc, "labels") {
        let rewritten = labels
            .into_iter()
            .map(|label| {
                if label.contains(FORWARD_AUTH_ADDRESS) {
                    prefix_hosts(&label, CONTAINER_SUFFIXES, prefix)
                } else {
                    label
                }
            })
            .collect();
        set_string_list(svc, "labels", rewritten);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_prefix() {
        let out = prefix_hosts("WARDEN_URL=http://warden:8081", &[("warden", "warden")], "foo-");
        assert_eq!(out, "WARDEN_URL=http://foo-warden:8081");
    }

    #[test]
    fn default_prefixed_host_is_reprefixed() {
        let out = prefix_hosts(
            "WARDEN_URL=http://the-gate-warden:8081",
            &[("warden", "warden")],
            "foo-",
        );
        assert_eq!(out, "WARDEN_URL=http://foo-warden:8081");
    }

    #[test]
    fn similar_names_do_not_match() {
        let out = prefix_hosts(
            "HERALD_TOTP_BASE_URL=http://herald-totp:8084",
            &[("herald", "herald")],
            "foo-",
        );
        assert_eq!(out, "HERALD_TOTP_BASE_URL=http://herald-totp:8084");
    }

    #[test]
    fn templated_default_is_rewritten() {
        let out = prefix_hosts(
            "HERALD_URL=${HERALD_URL:-http://herald:8082}",
            &[("herald", "herald")],
            "x-",
        );
        assert_eq!(out, "HERALD_URL=${HERALD_URL:-http://x-herald:8082}");
    }

    #[test]
    fn rewriting_is_idempotent() {
        let once = prefix_hosts("http://stargate/_auth", &[("stargate", "stargate")], "p-");
        let twice = prefix_hosts(&once, &[("stargate", "stargate")], "p-");
        assert_eq!(once, "http://p-stargate/_auth");
        assert_eq!(once, twice);
    }

    #[test]
    fn gateway_env_and_forward_auth_label_are_rewritten() {
        let mut svc: Mapping = serde_yaml::from_str(
            r"
environment:
  - WARDEN_URL=http://warden:8081
  - HERALD_URL=http://herald:8082
  - HERALD_TOTP_BASE_URL=http://herald-totp:8084
  - AUTH_HOST=http://warden:1
labels:
  - traefik.http.middlewares.stargate-auth.forwardauth.address=http://stargate/_auth
  - traefik.http.routers.x.rule=Host(`stargate`)
",
        )
        .expect("yaml");
        rewrite_gateway_addresses(&mut svc, "foo-");
        let env = string_list(&svc, "environment").expect("env");
        assert_eq!(
            env,
            vec![
                "WARDEN_URL=http://foo-warden:8081",
                "HERALD_URL=http://foo-herald:8082",
                "HERALD_TOTP_BASE_URL=http://foo-herald-totp:8084",
                "AUTH_HOST=http://warden:1",
            ]
        );
        let labels = string_list(&svc, "labels").expect("labels");
        assert_eq!(
            labels[0],
            "traefik.http.middlewares.stargate-auth.forwardauth.address=http://foo-stargate/_auth"
        );
        assert_eq!(labels[1], "traefik.http.routers.x.rule=Host(`stargate`)");
    }
}
