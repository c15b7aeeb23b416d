//! Adding and removing optional provider services.

use gatesuite_common::constants::SHARED_NETWORK;
use serde_yaml::{Mapping, Value};

use crate::catalog::{
    FEATURES, FeatureSpec, MAIL_CAPTURE, MAIL_CAPTURE_CLIENT, MAIL_CAPTURE_SMTP_ENV, container_suffix,
};
use crate::document::{ComposeDocument, assignment_key, set_string_list, string_list};
use crate::options::{Feature, GenerationOptions};

const MAIL_CAPTURE_IMAGE: &str = "ghcr.io/soulteary/owlmail:latest";
const MAIL_CAPTURE_SMTP_PORT: &str = "1025";
const MAIL_CAPTURE_WEB_PORT: &str = "1080";

/// Removes disabled feature services and injects the mail-capture sidecar.
///
/// Only services present in `doc` are touched, so the same call works for
/// the full topology and for any slice.
pub fn apply_features(doc: &mut ComposeDocument, opts: &GenerationOptions) {
    for entry in &FEATURES {
        if !opts.has(entry.feature) {
            remove_feature(doc, entry);
        }
    }
    if opts.has(Feature::MailCapture) && doc.service(MAIL_CAPTURE_CLIENT).is_some() {
        inject_mail_capture(doc, opts);
    }
}

fn remove_feature(doc: &mut ComposeDocument, entry: &FeatureSpec) {
    let Some(services) = doc.services_mut() else {
        return;
    };
    if services.remove(entry.service).is_some() {
        tracing::debug!(service = entry.service, "removed disabled feature service");
    }

    if !entry.owner_env.is_empty() {
        if let Some(owner) = services.get_mut(entry.owner).and_then(Value::as_mapping_mut) {
            if let Some(env) = string_list(owner, "environment") {
                let kept = env
                    .into_iter()
                    .filter(|e| !entry.owner_env.iter().any(|k| *k == assignment_key(e)))
                    .collect();
                set_string_list(owner, "environment", kept);
            }
        }
    }

    for (_, svc) in services.iter_mut() {
        if let Some(svc) = svc.as_mapping_mut() {
            drop_dependency(svc, entry.service);
        }
    }
}

/// Removes `target` from a `depends_on` list or map, dropping the key once empty.
fn drop_dependency(svc: &mut Mapping, target: &str) {
    let now_empty = match svc.get_mut("depends_on") {
        Some(Value::Sequence(seq)) => {
            seq.retain(|v| v.as_str() != Some(target));
            seq.is_empty()
        }
        Some(Value::Mapping(map)) => {
            let _ = map.remove(target);
            map.is_empty()
        }
        _ => false,
    };
    if now_empty {
        let _ = svc.remove("depends_on");
    }
}

fn add_dependency(svc: &mut Mapping, target: &str) {
    match svc.get_mut("depends_on") {
        Some(Value::Sequence(seq)) => {
            if !seq.iter().any(|v| v.as_str() == Some(target)) {
                seq.push(target.into());
            }
        }
        Some(Value::Mapping(map)) => {
            let mut cond = Mapping::new();
            let _ = cond.insert("condition".into(), "service_started".into());
            let _ = map.insert(target.into(), Value::Mapping(cond));
        }
        _ => {
            let _ = svc.insert("depends_on".into(), Value::Sequence(vec![target.into()]));
        }
    }
}

/// Merges `KEY=VALUE` assignments into a service's environment list.
///
/// Existing keys are replaced in place; the rest are appended in the given
/// order. A missing environment list is created.
pub(crate) fn merge_env<'a>(svc: &mut Mapping, overrides: impl IntoIterator<Item = (&'a str, &'a str)>) {
    let overrides: Vec<(&str, &str)> = overrides.into_iter().collect();
    let mut used = vec![false; overrides.len()];
    let mut env: Vec<String> = string_list(svc, "environment")
        .unwrap_or_default()
        .into_iter()
        .map(|entry| {
            if !entry.contains('=') {
                return entry;
            }
            let key = assignment_key(&entry);
            match overrides.iter().position(|(k, _)| *k == key) {
                Some(idx) => {
                    used[idx] = true;
                    format!("{key}={}", overrides[idx].1)
                }
                None => entry,
            }
        })
        .collect();
    for ((key, value), used) in overrides.iter().zip(used) {
        if !used {
            env.push(format!("{key}={value}"));
        }
    }
    set_string_list(svc, "environment", env);
}

fn inject_mail_capture(doc: &mut ComposeDocument, opts: &GenerationOptions) {
    let web_port = opts
        .host_ports
        .get(MAIL_CAPTURE)
        .map_or(MAIL_CAPTURE_WEB_PORT, String::as_str);
    let sidecar = mail_capture_service(opts.addressing_prefix(), web_port);

    let Some(services) = doc.services_mut() else {
        return;
    };
    let _ = services.insert(MAIL_CAPTURE.into(), Value::Mapping(sidecar));

    if let Some(client) = services
        .get_mut(MAIL_CAPTURE_CLIENT)
        .and_then(Value::as_mapping_mut)
    {
        merge_env(client, MAIL_CAPTURE_SMTP_ENV.iter().copied());
        add_dependency(client, MAIL_CAPTURE);
    }
    tracing::debug!(web_port, "injected mail-capture sidecar");
}

fn mail_capture_service(prefix: &str, web_port: &str) -> Mapping {
    let strings = |items: &[&str]| Value::Sequence(items.iter().map(|s| Value::from(*s)).collect());
    let suffix = container_suffix(MAIL_CAPTURE).unwrap_or(MAIL_CAPTURE);

    let mut health = Mapping::new();
    let _ = health.insert(
        "test".into(),
        strings(&[
            "CMD-SHELL",
            "wget -q --spider http://localhost:1080/healthz || exit 1",
        ]),
    );
    let _ = health.insert("interval".into(), "10s".into());
    let _ = health.insert("timeout".into(), "3s".into());
    let _ = health.insert("retries".into(), Value::from(3));
    let _ = health.insert("start_period".into(), "5s".into());

    let mut svc = Mapping::new();
    let _ = svc.insert("image".into(), MAIL_CAPTURE_IMAGE.into());
    let _ = svc.insert("container_name".into(), format!("{prefix}{suffix}").into());
    let _ = svc.insert(
        "ports".into(),
        strings(&[
            format!("{MAIL_CAPTURE_SMTP_PORT}:{MAIL_CAPTURE_SMTP_PORT}").as_str(),
            format!("{web_port}:{MAIL_CAPTURE_WEB_PORT}").as_str(),
        ]),
    );
    let _ = svc.insert(
        "environment".into(),
        strings(&[
            format!("MAILDEV_SMTP_PORT={MAIL_CAPTURE_SMTP_PORT}").as_str(),
            format!("MAILDEV_WEB_PORT={MAIL_CAPTURE_WEB_PORT}").as_str(),
            "MAILDEV_WEB_IP=0.0.0.0",
        ]),
    );
    let _ = svc.insert("networks".into(), strings(&[SHARED_NETWORK]));
    let _ = svc.insert("healthcheck".into(), Value::Mapping(health));
    let _ = svc.insert("restart".into(), "unless-stopped".into());
    svc
}
