//! Redis data placement.

use serde_yaml::Value;

use crate::catalog::REDIS_SERVICES;
use crate::document::{ComposeDocument, VOLUMES};
use crate::options::RedisStorage;

/// Switches the Redis services to bind mounts when requested.
///
/// In bind mode each Redis service mounts `${<VAR>:-<path>}:/data` and its
/// named volume is removed from the top level, so a named volume and a bind
/// mount never coexist for the same data. The `volumes` section is dropped
/// once empty. Named-volume mode leaves the document alone.
pub fn apply_redis_storage(doc: &mut ComposeDocument, storage: &RedisStorage) {
    let RedisStorage::BindPath { herald, warden } = storage else {
        return;
    };

    for (redis, path) in REDIS_SERVICES.iter().zip([herald, warden]) {
        if let Some(svc) = doc.service_mut(redis.service) {
            let mount = format!("${{{}:-{path}}}:/data", redis.path_var);
            let _ = svc.insert("volumes".into(), Value::Sequence(vec![mount.into()]));
            tracing::debug!(service = redis.service, path = %path, "bind-mounted redis data");
        }
    }

    if let Some(volumes) = doc.section_mut(VOLUMES) {
        for redis in &REDIS_SERVICES {
            let _ = volumes.remove(redis.volume);
        }
        if volumes.is_empty() {
            doc.remove_section(VOLUMES);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::string_list;

    const DOC: &str = r"
services:
  herald-redis:
    image: redis
    volumes: [herald-redis-data:/data]
  warden-redis:
    image: redis
    volumes: [warden-redis-data:/data]
volumes:
  herald-redis-data: {}
  warden-redis-data: {}
";

    #[test]
    fn named_volume_mode_is_a_no_op() {
        let mut doc = ComposeDocument::parse(DOC).expect("parse");
        let before = doc.clone();
        apply_redis_storage(&mut doc, &RedisStorage::NamedVolume);
        assert_eq!(doc, before);
    }

    #[test]
    fn bind_mode_mounts_paths_and_drops_named_volumes() {
        let mut doc = ComposeDocument::parse(DOC).expect("parse");
        apply_redis_storage(&mut doc, &RedisStorage::bind("/srv/h", ""));
        let herald = doc.service("herald-redis").expect("herald-redis");
        assert_eq!(
            string_list(herald, "volumes").expect("volumes"),
            vec!["${HERALD_REDIS_DATA_PATH:-/srv/h}:/data"]
        );
        let warden = doc.service("warden-redis").expect("warden-redis");
        assert_eq!(
            string_list(warden, "volumes").expect("volumes"),
            vec!["${WARDEN_REDIS_DATA_PATH:-./data/warden-redis}:/data"]
        );
        assert!(doc.volumes().is_none());
    }

    #[test]
    fn bind_mode_keeps_unrelated_volumes() {
        let mut doc = ComposeDocument::parse(&format!("{DOC}  other: {{}}\n")).expect("parse");
        apply_redis_storage(&mut doc, &RedisStorage::bind("", ""));
        let volumes = doc.volumes().expect("volumes");
        assert_eq!(volumes.len(), 1);
        assert!(volumes.contains_key("other"));
    }
}
