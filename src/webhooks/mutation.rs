//! Pod mutation: CA volume and mounts.
//!
//! The volume and every mount are addressed by [`INJECTED_VOLUME_NAME`].
//! Both are upserted: an existing entry with that name is replaced in place,
//! otherwise a new one is appended. Running [`inject`] twice with the same
//! configuration is therefore a no-op the second time.

use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, Pod, SecretVolumeSource, Volume, VolumeMount,
};

use crate::config::InjectionConfig;
use crate::resources::RecordKind;

/// Reserved name of the injected volume and its mounts
pub const INJECTED_VOLUME_NAME: &str = "injected-ca";

/// The volume exposing the trust record.
pub fn ca_volume(config: &InjectionConfig) -> Volume {
    let optional = config.volume_optional.then_some(true);
    match config.record_kind {
        RecordKind::ConfigMap => Volume {
            name: INJECTED_VOLUME_NAME.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: config.record_name.clone(),
                optional,
                ..Default::default()
            }),
            ..Default::default()
        },
        RecordKind::Secret | RecordKind::TlsSecret => Volume {
            name: INJECTED_VOLUME_NAME.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(config.record_name.clone()),
                optional,
                ..Default::default()
            }),
            ..Default::default()
        },
    }
}

/// The read-only mount projecting a single key of the record onto one file.
pub fn ca_volume_mount(config: &InjectionConfig) -> VolumeMount {
    VolumeMount {
        name: INJECTED_VOLUME_NAME.to_string(),
        read_only: Some(true),
        mount_path: config.mount_path.clone(),
        sub_path: Some(config.record_key.clone()),
        ..Default::default()
    }
}

/// Add or replace the CA volume and the CA mount of every container.
///
/// Containers are handled before init containers, each in declaration order.
pub fn inject(pod: &mut Pod, config: &InjectionConfig) {
    let Some(spec) = pod.spec.as_mut() else {
        return;
    };

    upsert_by_name(
        spec.volumes.get_or_insert_with(Vec::new),
        ca_volume(config),
        |v| v.name.as_str(),
    );

    let mount = ca_volume_mount(config);
    for container in spec.containers.iter_mut() {
        upsert_mount(container, &mount);
    }
    for container in spec.init_containers.iter_mut().flatten() {
        upsert_mount(container, &mount);
    }
}

fn upsert_mount(container: &mut Container, mount: &VolumeMount) {
    upsert_by_name(
        container.volume_mounts.get_or_insert_with(Vec::new),
        mount.clone(),
        |m| m.name.as_str(),
    );
}

fn upsert_by_name<T>(items: &mut Vec<T>, item: T, name: impl Fn(&T) -> &str) {
    match items.iter_mut().find(|existing| name(&**existing) == name(&item)) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}
