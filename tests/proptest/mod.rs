// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for pod-ca-trust.
//!
//! Uses proptest to generate random Pods and injection settings and verify
//! the mutation and patch invariants.

use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, Volume, VolumeMount};
use proptest::prelude::*;

use pod_ca_trust::config::InjectionConfig;
use pod_ca_trust::resources::RecordKind;
use pod_ca_trust::webhooks::INJECTED_VOLUME_NAME;
use pod_ca_trust::webhooks::mutation::{ca_volume, ca_volume_mount, inject};
use pod_ca_trust::webhooks::patch::{diff, diff_objects};

/// Strategy for DNS-label-like names, occasionally the reserved volume name.
fn any_name() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z][a-z0-9-]{0,10}",
        1 => Just(INJECTED_VOLUME_NAME.to_string()),
    ]
}

fn any_path() -> impl Strategy<Value = String> {
    "/[a-z]{1,8}(/[a-z.]{1,8}){0,2}"
}

fn any_mount() -> impl Strategy<Value = VolumeMount> {
    (any_name(), any_path(), any::<Option<bool>>()).prop_map(|(name, mount_path, read_only)| {
        VolumeMount {
            name,
            mount_path,
            read_only,
            ..Default::default()
        }
    })
}

fn any_container() -> impl Strategy<Value = Container> {
    (
        "[a-z][a-z0-9]{0,8}",
        prop::collection::vec(any_mount(), 0..4),
    )
        .prop_map(|(name, mounts)| Container {
            name,
            volume_mounts: (!mounts.is_empty()).then_some(mounts),
            ..Default::default()
        })
}

fn any_volume() -> impl Strategy<Value = Volume> {
    any_name().prop_map(|name| Volume {
        name,
        ..Default::default()
    })
}

fn any_pod() -> impl Strategy<Value = Pod> {
    (
        prop::collection::vec(any_container(), 1..4),
        prop::collection::vec(any_container(), 0..3),
        prop::collection::vec(any_volume(), 0..4),
    )
        .prop_map(|(containers, init, volumes)| Pod {
            spec: Some(PodSpec {
                containers,
                init_containers: (!init.is_empty()).then_some(init),
                volumes: (!volumes.is_empty()).then_some(volumes),
                ..Default::default()
            }),
            ..Default::default()
        })
}

fn any_config() -> impl Strategy<Value = InjectionConfig> {
    (
        prop_oneof![
            Just(RecordKind::ConfigMap),
            Just(RecordKind::Secret)
        ],
        "[a-z][a-z0-9.-]{0,15}",
        "[a-z]{1,6}\\.(crt|pem)",
        any_path(),
        any::<bool>(),
    )
        .prop_map(
            |(record_kind, record_name, record_key, mount_path, volume_optional)| InjectionConfig {
                record_kind,
                record_name,
                record_key,
                mount_path,
                volume_optional,
                ..Default::default()
            },
        )
}

fn count_named<T>(items: &Option<Vec<T>>, name: impl Fn(&T) -> &str) -> usize {
    items
        .iter()
        .flatten()
        .filter(|item| name(item) == INJECTED_VOLUME_NAME)
        .count()
}

proptest! {
    /// Injecting twice is the same as injecting once.
    #[test]
    fn inject_is_idempotent(pod in any_pod(), config in any_config()) {
        let mut once = pod;
        inject(&mut once, &config);
        let mut twice = once.clone();
        inject(&mut twice, &config);
        prop_assert_eq!(&once, &twice);
        prop_assert!(diff_objects(&once, &twice).unwrap().is_none());
    }

    /// The generated patch turns the original into the mutated Pod.
    #[test]
    fn patch_applies_to_original(pod in any_pod(), config in any_config()) {
        let mut mutated = pod.clone();
        inject(&mut mutated, &config);

        let original = serde_json::to_value(&pod).unwrap();
        let expected = serde_json::to_value(&mutated).unwrap();

        let mut applied = original.clone();
        if let Some(patch) = diff(&original, &expected) {
            json_patch::patch(&mut applied, &patch).unwrap();
        }
        prop_assert_eq!(applied, expected);
    }

    /// Identical inputs produce byte-identical patches.
    #[test]
    fn patch_is_deterministic(pod in any_pod(), config in any_config()) {
        let mut mutated = pod.clone();
        inject(&mut mutated, &config);

        let first = serde_json::to_vec(&diff_objects(&pod, &mutated).unwrap()).unwrap();
        let second = serde_json::to_vec(&diff_objects(&pod, &mutated).unwrap()).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Pods that never carried the reserved name end up with exactly one
    /// injected volume and one injected mount per container.
    #[test]
    fn single_injected_entry(pod in any_pod(), config in any_config()) {
        let mut mutated = pod.clone();
        inject(&mut mutated, &config);

        let spec = mutated.spec.unwrap();
        let original = pod.spec.unwrap();
        let had_volume = count_named(&original.volumes, |v: &Volume| v.name.as_str());

        prop_assert_eq!(
            count_named(&spec.volumes, |v: &Volume| v.name.as_str()),
            had_volume.max(1)
        );
        prop_assert!(spec.volumes.iter().flatten().any(|v| *v == ca_volume(&config)));

        let mount = ca_volume_mount(&config);
        for container in spec.containers.iter().chain(spec.init_containers.iter().flatten()) {
            prop_assert!(container.volume_mounts.iter().flatten().any(|m| *m == mount));
        }
    }

    /// Entries not named after the injected volume are left untouched.
    #[test]
    fn unrelated_entries_preserved(pod in any_pod(), config in any_config()) {
        let mut mutated = pod.clone();
        inject(&mut mutated, &config);

        let before = pod.spec.unwrap();
        let after = mutated.spec.unwrap();

        let unrelated = |volumes: &Option<Vec<Volume>>| -> Vec<Volume> {
            volumes
                .iter()
                .flatten()
                .filter(|v| v.name != INJECTED_VOLUME_NAME)
                .cloned()
                .collect()
        };
        prop_assert_eq!(unrelated(&before.volumes), unrelated(&after.volumes));
        prop_assert_eq!(before.containers.len(), after.containers.len());
    }
}
