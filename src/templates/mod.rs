//! Manifest builders for the subsystem custom resources. Manifests are built
//! as unstructured JSON and applied through the dynamic API, since the target
//! kinds belong to operators this controller installs rather than to its own
//! scheme.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::crd::orchestrator::{PlatformSpec, RhdhPluginsSpec};

pub fn operator_labels() -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(
        "app.kubernetes.io/created-by".to_string(),
        "orchestrator-operator".to_string(),
    );
    labels
}

pub fn sonataflow_cluster_platform(
    name: &str,
    platform_name: &str,
    platform_namespace: &str,
) -> Value {
    json!({
        "apiVersion": "sonataflow.org/v1alpha08",
        "kind": "SonataFlowClusterPlatform",
        "metadata": {
            "name": name,
            "labels": operator_labels(),
        },
        "spec": {
            "platformRef": {
                "name": platform_name,
                "namespace": platform_namespace,
            },
        },
    })
}

pub fn sonataflow_platform(
    name: &str,
    namespace: &str,
    platform: Option<&PlatformSpec>,
) -> Value {
    let mut resources = json!({});
    if let Some(req) = platform.and_then(|p| p.resources.as_ref()) {
        if let Some(r) = &req.requests {
            resources["requests"] = quantity_map(&r.cpu, &r.memory);
        }
        if let Some(l) = &req.limits {
            resources["limits"] = quantity_map(&l.cpu, &l.memory);
        }
    }
    json!({
        "apiVersion": "sonataflow.org/v1alpha08",
        "kind": "SonataFlowPlatform",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": operator_labels(),
        },
        "spec": {
            "build": {
                "template": {
                    "resources": resources,
                },
            },
            "services": {
                "dataIndex": { "enabled": true, "persistence": {} },
                "jobService": { "enabled": true, "persistence": {} },
            },
        },
    })
}

pub fn knative_eventing(name: &str, namespace: &str) -> Value {
    json!({
        "apiVersion": "operator.knative.dev/v1beta1",
        "kind": "KnativeEventing",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": operator_labels(),
        },
        "spec": {},
    })
}

pub fn knative_serving(name: &str, namespace: &str) -> Value {
    json!({
        "apiVersion": "operator.knative.dev/v1beta1",
        "kind": "KnativeServing",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": operator_labels(),
        },
        "spec": {},
    })
}

/// npm registry credentials consumed by the Backstage dynamic-plugin loader.
pub fn backstage_registry_secret(
    name: &str,
    namespace: &str,
    npm_registry: &str,
) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": operator_labels(),
        },
        "type": "Opaque",
        "stringData": {
            ".npmrc": format!("registry={}\n", npm_registry),
        },
    })
}

pub fn backstage_cr(
    name: &str,
    namespace: &str,
    plugins: &RhdhPluginsSpec,
    cluster_domain: Option<&str>,
) -> Value {
    let mut app_config = json!({});
    if let Some(domain) = cluster_domain {
        let base_url = format!("https://backstage-{}-{}.{}", name, namespace, domain);
        app_config["app"] = json!({ "baseUrl": base_url.clone() });
        app_config["backend"] = json!({ "baseUrl": base_url });
    }
    if let Some(email) = &plugins.notifications_email_hostname {
        app_config["notifications"] = json!({
            "email": { "hostname": email },
        });
    }
    json!({
        "apiVersion": "rhdh.redhat.com/v1alpha1",
        "kind": "Backstage",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": operator_labels(),
        },
        "spec": {
            "application": {
                "appConfig": { "inline": app_config },
                "dynamicPluginsConfigMapName": "dynamic-plugins",
            },
            "database": {
                "enableLocalDb": true,
            },
        },
    })
}

fn quantity_map(cpu: &Option<String>, memory: &Option<String>) -> Value {
    let mut out = json!({});
    if let Some(cpu) = cpu {
        out["cpu"] = json!(cpu);
    }
    if let Some(memory) = memory {
        out["memory"] = json!(memory);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::orchestrator::{
        PlatformSpec, ResourceListSpec, ResourceRequirementsSpec,
    };

    #[test]
    fn sonataflow_platform_carries_resource_requests() {
        let platform = PlatformSpec {
            resources: Some(ResourceRequirementsSpec {
                requests: Some(ResourceListSpec {
                    cpu: Some("500m".into()),
                    memory: Some("1Gi".into()),
                }),
                limits: None,
            }),
        };
        let m = sonataflow_platform("sonataflow-platform", "sf", Some(&platform));
        assert_eq!(m["kind"], "SonataFlowPlatform");
        assert_eq!(m["metadata"]["namespace"], "sf");
        assert_eq!(
            m["spec"]["build"]["template"]["resources"]["requests"]["cpu"],
            "500m"
        );
    }

    #[test]
    fn knative_manifests_are_namespaced_singletons() {
        let ev = knative_eventing("knative-eventing", "knative-eventing");
        assert_eq!(ev["kind"], "KnativeEventing");
        assert_eq!(ev["metadata"]["name"], ev["metadata"]["namespace"]);
        let sv = knative_serving("knative-serving", "knative-serving");
        assert_eq!(sv["kind"], "KnativeServing");
    }

    #[test]
    fn backstage_cr_wires_cluster_domain_into_base_urls() {
        let plugins = RhdhPluginsSpec {
            npm_registry: "https://npm.example.com".into(),
            notifications_email_hostname: None,
        };
        let m = backstage_cr("backstage", "rhdh", &plugins, Some("apps.example.com"));
        let base = m["spec"]["application"]["appConfig"]["inline"]["app"]["baseUrl"]
            .as_str()
            .unwrap();
        assert!(base.ends_with("apps.example.com"));

        let m = backstage_cr("backstage", "rhdh", &plugins, None);
        assert!(
            m["spec"]["application"]["appConfig"]["inline"]
                .get("app")
                .is_none()
        );
    }
}
