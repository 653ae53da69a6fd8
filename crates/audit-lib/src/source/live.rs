//! Kubernetes API source
//!
//! Reads pods, persistent volume claims and `metrics.k8s.io` pod metrics for
//! one namespace. The client is handed in by the caller; nothing here keeps a
//! process-wide handle.

use super::{async_trait, ClusterSource, WorkloadWithUsage};
use crate::error::SourceError;
use crate::models::{ResourceAmounts, StorageClaim, UsageSample, WorkloadUnit};
use crate::quantity::{parse_cpu_millicores, parse_memory_bytes, to_field};
use k8s_openapi::api::core::v1::{Container, PersistentVolumeClaim, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

const METRICS_GROUP: &str = "metrics.k8s.io";
const METRICS_VERSION: &str = "v1beta1";

/// Cluster source backed by a kube client
#[derive(Clone)]
pub struct KubeClusterSource {
    client: Client,
}

impl KubeClusterSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from in-cluster config or the default kubeconfig
    pub async fn infer() -> Result<Self, SourceError> {
        let config = Config::infer().await?;
        Ok(Self::new(Client::try_from(config)?))
    }

    /// Build a client from a kubeconfig file, optionally pinning a context
    pub async fn from_kubeconfig(path: &Path, context: Option<&str>) -> Result<Self, SourceError> {
        let kubeconfig = Kubeconfig::read_from(path)?;
        let options = KubeConfigOptions {
            context: context.map(str::to_string),
            ..Default::default()
        };
        let config = Config::from_custom_kubeconfig(kubeconfig, &options).await?;
        Ok(Self::new(Client::try_from(config)?))
    }

    /// Build a client from the default kubeconfig (`KUBECONFIG`, possibly a
    /// list of files, or `~/.kube/config`) using a named context
    pub async fn from_default_kubeconfig(context: &str) -> Result<Self, SourceError> {
        let options = KubeConfigOptions {
            context: Some(context.to_string()),
            ..Default::default()
        };
        let config = Config::from_kubeconfig(&options).await?;
        Ok(Self::new(Client::try_from(config)?))
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, SourceError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods.list(&ListParams::default()).await?;
        debug!(namespace = %namespace, pods = list.items.len(), "Listed pods");
        Ok(list.items)
    }

    async fn list_pod_metrics(&self, namespace: &str) -> Result<Vec<PodMetrics>, SourceError> {
        let gvk = GroupVersionKind::gvk(METRICS_GROUP, METRICS_VERSION, "PodMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "pods");
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &resource);

        let list = api.list(&ListParams::default()).await.map_err(|e| match e {
            kube::Error::Api(response) if response.code == 404 => {
                SourceError::MetricsUnavailable(response.message)
            }
            other => SourceError::Kube(other),
        })?;

        Ok(list.items.iter().filter_map(pod_metrics_from_object).collect())
    }
}

#[async_trait]
impl ClusterSource for KubeClusterSource {
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadWithUsage>, SourceError> {
        let pods = self.list_pods(namespace).await?;
        let metrics = self.list_pod_metrics(namespace).await?;
        Ok(pair_workloads(&pods, metrics))
    }

    async fn list_storage_claims(&self, namespace: &str) -> Result<Vec<StorageClaim>, SourceError> {
        let claims: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        let list = claims.list(&ListParams::default()).await?;
        debug!(namespace = %namespace, claims = list.items.len(), "Listed persistent volume claims");
        Ok(list.items.iter().map(claim_from_pvc).collect())
    }

    async fn list_active_claim_references(
        &self,
        namespace: &str,
    ) -> Result<HashSet<String>, SourceError> {
        let pods = self.list_pods(namespace).await?;
        Ok(pods.iter().flat_map(claim_refs).collect())
    }
}

/// Pod metrics entry as served by metrics-server
#[derive(Debug, Clone, PartialEq)]
struct PodMetrics {
    name: String,
    containers: Vec<ContainerUsage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct ContainerUsage {
    name: String,
    #[serde(default)]
    usage: BTreeMap<String, String>,
}

fn pod_metrics_from_object(object: &DynamicObject) -> Option<PodMetrics> {
    let name = object.metadata.name.clone()?;
    let containers = match object.data.get("containers") {
        Some(value) => match serde_json::from_value::<Vec<ContainerUsage>>(value.clone()) {
            Ok(containers) => containers,
            Err(e) => {
                warn!(pod = %name, error = %e, "Unreadable container usage in pod metrics");
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    Some(PodMetrics { name, containers })
}

/// Pair pods with their metrics by name, keeping pod list order
fn pair_workloads(pods: &[Pod], metrics: Vec<PodMetrics>) -> Vec<WorkloadWithUsage> {
    let mut by_name: HashMap<String, PodMetrics> =
        metrics.into_iter().map(|m| (m.name.clone(), m)).collect();

    pods.iter()
        .map(|pod| {
            let workload = workload_from_pod(pod);
            let primary = primary_container(pod).map(|c| c.name.as_str());
            let sample = by_name
                .remove(&workload.name)
                .map(|m| usage_from_metrics(&m, primary));
            (workload, sample)
        })
        .collect()
}

fn primary_container(pod: &Pod) -> Option<&Container> {
    pod.spec.as_ref().and_then(|spec| spec.containers.first())
}

fn quantity_str<'a>(map: Option<&'a BTreeMap<String, Quantity>>, key: &str) -> Option<&'a str> {
    map.and_then(|m| m.get(key)).map(|q| q.0.as_str())
}

/// Workload view of a pod: primary container requests and mounted claims
fn workload_from_pod(pod: &Pod) -> WorkloadUnit {
    let name = pod.metadata.name.clone().unwrap_or_default();
    let requests = primary_container(pod)
        .and_then(|c| c.resources.as_ref())
        .and_then(|r| r.requests.as_ref());

    let amounts = ResourceAmounts::new(
        to_field(quantity_str(requests, "cpu"), parse_cpu_millicores),
        to_field(quantity_str(requests, "memory"), parse_memory_bytes),
    );

    WorkloadUnit::new(name, amounts).with_claims(claim_refs(pod))
}

/// Usage of the primary container, matched by name with a fallback to the
/// first entry
fn usage_from_metrics(metrics: &PodMetrics, primary: Option<&str>) -> UsageSample {
    let container = primary
        .and_then(|name| metrics.containers.iter().find(|c| c.name == name))
        .or_else(|| metrics.containers.first());

    match container {
        Some(c) => UsageSample::new(
            metrics.name.clone(),
            ResourceAmounts::new(
                to_field(c.usage.get("cpu").map(String::as_str), parse_cpu_millicores),
                to_field(c.usage.get("memory").map(String::as_str), parse_memory_bytes),
            ),
        ),
        None => UsageSample::empty(metrics.name.clone()),
    }
}

fn claim_refs(pod: &Pod) -> Vec<String> {
    pod.spec
        .as_ref()
        .and_then(|spec| spec.volumes.as_ref())
        .map(|volumes| {
            volumes
                .iter()
                .filter_map(|v| v.persistent_volume_claim.as_ref())
                .map(|pvc| pvc.claim_name.clone())
                .collect()
        })
        .unwrap_or_default()
}

fn claim_from_pvc(pvc: &PersistentVolumeClaim) -> StorageClaim {
    let size = pvc
        .spec
        .as_ref()
        .and_then(|spec| spec.resources.as_ref())
        .and_then(|r| quantity_str(r.requests.as_ref(), "storage"))
        .map(str::to_string);

    StorageClaim::new(pvc.metadata.name.clone().unwrap_or_default(), size)
}
