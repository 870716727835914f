use k8s_openapi::api::core::v1::{Namespace, Pod, Service, ServicePort};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{Api, Client, api::ListParams, config::Config};
use tracing::debug;

use crate::error::Result;

/// Read-only cluster queries a session depends on.
#[allow(async_fn_in_trait)]
pub trait ClusterGateway {
    /// Namespace of the current kube context.
    fn default_namespace(&self) -> &str;

    async fn list_namespaces(&self) -> Result<Vec<String>>;

    /// Pod listing text in `kubectl get pods` layout. Cluster-wide listings
    /// (`namespace == None`) carry a `NAMESPACE` column.
    async fn list_pods(&self, namespace: Option<&str>) -> Result<String>;

    async fn service_ports(&self, namespace: &str, service: &str) -> Result<Vec<u16>>;
}

pub struct KubeGateway {
    client: Client,
    default_namespace: String,
}

impl KubeGateway {
    pub async fn connect() -> Result<Self> {
        let config = Config::infer().await?;
        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config)?;
        Ok(Self { client, default_namespace })
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }
}

impl ClusterGateway for KubeGateway {
    fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        debug!(count = list.items.len(), "listed namespaces");
        Ok(list.items.into_iter().filter_map(|n| n.metadata.name).collect())
    }

    async fn list_pods(&self, namespace: Option<&str>) -> Result<String> {
        let api: Api<Pod> = match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        let list = api.list(&ListParams::default()).await?;
        debug!(namespace, count = list.items.len(), "listed pods");
        Ok(render_listing(&list.items, namespace.is_none()))
    }

    async fn service_ports(&self, namespace: &str, service: &str) -> Result<Vec<u16>> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let svc = api.get(service).await?;
        let ports = svc
            .spec
            .and_then(|s| s.ports)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| pod_port(&p))
            .collect::<Vec<_>>();
        debug!(namespace, service, ?ports, "detected service ports");
        Ok(ports)
    }
}

/// Port the pod listens on for a service port: a numeric `targetPort`,
/// else the service `port` (named target ports can't be resolved here).
fn pod_port(port: &ServicePort) -> Option<u16> {
    match &port.target_port {
        Some(IntOrString::Int(target)) => u16::try_from(*target).ok(),
        _ => u16::try_from(port.port).ok(),
    }
}

/// Formats pods the way `kubectl get pods` lays out its default columns.
pub fn render_listing(pods: &[Pod], with_namespace: bool) -> String {
    let mut out = String::new();
    out.push_str(if with_namespace { "NAMESPACE NAME STATUS\n" } else { "NAME STATUS\n" });

    for pod in pods {
        let Some(name) = pod.metadata.name.as_deref() else {
            continue;
        };
        if with_namespace {
            out.push_str(pod.metadata.namespace.as_deref().unwrap_or("<none>"));
            out.push(' ');
        }
        out.push_str(name);
        out.push(' ');
        out.push_str(&pod_status(pod));
        out.push('\n');
    }
    out
}

/// Status column value: deletion, then a waiting container's reason, then
/// the pod-level reason or phase.
fn pod_status(pod: &Pod) -> String {
    if pod.metadata.deletion_timestamp.is_some() {
        return "Terminating".to_string();
    }
    let status = pod.status.as_ref();
    let waiting = status
        .and_then(|s| s.container_statuses.as_ref())
        .and_then(|cs| {
            cs.iter()
                .find_map(|c| c.state.as_ref()?.waiting.as_ref()?.reason.clone())
        });

    waiting
        .or_else(|| status.and_then(|s| s.reason.clone()))
        .or_else(|| status.and_then(|s| s.phase.clone()))
        .unwrap_or_else(|| "Unknown".to_string())
}
