//! Selection flow for one session: namespace, service, environment, ports.
//!
//! Each step depends only on the answers before it. Answers given on the
//! command line skip the matching prompt.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::gateway::ClusterGateway;
use crate::models::{EnvironmentTag, InstanceDescriptor, NamespaceChoice, ServiceIndex};
use crate::resolver::resolve;
use crate::utils;

/// Namespace argument as parsed by clap: `None` when `-n` is missing,
/// `Some(None)` for a bare `-n`.
pub type NamespaceArg = Option<Option<String>>;

pub trait Prompter {
    fn namespace(&mut self, choices: Vec<NamespaceChoice>) -> Result<NamespaceChoice>;
    fn service(&mut self, services: Vec<String>) -> Result<String>;
    fn environment(&mut self, service: &str, environments: Vec<EnvironmentTag>) -> Result<EnvironmentTag>;
    fn remote_port(&mut self, detected: Vec<u16>, fallback: u16) -> Result<u16>;
    fn local_port(&mut self, suggested: u16) -> Result<u16>;
    fn follow_logs(&mut self) -> Result<bool>;
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub namespace: NamespaceArg,
    pub service: Option<String>,
    pub environment: Option<EnvironmentTag>,
    pub local_port: Option<u16>,
    pub remote_port: Option<u16>,
    pub follow_logs: Option<bool>,
    /// Remote port used when the service ports can't be detected.
    pub default_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub service: String,
    pub environment: EnvironmentTag,
    pub instance: InstanceDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelPlan {
    pub target: Target,
    pub local_port: u16,
    pub remote_port: u16,
    pub follow_logs: bool,
}

/// Outcome of a selection. An empty index is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    Ready(T),
    NoServices(NamespaceChoice),
}

/// Resolves the namespace scope for a session.
pub async fn choose_namespace<G, P>(gateway: &G, prompter: &mut P, arg: &NamespaceArg) -> Result<NamespaceChoice>
where
    G: ClusterGateway,
    P: Prompter,
{
    match arg {
        Some(Some(ns)) => Ok(NamespaceChoice::Named(ns.clone())),
        Some(None) => Ok(NamespaceChoice::Named(gateway.default_namespace().to_string())),
        None => {
            let pb = utils::create_spinner("Fetching namespaces...");
            let namespaces = gateway.list_namespaces().await;
            pb.finish_and_clear();

            let mut choices = vec![NamespaceChoice::All];
            choices.extend(namespaces?.into_iter().map(NamespaceChoice::Named));
            prompter.namespace(choices)
        }
    }
}

/// Fetches and resolves the pods in `scope`.
pub async fn load_index<G: ClusterGateway>(gateway: &G, scope: &NamespaceChoice) -> Result<ServiceIndex> {
    let pb = utils::create_spinner("Fetching pods...");
    let listing = gateway.list_pods(scope.as_filter()).await;
    pb.finish_and_clear();

    let index = resolve(&listing?, scope.as_filter());
    debug!(%scope, services = index.len(), "resolved services");
    Ok(index)
}

/// Picks the service and environment, prompting for whatever wasn't given.
pub fn choose_target<P: Prompter>(index: &ServiceIndex, prompter: &mut P, options: &SessionOptions) -> Result<Target> {
    let service = match &options.service {
        Some(name) if index.contains(name) => name.clone(),
        Some(name) => return Err(Error::ServiceNotFound(name.clone())),
        None => prompter.service(index.services().map(str::to_string).collect())?,
    };

    let environment = match options.environment {
        Some(tag) => tag,
        None => {
            let environments = index.environments(&service);
            match environments.as_slice() {
                [only] => *only,
                _ => prompter.environment(&service, environments)?,
            }
        }
    };

    let instance = index
        .instance(&service, environment)
        .cloned()
        .ok_or_else(|| Error::InstanceNotFound {
            service: service.clone(),
            environment,
        })?;

    Ok(Target { service, environment, instance })
}

/// Namespace, service and environment: everything a log stream needs.
pub async fn select_target<G, P>(gateway: &G, prompter: &mut P, options: &SessionOptions) -> Result<Selection<Target>>
where
    G: ClusterGateway,
    P: Prompter,
{
    let scope = choose_namespace(gateway, prompter, &options.namespace).await?;
    let index = load_index(gateway, &scope).await?;
    if index.is_empty() {
        return Ok(Selection::NoServices(scope));
    }
    Ok(Selection::Ready(choose_target(&index, prompter, options)?))
}

/// The full tunnel flow: target, then ports, then whether to follow logs.
pub async fn plan_tunnel<G, P>(gateway: &G, prompter: &mut P, options: &SessionOptions) -> Result<Selection<TunnelPlan>>
where
    G: ClusterGateway,
    P: Prompter,
{
    let target = match select_target(gateway, prompter, options).await? {
        Selection::Ready(target) => target,
        Selection::NoServices(scope) => return Ok(Selection::NoServices(scope)),
    };

    let remote_port = match options.remote_port {
        Some(port) => port,
        None => {
            let detected = detect_ports(gateway, &target.instance).await;
            prompter.remote_port(detected, options.default_port)?
        }
    };
    let local_port = match options.local_port {
        Some(port) => port,
        None => prompter.local_port(remote_port)?,
    };
    let follow_logs = match options.follow_logs {
        Some(follow) => follow,
        None => prompter.follow_logs()?,
    };

    Ok(Selection::Ready(TunnelPlan {
        target,
        local_port,
        remote_port,
        follow_logs,
    }))
}

/// Ports of the backing service, or nothing when they can't be read.
async fn detect_ports<G: ClusterGateway>(gateway: &G, instance: &InstanceDescriptor) -> Vec<u16> {
    match gateway.service_ports(instance.namespace(), instance.service_name()).await {
        Ok(ports) => ports,
        Err(err) => {
            warn!(service = instance.service_name(), error = %err, "port detection failed, using default port");
            Vec::new()
        }
    }
}
