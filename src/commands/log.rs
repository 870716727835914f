use crate::error::Result;
use crate::gateway::KubeGateway;
use crate::models::{InstanceDescriptor, LogMessage};
use crate::prompt::InquirePrompter;
use crate::session::{self, Selection, SessionOptions, Target};
use crate::utils;
use colored::*;
use futures::{AsyncBufReadExt, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client, api::LogParams};
use regex::Regex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const DEFAULT_CONTAINER_ANNOTATION: &str = "kubectl.kubernetes.io/default-container";

/// Include/exclude patterns applied to every log line.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl LogFilter {
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        Ok(Self {
            include: include.map(Regex::new).transpose()?,
            exclude: exclude.map(Regex::new).transpose()?,
        })
    }

    pub fn allows(&self, line: &str) -> bool {
        if self.exclude.as_ref().is_some_and(|re| re.is_match(line)) {
            return false;
        }
        self.include.as_ref().is_none_or(|re| re.is_match(line))
    }
}

pub async fn run(
    gateway: &KubeGateway,
    options: SessionOptions,
    filter: LogFilter,
    tail_lines: i64,
) -> Result<()> {
    let target = match session::select_target(gateway, &mut InquirePrompter, &options).await? {
        Selection::Ready(target) => target,
        Selection::NoServices(scope) => {
            utils::print_info(&format!("No running services found in {scope}"));
            return Ok(());
        }
    };

    println!("{} {}", "Following".green().bold(), target.instance);
    tokio::select! {
        res = stream(gateway.client(), target, filter, tail_lines) => res,
        _ = tokio::signal::ctrl_c() => Ok(()),
    }
}

/// Prints the target's log lines until the stream ends.
pub async fn stream(client: Client, target: Target, filter: LogFilter, tail_lines: i64) -> Result<()> {
    let (tx, rx) = mpsc::channel(100);
    let source = format!("{}/{}", target.service, target.environment);

    let tail = async move {
        if let Err(err) = tail_logs(client, &target.instance, source, tx, tail_lines).await {
            warn!(pod = %target.instance.pod_name(), error = %err, "log stream ended");
        }
    };

    println!("\n--- Streaming Logs ---\n");
    pump(tail, rx, &filter, |log| println!("{log}")).await;
    Ok(())
}

/// Runs the producer and the printer as one future, so dropping it also
/// drops the follow request.
async fn pump<T>(tail: T, mut rx: mpsc::Receiver<LogMessage>, filter: &LogFilter, mut emit: impl FnMut(&LogMessage))
where
    T: Future<Output = ()>,
{
    let print = async {
        while let Some(log) = rx.recv().await {
            if filter.allows(&log.message) {
                emit(&log);
            }
        }
    };
    tokio::join!(tail, print);
}

/// Container `kubectl logs` would pick: the default-container annotation,
/// else the first container in the spec.
fn default_container(pod: &Pod) -> Option<String> {
    pod.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(DEFAULT_CONTAINER_ANNOTATION).cloned())
        .or_else(|| pod.spec.as_ref()?.containers.first().map(|c| c.name.clone()))
}

async fn tail_logs(
    client: Client,
    instance: &InstanceDescriptor,
    source: String,
    tx: mpsc::Sender<LogMessage>,
    tail_lines: i64,
) -> Result<()> {
    let pods: Api<Pod> = Api::namespaced(client, instance.namespace());
    let pod_name = instance.pod_name();
    let container = default_container(&pods.get(&pod_name).await?);
    debug!(pod = %pod_name, ?container, "following logs");

    let lp = LogParams {
        follow: true,
        tail_lines: Some(tail_lines),
        container,
        ..LogParams::default()
    };

    let log_stream = pods.log_stream(&pod_name, &lp).await?;
    let mut lines = log_stream.lines();

    while let Some(line_result) = lines.next().await {
        if let Ok(line) = line_result {
            let msg = LogMessage {
                source: source.clone(),
                message: line,
            };
            if tx.send(msg).await.is_err() {
                break;
            }
        }
    }
    Ok(())
}
