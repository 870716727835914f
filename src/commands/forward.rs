use colored::*;
use tracing::info;

use crate::commands::log::{self, LogFilter};
use crate::error::{Error, Result};
use crate::gateway::KubeGateway;
use crate::prompt::{self, InquirePrompter};
use crate::session::{self, Selection, SessionOptions, TunnelPlan};
use crate::tunnel::TunnelCommand;
use crate::utils;

pub struct ForwardArgs {
    pub options: SessionOptions,
    pub filter: LogFilter,
    pub tail_lines: i64,
    pub kubectl: String,
    pub once: bool,
}

/// Runs sessions until the user declines another one. A failed session
/// is reported and does not end the loop.
pub async fn run(gateway: &KubeGateway, args: ForwardArgs) -> Result<()> {
    loop {
        match run_session(gateway, &args).await {
            Ok(()) => {}
            Err(err) if err.is_cancelled() => return Ok(()),
            Err(err) => utils::print_error(&err.to_string()),
        }
        if args.once {
            return Ok(());
        }
        match prompt::another_session() {
            Ok(true) => continue,
            Ok(false) => return Ok(()),
            Err(err) if err.is_cancelled() => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

async fn run_session(gateway: &KubeGateway, args: &ForwardArgs) -> Result<()> {
    let plan = match session::plan_tunnel(gateway, &mut InquirePrompter, &args.options).await? {
        Selection::Ready(plan) => plan,
        Selection::NoServices(scope) => {
            utils::print_info(&format!("No running services found in {scope}"));
            return Ok(());
        }
    };
    open_tunnel(gateway, args, plan).await
}

async fn open_tunnel(gateway: &KubeGateway, args: &ForwardArgs, plan: TunnelPlan) -> Result<()> {
    let cmd = TunnelCommand::new(&args.kubectl, &plan.target.instance, plan.local_port, plan.remote_port);
    println!(
        "{} {} {} via {} -> localhost:{}",
        "Forwarding".green().bold(),
        plan.target.service.bold(),
        format!("({})", plan.target.environment).dimmed(),
        plan.target.instance,
        plan.local_port
    );
    println!("{}", cmd.command_line().dimmed());

    let mut child = cmd.spawn()?;
    let logs = plan.follow_logs.then(|| {
        tokio::spawn(log::stream(
            gateway.client(),
            plan.target.clone(),
            args.filter.clone(),
            args.tail_lines,
        ))
    });

    let result = tokio::select! {
        status = child.wait() => match status? {
            status if status.success() => Ok(()),
            status => Err(Error::TunnelExited(status)),
        },
        _ = tokio::signal::ctrl_c() => {
            info!(pod = %plan.target.instance.pod_name(), "stopping tunnel");
            Ok(())
        }
    };

    if let Some(handle) = logs {
        handle.abort();
    }
    // already exited when the select finished on wait()
    let _ = child.kill().await;
    result
}
