use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::InstanceDescriptor;

/// `kubectl port-forward` against a single instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelCommand {
    program: String,
    namespace: String,
    pod: String,
    local_port: u16,
    remote_port: u16,
}

impl TunnelCommand {
    pub fn new(program: impl Into<String>, instance: &InstanceDescriptor, local_port: u16, remote_port: u16) -> Self {
        Self {
            program: program.into(),
            namespace: instance.namespace().to_string(),
            pod: instance.pod_name(),
            local_port,
            remote_port,
        }
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            "port-forward".to_string(),
            "--namespace".to_string(),
            self.namespace.clone(),
            self.pod.clone(),
            format!("{}:{}", self.local_port, self.remote_port),
        ]
    }

    /// Shell-quoted command line for display.
    pub fn command_line(&self) -> String {
        let args = self.args();
        let words = std::iter::once(self.program.as_str()).chain(args.iter().map(String::as_str));
        shlex::try_join(words).unwrap_or_else(|_| format!("{} {}", self.program, args.join(" ")))
    }

    /// Starts the forward. The child is killed when dropped.
    pub fn spawn(&self) -> Result<Child> {
        info!(command = %self.command_line(), "starting tunnel");
        Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::TunnelSpawn {
                program: self.program.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_address_pod_by_full_name() {
        let instance = InstanceDescriptor::new("abc12-99zz", "payments", "dev-billing");
        let cmd = TunnelCommand::new("kubectl", &instance, 18080, 8080);

        assert_eq!(
            cmd.args(),
            ["port-forward", "--namespace", "payments", "dev-billing-abc12-99zz", "18080:8080"]
        );
        assert_eq!(
            shlex::split(&cmd.command_line()).unwrap(),
            ["kubectl", "port-forward", "--namespace", "payments", "dev-billing-abc12-99zz", "18080:8080"]
        );
    }

    #[test]
    fn command_line_quotes_program_path() {
        let instance = InstanceDescriptor::new("1a-2b", "shop", "cart");
        let cmd = TunnelCommand::new("/opt/kube tools/kubectl", &instance, 80, 80);

        let words = shlex::split(&cmd.command_line()).unwrap();
        assert_eq!(words[0], "/opt/kube tools/kubectl");
        assert_eq!(words.len(), 6);
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let instance = InstanceDescriptor::new("1a-2b", "shop", "cart");
        let cmd = TunnelCommand::new("kport-no-such-binary", &instance, 80, 80);

        assert!(matches!(cmd.spawn(), Err(Error::TunnelSpawn { .. })));
    }
}
