use std::process::ExitStatus;

use crate::models::EnvironmentTag;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load kubeconfig: {0}")]
    Config(#[from] kube::config::InferConfigError),

    #[error("cluster query failed: {0}")]
    Kube(#[from] kube::Error),

    #[error(transparent)]
    Prompt(#[from] inquire::InquireError),

    #[error("invalid log pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("no running service named '{0}'")]
    ServiceNotFound(String),

    #[error("service '{service}' has no running instance in environment '{environment}'")]
    InstanceNotFound {
        service: String,
        environment: EnvironmentTag,
    },

    #[error("failed to start '{program}': {source}")]
    TunnelSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("port-forward exited with {0}")]
    TunnelExited(ExitStatus),
}

impl Error {
    /// Ctrl-C or Esc inside a prompt.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Prompt(
                inquire::InquireError::OperationCanceled
                    | inquire::InquireError::OperationInterrupted
            )
        )
    }
}
