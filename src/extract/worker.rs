//! Isolated extraction worker invocation
//!
//! The worker is an untrusted container: it sees only the staging directory,
//! mounted read-write at `/data`, and the three positional arguments.

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::service::HostConfig;
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::report::CONTAINER_MOUNT;

/// Everything the worker needs for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInvocation {
    pub image: String,
    /// Host staging directory, bound at `/data`
    pub staging_dir: PathBuf,
    /// Path of the target as seen inside the container
    pub target: String,
    pub max_extracted_files: u32,
    pub max_automatic_analyses: u32,
    pub timeout: Duration,
}

impl WorkerInvocation {
    /// Positional arguments: target, file ceiling, analysis ceiling
    pub fn args(&self) -> Vec<String> {
        vec![
            self.target.clone(),
            self.max_extracted_files.to_string(),
            self.max_automatic_analyses.to_string(),
        ]
    }

    pub fn bind(&self) -> String {
        format!("{}:{}:rw", self.staging_dir.display(), CONTAINER_MOUNT)
    }
}

/// Ways a worker run can fail; diagnostics are already decoded text
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkerError {
    /// The worker ran and exited with an error
    #[error("{diagnostic}")]
    Exited { exit_code: i64, diagnostic: String },

    /// The container backend could not run the worker
    #[error("{explanation}")]
    Backend { explanation: String },

    #[error("extraction worker timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
}

impl WorkerError {
    pub fn exited(exit_code: i64, diagnostic: &[u8]) -> Self {
        WorkerError::Exited {
            exit_code,
            diagnostic: String::from_utf8_lossy(diagnostic).into_owned(),
        }
    }

    pub fn backend(explanation: &[u8]) -> Self {
        WorkerError::Backend {
            explanation: String::from_utf8_lossy(explanation).into_owned(),
        }
    }
}

impl From<DockerError> for WorkerError {
    fn from(err: DockerError) -> Self {
        match err {
            DockerError::DockerResponseServerError { message, .. } => {
                WorkerError::Backend { explanation: message }
            }
            other => WorkerError::Backend {
                explanation: other.to_string(),
            },
        }
    }
}

#[async_trait]
pub trait ExtractionWorker: Send + Sync {
    /// Runs the worker to completion and returns its raw combined output
    async fn run(&self, invocation: &WorkerInvocation) -> Result<Vec<u8>, WorkerError>;

    fn name(&self) -> &str;
}

/// Runs the worker image through the local Docker daemon
pub struct DockerWorker {
    docker: Docker,
}

#[derive(Default)]
struct CapturedLogs {
    combined: Vec<u8>,
    stderr: Vec<u8>,
}

impl DockerWorker {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    async fn create(&self, invocation: &WorkerInvocation) -> Result<String, WorkerError> {
        let name = format!("crackbox-extract-{}", uuid::Uuid::new_v4().simple());
        let config = Config {
            image: Some(invocation.image.clone()),
            cmd: Some(invocation.args()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            network_disabled: Some(true),
            host_config: Some(HostConfig {
                binds: Some(vec![invocation.bind()]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: name.as_str(),
            platform: None,
        };
        let created = match self
            .docker
            .create_container(Some(options.clone()), config.clone())
            .await
        {
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                self.pull(&invocation.image).await?;
                self.docker.create_container(Some(options), config).await?
            }
            other => other?,
        };
        for warning in &created.warnings {
            warn!(container = %name, "Docker: {}", warning);
        }
        Ok(created.id)
    }

    async fn pull(&self, image: &str) -> Result<(), WorkerError> {
        info!(image, "Worker image not present locally, pulling");
        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };
        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(progress) = stream.next().await {
            let progress = progress?;
            if let Some(status) = progress.status {
                debug!(image, "{}", status);
            }
        }
        Ok(())
    }

    /// Waits for exit; returns the exit code and the daemon's wait error, if any
    async fn wait(&self, id: &str) -> Result<(i64, Option<String>), WorkerError> {
        let mut stream = self
            .docker
            .wait_container(id, None::<WaitContainerOptions<String>>);

        match stream.next().await {
            Some(Ok(response)) => Ok((
                response.status_code,
                response.error.and_then(|e| e.message),
            )),
            Some(Err(DockerError::DockerContainerWaitError { error, code })) => {
                Ok((code, Some(error).filter(|e| !e.is_empty())))
            }
            Some(Err(e)) => Err(e.into()),
            None => Err(WorkerError::Backend {
                explanation: "container wait stream ended without a status".to_string(),
            }),
        }
    }

    async fn logs(&self, id: &str) -> Result<CapturedLogs, WorkerError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            ..Default::default()
        };

        let mut captured = CapturedLogs::default();
        let mut stream = self.docker.logs(id, Some(options));
        while let Some(chunk) = stream.next().await {
            match chunk? {
                LogOutput::StdErr { message } => {
                    captured.stderr.extend_from_slice(&message);
                    captured.combined.extend_from_slice(&message);
                }
                other => captured.combined.extend_from_slice(&other.into_bytes()),
            }
        }
        Ok(captured)
    }

    async fn remove(&self, id: &str) {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };
        if let Err(e) = self.docker.remove_container(id, Some(options)).await {
            warn!(container = id, "Failed to remove worker container: {}", e);
        }
    }

    async fn run_created(
        &self,
        id: &str,
        invocation: &WorkerInvocation,
    ) -> Result<Vec<u8>, WorkerError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        debug!(container = id, "Worker started");

        let (exit_code, wait_error) = tokio::time::timeout(invocation.timeout, self.wait(id))
            .await
            .map_err(|_| WorkerError::Timeout {
                seconds: invocation.timeout.as_secs(),
            })??;

        let logs = self.logs(id).await?;
        if exit_code != 0 {
            let diagnostic = if logs.stderr.is_empty() {
                wait_error
                    .map(String::into_bytes)
                    .unwrap_or_else(|| format!("worker exited with status {}", exit_code).into_bytes())
            } else {
                logs.stderr
            };
            return Err(WorkerError::exited(exit_code, &diagnostic));
        }

        Ok(logs.combined)
    }
}

#[async_trait]
impl ExtractionWorker for DockerWorker {
    async fn run(&self, invocation: &WorkerInvocation) -> Result<Vec<u8>, WorkerError> {
        info!(
            image = %invocation.image,
            target = %invocation.target,
            "Running extraction worker"
        );

        let id = self.create(invocation).await?;
        let outcome = self.run_created(&id, invocation).await;
        self.remove(&id).await;
        outcome
    }

    fn name(&self) -> &str {
        "docker"
    }
}
