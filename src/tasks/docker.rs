use std::collections::HashMap;

use async_trait::async_trait;
use bollard::{
    Docker,
    container::{
        Config as ContainerConfig, CreateContainerOptions, InspectContainerOptions,
        ListContainersOptions, RemoveContainerOptions, RestartContainerOptions,
        StartContainerOptions, StopContainerOptions,
    },
    errors::Error as DockerError,
    image::{CreateImageOptions, ListImagesOptions},
    models::{ContainerStateStatusEnum, HostConfig, RestartPolicy, RestartPolicyNameEnum},
};
use futures_util::stream::StreamExt;
use tracing::{debug, error, info};

use super::runtime::Runtime;
use super::types::{Config, Inspection, PortBinding, PortMap, RuntimeError, RuntimeResult};

/// Docker-backed runtime. One client is shared by every task on a worker.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    client: Docker,
}

impl DockerRuntime {
    pub fn new() -> RuntimeResult<Self> {
        let client = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Connect(e.to_string()))?;
        Ok(DockerRuntime { client })
    }

    async fn image_exists(&self, image: &str) -> RuntimeResult<bool> {
        let images = self
            .client
            .list_images(Some(ListImagesOptions::<String> {
                all: false,
                ..Default::default()
            }))
            .await?;

        let latest = format!("{image}:latest");
        Ok(images
            .iter()
            .flat_map(|img| img.repo_tags.iter())
            .any(|tag| tag == image || *tag == latest))
    }

    async fn pull_image(&self, image: &str) -> RuntimeResult<()> {
        info!(image, "pulling image");

        let mut stream = self.client.create_image(
            Some(CreateImageOptions {
                from_image: image.to_string(),
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(msg) = stream.next().await {
            match msg {
                Ok(progress) => {
                    if let Some(status) = progress.status {
                        debug!(image, status = %status, "pull progress");
                    }
                }
                Err(e) => {
                    error!(image, error = %e, "image pull failed");
                    return Err(e.into());
                }
            }
        }

        info!(image, "image pulled");
        Ok(())
    }

    async fn find_container(&self, name: &str) -> RuntimeResult<Option<String>> {
        let containers = self
            .client
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                ..Default::default()
            }))
            .await?;

        let prefixed = format!("/{name}");
        Ok(containers.into_iter().find_map(|c| {
            let matches = c
                .names
                .unwrap_or_default()
                .iter()
                .any(|n| *n == prefixed || n == name);
            if matches { c.id } else { None }
        }))
    }

    fn container_config(config: &Config) -> ContainerConfig<String> {
        let restart_policy = RestartPolicy {
            name: Some(
                config
                    .restart_policy
                    .parse()
                    .unwrap_or(RestartPolicyNameEnum::NO),
            ),
            maximum_retry_count: None,
        };

        let host_config = HostConfig {
            restart_policy: Some(restart_policy),
            nano_cpus: Some((config.cpu * 1_000_000_000.0) as i64),
            memory: Some(config.memory),
            publish_all_ports: Some(true),
            ..Default::default()
        };

        ContainerConfig {
            image: Some(config.image.clone()),
            env: Some(config.env.clone()),
            tty: Some(false),
            exposed_ports: Some(
                config
                    .exposed_ports
                    .iter()
                    .map(|port| (port.clone(), HashMap::new()))
                    .collect(),
            ),
            host_config: Some(host_config),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Runtime for DockerRuntime {
    async fn run(&self, config: &Config) -> RuntimeResult<String> {
        if !self.image_exists(&config.image).await? {
            self.pull_image(&config.image).await?;
        }

        if let Some(id) = self.find_container(&config.name).await? {
            self.client
                .restart_container(&id, None::<RestartContainerOptions>)
                .await?;
            info!(container_id = %id, name = %config.name, "restarted existing container");
            return Ok(id);
        }

        let created = self
            .client
            .create_container(
                Some(CreateContainerOptions {
                    name: config.name.clone(),
                    platform: None,
                }),
                Self::container_config(config),
            )
            .await
            .inspect_err(|e| error!(image = %config.image, error = %e, "container create failed"))?;

        self.client
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
            .inspect_err(|e| error!(container_id = %created.id, error = %e, "container start failed"))?;

        info!(container_id = %created.id, name = %config.name, "container started");
        Ok(created.id)
    }

    async fn stop(&self, container_id: &str) -> RuntimeResult<()> {
        info!(container_id, "stopping container");
        self.client
            .stop_container(container_id, None::<StopContainerOptions>)
            .await?;
        self.client
            .remove_container(container_id, None::<RemoveContainerOptions>)
            .await?;
        info!(container_id, "container stopped and removed");
        Ok(())
    }

    async fn inspect(&self, container_id: &str) -> RuntimeResult<Option<Inspection>> {
        let response = match self
            .client
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await
        {
            Ok(response) => response,
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let status = response
            .state
            .and_then(|s| s.status)
            .unwrap_or(ContainerStateStatusEnum::EMPTY)
            .to_string();

        let host_ports: PortMap = response
            .network_settings
            .and_then(|n| n.ports)
            .unwrap_or_default()
            .into_iter()
            .map(|(port, bindings)| {
                let bindings = bindings
                    .unwrap_or_default()
                    .into_iter()
                    .map(|b| PortBinding {
                        host_ip: b.host_ip,
                        host_port: b.host_port,
                    })
                    .collect();
                (port, bindings)
            })
            .collect();

        Ok(Some(Inspection { status, host_ports }))
    }
}
