use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hearth_api::models::{
    ControlResponse, ExecutionResult, SensorMap, SensorsResponse, ValidatedCommand,
};
use serde_json::json;

use crate::errors::RelayError;
use crate::services::CommandExecutor;
use crate::services::device_store::DeviceStore;

/// Where the coordinator sends validated commands.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    async fn execute(&self, commands: &[ValidatedCommand]) -> Vec<ExecutionResult>;

    async fn sensors(&self) -> Result<SensorMap, RelayError>;
}

/// Runs commands against the in-process store.
pub struct LocalDeviceControl {
    executor: Arc<CommandExecutor>,
    store: Arc<DeviceStore>,
}

impl LocalDeviceControl {
    pub fn new(executor: Arc<CommandExecutor>, store: Arc<DeviceStore>) -> Self {
        Self { executor, store }
    }
}

#[async_trait]
impl DeviceControl for LocalDeviceControl {
    async fn execute(&self, commands: &[ValidatedCommand]) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            results.push(self.executor.execute(command).await);
        }
        results
    }

    async fn sensors(&self) -> Result<SensorMap, RelayError> {
        Ok(self.store.sensors().await)
    }
}

/// Relays commands to a remote device service over HTTP.
pub struct RemoteDeviceControl {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl RemoteDeviceControl {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RelayError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    async fn post_control(&self, commands: &[ValidatedCommand]) -> Result<Vec<ExecutionResult>, RelayError> {
        let body = json!({ "commands": commands });
        let request = self
            .client
            .post(format!("{}/control", self.endpoint))
            .json(&body)
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| RelayError::Timeout(self.timeout.as_secs()))??;
        if !response.status().is_success() {
            return Err(RelayError::Status(response.status()));
        }

        Ok(response.json::<ControlResponse>().await?.results)
    }
}

#[async_trait]
impl DeviceControl for RemoteDeviceControl {
    async fn execute(&self, commands: &[ValidatedCommand]) -> Vec<ExecutionResult> {
        if commands.is_empty() {
            return Vec::new();
        }

        match self.post_control(commands).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!("Relaying {} commands failed: {}", commands.len(), e);
                vec![ExecutionResult::error(e.to_string())]
            }
        }
    }

    async fn sensors(&self) -> Result<SensorMap, RelayError> {
        let request = self.client.get(format!("{}/sensors", self.endpoint)).send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| RelayError::Timeout(self.timeout.as_secs()))??;
        if !response.status().is_success() {
            return Err(RelayError::Status(response.status()));
        }

        Ok(response.json::<SensorsResponse>().await?.sensors)
    }
}

#[cfg(test)]
mod tests {
    use hearth_api::models::{DeviceCommand, FanAction, Room};

    use super::*;

    #[tokio::test]
    async fn test_unreachable_relay_becomes_one_error_entry() {
        let relay = RemoteDeviceControl::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let commands = [
            ValidatedCommand {
                location: Room::Study,
                command: DeviceCommand::Fan(FanAction::On),
            },
            ValidatedCommand {
                location: Room::Bedroom,
                command: DeviceCommand::Fan(FanAction::Off),
            },
        ];

        let results = relay.execute(&commands).await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].is_success());
        assert!(relay.sensors().await.is_err());
    }
}
