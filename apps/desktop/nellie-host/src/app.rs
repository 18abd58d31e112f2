//! Startup and shutdown of the bridge host process.

use crate::connection_info::ConnectionInfo;
use crate::error::NellieHostError;
use crate::paths::HostPaths;

use bridge_core::config::BridgeConfig;
use bridge_core::host::{
    BridgeHostHandle, CreatorEvent, Credentials, HostRouter, HostState, PlanGenerator,
    SubmissionCache, UnconfiguredPlanGenerator, start_bridge_host,
};

use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Load `bridge.json` and apply environment overrides.
///
/// A corrupt or invalid file is logged and replaced by defaults so a bad edit
/// never keeps the editor's webviews offline; a bad environment override is
/// reported as an error.
pub fn load_config(paths: &HostPaths) -> Result<BridgeConfig, NellieHostError> {
    let mut config = match BridgeConfig::load(&paths.config_dir) {
        Ok(config) => config,
        Err(e) => {
            warn!("Using default bridge config: {e}");
            BridgeConfig::default()
        }
    };

    config.apply_env_overrides()?;
    Ok(config)
}

/// A running host plus the task draining its creator events.
pub struct NellieHost {
    handle: BridgeHostHandle,
    router: HostRouter,
    events_task: JoinHandle<()>,
    paths: HostPaths,
}

impl NellieHost {
    /// Start with the built-in plan generator and credentials from the environment.
    pub async fn start(paths: HostPaths, config: &BridgeConfig) -> Result<Self, NellieHostError> {
        Self::start_with(paths, config, Arc::new(UnconfiguredPlanGenerator), Credentials::from_env()).await
    }

    pub async fn start_with(
        paths: HostPaths,
        config: &BridgeConfig,
        planner: Arc<dyn PlanGenerator>,
        credentials: Credentials,
    ) -> Result<Self, NellieHostError> {
        paths.ensure()?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let router = HostRouter::new(
            config,
            HostState::with_credentials(credentials),
            planner,
            events_tx,
            SubmissionCache::new(&paths.data_dir),
        );

        let handle = start_bridge_host(config, router.clone()).await?;
        let events_task = tokio::spawn(log_creator_events(events_rx));

        let info = ConnectionInfo::from_handle(&handle);
        let written = info.write(&paths.data_dir)?;
        info!("Connection info written to {}", written.display());

        // A submission cached before the workspace swap restarted us
        match router.creator().replay_cached_submission(true).await {
            Ok(true) => info!("Replayed cached creator submission"),
            Ok(false) => {}
            Err(e) => warn!("Could not replay cached creator submission: {e}"),
        }

        Ok(Self {
            handle,
            router,
            events_task,
            paths,
        })
    }

    pub fn handle(&self) -> &BridgeHostHandle {
        &self.handle
    }

    pub fn router(&self) -> &HostRouter {
        &self.router
    }

    pub fn paths(&self) -> &HostPaths {
        &self.paths
    }

    pub async fn shutdown(self) {
        info!("Shutting down bridge host on port {}", self.handle.port());
        self.handle.shutdown().await;
        // Router holds the last event sender; dropping it ends the drain task
        drop(self.router);
        if let Err(e) = self.events_task.await {
            error!("Creator event task failed: {e}");
        }
        ConnectionInfo::remove(&self.paths.data_dir);
    }
}

async fn log_creator_events(mut events: mpsc::UnboundedReceiver<CreatorEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            CreatorEvent::ExecutePlan(request) => {
                info!("Execute plan requested ({} chars)", request.plan.len());
            }
            CreatorEvent::ReplaceWorkspaceFolder { path } => {
                info!("Workspace folder replaced with {}", path.display());
            }
            CreatorEvent::StateChanged(state) => {
                info!("Creator mode is now {state:?}");
            }
        }
    }
}
