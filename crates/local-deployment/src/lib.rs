use std::sync::Arc;

use agents::AnthropicGenerator;
use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    call_log::CallLog,
    config::{Config, load_config_from_file, save_config_to_file},
    events::EventBroadcaster,
    generation::GenerationService,
    tracker::GenerationTracker,
};
use tokio::sync::RwLock;
use utils::assets::config_path;

#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<RwLock<Config>>,
    db: DBService,
    tracker: GenerationTracker,
    events: EventBroadcaster,
    generation: GenerationService,
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let raw_config = load_config_from_file(&config_path()).await;

        // Always save config so fields added since the last run land on disk
        save_config_to_file(&raw_config, &config_path()).await?;

        let db = DBService::new().await?;
        let tracker = GenerationTracker::new();
        let events = EventBroadcaster::new(raw_config.event_buffer_size);

        let generator = AnthropicGenerator::from_env(raw_config.model.clone())
            .with_recorder(Arc::new(CallLog::new(db.clone())));
        let generation = GenerationService::new(
            db.clone(),
            tracker.clone(),
            events.clone(),
            Arc::new(generator),
        );

        let config = Arc::new(RwLock::new(raw_config));

        Ok(Self {
            config,
            db,
            tracker,
            events,
            generation,
        })
    }

    fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn tracker(&self) -> &GenerationTracker {
        &self.tracker
    }

    fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    fn generation(&self) -> &GenerationService {
        &self.generation
    }
}
