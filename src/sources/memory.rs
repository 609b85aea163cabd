//! In-memory sources
//!
//! `MemorySource` serves every collaborator trait from one mutable
//! `SiteConditions`; hosts that already hold the data in process feed it here.
//! `WeatherFeed` is a push-based weather source.

use async_trait::async_trait;
use tokio::sync::{watch, RwLock};

use super::*;

/// Collaborator adapter backed by an in-process `SiteConditions`
#[derive(Default)]
pub struct MemorySource {
    conditions: RwLock<SiteConditions>,
}

impl MemorySource {
    pub fn new(conditions: SiteConditions) -> Self {
        Self {
            conditions: RwLock::new(conditions),
        }
    }

    /// Replace the whole picture
    pub async fn set(&self, conditions: SiteConditions) {
        *self.conditions.write().await = conditions;
    }

    /// Modify part of the picture in place
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut SiteConditions),
    {
        let mut conditions = self.conditions.write().await;
        f(&mut conditions);
    }

    pub async fn snapshot(&self) -> SiteConditions {
        self.conditions.read().await.clone()
    }
}

#[async_trait]
impl WeatherSource for MemorySource {
    async fn current(&self) -> Result<Option<WeatherSnapshot>, SourceError> {
        Ok(self.conditions.read().await.weather.clone())
    }
}

#[async_trait]
impl EquipmentTracker for MemorySource {
    async fn status(&self) -> Result<EquipmentStatus, SourceError> {
        Ok(self
            .conditions
            .read()
            .await
            .equipment
            .clone()
            .unwrap_or_default())
    }
}

#[async_trait]
impl LocationSource for MemorySource {
    async fn current_position(&self) -> Result<Option<Coordinates>, SourceError> {
        Ok(self.conditions.read().await.position)
    }
}

#[async_trait]
impl CrewRoster for MemorySource {
    async fn crew(&self) -> Result<Option<Vec<CrewMember>>, SourceError> {
        Ok(self.conditions.read().await.crew.clone())
    }
}

/// Push-based weather source. Every `publish` wakes subscribers so the
/// monitor can re-run its cycle.
pub struct WeatherFeed {
    tx: watch::Sender<Option<WeatherSnapshot>>,
}

impl WeatherFeed {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn publish(&self, snapshot: WeatherSnapshot) {
        self.tx.send_replace(Some(snapshot));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

impl Default for WeatherFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WeatherSource for WeatherFeed {
    async fn current(&self) -> Result<Option<WeatherSnapshot>, SourceError> {
        Ok(self.tx.borrow().clone())
    }

    fn changes(&self) -> Option<watch::Receiver<Option<WeatherSnapshot>>> {
        Some(self.tx.subscribe())
    }
}
