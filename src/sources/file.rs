//! File-backed site conditions
//!
//! The daemon's default collaborator: a JSON `SiteConditions` document that
//! field tooling rewrites as readings arrive. It is re-read on every call so
//! each cycle sees the latest file contents.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::trace;

use super::*;

pub struct ConditionsFile {
    path: PathBuf,
}

impl ConditionsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<SiteConditions, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::Unavailable(format!("{} not found", self.path.display()))
            } else {
                SourceError::Io(e.to_string())
            }
        })?;

        let conditions: SiteConditions = serde_json::from_str(&content)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        trace!(path = %self.path.display(), "Loaded site conditions");
        Ok(conditions)
    }
}

#[async_trait]
impl WeatherSource for ConditionsFile {
    async fn current(&self) -> Result<Option<WeatherSnapshot>, SourceError> {
        Ok(self.load().await?.weather)
    }
}

#[async_trait]
impl EquipmentTracker for ConditionsFile {
    async fn status(&self) -> Result<EquipmentStatus, SourceError> {
        Ok(self.load().await?.equipment.unwrap_or_default())
    }
}

#[async_trait]
impl LocationSource for ConditionsFile {
    async fn current_position(&self) -> Result<Option<Coordinates>, SourceError> {
        Ok(self.load().await?.position)
    }
}

#[async_trait]
impl CrewRoster for ConditionsFile {
    async fn crew(&self) -> Result<Option<Vec<CrewMember>>, SourceError> {
        Ok(self.load().await?.crew)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_conditions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conditions.json");
        std::fs::write(
            &path,
            r#"{
                "weather": {"temperature_f": 72.0, "wind_speed_mph": 38.0, "precipitation_in": 0.0, "condition": "Windy"},
                "position": {"latitude": 45.5, "longitude": -122.6},
                "crew": [
                    {"id": "c1", "name": "Dana", "role": "climber", "certifications": ["tree_climbing"], "years_experience": 4}
                ]
            }"#,
        )
        .unwrap();

        let source = ConditionsFile::new(&path);

        let weather = WeatherSource::current(&source).await.unwrap().unwrap();
        assert_eq!(weather.wind_speed_mph, 38.0);

        let crew = source.crew().await.unwrap().unwrap();
        assert_eq!(crew.len(), 1);
        assert!(crew[0].active);

        assert!(source.status().await.unwrap().is_empty());
        assert_eq!(
            source.current_position().await.unwrap(),
            Some(Coordinates::new(45.5, -122.6))
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let source = ConditionsFile::new("/nonexistent/conditions.json");
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conditions.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = ConditionsFile::new(&path).load().await.unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }
}
