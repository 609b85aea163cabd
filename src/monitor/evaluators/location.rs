//! Location evaluator
//!
//! Classifies the crew position against geospatial reference data. Each
//! lookup is independent; one that errors is skipped, as is every check when
//! no reference data is configured.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::RiskEvaluator;
use crate::error::SourceError;
use crate::monitor::models::{Hazard, RiskFactor, RiskType, Severity};
use crate::sources::{Coordinates, GeoReference, LocationSource};

/// Position plus the outcome of each reference lookup. `None` means the
/// lookup was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationContext {
    pub coordinates: Coordinates,
    pub near_power_line: Option<bool>,
    pub high_traffic: Option<bool>,
    pub residential: Option<bool>,
}

impl LocationContext {
    pub fn unclassified(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            near_power_line: None,
            high_traffic: None,
            residential: None,
        }
    }
}

pub struct LocationEvaluator {
    source: Arc<dyn LocationSource>,
    geo: Option<Arc<dyn GeoReference>>,
}

impl LocationEvaluator {
    pub fn new(source: Arc<dyn LocationSource>, geo: Option<Arc<dyn GeoReference>>) -> Self {
        Self { source, geo }
    }

    async fn classify(geo: &dyn GeoReference, at: Coordinates) -> LocationContext {
        let (power, traffic, residential) = tokio::join!(
            geo.near_power_lines(at),
            geo.is_high_traffic(at),
            geo.is_residential(at),
        );

        LocationContext {
            coordinates: at,
            near_power_line: skip_on_error("power_line", power),
            high_traffic: skip_on_error("traffic", traffic),
            residential: skip_on_error("residential", residential),
        }
    }
}

fn skip_on_error(check: &'static str, result: Result<bool, SourceError>) -> Option<bool> {
    match result {
        Ok(hit) => Some(hit),
        Err(e) => {
            debug!(check, error = %e, "Geo reference lookup unavailable, skipping check");
            None
        }
    }
}

#[async_trait]
impl RiskEvaluator for LocationEvaluator {
    type Input = LocationContext;

    fn name(&self) -> &'static str {
        "location"
    }

    async fn fetch(&self) -> Result<Option<LocationContext>, SourceError> {
        let Some(at) = self.source.current_position().await? else {
            return Ok(None);
        };

        Ok(Some(match &self.geo {
            Some(geo) => Self::classify(geo.as_ref(), at).await,
            None => LocationContext::unclassified(at),
        }))
    }

    fn evaluate(&self, ctx: &LocationContext) -> Vec<RiskFactor> {
        let mut factors = Vec::new();

        if ctx.near_power_line == Some(true) {
            factors.push(RiskFactor::new(
                RiskType::Location,
                Hazard::PowerLine,
                Severity::Critical,
                9.5,
                "Power lines within clearance distance of the work area",
                "Maintain minimum approach distance and coordinate with the utility",
            ));
        }

        if ctx.high_traffic == Some(true) {
            factors.push(RiskFactor::new(
                RiskType::Location,
                Hazard::Traffic,
                Severity::High,
                6.0,
                "Work area in a high-traffic zone",
                "Set up traffic control and a flagger before work starts",
            ));
        }

        if ctx.residential == Some(true) {
            factors.push(RiskFactor::new(
                RiskType::Location,
                Hazard::Residential,
                Severity::Medium,
                4.0,
                "Residential property adjacent to the work area",
                "Establish an exclusion zone and protect nearby structures",
            ));
        }

        factors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::geo::{PowerLine, Zone};
    use crate::sources::{MemorySource, SiteConditions, StaticGeoReference};

    struct BrokenGeo;

    #[async_trait]
    impl GeoReference for BrokenGeo {
        async fn near_power_lines(&self, _at: Coordinates) -> Result<bool, SourceError> {
            Err(SourceError::Unavailable("gis offline".into()))
        }
        async fn is_high_traffic(&self, _at: Coordinates) -> Result<bool, SourceError> {
            Ok(true)
        }
        async fn is_residential(&self, _at: Coordinates) -> Result<bool, SourceError> {
            Err(SourceError::Unavailable("gis offline".into()))
        }
    }

    fn site() -> Coordinates {
        Coordinates::new(45.5, -122.6)
    }

    fn source_at(at: Coordinates) -> Arc<MemorySource> {
        Arc::new(MemorySource::new(SiteConditions {
            position: Some(at),
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn test_all_classifications() {
        let geo = StaticGeoReference::new(15.0)
            .with_power_line(PowerLine {
                name: "feeder".into(),
                points: vec![Coordinates::new(45.4999, -122.6), Coordinates::new(45.5001, -122.6)],
            })
            .with_traffic_zone(Zone {
                name: "arterial".into(),
                center: site(),
                radius_m: 100.0,
            })
            .with_residential_zone(Zone {
                name: "subdivision".into(),
                center: site(),
                radius_m: 200.0,
            });
        let eval = LocationEvaluator::new(source_at(site()), Some(Arc::new(geo)));

        let ctx = eval.fetch().await.unwrap().unwrap();
        let factors = eval.evaluate(&ctx);
        let scores: Vec<_> = factors.iter().map(|f| (f.hazard, f.score)).collect();
        assert_eq!(
            scores,
            vec![
                (Hazard::PowerLine, 9.5),
                (Hazard::Traffic, 6.0),
                (Hazard::Residential, 4.0)
            ]
        );
    }

    #[tokio::test]
    async fn test_no_position_is_no_input() {
        let eval = LocationEvaluator::new(Arc::new(MemorySource::default()), None);
        assert!(eval.fetch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_without_reference_data_checks_are_skipped() {
        let eval = LocationEvaluator::new(source_at(site()), None);
        let ctx = eval.fetch().await.unwrap().unwrap();
        assert_eq!(ctx, LocationContext::unclassified(site()));
        assert!(eval.evaluate(&ctx).is_empty());
    }

    #[tokio::test]
    async fn test_failed_lookup_skipped_not_failed() {
        let eval = LocationEvaluator::new(source_at(site()), Some(Arc::new(BrokenGeo)));
        let ctx = eval.fetch().await.unwrap().unwrap();
        assert_eq!(ctx.near_power_line, None);
        assert_eq!(ctx.high_traffic, Some(true));

        let factors = eval.evaluate(&ctx);
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].hazard, Hazard::Traffic);
    }
}
