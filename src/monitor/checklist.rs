//! Checklist generator
//!
//! Builds a pre-task checklist from the latest cycle plus static PPE and crew
//! requirements. Items are created uncompleted; only `complete_item` on the
//! checklist changes them.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::models::*;
use crate::config::{ChecklistConfig, TaskComplexity};

pub struct ChecklistGenerator {
    ppe: Vec<String>,
    complexity: TaskComplexity,
}

impl ChecklistGenerator {
    pub fn new(config: &ChecklistConfig, complexity: TaskComplexity) -> Self {
        Self {
            ppe: config.ppe.clone(),
            complexity,
        }
    }

    pub fn generate(&self, cycle: Option<&RiskAssessmentCycle>, now: DateTime<Utc>) -> SafetyChecklist {
        let mut items = vec![ChecklistItem::required(
            ChecklistCategory::Briefing,
            "Pre-job safety briefing with all crew members",
        )];

        items.extend(
            self.ppe
                .iter()
                .map(|p| ChecklistItem::required(ChecklistCategory::Ppe, format!("Verify PPE: {}", p))),
        );

        items.push(ChecklistItem::required(
            ChecklistCategory::Communication,
            "Test radios and communication equipment",
        ));

        if let Some(cycle) = cycle {
            items.extend(self.condition_items(cycle));
        }

        if self.complexity.is_elevated() {
            items.push(ChecklistItem::required(
                ChecklistCategory::Emergency,
                "Review emergency response plan and rescue assignments",
            ));
        }

        SafetyChecklist {
            id: uuid::Uuid::new_v4().to_string(),
            items,
            created_at: now,
            completed: false,
            cycle_id: cycle.map(|c| c.id.clone()),
        }
    }

    fn condition_items(&self, cycle: &RiskAssessmentCycle) -> Vec<ChecklistItem> {
        let mut items = Vec::new();
        let hazards: HashSet<Hazard> = cycle.factors.iter().map(|f| f.hazard).collect();

        // One item per weather hazard, in a fixed order
        for hazard in [
            Hazard::HighWind,
            Hazard::Precipitation,
            Hazard::HeatStress,
            Hazard::ColdStress,
            Hazard::Lightning,
        ] {
            if hazards.contains(&hazard) {
                if let Some(text) = weather_gear(hazard) {
                    items.push(ChecklistItem::required(ChecklistCategory::Weather, text));
                }
            }
        }

        for (_, name) in cycle.snapshot.engaged_equipment() {
            items.push(ChecklistItem::required(
                ChecklistCategory::Equipment,
                format!("Inspect {} before operation", name),
            ));
        }

        if hazards.contains(&Hazard::PowerLine) {
            items.push(ChecklistItem::required(
                ChecklistCategory::Hazard,
                "Utility coordination and line clearance confirmed",
            ));
            items.push(ChecklistItem::required(
                ChecklistCategory::Hazard,
                "Electrical hazard training verified for all crew",
            ));
        }

        if hazards.contains(&Hazard::Residential) {
            items.push(ChecklistItem::required(
                ChecklistCategory::Hazard,
                "Exclusion zone established and property protection in place",
            ));
        }

        items
    }
}

fn weather_gear(hazard: Hazard) -> Option<&'static str> {
    match hazard {
        Hazard::HighWind => Some("Secure loose gear and fasten helmet chin straps"),
        Hazard::Precipitation => Some("Non-slip footwear and rain gear for all crew"),
        Hazard::HeatStress => Some("Water, electrolytes and shaded cooling area on site"),
        Hazard::ColdStress => Some("Insulated layers and warm-up shelter available"),
        Hazard::Lightning => Some("Shelter identified and aerial work suspended"),
        _ => None,
    }
}
