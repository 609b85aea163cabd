//! Personnel evaluator
//!
//! Checks the active roster against role requirements. Certification and
//! experience findings are per member; the minimum-crew rule applies to the
//! roster as a whole. A roster with nobody active, empty or not, violates it.
//! Only a missing roster contributes nothing.

use std::sync::Arc;

use async_trait::async_trait;

use super::RiskEvaluator;
use crate::config::CrewConfig;
use crate::error::SourceError;
use crate::monitor::models::{Hazard, RiskFactor, RiskType, Severity};
use crate::sources::{CrewMember, CrewRoster};

pub struct PersonnelEvaluator {
    roster: Arc<dyn CrewRoster>,
    config: CrewConfig,
}

impl PersonnelEvaluator {
    pub fn new(roster: Arc<dyn CrewRoster>, config: CrewConfig) -> Self {
        Self { roster, config }
    }

    fn member_factors(&self, member: &CrewMember) -> Vec<RiskFactor> {
        let Some(req) = self.config.requirement(member.role) else {
            return Vec::new();
        };
        let mut factors = Vec::new();

        if let Some(cert) = &req.certification {
            if !member.certifications.iter().any(|c| c == cert) {
                factors.push(
                    RiskFactor::new(
                        RiskType::Personnel,
                        Hazard::MissingCertification,
                        Severity::High,
                        7.0,
                        format!(
                            "{} is assigned as {} without {} certification",
                            member.name,
                            member.role.label(),
                            cert
                        ),
                        "Reassign the role or pair with a certified crew member",
                    )
                    .with_subject(member.id.clone()),
                );
            }
        }

        let min_years = req.min_years + self.config.task_complexity.experience_increment();
        if member.years_experience < min_years {
            factors.push(
                RiskFactor::new(
                    RiskType::Personnel,
                    Hazard::InsufficientExperience,
                    Severity::Medium,
                    4.5,
                    format!(
                        "{} has {:.1} years as {}, {:.1} required for this task",
                        member.name,
                        member.years_experience,
                        member.role.label(),
                        min_years
                    ),
                    "Assign direct supervision by an experienced crew member",
                )
                .with_subject(member.id.clone()),
            );
        }

        factors
    }
}

#[async_trait]
impl RiskEvaluator for PersonnelEvaluator {
    type Input = Vec<CrewMember>;

    fn name(&self) -> &'static str {
        "personnel"
    }

    async fn fetch(&self) -> Result<Option<Vec<CrewMember>>, SourceError> {
        self.roster.crew().await
    }

    fn evaluate(&self, crew: &Vec<CrewMember>) -> Vec<RiskFactor> {
        let active: Vec<&CrewMember> = crew.iter().filter(|m| m.active).collect();

        let mut factors: Vec<RiskFactor> = active
            .iter()
            .flat_map(|m| self.member_factors(m))
            .collect();

        if active.len() < self.config.min_crew_size {
            factors.push(RiskFactor::new(
                RiskType::Personnel,
                Hazard::MinimumCrew,
                Severity::High,
                8.0,
                format!(
                    "{} active crew on site, minimum is {}",
                    active.len(),
                    self.config.min_crew_size
                ),
                "Stop work until the minimum crew is present",
            ));
        }

        factors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskComplexity;
    use crate::sources::{CrewRole, MemorySource};

    fn member(id: &str, role: CrewRole, certs: &[&str], years: f64) -> CrewMember {
        CrewMember {
            id: id.to_string(),
            name: format!("Member {}", id),
            role,
            certifications: certs.iter().map(|c| c.to_string()).collect(),
            years_experience: years,
            active: true,
        }
    }

    fn evaluator(config: CrewConfig) -> PersonnelEvaluator {
        PersonnelEvaluator::new(Arc::new(MemorySource::default()), config)
    }

    fn qualified_crew() -> Vec<CrewMember> {
        vec![
            member("lead", CrewRole::CrewLeader, &["isa_certified_arborist"], 12.0),
            member("climb", CrewRole::Climber, &["tree_climbing"], 6.0),
        ]
    }

    #[test]
    fn test_qualified_crew_no_factors() {
        let eval = evaluator(CrewConfig::default());
        assert!(eval.evaluate(&qualified_crew()).is_empty());
    }

    #[test]
    fn test_single_member_minimum_crew() {
        let eval = evaluator(CrewConfig::default());
        let crew = vec![member("lead", CrewRole::CrewLeader, &["isa_certified_arborist"], 12.0)];

        let factors = eval.evaluate(&crew);
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].hazard, Hazard::MinimumCrew);
        assert_eq!(factors[0].severity, Severity::High);
        assert_eq!(factors[0].score, 8.0);
    }

    #[test]
    fn test_inactive_members_not_counted() {
        let eval = evaluator(CrewConfig::default());
        let mut crew = qualified_crew();
        crew[1].active = false;
        crew.push(member("x", CrewRole::Climber, &[], 0.0));
        crew[2].active = false;

        let factors = eval.evaluate(&crew);
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].hazard, Hazard::MinimumCrew);
    }

    #[test]
    fn test_each_member_contributes() {
        let eval = evaluator(CrewConfig::default());
        let crew = vec![
            member("a", CrewRole::Climber, &[], 5.0),
            member("b", CrewRole::Climber, &["tree_climbing"], 1.0),
            member("c", CrewRole::GroundWorker, &[], 0.0),
        ];

        let factors = eval.evaluate(&crew);
        let found: Vec<_> = factors
            .iter()
            .map(|f| (f.subject.as_deref().unwrap_or(""), f.hazard, f.score))
            .collect();
        assert_eq!(
            found,
            vec![
                ("a", Hazard::MissingCertification, 7.0),
                ("b", Hazard::InsufficientExperience, 4.5),
                ("c", Hazard::MissingCertification, 7.0),
            ]
        );
    }

    #[test]
    fn test_complexity_raises_experience_minimum() {
        let crew = vec![
            member("lead", CrewRole::CrewLeader, &["isa_certified_arborist"], 6.0),
            member("climb", CrewRole::Climber, &["tree_climbing"], 3.0),
        ];

        let moderate = evaluator(CrewConfig::default());
        assert!(moderate.evaluate(&crew).is_empty());

        let extreme = evaluator(CrewConfig {
            task_complexity: TaskComplexity::Extreme,
            ..Default::default()
        });
        let factors = extreme.evaluate(&crew);
        assert_eq!(factors.len(), 2);
        assert!(factors
            .iter()
            .all(|f| f.hazard == Hazard::InsufficientExperience));
    }

    #[tokio::test]
    async fn test_missing_roster_is_no_input() {
        let eval = evaluator(CrewConfig::default());
        assert!(eval.fetch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_roster_violates_minimum_crew() {
        let source = MemorySource::new(crate::sources::SiteConditions {
            crew: Some(Vec::new()),
            ..Default::default()
        });
        let eval = PersonnelEvaluator::new(Arc::new(source), CrewConfig::default());

        let crew = eval.fetch().await.unwrap().unwrap();
        let factors = eval.evaluate(&crew);
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].hazard, Hazard::MinimumCrew);
        assert_eq!(factors[0].score, 8.0);
    }
}
