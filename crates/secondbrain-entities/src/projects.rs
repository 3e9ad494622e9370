//! Projects lookup/creation service (C4), grounded on
//! `examples/original_source/src/assistant/services/projects.py`.

use secondbrain_core::ids::ProjectId;
use secondbrain_core::records::Project;
use secondbrain_core::types::{ProjectStatus, ProjectType};
use secondbrain_kb::KnowledgeBase;

use crate::cache::NameCache;
use crate::confidence::{disambiguate, Candidate};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchedBy {
    Name,
    Partial,
    Created,
}

#[derive(Debug, Clone)]
pub struct ProjectMatch {
    pub project_id: ProjectId,
    pub name: String,
    pub confidence: f64,
    pub status: ProjectStatus,
    pub deadline: Option<String>,
    pub matched_by: MatchedBy,
}

impl Candidate for ProjectMatch {
    fn confidence(&self) -> f64 {
        self.confidence
    }
    fn is_top_priority(&self) -> bool {
        matches!(self.status, ProjectStatus::Active)
    }
    fn recency_key(&self) -> Option<&str> {
        self.deadline.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectLookupResult {
    pub found: bool,
    pub project_id: Option<ProjectId>,
    pub matches: Vec<ProjectMatch>,
    pub needs_disambiguation: bool,
    pub is_new: bool,
}

fn calculate_confidence(search: &str, name: &str, status: ProjectStatus) -> (f64, MatchedBy) {
    if search.is_empty() {
        return (0.0, MatchedBy::Partial);
    }

    let name_lower = name.to_lowercase();

    let (mut confidence, matched_by) = if search == name_lower {
        (1.0, MatchedBy::Name)
    } else if name_lower.starts_with(search) {
        (0.9, MatchedBy::Name)
    } else if name_lower.contains(search) {
        (0.7, MatchedBy::Name)
    } else if name_lower.split_whitespace().any(|w| w.starts_with(search)) {
        (0.65, MatchedBy::Partial)
    } else {
        (0.5, MatchedBy::Partial)
    };

    let boost = status.priority_rank() as f64 / 1000.0;
    confidence = (confidence + boost).min(1.0);

    (confidence, matched_by)
}

pub struct ProjectsService<'a> {
    kb: &'a KnowledgeBase,
    cache: NameCache,
}

impl<'a> ProjectsService<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        Self { kb, cache: NameCache::new() }
    }

    pub fn lookup(&self, name: &str) -> Result<ProjectLookupResult> {
        let search = name.to_lowercase();
        let projects = self.kb.list_projects(None)?;

        let mut matches: Vec<ProjectMatch> = projects
            .into_iter()
            .map(|p| {
                let (confidence, matched_by) = calculate_confidence(&search, &p.name, p.status);
                ProjectMatch {
                    project_id: p.id,
                    name: p.name,
                    confidence,
                    status: p.status,
                    deadline: p.deadline,
                    matched_by,
                }
            })
            .filter(|m| m.confidence > 0.0)
            .collect();

        if matches.is_empty() {
            return Ok(ProjectLookupResult { found: false, ..Default::default() });
        }

        let (best_idx, needs_disambiguation) = disambiguate(&mut matches);
        let project_id = matches[best_idx].project_id.clone();
        self.cache.insert(search, project_id.0.clone());

        Ok(ProjectLookupResult {
            found: true,
            project_id: Some(project_id),
            matches,
            needs_disambiguation,
            is_new: false,
        })
    }

    pub fn lookup_or_create(&self, name: &str, project_type: ProjectType, notes: Option<String>) -> Result<ProjectLookupResult> {
        let result = self.lookup(name)?;
        if result.found {
            return Ok(result);
        }

        let project = self.create(name, project_type, notes)?;
        Ok(ProjectLookupResult {
            found: true,
            project_id: Some(project.id.clone()),
            matches: vec![ProjectMatch {
                project_id: project.id,
                name: project.name,
                confidence: 1.0,
                status: project.status,
                deadline: None,
                matched_by: MatchedBy::Created,
            }],
            needs_disambiguation: false,
            is_new: true,
        })
    }

    pub fn create(&self, name: &str, project_type: ProjectType, notes: Option<String>) -> Result<Project> {
        let now = chrono::Utc::now().to_rfc3339();
        let project = Project {
            id: ProjectId::new(),
            name: name.to_string(),
            project_type,
            status: ProjectStatus::Active,
            deadline: None,
            next_action: None,
            notes,
            deleted_at: None,
            created_at: now.clone(),
            last_modified_at: now,
        };
        self.kb.create_project(&project)?;
        self.cache.insert(name.to_lowercase(), project.id.0.clone());
        Ok(project)
    }

    pub fn lookup_active(&self) -> Result<Vec<Project>> {
        self.kb.list_projects(Some("active")).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_status_preferred_over_completed() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let service = ProjectsService::new(&kb);
        let mut completed = Project {
            id: ProjectId::new(),
            name: "Website Revamp".to_string(),
            project_type: ProjectType::Work,
            status: ProjectStatus::Completed,
            deadline: None,
            next_action: None,
            notes: None,
            deleted_at: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            last_modified_at: chrono::Utc::now().to_rfc3339(),
        };
        kb.create_project(&completed).unwrap();
        completed.name = "Website Launch".to_string();
        completed.id = ProjectId::new();
        completed.status = ProjectStatus::Active;
        kb.create_project(&completed).unwrap();

        let result = service.lookup("Website").unwrap();
        assert!(result.found);
        let best = result.matches.iter().find(|m| Some(m.project_id.clone()) == result.project_id).unwrap();
        assert_eq!(best.status, ProjectStatus::Active);
    }
}
