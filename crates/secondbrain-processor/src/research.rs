//! Research pipeline orchestration (spec §4.11 step 5, SPEC_FULL §11
//! via `services/research_pipeline.py`): detects a research request,
//! hands the topic to a black-box researcher, then files the findings
//! as an externally-linked Doc plus a Task that carries the Doc's url
//! in its notes, and renders one combined success message. The web
//! research itself and the document store are external collaborators
//! (spec §1 Non-goals) represented here only as traits.

use std::sync::OnceLock;

use chrono::Utc;
use regex::RegexSet;

use secondbrain_core::ids::TaskId;
use secondbrain_core::records::Task;
use secondbrain_core::types::{CreatedBy, Priority, Source, TaskStatus};
use secondbrain_kb::KnowledgeBase;

use crate::error::Result;

fn research_patterns() -> &'static RegexSet {
    static RE: OnceLock<RegexSet> = OnceLock::new();
    RE.get_or_init(|| {
        RegexSet::new([
            r"(?i)^research\s+.+",
            r"(?i)^find\s+out\s+(?:about\s+)?.+",
            r"(?i)^look\s+(?:up|into)\s+.+",
            r"(?i)^investigate\s+.+",
            r"(?i)^what\s+(?:are\s+)?(?:the\s+)?best\s+.+",
            r"(?i)^compare\s+.+",
        ])
        .unwrap()
    })
}

/// `true` if `text` reads as a research request.
pub fn is_research_request(text: &str) -> bool {
    research_patterns().is_match(text.trim())
}

/// Best-effort topic extraction: strips the leading verb phrase that
/// triggered `is_research_request`, falling back to the full text.
pub fn extract_research_topic(text: &str) -> String {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();
    const PREFIXES: &[&str] = &[
        "research ",
        "find out about ",
        "find out ",
        "look up ",
        "look into ",
        "investigate ",
        "what are the best ",
        "what is the best ",
        "compare ",
    ];
    for prefix in PREFIXES {
        if lower.starts_with(prefix) {
            return trimmed[prefix.len()..].trim().to_string();
        }
    }
    trimmed.to_string()
}

/// One finding returned by a `WebResearcher`.
#[derive(Debug, Clone)]
pub struct Finding {
    pub title: String,
    pub url: String,
}

/// Result of a completed research run, handed to `create_doc`.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    pub topic: String,
    pub findings: Vec<Finding>,
    pub sources_count: usize,
}

/// Black-box web researcher (spec §1 Non-goals: "researcher is treated
/// as a black-box that returns findings + source URLs").
pub trait WebResearcher {
    fn research(&self, topic: &str) -> Result<ResearchOutcome>;
}

/// A created external document, e.g. a Drive doc.
#[derive(Debug, Clone)]
pub struct ExternalDoc {
    pub doc_id: String,
    pub web_view_url: String,
}

/// External document store the pipeline files findings into.
pub trait DocStore {
    fn create_doc(&self, topic: &str, outcome: &ResearchOutcome) -> Result<ExternalDoc>;
}

/// Outcome of running the full pipeline, success or failure, with the
/// message already rendered for the transport to send back verbatim.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub success: bool,
    pub task_id: Option<TaskId>,
    pub message: String,
}

/// Runs research → doc → linked task, and renders the combined
/// success message, or a failure message if any step errors out.
pub fn run_pipeline(
    kb: &KnowledgeBase,
    researcher: &dyn WebResearcher,
    docs: &dyn DocStore,
    topic: &str,
) -> Result<PipelineResult> {
    let outcome = match researcher.research(topic) {
        Ok(o) => o,
        Err(e) => return Ok(failure(topic, &e.to_string())),
    };

    let doc = match docs.create_doc(topic, &outcome) {
        Ok(d) => d,
        Err(e) => return Ok(failure(topic, &e.to_string())),
    };

    let task_id = create_research_task(kb, topic, &doc, outcome.findings.len())?;

    Ok(PipelineResult { success: true, task_id: Some(task_id.clone()), message: format_success(topic, &outcome, &doc, &task_id) })
}

fn failure(topic: &str, error: &str) -> PipelineResult {
    PipelineResult { success: false, task_id: None, message: format!("Research failed for: {topic}\n\nError: {error}") }
}

fn create_research_task(kb: &KnowledgeBase, topic: &str, doc: &ExternalDoc, findings_count: usize) -> Result<TaskId> {
    let now = Utc::now().to_rfc3339();
    let task = Task {
        id: TaskId::new(),
        title: format!("Review research: {topic}"),
        status: TaskStatus::Todo,
        priority: Priority::Medium,
        due_at: None,
        due_timezone: None,
        source: Some(Source::TelegramText),
        confidence: None,
        created_by: CreatedBy::Ai,
        person_ids: vec![],
        place_id: None,
        project_id: None,
        external_doc_id: Some(doc.doc_id.clone()),
        external_doc_url: Some(doc.web_view_url.clone()),
        notes: Some(format!("Research: {findings_count} findings. See: {}", doc.web_view_url)),
        deleted_at: None,
        created_at: now.clone(),
        last_modified_at: now,
    };
    kb.create_task(&task)?;
    Ok(task.id)
}

fn format_success(topic: &str, outcome: &ResearchOutcome, doc: &ExternalDoc, task_id: &TaskId) -> String {
    format!(
        "Research completed for: {topic}\n\n\
         Found {} items from {} sources\n\n\
         Created a document with the findings\n\
         {}\n\n\
         Created task (id {task_id}): Review research: {topic}",
        outcome.findings.len(),
        outcome.sources_count,
        doc.web_view_url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_research_phrasings() {
        assert!(is_research_request("research the best CRM options"));
        assert!(is_research_request("find out about flight prices"));
        assert!(is_research_request("compare hotel A vs hotel B"));
        assert!(!is_research_request("buy milk"));
    }

    #[test]
    fn extracts_the_topic() {
        assert_eq!(extract_research_topic("Research best CRM options"), "best CRM options");
        assert_eq!(extract_research_topic("Find out about flight prices"), "flight prices");
        assert_eq!(extract_research_topic("Compare hotel A vs hotel B"), "hotel A vs hotel B");
    }

    struct StubResearcher;
    impl WebResearcher for StubResearcher {
        fn research(&self, topic: &str) -> Result<ResearchOutcome> {
            Ok(ResearchOutcome {
                topic: topic.to_string(),
                findings: vec![Finding { title: "Option A".to_string(), url: "https://a.example".to_string() }],
                sources_count: 1,
            })
        }
    }

    struct StubDocStore;
    impl DocStore for StubDocStore {
        fn create_doc(&self, _topic: &str, _outcome: &ResearchOutcome) -> Result<ExternalDoc> {
            Ok(ExternalDoc { doc_id: "doc-1".to_string(), web_view_url: "https://docs.example/doc-1".to_string() })
        }
    }

    #[test]
    fn pipeline_creates_a_linked_task_and_renders_both_links() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let result = run_pipeline(&kb, &StubResearcher, &StubDocStore, "best CRM options").unwrap();
        assert!(result.success);
        let task_id = result.task_id.unwrap();
        let task = kb.list_tasks(None, false).unwrap().into_iter().find(|t| t.id == task_id).unwrap();
        assert_eq!(task.external_doc_url.as_deref(), Some("https://docs.example/doc-1"));
        assert!(result.message.contains("https://docs.example/doc-1"));
        assert!(result.message.contains("Review research: best CRM options"));
    }
}
