use serde::{Deserialize, Serialize};

/// Task lifecycle status (spec §3: Task).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Cancelled,
    Deleted,
}

impl TaskStatus {
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Todo | TaskStatus::InProgress)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "todo" => TaskStatus::Todo,
            "in-progress" => TaskStatus::InProgress,
            "done" => TaskStatus::Done,
            "cancelled" => TaskStatus::Cancelled,
            "deleted" => TaskStatus::Deleted,
            other => {
                return Err(crate::error::Error::Validation(format!(
                    "unknown task status: {other}"
                )))
            }
        })
    }
}

/// Task priority (spec §3: Task). Ordering follows declaration order —
/// `Urgent` is highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn is_high_or_urgent(self) -> bool {
        matches!(self, Priority::Urgent | Priority::High)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Priority {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "urgent" => Priority::Urgent,
            "high" => Priority::High,
            "medium" => Priority::Medium,
            "low" => Priority::Low,
            other => {
                return Err(crate::error::Error::Validation(format!(
                    "unknown priority: {other}"
                )))
            }
        })
    }
}

/// Where an inbound message/capture originated (spec §3: InboxItem.source,
/// §6 idempotency-key prefixes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    TelegramText,
    TelegramVoice,
    WhatsappText,
    WhatsappVoice,
}

impl Source {
    /// The transport prefix used in idempotency keys (`telegram:...`,
    /// `whatsapp:...`).
    pub fn transport_prefix(self) -> &'static str {
        match self {
            Source::TelegramText | Source::TelegramVoice => "telegram",
            Source::WhatsappText | Source::WhatsappVoice => "whatsapp",
        }
    }

    pub fn channel_name(self) -> &'static str {
        match self {
            Source::TelegramText | Source::TelegramVoice => "telegram",
            Source::WhatsappText | Source::WhatsappVoice => "whatsapp",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Source::TelegramText => "telegram-text",
            Source::TelegramVoice => "telegram-voice",
            Source::WhatsappText => "whatsapp-text",
            Source::WhatsappVoice => "whatsapp-voice",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Source {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "telegram-text" => Source::TelegramText,
            "telegram-voice" => Source::TelegramVoice,
            "whatsapp-text" => Source::WhatsappText,
            "whatsapp-voice" => Source::WhatsappVoice,
            other => {
                return Err(crate::error::Error::Validation(format!(
                    "unknown source: {other}"
                )))
            }
        })
    }
}

/// Relationship to the user (spec §3: Person). Declaration order is the
/// disambiguation priority (partner highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Partner,
    Family,
    Friend,
    Colleague,
    Acquaintance,
}

impl Relationship {
    /// Higher is preferred. Matches the original `RELATIONSHIP_PRIORITY`
    /// map shape, values chosen to leave room between tiers the way the
    /// original's map does.
    pub fn priority_rank(self) -> u32 {
        match self {
            Relationship::Partner => 100,
            Relationship::Family => 90,
            Relationship::Friend => 70,
            Relationship::Colleague => 50,
            Relationship::Acquaintance => 30,
        }
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Relationship::Partner => "partner",
            Relationship::Family => "family",
            Relationship::Friend => "friend",
            Relationship::Colleague => "colleague",
            Relationship::Acquaintance => "acquaintance",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Relationship {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "partner" => Relationship::Partner,
            "family" => Relationship::Family,
            "friend" => Relationship::Friend,
            "colleague" => Relationship::Colleague,
            "acquaintance" => Relationship::Acquaintance,
            other => {
                return Err(crate::error::Error::Validation(format!(
                    "unknown relationship: {other}"
                )))
            }
        })
    }
}

/// Place category (spec §3: Place). Declaration order is the disambiguation
/// priority (home highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceType {
    Home,
    Office,
    Restaurant,
    Cinema,
    Venue,
    Other,
}

impl PlaceType {
    pub fn priority_rank(self) -> u32 {
        match self {
            PlaceType::Home => 100,
            PlaceType::Office => 80,
            PlaceType::Restaurant => 60,
            PlaceType::Cinema => 50,
            PlaceType::Venue => 40,
            PlaceType::Other => 20,
        }
    }
}

impl std::fmt::Display for PlaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlaceType::Home => "home",
            PlaceType::Office => "office",
            PlaceType::Restaurant => "restaurant",
            PlaceType::Cinema => "cinema",
            PlaceType::Venue => "venue",
            PlaceType::Other => "other",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for PlaceType {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "home" => PlaceType::Home,
            "office" => PlaceType::Office,
            "restaurant" => PlaceType::Restaurant,
            "cinema" => PlaceType::Cinema,
            "venue" => PlaceType::Venue,
            "other" => PlaceType::Other,
            other => {
                return Err(crate::error::Error::Validation(format!(
                    "unknown place type: {other}"
                )))
            }
        })
    }
}

/// Project category and status (spec §3: Project).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Work,
    Personal,
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ProjectType::Work => "work",
            ProjectType::Personal => "personal",
        })
    }
}

impl std::str::FromStr for ProjectType {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "work" => ProjectType::Work,
            "personal" => ProjectType::Personal,
            other => {
                return Err(crate::error::Error::Validation(format!(
                    "unknown project type: {other}"
                )))
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub fn priority_rank(self) -> u32 {
        if matches!(self, ProjectStatus::Active) {
            100
        } else {
            10
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Paused => "paused",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        })
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "active" => ProjectStatus::Active,
            "paused" => ProjectStatus::Paused,
            "completed" => ProjectStatus::Completed,
            "cancelled" => ProjectStatus::Cancelled,
            other => {
                return Err(crate::error::Error::Validation(format!(
                    "unknown project status: {other}"
                )))
            }
        })
    }
}

/// Audit log action kind (spec §3: LogEntry.action-type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    Capture,
    Create,
    Update,
    Delete,
    Send,
    Research,
    CalendarCreate,
    Error,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionType::Capture => "capture",
            ActionType::Create => "create",
            ActionType::Update => "update",
            ActionType::Delete => "delete",
            ActionType::Send => "send",
            ActionType::Research => "research",
            ActionType::CalendarCreate => "calendar-create",
            ActionType::Error => "error",
        };
        f.write_str(s)
    }
}

/// `created-by` discriminator on records (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatedBy {
    Human,
    Ai,
}

impl std::fmt::Display for CreatedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CreatedBy::Human => "human",
            CreatedBy::Ai => "ai",
        })
    }
}
