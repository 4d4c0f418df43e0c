//! Core data entities. Ownership and cascade rules are enforced by the
//! schema (`store::schema`), not re-checked here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
    pub id: String,
    pub full_name: String,
    pub local_path: Option<String>,
    pub default_ref: String,
    pub last_indexed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Skipped
        )
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => JobStatus::Pending,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "skipped" => JobStatus::Skipped,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobStats {
    pub files_scanned: u64,
    pub files_indexed: u64,
    pub symbols: u64,
    pub references: u64,
    pub dependencies: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexJob {
    pub id: String,
    pub repository_id: String,
    pub git_ref: String,
    pub status: JobStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub stats: JobStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedFile {
    pub id: String,
    pub repository_id: String,
    pub path: String,
    pub content_hash: String,
    pub language: String,
    pub size_bytes: u64,
    pub content_snippet: String,
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    Type,
    Enum,
    Const,
    Variable,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Enum => "enum",
            SymbolKind::Const => "const",
            SymbolKind::Variable => "variable",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "function" => SymbolKind::Function,
            "class" => SymbolKind::Class,
            "interface" => SymbolKind::Interface,
            "type" => SymbolKind::Type,
            "enum" => SymbolKind::Enum,
            "const" => SymbolKind::Const,
            "variable" => SymbolKind::Variable,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub id: String,
    pub file_id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub line: u32,
    pub jsdoc: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    Import,
    ReExport,
    ExportAll,
    DynamicImport,
    Require,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Import => "import",
            ReferenceType::ReExport => "re_export",
            ReferenceType::ExportAll => "export_all",
            ReferenceType::DynamicImport => "dynamic_import",
            ReferenceType::Require => "require",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "import" => ReferenceType::Import,
            "re_export" => ReferenceType::ReExport,
            "export_all" => ReferenceType::ExportAll,
            "dynamic_import" => ReferenceType::DynamicImport,
            "require" => ReferenceType::Require,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub from_file_id: String,
    pub to_path: String,
    pub symbols: Vec<String>,
    pub reference_type: ReferenceType,
    pub is_type_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source_file_id: String,
    pub target_file_id: String,
    pub reference_type: ReferenceType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Tier {
    Free,
    Solo,
    Team,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Solo => "solo",
            Tier::Team => "team",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "free" => Tier::Free,
            "solo" => Tier::Solo,
            "team" => Tier::Team,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateCounter {
    pub key_id: String,
    pub window_start: DateTime<Utc>,
    pub request_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub key_id: String,
    pub tier: Tier,
    pub secret_hash: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MemoryKind {
    Decision,
    Failure,
    Pattern,
    Insight,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Decision => "decision",
            MemoryKind::Failure => "failure",
            MemoryKind::Pattern => "pattern",
            MemoryKind::Insight => "insight",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "decision" => MemoryKind::Decision,
            "failure" => MemoryKind::Failure,
            "pattern" => MemoryKind::Pattern,
            "insight" => MemoryKind::Insight,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub kind: MemoryKind,
    pub repository: Option<String>,
    pub text: String,
    pub related_files: Vec<String>,
    pub supersedes: Option<String>,
    pub created_at: DateTime<Utc>,
}
