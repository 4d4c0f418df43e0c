//! Query engine: read-only operations over the Store, all served from
//! pooled reader connections.

pub mod dependencies;
pub mod impact;
pub mod recent;
pub mod search;

pub use dependencies::{file_id_for_path, search_dependencies, Direction, DependencyHit};
pub use impact::{analyze_change_impact, ChangeImpact, ChangeImpactRequest, RiskLevel};
pub use recent::{list_recent_files, RecentFile};
pub use search::{search_code, SearchHit};
