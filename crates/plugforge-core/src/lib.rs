//! Core engine for incremental multi-file plugin generation.
//!
//! A session takes an immutable [`spec::ProjectSpec`], derives an ordered
//! [`plan::Plan`] of file tasks, and drives each task through generation,
//! validation, and retry until the plan settles. Completed files feed a
//! monotonic [`context::ContextAccumulator`] so later generations see
//! everything produced before them.
//!
//! # Architecture
//!
//! ```text
//! ProjectSpec --> plan::build_plan --> session::run_session
//!                                          |
//!                  +-----------------------+--------------------+
//!                  |                       |                    |
//!            generator::Generator    validate::run_battery   score
//!            (backend attempt)       (per-file + project)   (quality)
//! ```

pub mod context;
pub mod generator;
pub mod plan;
pub mod score;
pub mod session;
pub mod spec;
pub mod state;
pub mod task;
pub mod validate;

pub use plan::{Plan, PlanError, build_plan};
pub use session::{SessionConfig, SessionResult, run_session};
pub use spec::{FileKind, ProjectSpec};
pub use task::{FileTask, GeneratedFile, TaskStatus};
