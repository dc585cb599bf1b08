//! Plan management: task derivation, symbol naming, dependency ordering.

pub mod builder;

pub use builder::{
    Plan, PlanError, build_plan, feature_class_name, main_class_name, sanitize_words,
};
