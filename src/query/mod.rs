//! Read-only questions asked of a built [`DependencyGraph`](crate::DependencyGraph).

pub mod affected;
pub mod cross_project;
pub mod stats;
