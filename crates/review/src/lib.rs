//! Two-stage draft review.
//!
//! A cheap clarity [`Prefilter`] decides whether the costlier rubric
//! [`Reviewer`] is warranted at all; the reviewer scores a draft against
//! a ten-criterion rubric and self-reports an approve/reject verdict.
//! Both stages call the remote model through the core [`Provider`]
//! abstraction, and both degrade safely: parsing failures never raise,
//! they default to "not approved" with a logged warning.
//!
//! [`Provider`]: codevet_core::Provider

pub mod prefilter;
pub mod reviewer;
pub mod verdict;

pub use prefilter::Prefilter;
pub use reviewer::Reviewer;
pub use verdict::{Assessment, ReviewVerdict};
