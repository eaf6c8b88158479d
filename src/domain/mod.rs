//! Domain types for taggr
//!
//! This module contains the configuration records the dispatch engine reads
//! (Channel, ScheduleGroup, Step, GlobalRules) and the ephemeral wire types it
//! produces (AttemptRecord, StepError, dispatch results). Configuration field
//! names serialize as camelCase to stay compatible with the `data.json`
//! document the labeling UI edits.

pub mod attempt;
pub mod channel;
pub mod rules;
pub mod schedule;

pub use attempt::{AttemptRecord, DispatchFailure, DispatchRequest, DispatchResult, DispatchSuccess, StepError, StepRef};
pub use channel::Channel;
pub use rules::GlobalRules;
pub use schedule::{InjectPlacement, ScheduleGroup, Step};
