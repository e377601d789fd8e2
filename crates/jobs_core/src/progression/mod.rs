//! Progression state machine
//!
//! ## Module layout
//! - `record`: per-(player, job) state and the mutation entry points
//! - `machine`: level-up / level-down resolution run after each mutation
//! - `cooldown`: leave / rejoin bookkeeping
//! - `context`: collaborator traits the machine calls out to
//!
//! ## Flow
//! 1. A caller mutates a record (`add_experience`, `set_level`, ...)
//! 2. The record resolves level transitions against the curve
//! 3. Each level change reloads player limits
//! 4. The final standing is published to the rank aggregator

mod context;
mod cooldown;
mod machine;
mod record;


pub use context::{
    Authorization, Clock, DenyAll, FixedClock, LimitRecalculator, ProgressionContext, SystemClock,
};
pub use record::{ProgressionRecord, RecordSeed};
