//! # Block Runtime
//!
//! The execution engine of Blockstage. Each tick it detects which event blocks
//! fire on which stage instances, walks the attached block chains and applies
//! their actions to the `stage_model` state.
//!
//! ## Core Components
//!
//! - **detector**: per-tick event detection with edge/level trigger state
//! - **interpreter**: chain walking (sequence, branch, bounded loop, suspension)
//! - **executor**: the semantics of each primitive action
//! - **scheduler**: deferred continuations for `Wait`, cancellable by stop or deletion
//! - **runtime**: the `play` / `stop` / `update` / `handle_click` facade and tick loop
//!
//! ## Design Philosophy
//!
//! - **Single-threaded**: everything runs on the tick thread; suspension is a
//!   scheduled continuation, never a blocking sleep
//! - **Forgiving**: bad arguments and dangling references degrade to defaults,
//!   one entity's chain never aborts another's

pub mod clock;
pub mod config;
pub mod detector;
pub mod error;
pub mod executor;
pub mod input;
pub mod interpreter;
pub mod runtime;
pub mod scheduler;

pub use clock::*;
pub use config::*;
pub use detector::*;
pub use error::*;
pub use executor::*;
pub use input::*;
pub use interpreter::*;
pub use runtime::*;
pub use scheduler::*;
