// atman-reason: state/logic/time separation for the reasoning engine
// Logic = compiled N3 implications, time = the tick/convergence loop;
// state stays in atman-store

pub mod compile;
pub mod error;
pub mod runner;
pub mod tick;

pub use compile::{compile_rules, CompiledRule, RejectedRule, RuleSet};
pub use error::{ReasonError, ReasonResult};
pub use runner::{run, run_to_completion, Run};
pub use tick::{tick, TickOutput, TickResult};
