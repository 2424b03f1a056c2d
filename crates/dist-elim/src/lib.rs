//! Elimination of the `dist` dialect.
//!
//! The pass rewrites every distribution-aware operation into a local
//! placeholder so later stages never see the `dist` dialect:
//!
//! | Operation | Replacement |
//! |---|---|
//! | `dist.register_tensor` | `arith.const` zero per result |
//! | `dist.local_offsets` | `arith.const` zero per result |
//! | `dist.local_shape` | the shape operand of its `dist.register_tensor` |
//! | `dist.all_reduce` | `tensor.cast` of the input (see [`AllReduceLowering`]) |
//!
//! Entry point is [`DistElimPass::run`].

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod legality;
pub mod observer;
pub mod pass;
pub mod rules;

pub use config::{AllReduceLowering, ElimConfig};
pub use dispatch::{Dispatch, DistOpKind, RuleSet};
pub use engine::{ElimStats, EliminationEngine};
pub use error::{ElimError, ElimResult};
pub use observer::{RecordedRewrite, RecordingObserver, RewriteEvent, RewriteObserver, TracingObserver};
pub use pass::DistElimPass;
