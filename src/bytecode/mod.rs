//! Compilation of surface terms into machine combinators.
//!
//! Stages run in a fixed order: [`saturate`](saturate::saturate) →
//! [`split_patterns`](pattern_split::split_patterns) →
//! [`lambda_lift`](lambda_lift::lambda_lift) → [`normalize`](anf::normalize) →
//! [`emit`](emit::emit). [`pipeline`] drives them against an evaluation
//! context.

pub mod anf;
pub mod combinator;
pub mod core;
pub mod emit;
pub mod fresh;
pub mod lambda_lift;
pub mod pattern_split;
pub mod pipeline;
pub mod saturate;
