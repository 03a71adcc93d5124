//! Controller layer: terminal input commands, failure reporting and the
//! interactive review loop.

pub mod commands;
pub mod events;
pub mod learn;
