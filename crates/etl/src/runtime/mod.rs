//! Runtime module: process lifecycle (boot, run, stop).

pub mod boot;
pub mod run;
pub mod stop;
