//! Command handlers. labkit has a single command; its handler lives in [`run`].

pub mod run;
