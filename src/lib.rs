#![forbid(unsafe_code)]

pub mod aggregation;
pub mod cli;
pub mod config;
pub mod datamodel;
pub mod error;
pub mod exporters;
pub mod importers;
pub mod merge;
pub mod pipeline;
pub mod unify;
