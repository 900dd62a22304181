#![doc = "bls-mirror-core: core logic library for bls-mirror."]

//! This crate contains the sync and report pipelines, independent of any concrete object
//! store client. The CLI crate supplies the S3-backed [`contract::MirrorStore`].
//!
//! # Usage
//! Build an [`session::HttpSession`] once, then hand it together with a store to
//! [`synchronise::synchronise`] and [`dataset::mirror_dataset`]. The report job only
//! needs [`report::build_report`].

pub mod config;
pub mod contract;
pub mod dataset;
pub mod inventory;
pub mod listing;
pub mod reconcile;
pub mod report;
pub mod session;
pub mod synchronise;
