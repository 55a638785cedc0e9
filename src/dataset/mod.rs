//! Dataset preparation: conversion, splitting, metadata and workload
//! generation, and evaluation against groundtruth.

pub mod convert;
pub mod evaluation;
pub mod metadata_gen;
pub mod split;
pub mod workload;

pub use self::convert::{convert_fbin, vectors_to_shard};
pub use self::evaluation::{RecallReport, recall_at_k};
pub use self::metadata_gen::{DEFAULT_LABELS, MetadataGenConfig, generate_metadata};
pub use self::split::{SplitConfig, split_files, split_iid};
pub use self::workload::{WorkloadConfig, generate_workload};
