//! # erx - extended r-index construction and benchmarking
//!
//! erx drives the external executables that build an extended r-index
//! (eBWT-based r-index over a collection of sequences) and times them
//! against competing indexes. It never computes a BWT itself; it chooses
//! the integer-width variant of each stage, sequences the stages, keeps
//! their output in a log, and records results.
//!
//! ## Architecture
//!
//! - [`command`] - Typed stage specifications and formed invocations
//! - [`supervise`] - Running an invocation with logging, deadlines and tree kill
//! - [`pipeline`] - Strictly ordered stage execution, stop on first failure
//! - [`index`] - Variant selection, mode records, artifacts, construction and queries
//! - [`bench`] - Benchmark sweep producing a CSV of time and memory
//! - [`output`] - Console reporting
//! - [`utils`] - App configuration and progress bars
//!
//! ## Quick Start
//!
//! ```ignore
//! use erx::index::{BuildParams, Toolchain, construct};
//! use erx::output::Console;
//! use erx::supervise::{LogSink, Supervisor};
//! use std::path::Path;
//!
//! let input = Path::new("reads.fa");
//! let toolchain = Toolchain::new("/opt/er-index/build");
//! let log = LogSink::open("reads.fa.log").unwrap();
//!
//! let summary = construct(
//!     &mut Supervisor::new(),
//!     &toolchain,
//!     input,
//!     &BuildParams::default(),
//!     &log,
//!     Console::default(),
//! )
//! .unwrap();
//! println!("built in {} mode", summary.index_width);
//! ```
//!
//! ## Variant selection
//!
//! Every stage executable exists in a 32-bit and a 64-bit build. A size at
//! or above the relevant ceiling always selects the 64-bit build:
//!
//! 1. **Parse words** against 2^32-1 for the inverted list and eBWT
//! 2. **Dictionary bytes** against 2^31-1 for the dictionary suffix array
//! 3. **Input bytes** against 2^32-1 for the index builder and all queries

pub mod bench;
pub mod command;
pub mod index;
pub mod output;
pub mod pipeline;
pub mod supervise;
pub mod utils;
