//! Bounded parallel map
//!
//! Fans a list of independent work items out to a fixed-size pool of
//! worker threads and collects the results back in input order.
//!
//! # Architecture
//!
//! ```text
//!   producer ──(index, item)──▶ bounded channel ──▶ worker-0 ┐
//!                                                  worker-1 ├─(index, result)─▶ collector
//!                                                  worker-N ┘                   Vec<Option<R>>
//! ```
//!
//! - Workers share nothing mutable; each item is processed independently.
//! - The collector slots results by their original index, so the output
//!   order never depends on which command finished first.
//! - A failing work item is the worker function's business: it returns a
//!   value describing the failure and the pool keeps going.
//!
//! # Example Usage
//!
//! ```rust
//! use statusmail::parallel::{ParallelConfig, ParallelProcessor};
//!
//! let processor = ParallelProcessor::new(ParallelConfig::with_workers(4));
//! let squares = processor
//!     .process(vec![1, 2, 3], |x| x * x, None::<fn(usize, usize)>)
//!     .unwrap();
//! assert_eq!(squares, vec![1, 4, 9]);
//! ```

pub mod processor;

pub use processor::{ParallelConfig, ParallelProcessor, default_worker_count};
