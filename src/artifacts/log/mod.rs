//! Commit history traversal
//!
//! - `rev_list`: pull-based walk over the commit graph, in topological or
//!   committer-date order
//!
//! ## Algorithm
//!
//! Both orders keep a priority queue of loaded commits keyed by committer
//! timestamp (newest first) and a seen-set, so merge commits and shared
//! ancestors are produced once. Parents of a commit are only read when the
//! caller asks for the next one.

pub mod rev_list;
