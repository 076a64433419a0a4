//! Porcelain commands (user-facing operations)
//!
//! Each command is an `impl Repository` block that returns its result as a
//! value; printing is left to the binary.
//!
//! ## Commands
//!
//! - `init`: Create a repository
//! - `add`: Stage files
//! - `commit`: Record the index as a commit
//! - `checkout`: Switch branches or detach HEAD
//! - `clone`: Copy a local repository
//! - `config`: Read or write the repository config
//! - `log`: Recent history from HEAD
//! - `remote`: Add and list remotes
//! - `rev_list`: Commit ids reachable from a revision
//! - `status`: Working tree status

pub mod add;
pub mod checkout;
pub mod clone;
pub mod commit;
pub mod config;
pub mod init;
pub mod log;
pub mod remote;
pub mod rev_list;
pub mod status;
