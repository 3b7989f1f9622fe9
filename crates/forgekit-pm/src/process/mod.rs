//! External process invocation.
//!
//! Every tool the backends shell out to (`git`, `svn`, `puppet`) goes through
//! a [`CommandRunner`] so tests can substitute a scripted fake.

mod runner;

pub use runner::{format_command, run_checked, CommandOutput, CommandRunner, SystemCommandRunner};
