//! Host command execution.
//!
//! Every external tool a step invokes (`crictl`, `systemctl`, `userdel`,
//! `ip`, `umount`, `containerd`) goes through [`CommandRunner`], so the
//! steps never touch `std::process` directly.

mod command;
pub mod mounts;

pub use command::{
    run_checked, CommandOutput, CommandRunner, HostCommandRunner, HostProcess, ProcessHandle,
};
