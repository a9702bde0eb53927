//! Concrete cleanup steps.
//!
//! Each step owns one area of the host a k0s node leaves behind:
//!
//! - `containerd` - Drains pods through the bundled container runtime
//! - `users` - Deletes the control plane system users
//! - `services` - Uninstalls the k0s service units
//! - `directories` - Unmounts leftovers and removes the data/runtime dirs
//! - `cni` - Removes CNI config files and virtual interfaces

mod cni;
mod containerd;
mod directories;
mod services;
mod users;

pub use cni::CniStep;
pub use containerd::ContainerdStep;
pub use directories::DirectoriesStep;
pub use services::ServicesStep;
pub use users::UsersStep;
