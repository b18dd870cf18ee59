#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(async_fn_in_trait)]
pub mod agent;
pub mod config;
pub mod controller;
pub mod keyboard;
pub mod logging;
pub mod motion;
pub mod net;
pub mod services;
pub mod shutdown;
pub mod sim_protocol;
pub mod testing;

use std::sync::LockResult;

use tracing::warn;

pub trait IgnoreMutexErr<T> {
    fn unwrap_ignore_poison(self) -> T;
}

impl<T> IgnoreMutexErr<T> for LockResult<T> {
    fn unwrap_ignore_poison(self) -> T {
        match self {
            Ok(r) => r,
            Err(poisoned) => {
                // Handle mutex poisoning
                let guard = poisoned.into_inner();
                warn!("mutex was poisoned, recovering from mutex poisoning");
                guard
            }
        }
    }
}
