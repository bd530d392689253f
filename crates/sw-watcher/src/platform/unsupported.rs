//! Stand-in for platforms without a native change notification backend.

use std::io;
use std::time::Duration;

use sw_core::{WatchConfig, WatchRequest};

use super::{Completion, NotificationSource};
use crate::decode::RawChange;
use crate::error::WatchError;

/// A source that can never be opened.
#[derive(Debug)]
pub enum UnsupportedSource {}

impl UnsupportedSource {
    /// Always fails with [`WatchError::UnsupportedPlatform`].
    pub fn open(_request: &WatchRequest, _config: &WatchConfig) -> Result<Self, WatchError> {
        Err(WatchError::UnsupportedPlatform)
    }
}

impl NotificationSource for UnsupportedSource {
    fn arm(&mut self) -> io::Result<()> {
        match *self {}
    }

    fn wait_ready(&mut self, _timeout: Option<Duration>) -> io::Result<bool> {
        match *self {}
    }

    fn read_result(&mut self) -> io::Result<Completion> {
        match *self {}
    }

    fn decode(&mut self, _len: usize, _out: &mut Vec<RawChange>) {
        match *self {}
    }

    fn cancel_and_close(&mut self) {
        match *self {}
    }
}
