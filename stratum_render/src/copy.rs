// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Copy-output requests.
//!
//! A copy request asks for a surface's rendered pixels. The contract is
//! exactly one response per request: a request that cannot be serviced
//! (its pass pruned, the frame skipped, the tree torn down) is answered
//! with an explicit [`CopyOutputResult::Empty`], never silently dropped.
//! Dropping an unanswered request is a bug and trips a debug assertion.

use core::fmt;

/// The pixels (or absence thereof) produced for a copy request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CopyOutputResult {
    /// Captured pixels, tightly packed RGBA.
    Bitmap {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// `width * height * 4` bytes.
        pixels: Vec<u8>,
    },
    /// The request could not be serviced.
    Empty,
}

/// An asynchronous request to capture a surface's rendered output.
pub struct CopyOutputRequest {
    callback: Option<Box<dyn FnOnce(CopyOutputResult) + Send>>,
}

impl fmt::Debug for CopyOutputRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyOutputRequest")
            .field("answered", &self.callback.is_none())
            .finish()
    }
}

impl CopyOutputRequest {
    /// Creates a request that delivers its result to `callback`.
    #[must_use]
    pub fn new(callback: impl FnOnce(CopyOutputResult) + Send + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// Answers the request with `result`.
    pub fn send(mut self, result: CopyOutputResult) {
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }

    /// Answers the request with an explicit empty result.
    pub fn send_empty(self) {
        self.send(CopyOutputResult::Empty);
    }
}

impl Drop for CopyOutputRequest {
    fn drop(&mut self) {
        debug_assert!(
            self.callback.is_none() || std::thread::panicking(),
            "copy-output request dropped without a response"
        );
    }
}
