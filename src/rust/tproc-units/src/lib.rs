// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Time and phase quantities shared by the sequence compiler and the
//! assembly backend.

pub mod angle;
pub mod duration;

pub use angle::Angle32;
pub use duration::{Duration, Microseconds, TimeUnit, microseconds};
