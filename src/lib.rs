//! # Myth Retained
//!
//! Retained-mode core of a 3D renderer: render objects are compiled once
//! from state-object snapshots into shared programs and draw chunks, kept
//! in a sorted draw list, and re-processed only as far as their dirty flags
//! require.
//!
//! ```text
//! StateSlots ──build_object──▶ RenderObject { program, chunks, sort key }
//!                                   │
//!             render / pick ◀── staged pipeline (list → order → sort → image)
//!                                   │
//!                               GpuDevice
//! ```
//!
//! [`HeadlessDevice`] implements [`GpuDevice`] on the CPU, so everything
//! including picking runs without a GPU.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod gpu;
pub mod renderer;
pub mod state;

pub use errors::{RenderError, Result};
pub use gpu::{GpuDevice, HeadlessDevice};
pub use renderer::{
    DirtyFlags, ObjectId, PickHit, PickParams, PickQuery, RenderParams, RenderStats, Renderer,
    RendererSettings,
};
pub use state::{Slot, StateSlots};
