//! Pointer/touch/gesture interaction mapped onto spring-driven or
//! gesture-driven transforms.
//!
//! Three pieces: [`pointer`] normalizes whatever device produced the
//! sample, [`modes`] names the three ways a controller can react to it,
//! and [`controller`] is where the reaction actually happens. The optional
//! `winit` feature adds [`winit_adapter`], one concrete
//! [`pointer::PointerSource`] for hosts already running a `winit` event
//! loop; everything else in this crate is agnostic to how the events
//! arrived.

pub mod controller;
pub mod modes;
pub mod pointer;

#[cfg(feature = "winit")]
pub mod winit_adapter;

pub use controller::{InteractionConfig, InteractionController, InteractionState};
pub use modes::{GestureModeConfig, MagneticModeConfig, ModeConfig, SpringModeConfig};
pub use pointer::{ManualPointerSource, PointerEvent, PointerKind, PointerPhase, PointerSource, Rect};
