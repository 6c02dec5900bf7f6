//! The dispatcher: one bus per event kind behind a single entry point.
//!
//! Most users build a [`Dispatcher`] through [`DispatcherBuilder`], register
//! events with [`Dispatcher::add_event`] and call [`Dispatcher::dispatch`]
//! from their own loop.

mod builder;
mod core;

pub use builder::DispatcherBuilder;
pub use core::Dispatcher;
