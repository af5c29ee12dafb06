//! Pluggable strategies that keep something in sync with a store.
//!
//! A [`Strategy`] owns the activation lifecycle and the per-store
//! subscriptions; the behaviour itself comes from a [`StrategyHooks`]
//! implementation. [`LoadingStrategy`] is the stock one.

mod loading;
mod strategy;

pub use loading::{LoadingOptions, LoadingStrategy};
pub use strategy::{Strategy, StrategyHooks, StrategyKind};
