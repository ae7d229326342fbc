//! HTTP middleware layers.

pub(crate) mod cache;
