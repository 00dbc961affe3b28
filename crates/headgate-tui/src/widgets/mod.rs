//! Reusable rendering helpers shared by the form-style screens.

pub mod form;
