//! Small helper types used throughout the crate.

pub(crate) mod opt_field;
