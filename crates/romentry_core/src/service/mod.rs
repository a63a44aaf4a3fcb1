//! Use-case services exposed to front ends.

pub mod form_service;
