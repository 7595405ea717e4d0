#![allow(dead_code)]

pub mod fake_backend;
pub mod shape_hunter_env;
