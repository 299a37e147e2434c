#![allow(dead_code)]

pub mod channels;
pub mod service;
