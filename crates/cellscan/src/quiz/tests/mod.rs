mod common;
mod scoring;
mod service;
