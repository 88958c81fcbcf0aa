//! receipt-batch - receipt image intake and batch extraction pipeline.
//!
//! Receipt images are uploaded through a web form (or the CLI) into object
//! storage under a pending prefix. A scheduled `submit` run packages every
//! pending image into one JSONL batch job for an OpenAI-compatible inference
//! service and records the returned job handle back into storage.

pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod ocr;
pub mod secrets;
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;
