//! Data models for receipt intake and batch tracking.

mod job;
mod receipt;

pub use job::{JobHandle, JobStatus};
pub use receipt::{archive_key, receipt_key, EventDetails, ReceiptUpload, RECEIPT_EXTENSION};
