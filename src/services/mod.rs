pub mod batch;
pub mod delete;
pub mod immich;
pub mod orientation;
pub mod pipeline;
pub mod run_log;
pub mod scan;
pub mod tools;
pub mod verify;
