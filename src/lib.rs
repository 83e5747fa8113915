// Library root
// -----------
// The binary (`main.rs`) wires these modules together; everything below
// can be driven without a terminal.
//
// Module responsibilities:
// - `api`: blocking HTTP client for the imaging service (submit, status,
//   result, asset download) behind the `TaskApi` trait.
// - `lifecycle`: per-task state machine (poll until success, failure or
//   timeout).
// - `batch`: runs one task per prompt in order, tolerating failures.
// - `retriever`: saves the images of a finished task to disk.
// - `model`, `error`: typed requests, presets, statuses and errors.
// - `report`: progress observer and its console implementation.
// - `config`, `cli`, `ui`: credential storage, arguments and interactive
//   input.
pub mod api;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod report;
pub mod retriever;
pub mod ui;

#[cfg(test)]
mod test_support;
