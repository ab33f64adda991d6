//! Core library for dte, the debuggable template engine.
//!
//! Translates templates mixing literal text with `<%= expr %>`, `<% code %>` and
//! `${ expr }` blocks into scripts, while recording for every generated character
//! the template position it came from. The resulting [`position::PositionMap`] is
//! used to report script compile errors against template lines ([`report`]) and
//! to move runtime failure frames back to template coordinates
//! ([`template::relocate`]).
//!
//! This crate is backend-agnostic. Scripts are compiled and executed through the
//! [`engine::ScriptEngine`] trait:
//! - [`dte_rhai`](https://docs.rs/dte-rhai): Rhai scripts

pub mod config;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod parser;
pub mod position;
pub mod reader;
pub mod report;
pub mod template;
pub mod writer;
