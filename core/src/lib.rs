//! # Reqchain Core
//!
//! The generic execution core of a request-oriented API client.
//!
//! An abstract "operation + parameters" pair becomes an HTTP exchange by
//! running through an ordered chain of named steps, grouped into phases:
//! Validate, Build, Sign, Send, ValidateResponse, Retry, AfterRetry,
//! Unmarshal, UnmarshalMeta and UnmarshalError. Cursor-based pagination is
//! driven by path expressions that read tokens out of a response and write
//! them into the next request's parameters, with no per-operation glue.
//!
//! ## Core Concepts
//!
//! - **Reflect**: object-safe view of a structure's fields, sequences and
//!   nullable references (`#[derive(Reflect)]` lives in `reqchain-macros`)
//! - **Path**: `A[-1].B.C` expressions resolved against any [`Reflect`] value
//! - **Handlers**: per-phase step lists, copied into every request
//! - **Request**: the mutable context one API call runs in
//! - **Pagination**: [`Request::next_page`] and [`Request::each_page`]
//!
//! ## Example
//!
//! ```ignore
//! use reqchain_core::{Config, Operation, Paginator, Service};
//! use std::sync::Arc;
//!
//! let mut service = Service::new(Config::builder().endpoint("https://api.example.com").build())?;
//! reqchain_runtime::DefaultHandlers::new(transport).install(&mut service);
//! let service = Arc::new(service);
//!
//! let op = Arc::new(
//!     Operation::new("ListUsers").with_paginator(Paginator::new("Marker", "NextMarker")),
//! );
//! let mut request = service.new_request(op, ListUsersInput::default(), ListUsersOutput::default());
//! request.each_page(|page, last| {
//!     println!("{page:?} last={last}");
//!     true
//! })?;
//! ```

#[cfg(test)]
extern crate self as reqchain_core;

pub use chrono::{DateTime, Utc};

/// Object-safe reflection over structures, sequences and nullable references
pub mod reflect;

/// Path expressions and the value accessors built on them
pub mod path;

pub mod config;
pub mod environment;
pub mod error;
pub mod handlers;
pub mod http;
pub mod operation;
pub mod pagination;
pub mod payload;
pub mod request;
pub mod service;

pub use config::{Config, ConfigBuilder};
pub use environment::{Clock, SystemClock};
pub use error::{ConfigError, Error};
pub use handlers::{HandlerList, Handlers, NamedHandler, Phase};
pub use http::{Headers, HttpRequest, HttpResponse};
pub use operation::{Operation, Paginator};
pub use path::{
    PathError, PathExpr, set_value_at_path, try_set_value_at_path, try_value_at_path,
    value_at_path, value_at_path_as, values_at_path,
};
pub use payload::Payload;
pub use reflect::{Access, FieldInfo, Kind, Optional, Reflect, Sequence, Struct};
pub use request::Request;
pub use service::Service;
