// Copyright 2023 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Querent is an asynchronous DNS stub resolver.
//!
//! Lookups go through a [`Context`](context::Context), which sends
//! queries to upstream recursive resolvers (or, in the recursing mode,
//! iterates from the root servers), retries and falls back to TCP as
//! needed, and optionally validates answers with DNSSEC. Responses are
//! available both as typed values and as [`Dict`](dict::Dict) trees.
//!
//! ```no_run
//! # async fn lookup() -> querent::Result<()> {
//! use querent::context::{Config, Context, Extensions};
//!
//! let config = Config {
//!     upstreams: vec!["192.0.2.53:53".parse().unwrap()],
//!     ..Config::default()
//! };
//! let context = Context::new(config)?;
//! let response = context.address("www.example.", &Extensions::default()).await?;
//! for address in response.just_address_answers() {
//!     println!("{address}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod class;
pub mod context;
pub mod dict;
pub mod dnssec;
pub mod error;
pub mod io;
pub mod message;
pub mod name;
pub mod rr;
pub mod transaction;
mod util;

pub use error::{Error, Result};
