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

//! Implements running a lookup and printing its response.

use std::fmt::Write;
use std::process;

use anyhow::{Context as _, Result};
use env_logger::Env;
use log::{error, info};
use tokio::runtime;

use querent::context::{response_status, Context, Extensions, Response};
use querent::dict::Dict;

use crate::args::{Args, Command, Options};
use crate::config;

/// Runs the lookup described by `args`.
pub fn run(args: Args) {
    let default_filter = match args.options.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::init_from_env(Env::new().default_filter_or(default_filter));

    match try_running(args) {
        Ok(true) => (),
        Ok(false) => process::exit(2),
        Err(e) => {
            let mut message = String::from("Lookup failed:");
            for (i, cause) in e.chain().enumerate() {
                let _ = write!(message, "\n[{}] {}", i + 1, cause);
            }
            error!("{}", message);
            process::exit(1);
        }
    }
}

/// Runs the lookup, returning whether the response has answers.
fn try_running(args: Args) -> Result<bool> {
    info!(
        "Querent v{}.{}.{} starting.",
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR"),
        env!("CARGO_PKG_VERSION_PATCH"),
    );

    let config = config::load(&args.options).context("failed to load the configuration")?;
    let extensions = extensions(&args.options);
    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the runtime")?;

    let response = runtime.block_on(async {
        let context = Context::new(config).context("failed to create the context")?;
        let response = match args.command {
            Command::General { ref name, rr_type } => {
                context.general(name, rr_type, &extensions).await
            }
            Command::Address { ref name } => context.address(name, &extensions).await,
            Command::Hostname { address } => context.hostname(address, &extensions).await,
            Command::Service { ref name } => context.service(name, &extensions).await,
        };
        response.context("failed to resolve")
    })?;

    if args.options.dict {
        println!("{:#?}", Dict::from(&response));
    } else {
        print_response(&response);
    }
    Ok(response.status() == response_status::GOOD)
}

fn extensions(options: &Options) -> Extensions {
    Extensions {
        dnssec_return_status: options.dnssec,
        dnssec_return_only_secure: options.only_secure,
        dnssec_return_validation_chain: false,
    }
}

/// Prints the answers of each reply, one record per line, preceded by
/// a comment describing where the reply came from.
fn print_response(response: &Response) {
    if let Some(name) = response.canonical_name() {
        println!("; canonical name: {name}");
    }
    for reply in &response.replies {
        let mut header = format!(
            "; {} from {} over {}",
            reply.message.rcode, reply.upstream, reply.mode
        );
        if let Some(status) = reply.dnssec_status {
            let _ = write!(header, ", DNSSEC {status}");
        }
        println!("{header}");
        for record in &reply.message.answers {
            println!("{record}");
        }
    }
    if response.status() == response_status::NO_SECURE_ANSWERS {
        println!("; no secure answers");
    }
}
