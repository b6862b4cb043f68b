//! Gather facts from one Arista EOS switch
//!
//! Connects, escalates to privileged mode, gathers the requested fact
//! categories and prints them as `ansible_net_*` JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example gather_facts -- --host switch1 --user admin --password secret
//! ```
//!
//! Only the default facts:
//! ```bash
//! cargo run --example gather_facts -- --host switch1 --user admin --password secret --subset '!all'
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use eospoll::{Driver, FactGatherer, HostKeyPolicy, SessionBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    eprintln!("Connecting to {}:{}...", args.host, args.port);

    let mut builder = SessionBuilder::new(&args.host)
        .port(args.port)
        .username(&args.user)
        .timeout(Duration::from_secs(args.timeout));

    if args.insecure {
        builder = builder.host_key_policy(HostKeyPolicy::Disabled);
    }

    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    } else {
        eprintln!("Error: Must provide either --password or --key");
        std::process::exit(1);
    }

    let mut session = builder.connect().await?;
    if let Some(mode) = session.current_privilege() {
        eprintln!("Connected in {} mode", mode);
    }

    session.escalate(args.enable_password.as_deref()).await?;

    let gathered = FactGatherer::new()
        .strict(args.strict)
        .gather(&mut session, &args.subsets)
        .await?;

    for warning in &gathered.warnings {
        eprintln!("warning: {}", warning);
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&gathered.into_ansible_facts())?
    );

    session.close().await?;
    Ok(())
}

struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    enable_password: Option<String>,
    key: Option<PathBuf>,
    timeout: u64,
    subsets: Vec<String>,
    strict: bool,
    insecure: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 22u16;
        let mut user = env::var("USER").unwrap_or_else(|_| "admin".to_string());
        let mut password = None;
        let mut enable_password = None;
        let mut key = None;
        let mut timeout = 30u64;
        let mut subsets = Vec::new();
        let mut strict = false;
        let mut insecure = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(22);
                    }
                }
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = Some(args[i].clone());
                    }
                }
                "--enable-password" | "-e" => {
                    i += 1;
                    if i < args.len() {
                        enable_password = Some(args[i].clone());
                    }
                }
                "--key" | "-k" => {
                    i += 1;
                    if i < args.len() {
                        key = Some(PathBuf::from(&args[i]));
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(30);
                    }
                }
                "--subset" | "-s" => {
                    i += 1;
                    if i < args.len() {
                        subsets.push(args[i].clone());
                    }
                }
                "--strict" => strict = true,
                "--insecure" => insecure = true,
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {}
            }
            i += 1;
        }

        Self {
            host,
            port,
            user,
            password,
            enable_password,
            key,
            timeout,
            subsets,
            strict,
            insecure,
        }
    }

    fn print_help() {
        println!(
            r#"eospoll gather_facts example

Gathers normalized facts from an Arista EOS switch.

USAGE:
    cargo run --example gather_facts -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>              Target host [default: localhost]
    -p, --port <PORT>              SSH port [default: 22]
    -u, --user <USER>              Username [default: $USER]
    -P, --password <PASS>          Password for authentication
    -e, --enable-password <PASS>   Password for enable, if required
    -k, --key <PATH>               Path to SSH private key
    -t, --timeout <SECS>           Connection and command timeout [default: 30]
    -s, --subset <NAME>            gather_subset token, repeatable [default: all]
    --strict                       Fail on replies that are not valid JSON
    --insecure                     Skip host key verification
    --help                         Print this help message
"#
        );
    }
}
