#[macro_use]
extern crate failure;

use clap::{App, Arg, ArgMatches, SubCommand};
use console::style;
use env_logger::Builder;
use failure::Error;
use log::LevelFilter;
use std::io::Write;

use distributor_client::config::Config;
use distributor_client::distribution::{hex_h256, parse_address};
use distributor_client::proof_cli::{self, ProofQuery};
use distributor_client::{doctor, publish};

fn load_config(matches: &ArgMatches<'_>) -> Result<Config, Error> {
    let mut config = Config::from_path_opt(matches.value_of("config_path"))?;
    config.apply_matches(matches)?;
    Ok(config)
}

fn run(matches: &ArgMatches<'_>) -> Result<(), Error> {
    let runtime = tokio::runtime::Runtime::new()?;

    if let Some(matches) = matches.subcommand_matches("generate") {
        let config = load_config(matches)?;
        let artifact = runtime.block_on(publish::run_round(&config))?;
        println!("Round published at block {}", artifact.block_number);
        println!("Merkle root: {}", hex_h256(&artifact.root));
        println!("CID: {}", artifact.cid);
        match artifact.receipt {
            Some(receipt) => println!(
                "{} (tx {:?})",
                style("setMerkleRoot confirmed").green(),
                receipt.transaction_hash
            ),
            None => println!(
                "{}",
                style("No signer configured; submit setMerkleRoot with the values above").yellow()
            ),
        }
        Ok(())
    } else if let Some(matches) = matches.subcommand_matches("proof") {
        let config = load_config(matches)?;
        let query = if matches.is_present("list") {
            ProofQuery::List
        } else if let Some(index) = matches.value_of("index") {
            ProofQuery::Index(index.parse().map_err(|_| {
                format_err!("--index \"{}\" is not a non-negative integer", index)
            })?)
        } else if let Some(address) = matches.value_of("address") {
            ProofQuery::Address {
                recipient: parse_address(address)?,
                token: matches.value_of("token").map(parse_address).transpose()?,
            }
        } else {
            return Err(format_err!("pass one of --index, --address or --list"));
        };
        let output = matches.value_of("output").unwrap_or("proof.json");
        runtime.block_on(proof_cli::run_proof(&config, query, output))
    } else if let Some(matches) = matches.subcommand_matches("claim") {
        let config = load_config(matches)?;
        let proof_file = matches
            .value_of("proof_file")
            .expect("Could not find param proof-file");
        runtime.block_on(proof_cli::run_claim(&config, proof_file))
    } else if let Some(matches) = matches.subcommand_matches("doctor") {
        let config = load_config(matches)?;
        runtime.block_on(doctor::run_checks(&config))
    } else {
        Err(format_err!("no subcommand given, see --help"))
    }
}

fn main() {
    let mut builder = Builder::from_default_env();

    if std::env::var("RUST_LOG").is_err() {
        builder
            .format(|buf, record| writeln!(buf, "{}", record.args()))
            .filter_level(LevelFilter::Info);
    }
    builder.init();

    let config_path_arg = Arg::with_name("config_path")
        .long("config")
        .value_name("FILE")
        .help("Sets a custom config file")
        .takes_value(true);
    let rpc_url_arg = Arg::with_name("rpc_url")
        .long("rpc-url")
        .value_name("URL")
        .help("Overrides the JSON-RPC endpoint")
        .takes_value(true);
    let distributor_arg = Arg::with_name("distributor_addr")
        .long("distributor")
        .value_name("ADDRESS")
        .help("Overrides the distributor contract address")
        .takes_value(true);
    let wrapper_arg = Arg::with_name("wrapper_addr")
        .long("wrapper")
        .value_name("ADDRESS")
        .help("Overrides the wrapper contract address")
        .takes_value(true);

    let matches = App::new("distributor-client")
        .about("Operator client for the cumulative Merkle reward distributor")
        .subcommand(
            SubCommand::with_name("generate")
                .about("Compute and publish the next distribution round")
                .arg(&config_path_arg)
                .arg(&rpc_url_arg)
                .arg(&distributor_arg)
                .arg(&wrapper_arg)
                .arg(
                    Arg::with_name("operator_fee")
                        .long("fee")
                        .value_name("PERCENT")
                        .help("Overrides the operator fee percent")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("output_file")
                        .long("output")
                        .value_name("FILE")
                        .help("Also write the distribution blob to a local file")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("proof")
                .about("Generate a Merkle proof for a published claim")
                .arg(&config_path_arg)
                .arg(&rpc_url_arg)
                .arg(&distributor_arg)
                .arg(
                    Arg::with_name("index")
                        .long("index")
                        .value_name("N")
                        .help("Claim index inside the published values")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("address")
                        .long("address")
                        .value_name("ADDRESS")
                        .help("Recipient address to look up")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("token")
                        .long("token")
                        .value_name("ADDRESS")
                        .help("Token address, when the recipient has several claims")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("list")
                        .long("list")
                        .help("List all published claims instead of writing a proof"),
                )
                .arg(
                    Arg::with_name("output")
                        .long("output")
                        .value_name("FILE")
                        .help("Proof output file (default proof.json)")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("claim")
                .about("Submit a claim transaction from a proof file")
                .arg(&config_path_arg)
                .arg(&rpc_url_arg)
                .arg(&distributor_arg)
                .arg(
                    Arg::with_name("proof_file")
                        .long("proof-file")
                        .value_name("FILE")
                        .required(true)
                        .help("Proof file written by the proof subcommand")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("doctor")
                .about("Diagnose problems by running a series of checks")
                .arg(&config_path_arg)
                .arg(&rpc_url_arg)
                .arg(&distributor_arg)
                .arg(&wrapper_arg),
        )
        .get_matches();

    if let Err(err) = run(&matches) {
        eprintln!("{}", style(format!("Error: {}", err)).red());
        std::process::exit(1);
    }
}
