use std::{
    fmt::Display,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use bytes::Bytes;
use clap::{ArgAction, Parser as ClapParser, Subcommand as ClapSubcommand};
use eyre::WrapErr;
use ferrum_common::{
    Address, H256, U256,
    types::{
        Block, BlockHeader, ChainConfig, Code, Fork, ForkConfig, GenesisAccount,
        GenesisAlloc, Receipt,
    },
};
use ferrum_evm::{errors::TxResult, vm::Message};
use ferrum_vm::{Evm, ExecutionResult, InMemoryDatabase};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{Level, error, info};

/// Where `run` places the code it executes, unless told otherwise.
pub const DEFAULT_RUN_ADDRESS: &str = "0x0000000000000000000000000000000000c0de00";
pub const DEFAULT_RUN_SENDER: &str = "0x0000000000000000000000000000000000000100";

#[allow(clippy::upper_case_acronyms)]
#[derive(ClapParser)]
#[command(name = "ferrum", version, about = "Ferrum EVM runner")]
pub struct CLI {
    #[command(flatten)]
    pub opts: Options,
    #[command(subcommand)]
    pub command: Subcommand,
}

#[derive(ClapParser, Debug, Clone)]
pub struct Options {
    #[arg(
        long = "chain-config",
        value_name = "CHAIN_CONFIG_FILE",
        help = "Receives a `ChainConfig` in json format.",
        long_help = "Chain id and fork activation blocks. Defaults to mainnet fork blocks with chain id `--chain-id`.",
        help_heading = "Chain options",
        env = "FERRUM_CHAIN_CONFIG"
    )]
    pub chain_config: Option<PathBuf>,
    #[arg(
        long = "chain-id",
        default_value_t = 1,
        value_name = "CHAIN_ID",
        help_heading = "Chain options",
        env = "FERRUM_CHAIN_ID"
    )]
    pub chain_id: u64,
    #[arg(
        long = "fork",
        value_name = "FORK",
        help = "Runs every block under this fork, ignoring the configured activation blocks.",
        long_help = "Possible values: frontier, homestead, tangerineWhistle, spuriousDragon, byzantium",
        help_heading = "Chain options",
        env = "FERRUM_FORK"
    )]
    pub fork: Option<Fork>,
    #[arg(
        long = "keep-gas",
        action = ArgAction::SetTrue,
        help = "Return the remaining gas of exceptionally halted frames instead of burning it.",
        help_heading = "Execution options",
        env = "FERRUM_KEEP_GAS"
    )]
    pub keep_gas: bool,
    #[arg(
        long = "log.level",
        default_value_t = Level::INFO,
        value_name = "LOG_LEVEL",
        env = "FERRUM_LOG_LEVEL",
        help = "The verbosity level used for logs.",
        long_help = "Possible values: info, debug, trace, warn, error",
        help_heading = "Node options"
    )]
    pub log_level: Level,
    #[arg(
        long = "log.color",
        default_value_t = LogColor::Auto,
        help = "Output logs with ANSI color codes.",
        long_help = "Possible values: auto, always, never",
        help_heading = "Node options",
        env = "FERRUM_LOG_COLOR"
    )]
    pub log_color: LogColor,
}

impl Options {
    fn chain_config(&self) -> eyre::Result<ChainConfig> {
        let mut config = match &self.chain_config {
            Some(path) => read_json::<ChainConfig>(path)?,
            None => ChainConfig {
                chain_id: self.chain_id,
                ..Default::default()
            },
        };
        if let Some(fork) = self.fork {
            config.forks = ForkConfig::single(fork);
        }
        Ok(config)
    }

    fn evm(&self, store: InMemoryDatabase) -> Evm {
        if self.keep_gas {
            Evm::new_keeping_gas(Arc::new(store))
        } else {
            Evm::new(Arc::new(store))
        }
    }
}

#[derive(ClapSubcommand)]
pub enum Subcommand {
    #[command(name = "run", about = "Execute raw bytecode as a message call")]
    Run {
        #[arg(required = true, value_name = "BYTECODE", help = "Hex encoded code to run")]
        code: String,
        #[arg(long = "input", default_value = "", value_name = "CALLDATA")]
        input: String,
        #[arg(long = "gas", default_value_t = 10_000_000, value_name = "GAS_LIMIT")]
        gas: u64,
        #[arg(long = "value", default_value_t = 0, value_name = "WEI")]
        value: u128,
        #[arg(long = "sender", default_value = DEFAULT_RUN_SENDER, value_name = "ADDRESS")]
        sender: Address,
        #[arg(long = "address", default_value = DEFAULT_RUN_ADDRESS, value_name = "ADDRESS")]
        address: Address,
        #[arg(long = "number", default_value_t = 1, value_name = "BLOCK_NUMBER")]
        number: u64,
        #[arg(long = "prestate", value_name = "ALLOC_FILE", help = "Accounts present before execution, in json format")]
        prestate: Option<PathBuf>,
    },
    #[command(name = "block", about = "Execute a block against a pre-state and print receipts")]
    Block {
        #[arg(long = "prestate", required = true, value_name = "ALLOC_FILE")]
        prestate: PathBuf,
        #[arg(long = "block", required = true, value_name = "BLOCK_FILE")]
        block: PathBuf,
    },
}

impl Subcommand {
    pub fn run(self, opts: &Options) -> eyre::Result<()> {
        let chain_config = opts.chain_config()?;
        match self {
            Subcommand::Run {
                code,
                input,
                gas,
                value,
                sender,
                address,
                number,
                prestate,
            } => {
                let mut alloc = match prestate {
                    Some(path) => read_json::<GenesisAlloc>(&path)?,
                    None => GenesisAlloc::new(),
                };
                alloc.entry(sender).or_insert_with(|| GenesisAccount {
                    balance: U256::from(value),
                    ..Default::default()
                });

                let mut store = InMemoryDatabase::from_genesis(chain_config, alloc);
                let mut account = store
                    .account(&address)
                    .cloned()
                    .unwrap_or_default();
                account.code = Code::from_bytecode(parse_hex(&code)?);
                account.info.code_hash = account.code.hash;
                store.add_account(address, account);

                let mut evm = opts.evm(store);
                let header = BlockHeader {
                    number,
                    gas_limit: gas,
                    ..Default::default()
                };
                let message = Message {
                    sender,
                    to: address,
                    code_address: address,
                    value: U256::from(value),
                    data: parse_hex(&input)?,
                    gas_limit: gas,
                    should_transfer_value: true,
                    ..Default::default()
                };
                let result = evm.call(message, &header)?;

                print_json(&RunOutput {
                    success: result.is_success(),
                    gas_used: result.gas_used,
                    output: format!("0x{}", hex::encode(&result.output)),
                    exception: match result.result {
                        TxResult::Success => None,
                        TxResult::Revert(error) => Some(error.to_string()),
                    },
                    state_root: evm.state_root()?,
                })?;
            }
            Subcommand::Block { prestate, block } => {
                let alloc = read_json::<GenesisAlloc>(&prestate)?;
                let block = read_json::<Block>(&block)?;
                let store = InMemoryDatabase::from_genesis(chain_config, alloc);
                let mut evm = opts.evm(store);

                let result = evm.execute_block(&block).inspect_err(|error| {
                    error!(number = block.header.number, %error, "Block execution failed");
                })?;
                let state_root = evm.state_root()?;
                info!(
                    number = block.header.number,
                    ?state_root,
                    gas_used = result.block_gas_used,
                    "Block applied"
                );

                print_json(&BlockOutput {
                    state_root,
                    gas_used: result.block_gas_used,
                    receipts: result.receipts,
                    results: result.results,
                })?;
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunOutput {
    success: bool,
    gas_used: u64,
    output: String,
    exception: Option<String>,
    state_root: H256,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockOutput {
    state_root: H256,
    gas_used: u64,
    receipts: Vec<Receipt>,
    results: Vec<ExecutionResult>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> eyre::Result<T> {
    let file = File::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .wrap_err_with(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn parse_hex(input: &str) -> eyre::Result<Bytes> {
    let digits = input.trim().trim_start_matches("0x");
    let decoded = hex::decode(digits).wrap_err_with(|| format!("Invalid hex input {input:?}"))?;
    Ok(Bytes::from(decoded))
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum LogColor {
    #[default]
    Auto,
    Always,
    Never,
}

impl Display for LogColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogColor::Auto => write!(f, "auto"),
            LogColor::Always => write!(f, "always"),
            LogColor::Never => write!(f, "never"),
        }
    }
}

impl FromStr for LogColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(LogColor::Auto),
            "always" => Ok(LogColor::Always),
            "never" => Ok(LogColor::Never),
            _ => Err(format!(
                "Invalid log color '{s}'. Expected: auto, always, or never"
            )),
        }
    }
}
