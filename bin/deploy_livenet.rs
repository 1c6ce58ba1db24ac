//! Deploy the debt pool contracts to Casper livenet/testnet using Odra livenet environment.
//!
//! Usage:
//!   cargo run --bin deploy_livenet --release
//!
//! Requires .env file with:
//!   ODRA_CASPER_LIVENET_SECRET_KEY_PATH=/path/to/secret_key.pem
//!   ODRA_CASPER_LIVENET_NODE_ADDRESS=https://node.testnet.casper.network
//!   ODRA_CASPER_LIVENET_CHAIN_NAME=casper-test
//!   ODRA_CASPER_LIVENET_PAYMENT_AMOUNT=200000000000
//!
//! Optional:
//!   PERI_INITIAL_SUPPLY (whole tokens, default 100000000)

use odra::casper_types::U256;
use odra::host::{Deployer, HostRef};
use odra::prelude::*;

use pynth_debt_contracts::access_control::{ROLE_ORACLE, ROLE_PYNTH_ISSUER};
use pynth_debt_contracts::collateral_eth::{
    CollateralEth, CollateralEthInitArgs, DEFAULT_ISSUE_FEE_RATE, DEFAULT_MIN_COLLATERAL,
    DEFAULT_MIN_CRATIO,
};
use pynth_debt_contracts::escrow::{RewardEscrow, RewardEscrowInitArgs};
use pynth_debt_contracts::exchange_rates::{
    ExchangeRates, ExchangeRatesInitArgs, DEFAULT_RATE_STALE_PERIOD,
};
use pynth_debt_contracts::issuer::{
    Issuer, IssuerInitArgs, DEFAULT_ISSUANCE_RATIO, DEFAULT_MINIMUM_STAKE_TIME,
};
use pynth_debt_contracts::peri_token::{PeriToken, PeriTokenInitArgs};
use pynth_debt_contracts::pynth::{Pynth, PynthInitArgs};
use pynth_debt_contracts::system_status::{SystemStatus, SystemStatusInitArgs};
use pynth_debt_contracts::types::PUSD;

fn main() {
    // Load environment from .env file
    dotenv::dotenv().ok();

    println!("=== Pynth Debt Pool Livenet Deployment ===");
    println!();

    let env = odra_casper_livenet_env::env();

    // Configure payment amount for deployments/calls (required for Casper 2.0 txs)
    let payment_amount: u64 = std::env::var("ODRA_CASPER_LIVENET_PAYMENT_AMOUNT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(200_000_000_000);
    env.set_gas(payment_amount);

    let deployer = env.caller();
    println!("Deployer: {:?}", deployer);
    println!();

    let scale = U256::from(10u64).pow(U256::from(18u64));
    let initial_supply_whole: u64 = std::env::var("PERI_INITIAL_SUPPLY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(100_000_000);
    let initial_supply = U256::from(initial_supply_whole) * scale;
    // Fees go to the deployer until a fee pool is set
    let fee_pool = deployer;

    // ==================== Phase 1: Gate, Rates, Collateral ====================
    println!("=== Phase 1: Deploying Gate, Rates and Collateral Token ===");
    println!();

    println!("Deploying SystemStatus...");
    let system_status = SystemStatus::deploy(&env, SystemStatusInitArgs { owner: deployer });
    let system_status_addr = system_status.address().clone();
    println!("SystemStatus deployed at: {:?}", system_status_addr);

    println!("Deploying ExchangeRates...");
    let exchange_rates = ExchangeRates::deploy(
        &env,
        ExchangeRatesInitArgs {
            owner: deployer,
            oracle: deployer,
            rate_stale_period: DEFAULT_RATE_STALE_PERIOD,
        },
    );
    let exchange_rates_addr = exchange_rates.address().clone();
    println!("ExchangeRates deployed at: {:?}", exchange_rates_addr);

    println!("Deploying PeriToken...");
    let mut peri = PeriToken::deploy(
        &env,
        PeriTokenInitArgs {
            owner: deployer,
            initial_supply,
            system_status: system_status_addr,
        },
    );
    let peri_addr = peri.address().clone();
    println!("PeriToken deployed at: {:?}", peri_addr);

    println!();

    // ==================== Phase 2: Pynths and Escrows ====================
    println!("=== Phase 2: Deploying Pynths and Escrows ===");
    println!();

    let mut pynths = Vec::new();
    for (name, symbol) in [("Pynth USD", PUSD), ("Pynth ETH", "pETH")] {
        println!("Deploying Pynth {}...", symbol);
        let pynth = Pynth::deploy(
            &env,
            PynthInitArgs {
                owner: deployer,
                name: name.to_string(),
                symbol: symbol.to_string(),
                currency_key: symbol.to_string(),
                system_status: system_status_addr,
            },
        );
        println!("Pynth {} deployed at: {:?}", symbol, pynth.address().clone());
        pynths.push(pynth);
    }

    println!("Deploying RewardEscrow (escrow)...");
    let escrow = RewardEscrow::deploy(&env, RewardEscrowInitArgs { owner: deployer });
    println!("Escrow deployed at: {:?}", escrow.address().clone());

    println!("Deploying RewardEscrow (reward escrow)...");
    let reward_escrow = RewardEscrow::deploy(&env, RewardEscrowInitArgs { owner: deployer });
    println!("RewardEscrow deployed at: {:?}", reward_escrow.address().clone());

    println!();

    // ==================== Phase 3: Core ====================
    println!("=== Phase 3: Deploying Issuer and Loan Manager ===");
    println!();

    println!("Deploying Issuer...");
    let mut issuer = Issuer::deploy(
        &env,
        IssuerInitArgs {
            owner: deployer,
            exchange_rates: exchange_rates_addr,
            system_status: system_status_addr,
            peri_token: peri_addr,
            issuance_ratio: U256::from(DEFAULT_ISSUANCE_RATIO),
            minimum_stake_time: DEFAULT_MINIMUM_STAKE_TIME,
        },
    );
    let issuer_addr = issuer.address().clone();
    println!("Issuer deployed at: {:?}", issuer_addr);

    println!("Deploying CollateralEth...");
    let mut collateral_eth = CollateralEth::deploy(
        &env,
        CollateralEthInitArgs {
            owner: deployer,
            exchange_rates: exchange_rates_addr,
            system_status: system_status_addr,
            fee_pool,
            collateral_key: "pETH".to_string(),
            min_cratio: U256::from(DEFAULT_MIN_CRATIO),
            min_collateral: U256::from(DEFAULT_MIN_COLLATERAL),
            issue_fee_rate: U256::from(DEFAULT_ISSUE_FEE_RATE),
            base_borrow_rate: U256::zero(),
        },
    );
    let collateral_eth_addr = collateral_eth.address().clone();
    println!("CollateralEth deployed at: {:?}", collateral_eth_addr);

    println!();

    // ==================== Phase 4: Wiring ====================
    println!("=== Phase 4: Cross-contract Configuration ===");
    println!();

    println!("Granting pynth issuer roles...");
    for pynth in pynths.iter_mut() {
        pynth.grant_role(ROLE_PYNTH_ISSUER, issuer_addr);
        pynth.grant_role(ROLE_PYNTH_ISSUER, collateral_eth_addr);
    }
    println!("Done.");

    println!("Registering pynths...");
    for pynth in pynths.iter() {
        let pynth_addr = pynth.address().clone();
        issuer.add_pynth(pynth_addr);
        collateral_eth.add_pynth(pynth_addr);
    }
    println!("Done.");

    println!("Configuring escrows and transfer lock...");
    issuer.set_escrows(
        Some(escrow.address().clone()),
        Some(reward_escrow.address().clone()),
    );
    peri.set_issuer(issuer_addr);
    println!("Done.");

    println!("Confirming oracle role...");
    let oracle_ok = exchange_rates.has_role(ROLE_ORACLE, deployer);
    println!("Deployer is oracle: {}", oracle_ok);

    println!();
    println!("=== Deployment Summary ===");
    println!("SystemStatus:  {:?}", system_status_addr);
    println!("ExchangeRates: {:?}", exchange_rates_addr);
    println!("PeriToken:     {:?}", peri_addr);
    println!("Issuer:        {:?}", issuer_addr);
    println!("CollateralEth: {:?}", collateral_eth_addr);
    println!("Fee pool:      {:?}", fee_pool);
}
