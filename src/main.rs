use clap::Parser;
use log::{error, info};
use peerchain::{run_console, ClientPool, Command, Config, Opt, ServerPool};
use std::io;
use std::process;

fn main() {
    let opt = Opt::parse();

    let config = match Config::load(opt.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    // LOG_LEVEL sets the baseline, RUST_LOG can still refine per module
    let level = config.log_level_filter().unwrap_or(log::LevelFilter::Info);
    env_logger::builder()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(e) = run_command(opt.command, config) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command, mut config: Config) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Listen { port } => {
            if let Some(port) = port {
                config.set_relay_port(port);
            }
            let (pool, events) = ServerPool::listen(&config.get_relay_addr())?;
            info!("Pool: relay ready on {}", pool.local_addr());
            pool.run(events);
        }
        Command::Connect {
            addr,
            mine_interval,
        } => {
            let addr = addr.unwrap_or_else(|| config.get_relay_addr());
            if let Some(secs) = mine_interval {
                config.set_mine_interval_secs(secs);
            }

            let mut pool = ClientPool::connect(&addr, config.get_mine_interval())?;
            let stdin = io::stdin();
            run_console(pool.peer(), stdin.lock(), io::stdout())?;
            pool.shutdown()?;
        }
    }
    Ok(())
}
