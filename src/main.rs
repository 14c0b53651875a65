use anyhow::Result;
use clap::Parser;
use primitive_db::config::{self, Config};
use primitive_db::shell::{Shell, TerminalConfirm, Timing};
use primitive_db::{AutoConfirm, Confirm, Database, DbResult, JsonFileStore};

fn main() -> Result<()> {
    let config = Config::parse();
    config::log(config.log_level)?;

    let store = JsonFileStore::new(&config.data_dir);
    log::debug!("storage root {}", store.root().display());

    let confirm: Box<dyn Confirm> = match config.yes {
        true => Box::new(AutoConfirm(true)),
        false => Box::new(TerminalConfirm),
    };

    let mut shell = Shell::new(Database::new(store, confirm), Timing::new(config.timing));
    let interrupt = shell.interrupt();
    ctrlc::set_handler(move || {
        if interrupt.trigger() {
            println!("\n{}", DbResult::Exit);
            std::process::exit(0);
        }
    })?;
    shell.run(std::io::stdin().lock(), std::io::stdout())
}
