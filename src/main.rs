use clap::Parser;
use tracing_subscriber::EnvFilter;

mod parser;
mod config;
use config::CmdChooser;
mod network;
mod misc;
mod output;
use network::main_execs;

fn main() -> anyhow::Result<()> {
    let option = CmdChooser::parse();

    // RUST_LOG wins over the quiet flag
    let level = if option.quiet() { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level))
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match option{
        CmdChooser::Simulate(opt) => main_execs::simulate(opt),
        CmdChooser::RelativeLoss(opt) => main_execs::relative_loss_exec(opt),
        CmdChooser::Run(opt) => main_execs::run(opt),
        CmdChooser::Info(opt) => main_execs::info(opt),
        CmdChooser::DefaultConfig(opt) => main_execs::default_config(opt)
    };
    if let Err(err) = &result{
        let model_err = err.chain()
            .find_map(|e| e.downcast_ref::<network::ModelError>());
        if let Some(model_err) = model_err{
            tracing::error!(class = model_err.class(), "input rejected");
        }
    }
    result
}
