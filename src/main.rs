// src/main.rs

use dagmake::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();

    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("dagmake: failed to initialise logging: {err:?}");
        std::process::exit(1);
    }

    match run(args).await {
        Ok(report) => {
            print!("{}", report.render());
            std::process::exit(report.exit_code());
        }
        Err(err) => {
            eprintln!("dagmake error: {err:?}");
            std::process::exit(1);
        }
    }
}
