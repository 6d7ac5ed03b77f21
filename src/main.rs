use clap::Parser;
use habla::args::Args;
use habla::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.log_level)?;
    habla::run(args).await
}
