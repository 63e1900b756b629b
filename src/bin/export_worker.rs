use clap::Parser;
use ddb_ferry_lib::cli::ExportArgs;
use ddb_ferry_lib::commands::run_export;

#[tokio::main]
async fn main() {
    let args = ExportArgs::parse();
    let code = run_export(args, "export_worker").await;
    std::process::exit(code);
}
