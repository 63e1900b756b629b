use clap::Parser;
use ddb_ferry_lib::cli::ImportArgs;
use ddb_ferry_lib::commands::run_import;

#[tokio::main]
async fn main() {
    let args = ImportArgs::parse();
    let code = run_import(args, "import_worker").await;
    std::process::exit(code);
}
