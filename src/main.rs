fn main() {
    if let Err(e) = creport_lib::cli::run_cli() {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}
