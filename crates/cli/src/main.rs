fn main() {
    if let Err(e) = itemaudit_cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
