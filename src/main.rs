fn main() {
    if let Err(e) = codegraph::cli::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
