fn main() {
    if let Err(err) = portfolio_tree::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
