fn main() {
    if let Err(err) = csv_impute::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
