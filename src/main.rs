fn main() {
    if let Err(err) = sankey_barchart::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
