fn main() {
    if let Err(e) = reportlens_lib::run() {
        eprintln!("reportlens: {e}");
        std::process::exit(1);
    }
}
