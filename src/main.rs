fn main() {
    if let Err(err) = pdf_callout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
