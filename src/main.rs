fn main() {
    if let Err(e) = mod_deployer_lib::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
