//! Main application entry point.

fn main() {
    env_logger::init();
    log::info!("Starting pagefill");

    if let Err(e) = pagefill_app::run(std::env::args_os()) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
