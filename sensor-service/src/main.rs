fn main() {
    if let Err(err) = sensor_collector::app::run() {
        eprintln!("service startup failed: {err}");
        std::process::exit(1);
    }
}
