fn main() {
    if let Err(err) = orgchart_renderer::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
