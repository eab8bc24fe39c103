fn main() {
    if let Err(error) = xqtype_cli::run() {
        // run() installs the subscriber right after argument parsing.
        tracing::error!(%error, "query failed");
        std::process::exit(1);
    }
}
