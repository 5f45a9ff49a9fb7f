//! `terraform-provider-oci` plugin binary.
//!
//! Pass `-debug` to start without the host's magic cookie, for attaching a
//! debugger by hand.

use terraform_provider_oci::{init_logging, serve_with_options, OciProvider, ServeOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let mut options = ServeOptions::new();
    if std::env::args().skip(1).any(|arg| arg == "-debug" || arg == "--debug") {
        options = options.without_magic_cookie();
    }

    serve_with_options(OciProvider::new(), options).await
}
