use clap::Parser;

pub(crate) const DEFAULT_UPSTREAM_URL: &str = "https://ai-backend-13.onrender.com/quiz/invoke";

#[derive(Parser, Debug)]
#[command(
    name = "hackaware-relay",
    version,
    about = "Pass-through relay to the HackAware inference backend"
)]
pub(crate) struct Args {
    #[arg(long, default_value = "127.0.0.1:3000")]
    pub(crate) listen_addr: String,
    #[arg(long, default_value = DEFAULT_UPSTREAM_URL)]
    pub(crate) upstream_url: String,
    #[arg(long, default_value_t = false)]
    pub(crate) log_to_stderr: bool,
}
