use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    taskhub::cli::run().await
}
