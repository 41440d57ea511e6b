//! Example running a GitHub authorization-code flow from the terminal.
//!
//! GitHub returns its token payload form-encoded rather than as JSON, so
//! this also demonstrates the token-response parser seam.
//!
//! Set GITHUB_CLIENT_ID / GITHUB_CLIENT_SECRET, open the printed URL in a
//! browser, approve, and paste the redirect URL back.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use url::Url;
use webview_auth_oauth2::{
    ClientConfiguration, CodeGrantFlow, FormEncodedTokenParser, GrantFlow,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ClientConfiguration::new(
        std::env::var("GITHUB_CLIENT_ID").unwrap_or_else(|_| "your-client-id".to_string()),
        Url::parse("https://github.com/login/oauth/authorize")?,
    )?
    .with_client_secret(
        std::env::var("GITHUB_CLIENT_SECRET").unwrap_or_else(|_| "your-client-secret".to_string()),
    )
    .with_token_uri(Url::parse("https://github.com/login/oauth/access_token")?)
    .with_redirect_uri("http://127.0.0.1:8080/callback")
    .with_scope("read:user");

    let mut flow = CodeGrantFlow::new(config).with_parser(Arc::new(FormEncodedTokenParser));

    flow.core_mut().set_on_authorize(|params| {
        println!("\nAuthorized. Token payload:");
        for (key, value) in &params {
            println!("  {key}: {value}");
        }
    });
    flow.core_mut().set_on_failure(|err| match err {
        Some(err) => println!("\nAuthorization failed: {err}"),
        None => println!("\nAuthorization cancelled."),
    });
    flow.core_mut()
        .set_after_authorize_or_failure(|was_failure, _| {
            println!("Attempt finished (failure: {was_failure})");
        });

    let auth_url = flow.authorize_url()?;
    println!("Open this URL in a browser:\n\n  {auth_url}\n");
    println!("After approving, paste the full redirect URL here:");
    print!("> ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let redirect = Url::parse(line.trim())?;

    flow.handle_redirect_url(&redirect).await;

    if flow.core().has_unexpired_access_token() {
        println!("\nSigned API requests will now carry:");
        println!("  {}", flow.core().authorization_header());
    }

    Ok(())
}
