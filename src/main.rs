use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;

use fedauth::oauth::CallbackParams;
use fedauth::{
    ApiOutcome, AuthError, CodeRedemption, FederationClient, FileSession, Identity, SessionStorage,
};

#[derive(Parser)]
#[command(
    name = "fedauth",
    version,
    about = "Sign in through a federation service and call a protected API on the user's behalf"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Session to use; each session keeps its own token cache
    #[arg(long, global = true, default_value = "default")]
    session: String,

    /// Directory holding the session's token files
    #[arg(long, global = true, env = "FEDAUTH_SESSION_DIR")]
    session_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the authorization URL for interactive sign-in
    #[command(name = "sign-in-url")]
    SignInUrl {
        /// Open the URL in the default browser
        #[arg(long)]
        open: bool,
    },

    /// Redeem the authorization code returned to the callback path
    Redeem {
        /// Name identifier of the signed-in user
        identity: String,

        /// Authorization code, or the raw callback query/form body
        code: String,

        /// Expected state value from the sign-in request
        #[arg(long)]
        state: Option<String>,

        /// Redirect URI the authorization request used (defaults to the
        /// configured callback)
        #[arg(long)]
        redirect_uri: Option<String>,
    },

    /// Acquire an access token silently for the configured resource
    Token {
        identity: String,

        /// Print the token itself
        #[arg(long)]
        show: bool,
    },

    /// Call the downstream API with a delegated token
    Call {
        identity: String,

        /// Path relative to the API base address
        path: String,

        /// POST this JSON body instead of issuing a GET
        #[arg(long)]
        post: Option<String>,
    },

    /// Drop every cached token for a user in this session
    #[command(name = "sign-out")]
    SignOut { identity: String },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("FEDAUTH_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        if e.requires_sign_in() {
            eprintln!("{}: {e}", "Sign-in required".yellow().bold());
            eprintln!("Run `fedauth sign-in-url` to sign in again.");
            std::process::exit(2);
        }
        eprintln!("{}: {e}", "Error".red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AuthError> {
    let config = fedauth::load_config(cli.config.as_deref())?;
    let client = Arc::new(FederationClient::from_config(config));
    let session: Arc<dyn SessionStorage> = match &cli.session_dir {
        Some(dir) => Arc::new(FileSession::new(std::path::Path::new(dir).join(&cli.session))),
        None => Arc::new(FileSession::for_session(&cli.session)),
    };

    match cli.command {
        Commands::SignInUrl { open } => {
            let request = client.sign_in_request().await?;
            println!("{}", request.url);
            eprintln!("state: {}", request.state);
            eprintln!("nonce: {}", request.nonce);
            if open && webbrowser::open(&request.url).is_err() {
                tracing::warn!("Could not open browser automatically. Please visit the URL above.");
            }
            Ok(())
        }
        Commands::Redeem {
            identity,
            code,
            state,
            redirect_uri,
        } => {
            let identity = Identity::new(identity);
            let redirect_uri = redirect_uri.unwrap_or_else(|| client.config().redirect_uri());
            match redeem(&client, session, &identity, &code, state.as_deref(), &redirect_uri).await
            {
                Ok(redemption) => {
                    println!("Signed in as {identity}");
                    if let Some(expires) = redemption.expires_at {
                        println!("Token expires: {expires}");
                    }
                    Ok(())
                }
                Err(e) => {
                    eprintln!("Redirect: {}", fedauth::oauth::failure_location(&e.to_string()));
                    Err(e)
                }
            }
        }
        Commands::Token { identity, show } => {
            let token = client
                .acquire_token(session, &Identity::new(identity))
                .await?;
            if show {
                println!("{}", token.secret());
            } else {
                println!("Token available for {}", client.config().resource_id);
            }
            Ok(())
        }
        Commands::Call {
            identity,
            path,
            post,
        } => {
            let identity = Identity::new(identity);
            let api = fedauth::ProtectedApi::new(client.clone())?;
            let outcome = match post {
                Some(body) => {
                    let body: serde_json::Value =
                        serde_json::from_str(&body).map_err(|e| AuthError::ConfigError {
                            path: "<--post>".into(),
                            detail: format!("Invalid JSON body: {e}"),
                        })?;
                    api.post_json(session, &identity, &path, &body).await?
                }
                None => api.get_json(session, &identity, &path).await?,
            };
            match outcome {
                ApiOutcome::Success(value) => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&value).unwrap_or_default()
                    );
                    Ok(())
                }
                ApiOutcome::SignInRequired => Err(AuthError::interaction_required(
                    &client.config().resource_id,
                )),
                ApiOutcome::Unauthorized => {
                    eprintln!(
                        "{}: the API rejected the cached token; it has been discarded.",
                        "Unauthorized".yellow().bold()
                    );
                    Err(AuthError::interaction_required(&client.config().resource_id))
                }
                ApiOutcome::Failed { status, detail } => {
                    let status = status.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
                    Err(AuthError::Api(format!("status {status}: {detail}")))
                }
            }
        }
        Commands::SignOut { identity } => {
            let identity = Identity::new(identity);
            client.sign_out(session, &identity).await?;
            println!("Signed out {identity}");
            Ok(())
        }
    }
}

/// Redeem either a bare code or a raw callback query/form body.
async fn redeem(
    client: &FederationClient,
    session: Arc<dyn SessionStorage>,
    identity: &Identity,
    input: &str,
    state: Option<&str>,
    redirect_uri: &str,
) -> Result<CodeRedemption, AuthError> {
    if input.contains('=') {
        let params = CallbackParams::parse(input);
        let code = params.authorization_code(state)?;
        client.redeem_code_at(session, identity, code, redirect_uri).await
    } else {
        client.redeem_code_at(session, identity, input, redirect_uri).await
    }
}
