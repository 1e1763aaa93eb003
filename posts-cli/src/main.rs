mod config;
mod console;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Settings;
use console::{truncate, ConsoleNotifier};
use posts_sync::models::Post;
use posts_sync::notify::BusyFlag;
use posts_sync::store::FileStore;
use posts_sync::{validation, PostsClient, SyncContext};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const TEARDOWN_WAIT: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API root, e.g. http://localhost:3000/api
    #[arg(short, long, env = "POSTS_API_URL")]
    server: Option<String>,

    /// Directory holding the persisted manager state
    #[arg(long, env = "POSTS_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Request timeout in seconds; unset or 0 waits forever
    #[arg(long, env = "POSTS_TIMEOUT_SECS")]
    timeout: Option<u64>,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Log in with a token issued by Google
    Google {
        #[arg(short, long)]
        token: String,
    },

    /// Pick up an existing server-side session
    Restore,

    Logout {
        #[arg(short, long)]
        quiet: bool,
    },

    /// Tear down the remote session without waiting for the answer
    Close,

    Status,

    List {
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        #[arg(short, long, default_value_t = 5)]
        rows: u32,

        #[arg(long, default_value = "title")]
        sort_by: String,

        #[arg(short, long)]
        descending: bool,

        #[arg(short, long, default_value = "")]
        filter: String,
    },

    Get {
        #[arg(short, long)]
        id: String,
    },

    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        content: String,
    },

    Update {
        #[arg(short, long)]
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,
    },

    Delete {
        /// Ids to delete; removed last to first
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let settings = Settings::resolve(cli.server, cli.state_dir, cli.timeout)?;
    tracing::debug!("Using API at {}", settings.api_url);

    let store = FileStore::new(&settings.state_dir).context("Failed to open state directory")?;
    let ctx = SyncContext::http(
        settings.api_url.clone(),
        settings.timeout,
        Some(settings.cookie_file()),
        Arc::new(ConsoleNotifier),
        Arc::new(BusyFlag::new()),
        Arc::new(store),
    )
    .context("Failed to create HTTP client")?;
    let mut client = PostsClient::new(ctx);

    let ok = match cli.command {
        Commands::Login { email, password } => {
            if let Err(e) = validation::validate_credentials(&email, &password) {
                eprintln!("{}", e);
                std::process::exit(1);
            }
            client
                .session
                .login_with_credentials(&email, &password)
                .await
                .is_ok()
        }

        Commands::Google { token } => client
            .session
            .login_with_external_token(&token)
            .await
            .is_ok(),

        Commands::Restore => match client.session.attempt_session_restore().await {
            Ok(Some(_)) => true,
            Ok(None) => {
                println!("No session to restore");
                true
            }
            Err(_) => false,
        },

        Commands::Logout { quiet } => client.session.end_session(!quiet).await.is_ok(),

        Commands::Close => {
            let handle = client.session.terminate_remote_session();
            // Give the request a moment before the runtime shuts down
            wait_for_teardown(handle, TEARDOWN_WAIT).await;
            true
        }

        Commands::Status => {
            match client.session.user() {
                Some(user) => {
                    println!("Logged in ({:?})", client.session.status());
                    println!("   Name: {}", user.name.as_deref().unwrap_or("-"));
                    println!("   Email: {}", user.email.as_deref().unwrap_or("-"));
                    if let Some(roles) = &user.roles {
                        println!("   Roles: {}", roles.join(", "));
                    }
                }
                None => println!("Not logged in"),
            }
            let pagination = client.posts.pagination();
            println!(
                "Posts: page {} ({} per page, {} total), sorted by {}{}",
                pagination.page,
                pagination.rows_per_page,
                pagination.rows_number,
                pagination.sort_by,
                if pagination.descending { " desc" } else { "" }
            );
            true
        }

        Commands::List {
            page,
            rows,
            sort_by,
            descending,
            filter,
        } => {
            client.posts.set_pagination(page, rows, sort_by, descending);
            client.posts.set_filter(filter);

            let ok = client.posts.refresh_page().await.is_ok();
            if ok {
                print_page(&client);
            }
            ok
        }

        Commands::Get { id } => {
            client.posts.set_data(Post::with_id(id));
            match client.posts.load_one().await {
                Ok(Some(post)) => {
                    print_post(&post);
                    true
                }
                Ok(None) => true,
                Err(_) => false,
            }
        }

        Commands::Create { title, content } => {
            client.posts.set_data(Post::draft(title, content));
            client.posts.create_one().await.is_ok()
        }

        Commands::Update { id, title, content } => {
            client.posts.set_data(Post::with_id(id));
            if client.posts.load_one().await.is_err() {
                std::process::exit(1);
            }
            client.posts.edit_data(|post| {
                if title.is_some() {
                    post.title = title;
                }
                if content.is_some() {
                    post.content = content;
                }
            });
            client.posts.update_one().await.is_ok()
        }

        Commands::Delete { ids } => {
            client
                .posts
                .select(ids.into_iter().map(Post::with_id).collect());
            client.posts.delete_selected().await.is_success()
        }
    };

    if !ok {
        std::process::exit(1);
    }

    Ok(())
}

/// Waits up to `limit` for the close request. Returns whether it settled.
async fn wait_for_teardown(handle: JoinHandle<()>, limit: Duration) -> bool {
    match tokio::time::timeout(limit, handle).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!("Close request task failed: {}", e);
            true
        }
        Err(_) => {
            tracing::debug!("Close request still pending after {:?}, exiting", limit);
            false
        }
    }
}

fn print_page(client: &PostsClient) {
    let posts = client.posts.posts();
    let pagination = client.posts.pagination();
    println!(
        "Found {} posts (total: {}, page {})",
        posts.len(),
        pagination.rows_number,
        pagination.page
    );
    println!();

    if posts.is_empty() {
        println!("   No posts found");
        return;
    }

    for (i, post) in posts.iter().enumerate() {
        println!(
            "   {}. [{}] {}",
            i + 1,
            post.id.as_deref().unwrap_or("-"),
            post.title.as_deref().unwrap_or("(untitled)")
        );
        if let Some(author) = &post.author {
            println!("      Author: {}", author);
        }
        println!(
            "      Content: {}",
            truncate(post.content.as_deref().unwrap_or(""), 50)
        );
        println!();
    }
}

fn print_post(post: &Post) {
    println!("   ID: {}", post.id.as_deref().unwrap_or("-"));
    println!("   Title: {}", post.title.as_deref().unwrap_or("(untitled)"));
    println!("   Author: {}", post.author.as_deref().unwrap_or("-"));
    println!("   Content: {}", post.content.as_deref().unwrap_or(""));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn teardown_wait_gives_up_on_a_stuck_request() {
        let handle = tokio::spawn(tokio::time::sleep(Duration::from_secs(60)));
        assert!(!wait_for_teardown(handle, Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn teardown_wait_returns_once_settled() {
        let handle = tokio::spawn(async {});
        assert!(wait_for_teardown(handle, Duration::from_secs(2)).await);
    }
}
