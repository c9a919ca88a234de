use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use uuid::Uuid;

mod identity;
mod link;
mod session;
mod store;
mod transport;

use eecp_crypto::ecies::{decrypt_for_recipient, EncryptedMessage, WrappedEntry};
use eecp_protocol::{
    now_millis, MessageEnvelope, MessagePayload, TimeWindow, WorkspaceConfig, WorkspaceId,
};
use identity::Identity;

#[derive(Parser)]
#[command(name = "eecp")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Creates a new workspace and prints its shareable link.
    Create {
        #[arg(long, default_value_t = 10)]
        duration: u32,
        #[arg(long, default_value_t = 8)]
        max_participants: u32,
        #[arg(long, default_value_t = false)]
        allow_extension: bool,
        #[arg(long, default_value = "localhost:3000")]
        server: String,
    },
    /// Joins an existing workspace and observes its text until it expires.
    Join {
        workspace_id: Uuid,
        #[arg(long)]
        key: String,
        #[arg(long, default_value = "localhost:3000")]
        server: String,
    },
    /// Lists workspaces this CLI has created or joined locally.
    List,
    /// Joins a workspace, observes it until interrupted, and writes the
    /// decrypted transcript to a file.
    Export {
        workspace_id: Uuid,
        output_path: String,
        #[arg(long)]
        key: String,
        #[arg(long, default_value = "localhost:3000")]
        server: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Create { duration, max_participants, allow_extension, server } => {
            run_create(duration, max_participants, allow_extension, &server).await
        }
        Command::Join { workspace_id, key, server } => run_join(workspace_id, &key, &server).await,
        Command::List => run_list(),
        Command::Export { workspace_id, output_path, key, server } => {
            run_export(workspace_id, &output_path, &key, &server).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run_create(
    duration_min: u32,
    max_participants: u32,
    allow_extension: bool,
    server: &str,
) -> anyhow::Result<()> {
    let identity = Identity::generate();
    let mut socket = transport::connect(server, None).await?;

    let now = now_millis();
    let config = WorkspaceConfig {
        id: WorkspaceId::new(),
        created_at: now,
        expires_at: now + duration_min as i64 * 60_000,
        time_window: TimeWindow {
            start_time: now,
            end_time: now + duration_min as i64 * 60_000,
            rotation_interval_min: 5,
            grace_period_ms: 60_000,
        },
        max_participants,
        allow_extension,
    };

    transport::send(
        &mut socket,
        &MessageEnvelope {
            workspace_id: None,
            participant_id: None,
            payload: MessagePayload::CreateWorkspace {
                config,
                creator_public_key: identity.public_key_bytes(),
            },
            timestamp: now,
        },
    )
    .await?;

    let challenge = match transport::recv(&mut socket).await?.payload {
        MessagePayload::AuthChallenge { challenge } => challenge,
        other => anyhow::bail!("unexpected message before auth challenge: {other:?}"),
    };
    let signature = eecp_crypto::auth::sign_challenge(&identity.signing_key, &challenge);
    transport::send(
        &mut socket,
        &MessageEnvelope {
            workspace_id: None,
            participant_id: None,
            payload: MessagePayload::AuthResponse { signature, public_key: identity.public_key_bytes() },
            timestamp: now_millis(),
        },
    )
    .await?;

    let response = transport::recv(&mut socket).await?;
    let participant_id = response
        .participant_id
        .ok_or_else(|| anyhow::anyhow!("create response carried no participant id"))?;
    let (created_config, wrapped_bytes) = match response.payload {
        MessagePayload::WorkspaceCreated { config, wrapped_secret, .. } => (config, wrapped_secret),
        MessagePayload::Error { code, message } => anyhow::bail!("{code}: {message}"),
        other => anyhow::bail!("unexpected create response: {other:?}"),
    };

    let entry: WrappedEntry = serde_json::from_slice(&wrapped_bytes)?;
    let mut msg = EncryptedMessage::default();
    msg.insert(participant_id, entry);
    let secret = decrypt_for_recipient(&msg, participant_id, &identity.secret_key)?;

    let base_url = format!("http://{server}");
    let shareable = link::build(&base_url, created_config.id.0, &secret);

    println!("Workspace created: {}", created_config.id);
    println!("Share this link with collaborators:\n{shareable}");

    store::remember(store::RememberedWorkspace {
        workspace_id: created_config.id.0,
        link: shareable,
        created_at: created_config.created_at,
        expires_at: created_config.expires_at,
    })?;

    info!(workspace = %created_config.id, "waiting for collaborators (ctrl-c to stop observing)");
    let joined = session::JoinedSession {
        socket,
        participant_id,
        metadata: eecp_protocol::WorkspaceMetadata {
            config: created_config,
            state: eecp_protocol::WorkspaceState::Active,
            participants: Vec::new(),
            current_temporal_key_id: "key-0".into(),
            previous_temporal_key_id: None,
            next_rotation_at: now_millis(),
        },
        secret,
    };
    let text = session::observe_until_closed(joined).await?;
    println!("final text: {text}");
    Ok(())
}

async fn run_join(workspace_id: Uuid, key: &str, server: &str) -> anyhow::Result<()> {
    let identity = Identity::generate();
    let secret_from_link = link::decode_secret(key)?;

    let joined = session::join(server, workspace_id, &identity).await?;
    if joined.secret != secret_from_link {
        anyhow::bail!("server's wrapped secret did not match the provided key");
    }

    store::remember(store::RememberedWorkspace {
        workspace_id,
        link: format!("http://{server}/join?w={workspace_id}&k={key}"),
        created_at: joined.metadata.config.created_at,
        expires_at: joined.metadata.config.expires_at,
    })?;

    info!(%workspace_id, "joined, observing until ctrl-c or expiry");
    let text = session::observe_until_closed(joined).await?;
    println!("final text: {text}");
    Ok(())
}

fn run_list() -> anyhow::Result<()> {
    let workspaces = store::load();
    if workspaces.is_empty() {
        println!("no known workspaces");
        return Ok(());
    }
    for w in workspaces {
        println!("{}  expires_at={}  {}", w.workspace_id, w.expires_at, w.link);
    }
    Ok(())
}

async fn run_export(workspace_id: Uuid, output_path: &str, key: &str, server: &str) -> anyhow::Result<()> {
    let identity = Identity::generate();
    let secret_from_link = link::decode_secret(key)?;

    let joined = session::join(server, workspace_id, &identity).await?;
    if joined.secret != secret_from_link {
        anyhow::bail!("server's wrapped secret did not match the provided key");
    }

    info!("observing workspace; press ctrl-c to finish and write the transcript");
    let text = session::observe_until_closed(joined).await?;

    std::fs::write(output_path, text)?;
    println!("wrote transcript to {output_path}");
    Ok(())
}
