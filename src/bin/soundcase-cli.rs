mod cli;

use std::io::IsTerminal;

use clap::Parser;

use cli::{Cli, Commands, EventPrinter};
use soundcase::model::{CaseId, Lobby, LobbyId, SoundId};
use soundcase::protocol::ClientMsg;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let color = std::io::stdout().is_terminal();
    let mut printer = EventPrinter::new(cli.json, color);

    match cli.command {
        Commands::Lobbies => {
            let lobbies: Vec<Lobby> = cli::fetch_json(&cli.server, "/api/lobbies").await?;
            printer.print_lobbies(&lobbies);
        }
        Commands::Users { lobby_id } => {
            let usernames: Vec<String> =
                cli::fetch_json(&cli.server, &format!("/api/lobbies/{}/users", lobby_id)).await?;
            printer.print_users(&lobby_id, &usernames);
        }
        Commands::Create { name } => {
            let actions = vec![ClientMsg::CreateLobby { name }];
            cli::run_session(
                &cli.server,
                &cli.username,
                actions,
                Some(cli.wait_ms),
                &mut printer,
            )
            .await?;
        }
        Commands::Join { lobby_id } => {
            let actions = vec![ClientMsg::JoinLobby {
                lobby_id: LobbyId(lobby_id),
            }];
            cli::run_session(
                &cli.server,
                &cli.username,
                actions,
                Some(cli.wait_ms),
                &mut printer,
            )
            .await?;
        }
        Commands::Play { sound_id, lobby } => {
            // Playing needs a lobby on this connection.
            let enter = match lobby {
                Some(lobby_id) => ClientMsg::JoinLobby {
                    lobby_id: LobbyId(lobby_id),
                },
                None => ClientMsg::CreateLobby {
                    name: format!("{}'s lobby", cli.username),
                },
            };
            let actions = vec![
                enter,
                ClientMsg::PlaySound {
                    sound_id: SoundId(sound_id),
                },
            ];
            cli::run_session(
                &cli.server,
                &cli.username,
                actions,
                Some(cli.wait_ms),
                &mut printer,
            )
            .await?;
        }
        Commands::Open { case_id } => {
            let actions = vec![ClientMsg::OpenCase {
                case_id: CaseId(case_id),
            }];
            cli::run_session(
                &cli.server,
                &cli.username,
                actions,
                Some(cli.wait_ms),
                &mut printer,
            )
            .await?;
        }
        Commands::Inventory => {
            cli::run_session(
                &cli.server,
                &cli.username,
                vec![ClientMsg::GetInventory],
                Some(cli.wait_ms),
                &mut printer,
            )
            .await?;
        }
        Commands::Watch { lobby } => {
            let actions = match lobby {
                Some(lobby_id) => vec![ClientMsg::JoinLobby {
                    lobby_id: LobbyId(lobby_id),
                }],
                None => Vec::new(),
            };
            // No timeout: print events until the server goes away.
            cli::run_session(&cli.server, &cli.username, actions, None, &mut printer).await?;
        }
    }

    Ok(())
}
