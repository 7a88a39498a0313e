use owo_colors::OwoColorize;

use soundcase::model::{Case, Lobby, Rarity, Sound};
use soundcase::protocol::ServerMsg;

pub struct EventPrinter {
    json: bool,
    color: bool,
}

impl EventPrinter {
    pub fn new(json: bool, color: bool) -> Self {
        Self { json, color }
    }

    pub fn handle(&mut self, msg: &ServerMsg) {
        if self.json {
            match serde_json::to_string_pretty(msg) {
                Ok(txt) => println!("{}", txt),
                Err(e) => eprintln!("Failed to serialize message to JSON: {}", e),
            }
            return;
        }

        match msg {
            ServerMsg::Welcome {
                user,
                sounds,
                cases,
            } => {
                println!(
                    "Hello {} ({} sounds, {} cases in the locker)",
                    user.username,
                    sounds.len(),
                    cases.len()
                );
            }
            ServerMsg::LobbyCreated { lobby } => {
                println!("Lobby '{}' is open  [{}]", lobby.name, lobby.id);
            }
            ServerMsg::JoinedLobby { lobby } => {
                println!(
                    "Joined '{}' ({} inside)  [{}]",
                    lobby.name, lobby.user_count, lobby.id
                );
            }
            ServerMsg::LeftLobby {
                lobby_id,
                lobby_deleted,
            } => {
                if *lobby_deleted {
                    println!("Left lobby {} (it closed behind you)", lobby_id);
                } else {
                    println!("Left lobby {}", lobby_id);
                }
            }
            ServerMsg::Lobbies { lobbies } => self.print_lobbies(lobbies),
            ServerMsg::LobbyUsers {
                lobby_id,
                usernames,
            } => {
                println!("{} users in {}:", usernames.len(), lobby_id);
                for username in usernames {
                    println!("  {}", username);
                }
            }
            ServerMsg::UserJoined { username, .. } => println!("-> {} joined", username),
            ServerMsg::UserLeft { username, .. } => println!("<- {} left", username),
            ServerMsg::LobbyClosed { lobby_id } => println!("Lobby {} closed", lobby_id),
            ServerMsg::SoundPlayed {
                username,
                file_path,
            } => {
                println!("{} played {}", username, file_path);
            }
            ServerMsg::CaseObtained { case } => {
                println!("Bonus drop! You received '{}' (case #{})", case.name, case.id);
            }
            ServerMsg::CaseOpened { case_id, sound } => match sound {
                Some(sound) => {
                    println!("Case #{} opened: {}", case_id, self.format_sound(sound))
                }
                None => println!("Case #{} was empty", case_id),
            },
            ServerMsg::Inventory { sounds, cases } => {
                println!("{} sounds:", sounds.len());
                for sound in sounds {
                    println!("  {}", self.format_sound(sound));
                }
                println!("{} cases:", cases.len());
                for case in cases {
                    println!("  {}", self.format_case(case));
                }
            }
            ServerMsg::Error { code, message } => {
                eprintln!("Server error ({:?}): {}", code, message)
            }
        }
    }

    pub fn print_lobbies(&self, lobbies: &[Lobby]) {
        if self.json {
            match serde_json::to_string_pretty(lobbies) {
                Ok(txt) => println!("{}", txt),
                Err(e) => eprintln!("Failed to serialize lobbies to JSON: {}", e),
            }
            return;
        }
        println!("{} open lobbies:", lobbies.len());
        for lobby in lobbies {
            println!("  {} ({} inside)  [{}]", lobby.name, lobby.user_count, lobby.id);
        }
    }

    pub fn print_users(&self, lobby_id: &str, usernames: &[String]) {
        if self.json {
            match serde_json::to_string_pretty(usernames) {
                Ok(txt) => println!("{}", txt),
                Err(e) => eprintln!("Failed to serialize users to JSON: {}", e),
            }
            return;
        }
        println!("{} users in {}:", usernames.len(), lobby_id);
        for username in usernames {
            println!("  {}", username);
        }
    }

    fn format_sound(&self, sound: &Sound) -> String {
        format!(
            "#{} {} [{}] (cooldown {}s)",
            sound.id,
            sound.name,
            format_rarity(sound.rarity, self.color),
            sound.cooldown_secs
        )
    }

    fn format_case(&self, case: &Case) -> String {
        format!("#{} {}", case.id, case.name)
    }
}

fn format_rarity(rarity: Rarity, color: bool) -> String {
    let name = match rarity {
        Rarity::Common => "Common",
        Rarity::Uncommon => "Uncommon",
        Rarity::Rare => "Rare",
        Rarity::Epic => "Epic",
        Rarity::Legendary => "Legendary",
    };
    if !color {
        return name.to_string();
    }
    match rarity {
        Rarity::Common => name.to_string(),
        Rarity::Uncommon => name.green().to_string(),
        Rarity::Rare => name.blue().to_string(),
        Rarity::Epic => name.magenta().to_string(),
        Rarity::Legendary => name.yellow().bold().to_string(),
    }
}
