//! Out-of-band account creation for the salesdesk credential store.

use salesdesk::auth::{AddOutcome, CredentialStore};
use std::io::{self, BufRead, Write};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::var("SALESDESK_USERS_DB").unwrap_or_else(|_| "users.db".to_string());
    let store = CredentialStore::open(&path)?;

    let stdin = io::stdin();
    let username = prompt(&stdin, "Enter username: ")?;
    let username = username.trim();
    let password = prompt(&stdin, "Enter password: ")?;
    let password = password.trim();

    match store.add(username, password)? {
        AddOutcome::Added => println!("User '{username}' added successfully."),
        AddOutcome::AlreadyExists => println!("User '{username}' already exists."),
    }

    Ok(())
}

fn prompt(stdin: &io::Stdin, label: &str) -> io::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(line)
}
