//! Display name of the login user.

use std::fs;
use std::path::Path;
use tracing::debug;

const PASSWD_FILE: &str = "/etc/passwd";

/// The user's full name from the GECOS field, if set.
pub fn pretty_name(username: &str) -> Option<String> {
    pretty_name_from(Path::new(PASSWD_FILE), username)
}

/// Look up `username` in a passwd-format file.
pub fn pretty_name_from(passwd: &Path, username: &str) -> Option<String> {
    let contents = match fs::read_to_string(passwd) {
        Ok(contents) => contents,
        Err(e) => {
            debug!("Could not read {}: {}", passwd.display(), e);
            return None;
        }
    };

    contents
        .lines()
        .map(|line| line.split(':').collect::<Vec<_>>())
        .find(|fields| fields.first() == Some(&username))
        .and_then(|fields| fields.get(4).copied())
        // GECOS is "full name,room,work phone,home phone,other"
        .and_then(|gecos| gecos.split(',').next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
